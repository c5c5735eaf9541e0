//! Transactions backed by driver sessions.

use async_trait::async_trait;
use bson::{Bson, Document, Uuid};
use mongodb::{Client, ClientSession, Collection, Database};
use std::fmt;
use tracing::debug;

use docwork_core::{
    backend::StoreSession,
    error::{DocumentStoreError, DocumentStoreResult},
    options::{DeleteOptions, InsertOptions, ReplaceOptions},
};

use crate::convert::{
    backend_error, delete_options, id_filter, insert_error, insert_options, prepare_document,
    replace_options,
};

/// A driver [`ClientSession`] with an open transaction.
///
/// Dropping it without committing lets the driver abort the transaction.
pub struct MongoDbSession {
    database: Database,
    session: ClientSession,
}

impl MongoDbSession {
    pub(crate) async fn start(client: &Client, database: &str) -> DocumentStoreResult<Self> {
        let mut session = client.start_session().await.map_err(backend_error)?;
        session.start_transaction().await.map_err(backend_error)?;
        debug!(database, "transaction started");

        Ok(Self {
            database: client.database(database),
            session,
        })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }
}

impl fmt::Debug for MongoDbSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoDbSession")
            .field("database", &self.database.name())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StoreSession for MongoDbSession {
    async fn insert_document(
        &mut self,
        id: Uuid,
        document: Bson,
        options: &InsertOptions,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        self.collection(collection)
            .insert_one(prepare_document(&id, document)?)
            .with_options(insert_options(options))
            .session(&mut self.session)
            .await
            .map_err(|e| insert_error(e, &id, collection))?;

        Ok(())
    }

    async fn replace_document(
        &mut self,
        id: Uuid,
        document: Bson,
        options: &ReplaceOptions,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        let result = self.collection(collection)
            .replace_one(id_filter(&id), prepare_document(&id, document)?)
            .with_options(replace_options(options))
            .session(&mut self.session)
            .await
            .map_err(backend_error)?;

        if result.matched_count == 0 && result.upserted_id.is_none() {
            return Err(DocumentStoreError::DocumentNotFound(id.to_string(), collection.to_string()));
        }

        Ok(())
    }

    async fn delete_document(
        &mut self,
        id: Uuid,
        options: &DeleteOptions,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        self.collection(collection)
            .delete_one(id_filter(&id))
            .with_options(delete_options(options))
            .session(&mut self.session)
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn commit_transaction(self: Box<Self>) -> DocumentStoreResult<()> {
        let mut this = *self;
        this.session.commit_transaction().await.map_err(backend_error)?;
        debug!(database = this.database.name(), "transaction committed");

        Ok(())
    }

    async fn abort_transaction(self: Box<Self>) -> DocumentStoreResult<()> {
        let mut this = *self;
        this.session.abort_transaction().await.map_err(backend_error)?;
        debug!(database = this.database.name(), "transaction aborted");

        Ok(())
    }
}
