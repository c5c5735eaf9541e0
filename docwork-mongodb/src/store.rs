use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Document, Bson, Uuid, doc};
use mongodb::{Client, Collection as MongoCollection, options::ClientOptions};
use tracing::{debug, info};

use docwork_core::{
    backend::{StoreBackend, StoreBackendBuilder, StoreSession},
    error::{DocumentStoreError, DocumentStoreResult},
    options::{DeleteOptions, InsertOptions, ReplaceOptions},
    query::Query,
};

use crate::{
    convert::{
        backend_error, delete_options, id_filter, insert_error, insert_options,
        prepare_document, replace_options, restore_document,
    },
    provider::ClientProvider,
    query::MongoQueryTranslator,
    session::MongoDbSession,
};


/// A [`StoreBackend`] over one MongoDB database.
///
/// Entity identities are stored as `_id`; every write targets a single document.
/// Transactional sessions require a replica set or sharded cluster.
#[derive(Debug, Clone)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn database_name(&self) -> &str {
        &self.database
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    async fn find(&self, filter: Document, query: &Query, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        Ok(
            self.get_collection(collection)
                .find(filter)
                .with_options(MongoQueryTranslator::find_options(query))
                .await
                .map_err(backend_error)?
                .try_collect::<Vec<Document>>()
                .await
                .map_err(backend_error)?
                .into_iter()
                .map(restore_document)
                .collect()
        )
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn get_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        self.find(doc! { "_id": { "$in": ids } }, &Query::new(), collection).await
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        let filter = MongoQueryTranslator::filter(&query)?;
        self.find(filter, &query, collection).await
    }

    async fn insert_document(
        &self,
        id: Uuid,
        document: Bson,
        options: &InsertOptions,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        self.get_collection(collection)
            .insert_one(prepare_document(&id, document)?)
            .with_options(insert_options(options))
            .await
            .map_err(|e| insert_error(e, &id, collection))?;

        Ok(())
    }

    async fn replace_document(
        &self,
        id: Uuid,
        document: Bson,
        options: &ReplaceOptions,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        let result = self.get_collection(collection)
            .replace_one(id_filter(&id), prepare_document(&id, document)?)
            .with_options(replace_options(options))
            .await
            .map_err(backend_error)?;

        if result.matched_count == 0 && result.upserted_id.is_none() {
            return Err(DocumentStoreError::DocumentNotFound(id.to_string(), collection.to_string()));
        }

        Ok(())
    }

    async fn delete_document(
        &self,
        id: Uuid,
        options: &DeleteOptions,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        self.get_collection(collection)
            .delete_one(id_filter(&id))
            .with_options(delete_options(options))
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn start_session(&self) -> DocumentStoreResult<Box<dyn StoreSession>> {
        Ok(Box::new(MongoDbSession::start(&self.client, &self.database).await?))
    }

    async fn shutdown(&self) -> DocumentStoreResult<()> {
        debug!(database = %self.database, "shutting down client");
        self.client.clone().shutdown().await;

        Ok(())
    }
}


enum ClientSource {
    ConnectionString(String),
    Provider(Box<dyn ClientProvider>),
}

/// Builds a [`MongoDbStore`] from a connection string or an injected client.
pub struct MongoDbStoreBuilder {
    source: ClientSource,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            source: ClientSource::ConnectionString(dsn.to_string()),
            database: database.to_string(),
        }
    }

    /// Uses the client returned by `provider` instead of connecting from a string.
    pub fn from_provider(provider: impl ClientProvider + 'static, database: &str) -> Self {
        Self {
            source: ClientSource::Provider(Box::new(provider)),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let client = match self.source {
            ClientSource::ConnectionString(dsn) => Client::with_options(
                ClientOptions::parse(&dsn)
                    .await
                    .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            )
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            ClientSource::Provider(provider) => provider.client(),
        };

        info!(database = %self.database, "mongodb store ready");
        Ok(MongoDbStore::new(client, self.database))
    }
}
