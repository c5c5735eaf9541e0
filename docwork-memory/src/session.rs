//! Transactions for the in-memory store.

use async_trait::async_trait;
use bson::{Bson, Uuid};
use tracing::debug;

use docwork_core::{
    backend::StoreSession,
    error::{DocumentStoreError, DocumentStoreResult},
    options::{DeleteOptions, InsertOptions, ReplaceOptions},
};

use crate::store::{InMemoryStore, StagedWrites};

/// A transaction over an [`InMemoryStore`].
///
/// Writes are checked against the session's own staged writes first and the
/// store second, then staged. Nothing reaches the store until
/// [`commit_transaction`](StoreSession::commit_transaction), which applies the
/// staged writes under one write lock. Aborting or dropping the session
/// discards them.
///
/// The session does not detect conflicting writes made to the store by others
/// after it started; the last commit wins.
#[derive(Debug)]
pub struct InMemorySession {
    store: InMemoryStore,
    staged: StagedWrites,
}

impl InMemorySession {
    pub(crate) fn new(store: InMemoryStore) -> Self {
        Self { store, staged: StagedWrites::new() }
    }

    async fn exists(&self, collection: &str, key: &str) -> bool {
        match self.staged.get(collection).and_then(|writes| writes.get(key)) {
            Some(staged) => staged.is_some(),
            None => self.store.contains(collection, key).await,
        }
    }

    fn stage(&mut self, collection: &str, key: String, value: Option<Bson>) {
        self.staged
            .entry(collection.to_string())
            .or_default()
            .insert(key, value);
    }

    fn staged_count(&self) -> usize {
        self.staged.values().map(|writes| writes.len()).sum()
    }
}

#[async_trait]
impl StoreSession for InMemorySession {
    async fn insert_document(
        &mut self,
        id: Uuid,
        document: Bson,
        _options: &InsertOptions,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        let key = id.to_string();

        if self.exists(collection, &key).await {
            return Err(DocumentStoreError::DocumentAlreadyExists(key, collection.to_string()));
        }

        self.stage(collection, key, Some(document));
        Ok(())
    }

    async fn replace_document(
        &mut self,
        id: Uuid,
        document: Bson,
        options: &ReplaceOptions,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        let key = id.to_string();

        if !options.is_upsert() && !self.exists(collection, &key).await {
            return Err(DocumentStoreError::DocumentNotFound(key, collection.to_string()));
        }

        self.stage(collection, key, Some(document));
        Ok(())
    }

    async fn delete_document(
        &mut self,
        id: Uuid,
        _options: &DeleteOptions,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        self.stage(collection, id.to_string(), None);
        Ok(())
    }

    async fn commit_transaction(self: Box<Self>) -> DocumentStoreResult<()> {
        let writes = self.staged_count();
        let InMemorySession { store, staged } = *self;

        store.apply(staged).await;
        debug!(writes, "in-memory transaction committed");

        Ok(())
    }

    async fn abort_transaction(self: Box<Self>) -> DocumentStoreResult<()> {
        debug!(writes = self.staged_count(), "in-memory transaction aborted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docwork_core::backend::StoreBackend;

    fn doc(text: &str) -> Bson {
        Bson::Document(doc! { "text": text })
    }

    #[tokio::test]
    async fn staged_writes_are_invisible_until_commit() {
        let store = InMemoryStore::new();
        let mut session = store.start_session().await.unwrap();
        let id = Uuid::new();

        session.insert_document(id, doc("a"), &InsertOptions::new(), "notes").await.unwrap();
        assert_eq!(store.count("notes").await, 0);

        session.commit_transaction().await.unwrap();
        assert_eq!(store.get_documents(vec![id], "notes").await.unwrap(), vec![doc("a")]);
    }

    #[tokio::test]
    async fn dropped_session_discards_writes() {
        let store = InMemoryStore::new();
        let id = Uuid::new();
        store.insert_document(id, doc("kept"), &InsertOptions::new(), "notes").await.unwrap();

        {
            let mut session = store.start_session().await.unwrap();
            session.delete_document(id, &DeleteOptions::new(), "notes").await.unwrap();
            session.insert_document(Uuid::new(), doc("lost"), &InsertOptions::new(), "notes").await.unwrap();
        }

        assert_eq!(store.count("notes").await, 1);
    }

    #[tokio::test]
    async fn checks_see_earlier_writes_of_the_same_session() {
        let store = InMemoryStore::new();
        let id = Uuid::new();
        store.insert_document(id, doc("v1"), &InsertOptions::new(), "notes").await.unwrap();
        let mut session = store.start_session().await.unwrap();

        let err = session
            .insert_document(id, doc("dup"), &InsertOptions::new(), "notes")
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentStoreError::DocumentAlreadyExists(..)));

        session.delete_document(id, &DeleteOptions::new(), "notes").await.unwrap();
        let err = session
            .replace_document(id, doc("v2"), &ReplaceOptions::new(), "notes")
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentStoreError::DocumentNotFound(..)));

        session.insert_document(id, doc("v3"), &InsertOptions::new(), "notes").await.unwrap();
        session.commit_transaction().await.unwrap();

        assert_eq!(store.get_documents(vec![id], "notes").await.unwrap(), vec![doc("v3")]);
    }
}
