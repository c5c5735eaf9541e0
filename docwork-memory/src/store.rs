//! In-memory storage implementation for document stores.
//!
//! This module provides a simple in-memory backend that stores documents as BSON
//! values in HashMaps behind an async-safe read-write lock.

use std::{collections::HashMap, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Uuid, Bson};

use docwork_core::{
    query::Query,
    options::{DeleteOptions, InsertOptions, ReplaceOptions},
    error::{DocumentStoreError, DocumentStoreResult},
    backend::{StoreBackend, StoreBackendBuilder, StoreSession},
};

use crate::{evaluator::apply_query, session::InMemorySession};

type CollectionMap = HashMap<String, Bson>;
type StoreMap = HashMap<String, CollectionMap>;

/// Writes staged by a session: collection -> (document key -> new value, `None` to delete).
pub(crate) type StagedWrites = HashMap<String, HashMap<String, Option<Bson>>>;


/// Thread-safe in-memory document storage backend.
///
/// All documents are stored as BSON values indexed by their UUID. The store is
/// cloneable and every clone shares the same data, so several units of work can
/// run against one store.
///
/// Sessions stage their writes privately and apply them in one step on commit;
/// see [`InMemorySession`].
///
/// # Performance
///
/// Queries scan all documents in a collection (no indexing).
///
/// # Example
///
/// ```ignore
/// use docwork_memory::InMemoryStore;
/// use docwork::backend::StoreBackend;
/// use bson::{Uuid, Bson, doc};
///
/// let store = InMemoryStore::new();
/// let id = Uuid::new();
///
/// store.insert_document(id, Bson::Document(doc! { "name": "Alice" }), &Default::default(), "users").await?;
/// assert_eq!(store.get_documents(vec![id], "users").await?.len(), 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection_name -> (document_id -> document)
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder
    }

    /// Returns the number of documents stored in `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        self.store
            .read()
            .await
            .get(collection)
            .map_or(0, HashMap::len)
    }

    pub(crate) async fn contains(&self, collection: &str, key: &str) -> bool {
        self.store
            .read()
            .await
            .get(collection)
            .is_some_and(|documents| documents.contains_key(key))
    }

    /// Applies every staged write under a single write lock.
    pub(crate) async fn apply(&self, staged: StagedWrites) {
        let mut store = self.store.write().await;

        for (collection, writes) in staged {
            let collection_map = store.entry(collection).or_default();

            for (key, value) in writes {
                match value {
                    Some(document) => {
                        collection_map.insert(key, document);
                    }
                    None => {
                        collection_map.remove(&key);
                    }
                }
            }
        }
    }
}


#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn get_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        Ok(
            ids
                .iter()
                .filter_map(|id| collection_map.get(&id.to_string()))
                .cloned()
                .collect()
        )
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        let store = self.store.read().await;

        match store.get(collection) {
            Some(collection_map) => apply_query(collection_map.values(), &query),
            None => Ok(vec![]),
        }
    }

    async fn insert_document(
        &self,
        id: Uuid,
        document: Bson,
        _options: &InsertOptions,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = store
            .entry(collection.to_string())
            .or_default();
        let key = id.to_string();

        if collection_map.contains_key(&key) {
            return Err(DocumentStoreError::DocumentAlreadyExists(key, collection.to_string()));
        }

        collection_map.insert(key, document);

        Ok(())
    }

    async fn replace_document(
        &self,
        id: Uuid,
        document: Bson,
        options: &ReplaceOptions,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = store
            .entry(collection.to_string())
            .or_default();
        let key = id.to_string();

        if !collection_map.contains_key(&key) && !options.is_upsert() {
            return Err(DocumentStoreError::DocumentNotFound(key, collection.to_string()));
        }

        collection_map.insert(key, document);

        Ok(())
    }

    async fn delete_document(
        &self,
        id: Uuid,
        _options: &DeleteOptions,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        if let Some(collection_map) = self.store.write().await.get_mut(collection) {
            collection_map.remove(&id.to_string());
        }

        Ok(())
    }

    async fn start_session(&self) -> DocumentStoreResult<Box<dyn StoreSession>> {
        Ok(Box::new(InMemorySession::new(self.clone())))
    }
}


/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Debug, Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Always succeeds and returns a freshly initialized store.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}
