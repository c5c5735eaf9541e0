//! Typed proxies over one collection of a unit of work.
//!
//! An [`EntitySet`] reads directly from the store and defers writes: `insert`,
//! `update` and `remove` build a [`Command`], push it onto the queue shared with
//! the owning [`UnitOfWork`](crate::unit::UnitOfWork) and return without touching
//! the store. Inserted and updated entities are also recorded in the set's
//! modified registry until the next successful commit.
//!
//! Reads only observe what is already stored, so a read issued after a queued
//! write does not see that write until the unit of work is committed.

use async_trait::async_trait;
use bson::{Uuid, de::deserialize_from_bson};
use mea::mutex::Mutex;
use serde::de::DeserializeOwned;
use std::{any::Any, collections::HashMap, fmt, sync::Arc};
use tracing::debug;

use crate::{
    backend::StoreBackend,
    command::{Command, WriteOperation},
    document::{Document, DocumentExt},
    error::{DocumentStoreError, DocumentStoreResult},
    options::{DeleteOptions, InsertOptions, ReplaceOptions},
    query::{Expr, Query},
    queue::SharedQueue,
};

/// Entities inserted or updated since the last commit, deduplicated by identity.
///
/// A re-tracked entity keeps its original position and takes the latest snapshot.
#[derive(Debug)]
pub(crate) struct ModifiedRegistry<D> {
    entries: Vec<D>,
    positions: HashMap<Uuid, usize>,
}

impl<D: Document> ModifiedRegistry<D> {
    fn new() -> Self {
        Self { entries: Vec::new(), positions: HashMap::new() }
    }

    fn track(&mut self, entity: D) {
        match self.positions.get(entity.id()) {
            Some(&position) => self.entries[position] = entity,
            None => {
                self.positions.insert(*entity.id(), self.entries.len());
                self.entries.push(entity);
            }
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.positions.clear();
    }
}

/// A typed, cloneable handle bound to one collection.
///
/// Entity sets are only created while a unit of work is being constructed (see
/// [`SetRegistry`](crate::unit::SetRegistry)); every clone shares the same queue and
/// modified registry.
pub struct EntitySet<D: Document> {
    collection: Arc<str>,
    backend: Arc<dyn StoreBackend>,
    queue: SharedQueue,
    modified: Arc<Mutex<ModifiedRegistry<D>>>,
}

impl<D: Document> EntitySet<D> {
    pub(crate) fn new(collection: &str, backend: Arc<dyn StoreBackend>, queue: SharedQueue) -> Self {
        Self {
            collection: Arc::from(collection),
            backend,
            queue,
            modified: Arc::new(Mutex::new(ModifiedRegistry::new())),
        }
    }

    /// Returns the name of the collection this set reads from and writes to.
    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    /// Returns the type name of the entities in this set.
    pub fn entity_type(&self) -> &'static str {
        std::any::type_name::<D>()
    }

    /// Reads the entity with the given identity.
    ///
    /// Returns `Ok(None)` when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::AmbiguousResult`] when the store reports more
    /// than one document for the identity.
    pub async fn get_by_id(&self, id: impl Into<Uuid>) -> DocumentStoreResult<Option<D>> {
        let id = id.into();
        let mut documents = self
            .backend
            .get_documents(vec![id], &self.collection)
            .await?;

        match documents.len() {
            0 | 1 => documents
                .pop()
                .map(D::from_bson)
                .transpose(),
            count => Err(DocumentStoreError::AmbiguousResult {
                id: id.to_string(),
                collection: self.collection.to_string(),
                count,
            }),
        }
    }

    /// Reads the full current contents of the collection. Each call queries the store.
    pub async fn get_all(&self) -> DocumentStoreResult<Vec<D>> {
        self.query(Query::new()).await
    }

    /// Reads the first entity matching `predicate`, or the first entity of the
    /// collection when no predicate is given.
    pub async fn find(&self, predicate: Option<Expr>) -> DocumentStoreResult<Option<D>> {
        let query = Query {
            filter: predicate,
            limit: Some(1),
            ..Query::default()
        };

        Ok(self
            .query(query)
            .await?
            .into_iter()
            .next())
    }

    /// Reads every entity matching `query`. Projection, sort and pagination are
    /// passed to the store untouched.
    ///
    /// A projection must keep every field `D` requires; use
    /// [`query_as`](Self::query_as) to read a subset of fields.
    pub async fn query(&self, query: Query) -> DocumentStoreResult<Vec<D>> {
        self.query_as(query).await
    }

    /// Reads every document matching `query` into `P`, typically a projection
    /// of `D`.
    ///
    /// ```ignore
    /// #[derive(Deserialize)]
    /// struct Name { name: String }
    ///
    /// let names: Vec<Name> = uow.customers
    ///     .query_as(Query::builder().project(["name"]).build())
    ///     .await?;
    /// ```
    pub async fn query_as<P: DeserializeOwned>(&self, query: Query) -> DocumentStoreResult<Vec<P>> {
        self.backend
            .query_documents(query, &self.collection)
            .await?
            .into_iter()
            .map(|document| deserialize_from_bson(document).map_err(DocumentStoreError::from))
            .collect()
    }

    /// Queues an insert of `entity` and tracks it as modified.
    ///
    /// The entity is serialized now; later changes to it are not written by this
    /// command.
    pub async fn insert(&self, entity: &D, options: InsertOptions) -> DocumentStoreResult<()> {
        let id = *entity.id();
        self.enqueue(WriteOperation::Insert {
            id,
            document: entity.to_bson()?,
            options,
        })
        .await;
        self.modified.lock().await.track(entity.clone());

        Ok(())
    }

    /// Queues a replace of the document stored under `id` with `entity` and tracks
    /// `entity` as modified.
    pub async fn update(
        &self,
        id: impl Into<Uuid>,
        entity: &D,
        options: ReplaceOptions,
    ) -> DocumentStoreResult<()> {
        self.enqueue(WriteOperation::Update {
            id: id.into(),
            document: entity.to_bson()?,
            options,
        })
        .await;
        self.modified.lock().await.track(entity.clone());

        Ok(())
    }

    /// Queues a delete of the document stored under `id`.
    ///
    /// Removed entities are not tracked as modified.
    pub async fn remove(&self, id: impl Into<Uuid>, options: DeleteOptions) {
        self.enqueue(WriteOperation::Remove { id: id.into(), options })
            .await;
    }

    /// Returns a snapshot of the entities inserted or updated since the last commit.
    pub async fn list_modified(&self) -> Vec<D> {
        self.modified.lock().await.entries.clone()
    }

    pub(crate) async fn clear_modified(&self) {
        self.modified.lock().await.clear();
    }

    async fn enqueue(&self, operation: WriteOperation) {
        let command = Command::for_entity::<D>(self.collection.as_ref(), operation);

        debug!(
            collection = %self.collection,
            entity_type = self.entity_type(),
            operation = %command.kind(),
            id = %command.operation().id(),
            "queued command"
        );

        self.queue.lock().await.enqueue(command);
    }
}

impl<D: Document> Clone for EntitySet<D> {
    fn clone(&self) -> Self {
        Self {
            collection: Arc::clone(&self.collection),
            backend: Arc::clone(&self.backend),
            queue: Arc::clone(&self.queue),
            modified: Arc::clone(&self.modified),
        }
    }
}

impl<D: Document> fmt::Debug for EntitySet<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitySet")
            .field("collection", &self.collection)
            .field("entity_type", &self.entity_type())
            .finish_non_exhaustive()
    }
}

/// Type-erased view of an entity set, held by the unit of work's slot registry.
#[async_trait]
pub(crate) trait TrackedSet: Send + Sync + fmt::Debug {
    fn collection_name(&self) -> &str;
    fn entity_type(&self) -> &'static str;
    async fn modified_count(&self) -> usize;
    async fn clear_modified(&self);
    fn as_any(&self) -> &dyn Any;
}

#[async_trait]
impl<D: Document> TrackedSet for EntitySet<D> {
    fn collection_name(&self) -> &str {
        EntitySet::collection_name(self)
    }

    fn entity_type(&self) -> &'static str {
        EntitySet::entity_type(self)
    }

    async fn modified_count(&self) -> usize {
        self.modified.lock().await.entries.len()
    }

    async fn clear_modified(&self) {
        EntitySet::clear_modified(self).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
