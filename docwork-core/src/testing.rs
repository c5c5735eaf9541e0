//! Test fixtures: a sample entity and a recording store with failure injection.

use async_trait::async_trait;
use bson::{Bson, Uuid};
use mea::mutex::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::{
    backend::{StoreBackend, StoreSession},
    command::OperationKind,
    document::{Document, DocumentExt},
    error::{DocumentStoreError, DocumentStoreResult},
    options::{DeleteOptions, InsertOptions, ReplaceOptions},
    query::Query,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Note {
    pub id: Uuid,
    pub text: String,
}

impl Note {
    pub fn new(text: &str) -> Self {
        Self { id: Uuid::new(), text: text.to_string() }
    }
}

impl Document for Note {
    fn id(&self) -> &Uuid {
        &self.id
    }

    fn collection_name() -> &'static str {
        "notes"
    }
}

pub(crate) type Write = (OperationKind, String, Uuid);

#[derive(Debug, Default)]
struct Recorded {
    documents: Vec<(String, Uuid, Bson)>,
    writes: Vec<Write>,
    attempts: usize,
    commits: usize,
}

/// Applies every write unconditionally and records it, except the write whose
/// zero-based attempt number equals `fail_at`, which fails.
#[derive(Debug, Clone)]
pub(crate) struct RecordingStore {
    inner: Arc<Mutex<Recorded>>,
    fail_at: Option<usize>,
    stall_at: Option<usize>,
    gate: Option<(usize, Arc<Notify>)>,
    fail_commit: bool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Recorded::default())),
            fail_at: None,
            stall_at: None,
            gate: None,
            fail_commit: false,
        }
    }

    /// A store whose write number `attempt` waits until the returned gate is
    /// notified.
    pub fn gated_at(attempt: usize) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let store = Self { gate: Some((attempt, Arc::clone(&gate))), ..Self::new() };
        (store, gate)
    }

    /// A store whose sessions fail on commit after staging every write.
    pub fn failing_commit() -> Self {
        Self { fail_commit: true, ..Self::new() }
    }

    pub fn failing_at(attempt: usize) -> Self {
        Self { fail_at: Some(attempt), ..Self::new() }
    }

    /// A store whose write number `attempt` never completes.
    pub fn stalling_at(attempt: usize) -> Self {
        Self { stall_at: Some(attempt), ..Self::new() }
    }

    pub async fn seed<D: Document>(&self, collection: &str, entity: &D) {
        let document = entity.to_bson().unwrap();
        self.inner
            .lock()
            .await
            .documents
            .push((collection.to_string(), *entity.id(), document));
    }

    pub async fn writes(&self) -> Vec<Write> {
        self.inner.lock().await.writes.clone()
    }

    pub async fn commits(&self) -> usize {
        self.inner.lock().await.commits
    }

    pub async fn documents(&self, collection: &str) -> Vec<Bson> {
        self.inner
            .lock()
            .await
            .documents
            .iter()
            .filter(|(name, _, _)| name == collection)
            .map(|(_, _, doc)| doc.clone())
            .collect()
    }

    /// Counts the attempt and fails or stalls it if it is the injected one.
    async fn attempt(&self) -> DocumentStoreResult<()> {
        let attempt = {
            let mut inner = self.inner.lock().await;
            inner.attempts += 1;
            inner.attempts - 1
        };

        if self.stall_at == Some(attempt) {
            futures::future::pending::<()>().await;
        }
        if let Some((gated, gate)) = &self.gate {
            if *gated == attempt {
                gate.notified().await;
            }
        }

        match self.fail_at {
            Some(fail_at) if fail_at == attempt => {
                Err(DocumentStoreError::Backend(format!("injected failure at write {attempt}")))
            }
            _ => Ok(()),
        }
    }

    async fn apply(&self, write: Write, document: Option<Bson>) {
        let mut inner = self.inner.lock().await;
        let (kind, collection, id) = write.clone();

        inner
            .documents
            .retain(|(name, stored, _)| !(name == &collection && stored == &id && kind != OperationKind::Insert));
        if let Some(document) = document {
            inner.documents.push((collection, id, document));
        }
        inner.writes.push(write);
    }
}

#[async_trait]
impl StoreBackend for RecordingStore {
    async fn get_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        Ok(self
            .inner
            .lock()
            .await
            .documents
            .iter()
            .filter(|(name, id, _)| name == collection && ids.contains(id))
            .map(|(_, _, doc)| doc.clone())
            .collect())
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        Ok(self
            .documents(collection)
            .await
            .into_iter()
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn insert_document(&self, id: Uuid, document: Bson, _: &InsertOptions, collection: &str) -> DocumentStoreResult<()> {
        self.attempt().await?;
        self.apply((OperationKind::Insert, collection.to_string(), id), Some(document)).await;
        Ok(())
    }

    async fn replace_document(&self, id: Uuid, document: Bson, _: &ReplaceOptions, collection: &str) -> DocumentStoreResult<()> {
        self.attempt().await?;
        self.apply((OperationKind::Update, collection.to_string(), id), Some(document)).await;
        Ok(())
    }

    async fn delete_document(&self, id: Uuid, _: &DeleteOptions, collection: &str) -> DocumentStoreResult<()> {
        self.attempt().await?;
        self.apply((OperationKind::Remove, collection.to_string(), id), None).await;
        Ok(())
    }

    async fn start_session(&self) -> DocumentStoreResult<Box<dyn StoreSession>> {
        Ok(Box::new(RecordingSession { store: self.clone(), staged: Vec::new() }))
    }
}

/// Stages writes and applies them to the store only on commit.
#[derive(Debug)]
pub(crate) struct RecordingSession {
    store: RecordingStore,
    staged: Vec<(Write, Option<Bson>)>,
}

#[async_trait]
impl StoreSession for RecordingSession {
    async fn insert_document(&mut self, id: Uuid, document: Bson, _: &InsertOptions, collection: &str) -> DocumentStoreResult<()> {
        self.store.attempt().await?;
        self.staged.push(((OperationKind::Insert, collection.to_string(), id), Some(document)));
        Ok(())
    }

    async fn replace_document(&mut self, id: Uuid, document: Bson, _: &ReplaceOptions, collection: &str) -> DocumentStoreResult<()> {
        self.store.attempt().await?;
        self.staged.push(((OperationKind::Update, collection.to_string(), id), Some(document)));
        Ok(())
    }

    async fn delete_document(&mut self, id: Uuid, _: &DeleteOptions, collection: &str) -> DocumentStoreResult<()> {
        self.store.attempt().await?;
        self.staged.push(((OperationKind::Remove, collection.to_string(), id), None));
        Ok(())
    }

    async fn commit_transaction(self: Box<Self>) -> DocumentStoreResult<()> {
        let RecordingSession { store, staged } = *self;
        if store.fail_commit {
            return Err(DocumentStoreError::Backend("injected commit failure".to_string()));
        }
        for (write, document) in staged {
            store.apply(write, document).await;
        }
        store.inner.lock().await.commits += 1;
        Ok(())
    }

    async fn abort_transaction(self: Box<Self>) -> DocumentStoreResult<()> {
        Ok(())
    }
}
