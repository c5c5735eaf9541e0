//! Storage backend abstraction for the unit of work.
//!
//! This module is the boundary between the deferred-command engine and a concrete
//! document store driver. The engine only ever asks a backend to:
//!
//! - read documents directly ([`StoreBackend::get_documents`], [`StoreBackend::query_documents`]),
//! - execute one write against a named collection ([`StoreBackend::insert_document`],
//!   [`StoreBackend::replace_document`], [`StoreBackend::delete_document`]),
//! - open a transactional [`StoreSession`] that performs the same writes and is
//!   either committed or discarded as a whole.
//!
//! Both traits are object safe; a [`UnitOfWork`](crate::unit::UnitOfWork) holds its
//! backend as `Arc<dyn StoreBackend>`.

use async_trait::async_trait;
use bson::{Bson, Uuid};
use std::fmt::Debug;

use crate::{
    error::DocumentStoreResult,
    options::{DeleteOptions, InsertOptions, ReplaceOptions},
    query::Query,
};

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; several units of work may share one store
/// and run concurrently with no coordination beyond what the store provides.
///
/// # Write semantics
///
/// - inserting an id that already exists fails with
///   [`DocumentAlreadyExists`](crate::error::DocumentStoreError::DocumentAlreadyExists);
/// - replacing an id that does not exist fails with
///   [`DocumentNotFound`](crate::error::DocumentStoreError::DocumentNotFound) unless
///   [`ReplaceOptions::upsert`] is set;
/// - deleting an id that does not exist succeeds without effect.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Retrieves every document whose identity is in `ids`.
    ///
    /// Missing ids are omitted. Result order is backend-defined.
    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;

    /// Returns the documents matching `query`, applying its projection, sort,
    /// offset and limit.
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;

    /// Inserts a single document under `id`.
    async fn insert_document(
        &self,
        id: Uuid,
        document: Bson,
        options: &InsertOptions,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Replaces the document stored under `id`.
    async fn replace_document(
        &self,
        id: Uuid,
        document: Bson,
        options: &ReplaceOptions,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Deletes the document stored under `id`.
    async fn delete_document(
        &self,
        id: Uuid,
        options: &DeleteOptions,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Starts a session with an open transaction.
    ///
    /// Writes made through the returned session become visible only once
    /// [`StoreSession::commit_transaction`] succeeds. Dropping the session without
    /// committing aborts the transaction.
    async fn start_session(&self) -> DocumentStoreResult<Box<dyn StoreSession>>;

    /// Releases connections and other backend resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(&self) -> DocumentStoreResult<()> {
        Ok(())
    }
}

/// A store session with one open transaction.
///
/// Sessions are scoped resources: consuming it through
/// [`commit_transaction`](StoreSession::commit_transaction) or
/// [`abort_transaction`](StoreSession::abort_transaction) ends the transaction, and
/// dropping it on any other exit path aborts.
#[async_trait]
pub trait StoreSession: Send + Debug {
    async fn insert_document(
        &mut self,
        id: Uuid,
        document: Bson,
        options: &InsertOptions,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    async fn replace_document(
        &mut self,
        id: Uuid,
        document: Bson,
        options: &ReplaceOptions,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    async fn delete_document(
        &mut self,
        id: Uuid,
        options: &DeleteOptions,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Makes every write performed through this session durable.
    async fn commit_transaction(self: Box<Self>) -> DocumentStoreResult<()>;

    /// Discards every write performed through this session.
    async fn abort_transaction(self: Box<Self>) -> DocumentStoreResult<()>;
}

/// Factory for backends; the client-provider capability a unit of work can be
/// constructed from.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
