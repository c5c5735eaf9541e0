//! Unit of work with deferred, ordered and optionally transactional writes over
//! JSON document stores.
//!
//! This crate is the primary entry point for users of docwork. It re-exports the
//! core types from the sub-crates and gives access to the storage backends.
//!
//! # Features
//!
//! - **Deferred writes** - Inserts, updates and removes are queued and only reach the store on commit
//! - **Ordered commits** - Queued writes run one at a time, in the order they were issued
//! - **Transactions** - Optionally wrap a commit in a store transaction
//! - **Static entity sets** - `#[derive(EntitySets)]` registers typed collections at construction
//! - **Multiple backends** - In-memory and MongoDB storage behind one trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docwork::{prelude::*, memory::InMemoryStore};
//! use bson::Uuid;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     pub id: Uuid,
//!     pub name: String,
//! }
//!
//! impl Document for User {
//!     fn id(&self) -> &Uuid { &self.id }
//!     fn collection_name() -> &'static str { "users" }
//! }
//!
//! #[derive(EntitySets)]
//! struct Accounts {
//!     users: EntitySet<User>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let uow = UnitOfWork::builder(InMemoryStore::new())
//!         .use_transactions(true)
//!         .build::<Accounts>()?;
//!
//!     let user = User { id: Uuid::new(), name: "Alice".to_string() };
//!
//!     // Queued, not yet visible to reads
//!     uow.users.insert(&user, InsertOptions::new()).await?;
//!     assert!(uow.users.get_by_id(user.id).await?.is_none());
//!
//!     uow.commit().await?;
//!     assert!(uow.users.get_by_id(user.id).await?.is_some());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - MongoDB backend (requires `mongodb` feature)

#[allow(unused_extern_crates)]
extern crate self as docwork;

pub mod prelude;

pub use docwork_core::{
    backend, cancel, command, config, document, entity_set, error, options, query, queue, unit,
};
pub use docwork_macros::EntitySets;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docwork_memory::{InMemorySession, InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docwork_mongodb::{ClientProvider, MongoDbSession, MongoDbStore, MongoDbStoreBuilder};

    use docwork_core::{
        config::ConnectionConfig,
        error::DocumentStoreResult,
        unit::{EntitySets, UnitOfWork},
    };

    /// Connects to `database` through `dsn` and creates a unit of work over it.
    pub async fn connect<S: EntitySets>(
        dsn: &str,
        database: &str,
        use_transactions: bool,
    ) -> DocumentStoreResult<UnitOfWork<S>> {
        UnitOfWork::from_builder(MongoDbStoreBuilder::new(dsn, database), use_transactions).await
    }

    pub async fn connect_with_config<S: EntitySets>(
        config: &ConnectionConfig,
    ) -> DocumentStoreResult<UnitOfWork<S>> {
        connect(&config.connection_string, &config.database, config.use_transactions).await
    }

    /// Creates a unit of work over the client supplied by `provider`.
    pub async fn connect_with_provider<S: EntitySets>(
        provider: impl ClientProvider + 'static,
        database: &str,
        use_transactions: bool,
    ) -> DocumentStoreResult<UnitOfWork<S>> {
        UnitOfWork::from_builder(
            MongoDbStoreBuilder::from_provider(provider, database),
            use_transactions,
        )
        .await
    }
}
