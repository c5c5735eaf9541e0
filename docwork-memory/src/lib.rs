//! In-memory document storage backend for docwork.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! `StoreBackend` trait, with transactional sessions. It is meant for development,
//! tests and small deployments.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **Type-erased storage** - Stores documents as BSON
//! - **Query support** - Filtering, multi-key sorting, pagination and projection
//! - **Transactions** - Sessions stage writes and apply them atomically on commit
//!
//! # Quick Start
//!
//! ```ignore
//! use docwork::prelude::*;
//! use docwork::memory::InMemoryStore;
//!
//! #[derive(EntitySets)]
//! struct Accounts {
//!     users: EntitySet<User>,
//! }
//!
//! let uow = UnitOfWork::builder(InMemoryStore::new())
//!     .use_transactions(true)
//!     .build::<Accounts>()?;
//!
//! uow.users.insert(&user, InsertOptions::new()).await?;
//! uow.commit().await?;
//! ```

pub mod store;
pub mod session;
mod evaluator;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
pub use session::InMemorySession;
