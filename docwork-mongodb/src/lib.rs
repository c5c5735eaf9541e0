//! MongoDB backend implementation for docwork.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait.
//! Queued writes become single-document `insertOne`, `replaceOne` and `deleteOne`
//! calls; transactional commits run them inside a driver session.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docwork = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! A store is built from a connection string, or from a [`ClientProvider`] when the
//! application manages its own driver client.
//!
//! # Example
//!
//! ```ignore
//! use docwork::{backend::StoreBackendBuilder, mongodb::MongoDbStore};
//!
//! let store = MongoDbStore::builder("mongodb://localhost:27017/?replicaSet=rs0", "shop")
//!     .build()
//!     .await?;
//! ```

pub mod store;
pub mod session;
pub mod provider;
mod convert;
mod query;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
pub use session::MongoDbSession;
pub use provider::ClientProvider;
