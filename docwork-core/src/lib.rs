//! Unit of work and deferred writes over document stores.
//!
//! This crate is the core of the docwork project and provides:
//!
//! - **Document traits** ([`document`]) - Core traits for defining and serializing entities
//! - **Store backend abstraction** ([`backend`]) - Traits for store drivers and transactional sessions
//! - **Entity sets** ([`entity_set`]) - Typed per-collection proxies with direct reads and deferred writes
//! - **Deferred commands** ([`command`], [`queue`]) - Inspectable write commands and the FIFO queue that holds them
//! - **Unit of work** ([`unit`]) - Static entity-set registration and ordered, optionally transactional commits
//! - **Query pass-through** ([`query`], [`options`]) - Filters, sort, projection and write options handed to the store
//! - **Cancellation** ([`cancel`]) - Abortable store calls and commits
//! - **Configuration** ([`config`]) - Connection settings loadable from JSON
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use docwork_core::{document::Document, entity_set::EntitySet, unit::{EntitySets, SetRegistry}};
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
//!     fn id(&self) -> &Uuid {
//!         &self.id
//!     }
//!
//!     fn collection_name() -> &'static str {
//!         "users"
//!     }
//! }
//!
//! pub struct Accounts {
//!     pub users: EntitySet<User>,
//! }
//!
//! impl EntitySets for Accounts {
//!     fn register(registry: &mut SetRegistry) -> DocumentStoreResult<Self> {
//!         Ok(Self { users: registry.register("users")? })
//!     }
//! }
//! ```

pub mod backend;
pub mod cancel;
pub mod command;
pub mod config;
pub mod document;
pub mod entity_set;
pub mod error;
pub mod options;
pub mod query;
pub mod queue;
pub mod unit;

#[cfg(test)]
mod testing;
