//! Core traits for entities stored through a unit of work.
//!
//! Every entity tracked by an [`EntitySet`](crate::entity_set::EntitySet) implements
//! [`Document`]; the identity returned by [`Document::id`] is what queued writes
//! target and what the modified registry deduplicates on.

use bson::{Bson, Uuid, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Deserialize, Serialize};

use crate::error::DocumentStoreResult;

/// Core trait that all entities stored in a document store must implement.
///
/// # Example
///
/// ```ignore
/// use docwork::document::Document;
/// use bson::Uuid;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct User {
///     pub id: Uuid,
///     pub name: String,
/// }
///
/// impl Document for User {
///     fn id(&self) -> &Uuid {
///         &self.id
///     }
///
///     fn collection_name() -> &'static str {
///         "users"
///     }
/// }
/// ```
pub trait Document: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Returns a reference to this entity's unique identifier.
    fn id(&self) -> &Uuid;

    /// Returns the default collection name for this entity type.
    ///
    /// Entity sets registered without an explicit collection use their slot name
    /// instead; see [`SetRegistry`](crate::unit::SetRegistry).
    fn collection_name() -> &'static str;
}

/// Extension trait providing BSON conversion for documents.
///
/// Automatically implemented for all types that implement [`Document`].
pub trait DocumentExt: Document {
    /// Converts this document to a BSON value for storage.
    fn to_bson(&self) -> DocumentStoreResult<Bson>;

    /// Creates a document from a BSON value read from a store.
    fn from_bson(bson: Bson) -> DocumentStoreResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_bson(&self) -> DocumentStoreResult<Bson> {
        Ok(serialize_to_bson(self)?)
    }

    fn from_bson(bson: Bson) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_bson(bson)?)
    }
}
