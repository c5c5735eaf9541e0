//! Error types and result types for unit-of-work and document store operations.
//!
//! Every fallible operation in the workspace returns [`DocumentStoreResult<T>`].
//! Failures raised while flushing queued writes are wrapped so that the caller of
//! a commit can see which queued command broke the drain.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

use crate::command::OperationKind;

/// Represents all possible errors that can occur when reading from a store or
/// flushing a unit of work.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A document with the given ID already exists in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// The targeted document was not found in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// A by-identity read matched more than one document.
    #[error("Expected at most one document {id} in collection {collection}, found {count}")]
    AmbiguousResult {
        id: String,
        collection: String,
        count: usize,
    },
    /// Two entity sets were registered under the same slot.
    #[error("Entity set slot already registered: {0}")]
    DuplicateEntitySet(String),
    /// A queued write failed while the unit of work was being committed.
    #[error("{operation} of {id} in collection {collection} ({entity_type}) failed: {source}")]
    StoreOperationFailed {
        operation: OperationKind,
        entity_type: String,
        collection: String,
        id: String,
        #[source]
        source: Box<DocumentStoreError>,
    },
    /// A transactional commit failed before its transaction could be committed.
    /// Nothing written inside the transaction was persisted.
    #[error("Commit aborted: {source}")]
    CommitAborted {
        #[source]
        source: Box<DocumentStoreError>,
    },
    /// The operation was cancelled before it completed.
    #[error("Operation cancelled")]
    Cancelled,
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl DocumentStoreError {
    /// Returns the innermost error, looking through commit and command wrappers.
    pub fn root_cause(&self) -> &DocumentStoreError {
        match self {
            DocumentStoreError::StoreOperationFailed { source, .. }
            | DocumentStoreError::CommitAborted { source } => source.root_cause(),
            other => other,
        }
    }
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
