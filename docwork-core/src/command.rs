//! Deferred write commands.
//!
//! A [`Command`] is a captured, not-yet-executed write. Entity sets build one per
//! insert/update/remove and push it onto the shared queue; the unit of work later
//! executes each one exactly once through a [`WriteTarget`].
//!
//! Payloads are serialized when the command is built, so mutating the source
//! entity afterwards does not change what gets written.

use bson::{Bson, Uuid};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    backend::{StoreBackend, StoreSession},
    document::Document,
    error::{DocumentStoreError, DocumentStoreResult},
    options::{DeleteOptions, InsertOptions, ReplaceOptions},
};

/// The kind of write a command performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Insert,
    Update,
    Remove,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Insert => "insert",
            OperationKind::Update => "update",
            OperationKind::Remove => "remove",
        })
    }
}

/// A single write, with every parameter captured by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WriteOperation {
    Insert {
        id: Uuid,
        document: Bson,
        options: InsertOptions,
    },
    /// Replace-by-identity.
    Update {
        id: Uuid,
        document: Bson,
        options: ReplaceOptions,
    },
    /// Delete-by-identity.
    Remove { id: Uuid, options: DeleteOptions },
}

impl WriteOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            WriteOperation::Insert { .. } => OperationKind::Insert,
            WriteOperation::Update { .. } => OperationKind::Update,
            WriteOperation::Remove { .. } => OperationKind::Remove,
        }
    }

    /// The identity of the targeted document.
    pub fn id(&self) -> &Uuid {
        match self {
            WriteOperation::Insert { id, .. }
            | WriteOperation::Update { id, .. }
            | WriteOperation::Remove { id, .. } => id,
        }
    }
}

/// Where a command is executed: directly against the store, or inside an open
/// transaction.
pub enum WriteTarget<'a> {
    Store(&'a dyn StoreBackend),
    Session(&'a mut dyn StoreSession),
}

/// An immutable deferred write bound to an entity type and a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    entity_type: String,
    collection: String,
    operation: WriteOperation,
}

impl Command {
    /// Builds a command for entity type `D` targeting `collection`.
    pub fn for_entity<D: Document>(collection: impl Into<String>, operation: WriteOperation) -> Self {
        Self {
            entity_type: std::any::type_name::<D>().to_string(),
            collection: collection.into(),
            operation,
        }
    }

    /// Type name of the entity this command writes. Diagnostic only.
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn operation(&self) -> &WriteOperation {
        &self.operation
    }

    pub fn kind(&self) -> OperationKind {
        self.operation.kind()
    }

    /// Performs the write. Consuming `self` guarantees a command runs at most once.
    ///
    /// Store failures are wrapped in
    /// [`StoreOperationFailed`](DocumentStoreError::StoreOperationFailed) carrying
    /// this command's collection, entity type and target id.
    pub async fn execute(self, target: &mut WriteTarget<'_>) -> DocumentStoreResult<()> {
        let Command { entity_type, collection, operation } = self;
        let kind = operation.kind();
        let id = *operation.id();

        let result = match (target, operation) {
            (WriteTarget::Store(store), WriteOperation::Insert { id, document, options }) => {
                store.insert_document(id, document, &options, &collection).await
            }
            (WriteTarget::Store(store), WriteOperation::Update { id, document, options }) => {
                store.replace_document(id, document, &options, &collection).await
            }
            (WriteTarget::Store(store), WriteOperation::Remove { id, options }) => {
                store.delete_document(id, &options, &collection).await
            }
            (WriteTarget::Session(session), WriteOperation::Insert { id, document, options }) => {
                session.insert_document(id, document, &options, &collection).await
            }
            (WriteTarget::Session(session), WriteOperation::Update { id, document, options }) => {
                session.replace_document(id, document, &options, &collection).await
            }
            (WriteTarget::Session(session), WriteOperation::Remove { id, options }) => {
                session.delete_document(id, &options, &collection).await
            }
        };

        result.map_err(|source| DocumentStoreError::StoreOperationFailed {
            operation: kind,
            entity_type,
            collection,
            id: id.to_string(),
            source: Box::new(source),
        })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} in {} ({})",
            self.kind(),
            self.operation.id(),
            self.collection,
            self.entity_type,
        )
    }
}
