//! Per-write options captured by queued commands.
//!
//! Options are stored inside the [`Command`](crate::command::Command) at enqueue
//! time and handed to the backend untouched when the command is flushed.

use bson::Bson;
use serde::{Deserialize, Serialize};

/// Options applied when a queued insert is flushed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsertOptions {
    /// Skip store-side document validation, where the backend supports it.
    pub bypass_document_validation: Option<bool>,
    /// Free-form comment attached to the store operation.
    pub comment: Option<Bson>,
}

impl InsertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bypass_document_validation(mut self, bypass: bool) -> Self {
        self.bypass_document_validation = Some(bypass);
        self
    }

    pub fn comment(mut self, comment: impl Into<Bson>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Options applied when a queued replace-by-identity is flushed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplaceOptions {
    /// Insert the document when nothing matches its identity.
    pub upsert: Option<bool>,
    /// Skip store-side document validation, where the backend supports it.
    pub bypass_document_validation: Option<bool>,
    /// Free-form comment attached to the store operation.
    pub comment: Option<Bson>,
}

impl ReplaceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = Some(upsert);
        self
    }

    pub fn bypass_document_validation(mut self, bypass: bool) -> Self {
        self.bypass_document_validation = Some(bypass);
        self
    }

    pub fn comment(mut self, comment: impl Into<Bson>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Returns `true` when a missing target should be inserted.
    pub fn is_upsert(&self) -> bool {
        self.upsert.unwrap_or(false)
    }
}

/// Options applied when a queued delete-by-identity is flushed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteOptions {
    /// Free-form comment attached to the store operation.
    pub comment: Option<Bson>,
}

impl DeleteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn comment(mut self, comment: impl Into<Bson>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}
