//! Conversions between docwork values and MongoDB driver types.

use bson::{Bson, Document, Uuid};
use mongodb::{
    error::{Error as MongoError, ErrorKind, WriteError, WriteFailure},
    options::{
        DeleteOptions as MongoDeleteOptions, InsertOneOptions,
        ReplaceOptions as MongoReplaceOptions,
    },
};

use docwork_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    options::{DeleteOptions, InsertOptions, ReplaceOptions},
};

const DUPLICATE_KEY: i32 = 11000;

/// Adds the identity as `_id` to an entity payload.
pub(crate) fn prepare_document(id: &Uuid, document: Bson) -> DocumentStoreResult<Document> {
    match document {
        Bson::Document(mut doc) => {
            doc.insert("_id", *id);
            Ok(doc)
        }
        other => Err(DocumentStoreError::Serialization(format!(
            "expected a document payload for {id}, got {:?}",
            other.element_type()
        ))),
    }
}

/// Strips the driver-level `_id` so the payload deserializes into the entity again.
pub(crate) fn restore_document(mut document: Document) -> Bson {
    document.remove("_id");
    Bson::Document(document)
}

pub(crate) fn id_filter(id: &Uuid) -> Document {
    bson::doc! { "_id": *id }
}

pub(crate) fn insert_options(options: &InsertOptions) -> InsertOneOptions {
    let mut converted = InsertOneOptions::default();
    converted.bypass_document_validation = options.bypass_document_validation;
    converted.comment = options.comment.clone();
    converted
}

pub(crate) fn replace_options(options: &ReplaceOptions) -> MongoReplaceOptions {
    let mut converted = MongoReplaceOptions::default();
    converted.upsert = options.upsert;
    converted.bypass_document_validation = options.bypass_document_validation;
    converted.comment = options.comment.clone();
    converted
}

pub(crate) fn delete_options(options: &DeleteOptions) -> MongoDeleteOptions {
    let mut converted = MongoDeleteOptions::default();
    converted.comment = options.comment.clone();
    converted
}

pub(crate) fn backend_error(err: MongoError) -> DocumentStoreError {
    DocumentStoreError::Backend(err.to_string())
}

/// Maps a failed insert, reporting duplicate `_id`s as
/// [`DocumentAlreadyExists`](DocumentStoreError::DocumentAlreadyExists).
pub(crate) fn insert_error(err: MongoError, id: &Uuid, collection: &str) -> DocumentStoreError {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(WriteError { code: DUPLICATE_KEY, .. })) => {
            DocumentStoreError::DocumentAlreadyExists(id.to_string(), collection.to_string())
        }
        _ => backend_error(err),
    }
}
