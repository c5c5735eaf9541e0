//! Convenient re-exports of commonly used types from docwork.
//!
//! ```ignore
//! use docwork::prelude::*;
//! ```

pub use docwork_core::{
    backend::{StoreBackend, StoreBackendBuilder, StoreSession},
    cancel::{AbortHandle, AbortRegistration, cancellable},
    command::{Command, OperationKind, WriteOperation},
    config::ConnectionConfig,
    document::{Document, DocumentExt},
    entity_set::EntitySet,
    error::{DocumentStoreError, DocumentStoreResult},
    options::{DeleteOptions, InsertOptions, ReplaceOptions},
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, QueryVisitor, Sort, SortDirection},
    unit::{EntitySets, SetRegistry, UnitOfWork, UnitOfWorkBuilder, UnitOfWorkState},
};
pub use docwork_macros::EntitySets;
