//! Cancellation of in-flight store calls.
//!
//! Cancellation uses the abort primitives from `futures`: create a pair with
//! [`AbortHandle::new_pair`], pass the registration along with the call, and call
//! [`AbortHandle::abort`] from anywhere to stop it.
//!
//! ```ignore
//! use docwork::cancel::{AbortHandle, cancellable};
//!
//! let (handle, registration) = AbortHandle::new_pair();
//! let users = cancellable(registration, uow.users.get_all());
//! handle.abort();
//! assert!(matches!(users.await, Err(DocumentStoreError::Cancelled)));
//! ```

use futures::future::Abortable;
use std::future::Future;

use crate::error::{DocumentStoreError, DocumentStoreResult};

pub use futures::future::{AbortHandle, AbortRegistration};

/// Runs `future` until it completes or `registration`'s handle is aborted.
///
/// An abort drops `future` at its current suspension point and yields
/// [`DocumentStoreError::Cancelled`].
pub async fn cancellable<F, T>(registration: AbortRegistration, future: F) -> DocumentStoreResult<T>
where
    F: Future<Output = DocumentStoreResult<T>>,
{
    Abortable::new(future, registration)
        .await
        .unwrap_or(Err(DocumentStoreError::Cancelled))
}
