//! Injected client construction.
//!
//! Applications that already manage a driver [`Client`] (pooling, credentials,
//! monitoring) hand it to the store through a [`ClientProvider`] instead of a
//! connection string.

use mongodb::Client;

/// Supplies the driver client a [`MongoDbStore`](crate::MongoDbStore) runs on.
pub trait ClientProvider: Send + Sync {
    fn client(&self) -> Client;
}

impl<F> ClientProvider for F
where
    F: Fn() -> Client + Send + Sync,
{
    fn client(&self) -> Client {
        self()
    }
}
