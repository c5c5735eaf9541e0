//! Connection settings for constructing a unit of work from a connection string.

use serde::{Deserialize, Serialize};

use crate::error::DocumentStoreResult;

/// Where a backend connects and how its units of work commit.
///
/// ```
/// use docwork_core::config::ConnectionConfig;
///
/// let config = ConnectionConfig::from_json(
///     r#"{ "connection_string": "mongodb://localhost:27017", "database": "shop" }"#,
/// )
/// .unwrap();
///
/// assert!(!config.use_transactions);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub connection_string: String,
    pub database: String,
    #[serde(default)]
    pub use_transactions: bool,
}

impl ConnectionConfig {
    pub fn new(connection_string: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            database: database.into(),
            use_transactions: false,
        }
    }

    pub fn use_transactions(mut self, use_transactions: bool) -> Self {
        self.use_transactions = use_transactions;
        self
    }

    /// Parses a config from a JSON object.
    pub fn from_json(json: &str) -> DocumentStoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
