//! Storage interfaces and implementations.
//!
//! Three stores back the system:
//! - Code store: available codes, one row per unissued code
//! - Redeemed log: append-only, one row per issued code (shares the `CodeStore` trait)
//! - Settings store: key/value configuration edited by administrators
//!
//! Backends:
//! - SQLite (`sqlite` feature): production storage
//! - Mock (tests / `test-utils` feature): in-memory with failure injection

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::model::{CodeRecord, NewCode, RedeemedCode};

#[cfg(feature = "sqlite")]
pub mod schema;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteCodeStore, SqliteSettingsStore};

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{MockCodeStore, MockSettingsStore};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Unknown storage type: {0}")]
    UnknownType(String),

    #[error("Order id {0} out of range")]
    OrderIdOutOfRange(u64),
}

/// Interface for the available-code pool and the redeemed log.
///
/// `claim` is the only path that moves a code from the pool to the log and
/// must be atomic: a claimed code is removed and logged together or not at
/// all, and two concurrent claims never return the same code.
///
/// Implementations:
/// - `SqliteCodeStore`: SQLite storage
/// - `MockCodeStore`: in-memory storage for tests
#[async_trait]
pub trait CodeStore: Send + Sync {
    /// Find one available code for an ISBN. The lowest id wins.
    async fn find_available(&self, isbn: &str) -> Result<Option<CodeRecord>>;

    /// Remove an available code by id. Returns whether a row was removed.
    async fn remove(&self, id: i64) -> Result<bool>;

    /// Append a record to the redeemed log.
    async fn append_redeemed(&self, code: NewCode) -> Result<RedeemedCode>;

    /// Number of codes still available, across all ISBNs.
    async fn count_available(&self) -> Result<u64>;

    /// Atomically claim the lowest-id available code for an ISBN.
    ///
    /// Returns `None` without mutating anything when no code matches.
    async fn claim(&self, isbn: &str) -> Result<Option<RedeemedCode>>;

    /// Claim a code on behalf of an order, at most once per order.
    ///
    /// The order is recorded as issued in the same unit as the claim. An
    /// order already recorded gets `AlreadyIssued` and nothing changes.
    async fn claim_for_order(&self, order_id: u64, isbn: &str) -> Result<OrderClaim>;

    /// Whether an order has already been issued a code.
    async fn order_issued(&self, order_id: u64) -> Result<bool>;

    /// Add one code to the available pool.
    async fn insert(&self, code: NewCode) -> Result<CodeRecord>;

    /// Add many codes to the available pool. Returns the number inserted.
    async fn insert_many(&self, codes: Vec<NewCode>) -> Result<u64>;

    /// All available codes, in id order.
    async fn list_available(&self) -> Result<Vec<CodeRecord>>;

    /// All redeemed codes, in id order.
    async fn list_redeemed(&self) -> Result<Vec<RedeemedCode>>;

    /// Clear the available pool. The redeemed log is untouched.
    async fn delete_all_available(&self) -> Result<u64>;

    /// Delete one available code by id. Returns whether a row was removed.
    async fn delete_available(&self, id: i64) -> Result<bool>;
}

/// Outcome of `CodeStore::claim_for_order`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderClaim {
    Claimed(RedeemedCode),
    /// No available code for the ISBN.
    NoStock,
    /// The order was issued a code earlier.
    AlreadyIssued,
}

/// Interface for key/value settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read a setting. Returns `None` when the key was never written.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a setting, replacing any previous value.
    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Write a setting only when the key is absent. Returns whether it was written.
    async fn put_if_absent(&self, key: &str, value: &str) -> Result<bool>;
}

/// Storage type discriminator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// SQLite database file at `path`.
    #[default]
    Sqlite,
    /// SQLite in-memory database (single connection, lost on exit).
    Memory,
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageType::Sqlite => write!(f, "sqlite"),
            StorageType::Memory => write!(f, "memory"),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage type discriminator.
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    /// Database file path (sqlite only).
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Sqlite,
            path: "data/codici.db".to_string(),
        }
    }
}

/// Initialized stores.
#[derive(Clone)]
pub struct Stores {
    pub codes: Arc<dyn CodeStore>,
    pub settings: Arc<dyn SettingsStore>,
}

/// Initialize storage based on configuration.
///
/// Creates the schema when missing. This is the "activation" step: it is
/// safe to run on every start.
#[cfg(feature = "sqlite")]
pub async fn init_storage(config: &StorageConfig) -> Result<Stores> {
    use std::str::FromStr;

    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

    tracing::info!(storage_type = %config.storage_type, path = %config.path, "initializing storage");

    let pool = match config.storage_type {
        StorageType::Sqlite => {
            if let Some(parent) = std::path::Path::new(&config.path).parent() {
                std::fs::create_dir_all(parent)?;
            }
            let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.path))?
                .create_if_missing(true);
            SqlitePoolOptions::new().connect_with(options).await?
        }
        // Every in-memory connection is its own database, so pin the pool to one.
        StorageType::Memory => {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect("sqlite::memory:")
                .await?
        }
    };

    let codes = SqliteCodeStore::new(pool.clone());
    codes.init().await?;

    let settings = SqliteSettingsStore::new(pool);
    settings.init().await?;

    Ok(Stores {
        codes: Arc::new(codes),
        settings: Arc::new(settings),
    })
}

#[cfg(not(feature = "sqlite"))]
pub async fn init_storage(config: &StorageConfig) -> Result<Stores> {
    tracing::error!(storage_type = %config.storage_type, "storage requested but 'sqlite' feature is not enabled");
    Err(StorageError::UnknownType(config.storage_type.to_string()))
}
