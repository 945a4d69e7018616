//! Key/value object storage port.
//!
//! The feed cache, the read-later list and the SDD registry all talk to an
//! [`ObjectStore`]. Two backends exist and one is chosen at process start:
//!
//! - [`FsStore`]: one file per key under a root directory
//! - [`SqliteStore`]: one row per key in a SQLite database (WAL mode)
//!
//! Keys are `/`-separated relative paths such as `readlater/ab12cd34.json`.

pub mod fs;
pub mod hash;
pub mod migrations;
pub mod sqlite;

use std::sync::Arc;

use chrono::{DateTime, Utc};

pub use crate::Error;
pub use fs::FsStore;
pub use hash::compute_url_key;
pub use sqlite::SqliteStore;

use crate::config::{AppConfig, StorageBackend};

/// A listed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub modified_at: DateTime<Utc>,
    pub size: u64,
}

/// Byte-blob storage addressed by string keys.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write (or overwrite) an object.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), Error>;

    /// Read an object, `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;

    /// List objects whose key starts with `prefix`, ordered by key.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, Error>;

    /// Delete an object. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), Error>;
}

/// Open the backend named by the configuration.
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn ObjectStore>, Error> {
    let store: Arc<dyn ObjectStore> = match config.storage {
        StorageBackend::Filesystem => Arc::new(FsStore::open(&config.data_dir).await?),
        StorageBackend::Sqlite => Arc::new(SqliteStore::open(&config.db_path).await?),
    };
    tracing::info!(backend = config.storage.as_str(), "object store opened");
    Ok(store)
}

/// Reject keys that could escape the store root or are otherwise unusable.
pub(crate) fn check_key(key: &str) -> Result<(), Error> {
    if key.is_empty() {
        return Err(Error::InvalidInput("object key must not be empty".into()));
    }
    if key.starts_with('/') || key.contains('\\') {
        return Err(Error::InvalidInput(format!("object key must be relative: {key}")));
    }
    if key.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..") {
        return Err(Error::InvalidInput(format!("invalid object key: {key}")));
    }
    Ok(())
}
