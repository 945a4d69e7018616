//! SQLite-backed object store.
//!
//! One row per key in the `objects` table. The database runs in WAL mode
//! and is migrated on open.

use std::path::Path;

use chrono::{DateTime, Utc};
use tokio_rusqlite::{Connection, params, rusqlite};

use super::{ObjectEntry, ObjectStore, check_key, migrations};
use crate::Error;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// Object store handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database at the specified path.
    ///
    /// Creates the file (and its parent directory) if needed, applies
    /// pragmas and runs pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    /// Open an in-memory database for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| conn.execute_batch(PRAGMAS))
            .await
            .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }
}

#[async_trait::async_trait]
impl ObjectStore for SqliteStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), Error> {
        check_key(key)?;
        let key = key.to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO objects (key, body, size, modified_at) VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(key) DO UPDATE SET
                        body = excluded.body,
                        size = excluded.size,
                        modified_at = excluded.modified_at",
                    params![key, bytes, bytes.len() as i64, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        check_key(key)?;
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Vec<u8>>, Error> {
                let result = conn.query_row("SELECT body FROM objects WHERE key = ?1", params![key], |row| row.get(0));
                match result {
                    Ok(body) => Ok(Some(body)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, Error> {
        let prefix = prefix.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<ObjectEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key, size, modified_at FROM objects
                     WHERE substr(key, 1, length(?1)) = ?1
                     ORDER BY key",
                )?;

                let rows = stmt.query_map(params![prefix], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?, row.get::<_, String>(2)?))
                })?;

                let mut entries = Vec::new();
                for row in rows {
                    let (key, size, modified_at) = row?;
                    let modified_at = DateTime::parse_from_rfc3339(&modified_at)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now());
                    entries.push(ObjectEntry { key, modified_at, size: size.max(0) as u64 });
                }
                Ok(entries)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        check_key(key)?;
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM objects WHERE key = ?1", params![key])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let version = store
            .conn
            .call(|conn| conn.query_row("SELECT sqlite_version()", [], |row| row.get::<_, String>(0)))
            .await
            .unwrap();
        assert!(!version.is_empty());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store.put("sdd/abc.sdd.json", b"one".to_vec()).await.unwrap();
        store.put("sdd/abc.sdd.json", b"three".to_vec()).await.unwrap();

        assert_eq!(store.get("sdd/abc.sdd.json").await.unwrap(), Some(b"three".to_vec()));
        let entries = store.list("sdd/").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].size, 5);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        assert_eq!(store.get("cache/none_feed.xml").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_prefix_is_literal() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store.put("readlater/b.json", b"{}".to_vec()).await.unwrap();
        store.put("readlater/a.json", b"{}".to_vec()).await.unwrap();
        store.put("read_later_other", b"{}".to_vec()).await.unwrap();
        store.put("cache/x_feed.xml", b"{}".to_vec()).await.unwrap();

        let keys: Vec<String> = store.list("readlater/").await.unwrap().into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["readlater/a.json", "readlater/b.json"]);

        // `_` is not a wildcard here
        assert_eq!(store.list("read_").await.unwrap().len(), 1);
        assert_eq!(store.list("").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store.put("readlater/a.json", b"{}".to_vec()).await.unwrap();
        store.delete("readlater/a.json").await.unwrap();
        store.delete("readlater/a.json").await.unwrap();
        assert!(store.list("readlater/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("objects.sqlite");
        let store = SqliteStore::open(&path).await.unwrap();
        store.put("a", b"x".to_vec()).await.unwrap();
        assert!(path.exists());
    }
}
