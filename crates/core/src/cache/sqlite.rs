//! SQLite-backed cache backend.
//!
//! Opens the database with WAL pragmas, runs migrations, and stores each
//! entry with an absolute expiry in epoch milliseconds. Expired rows are
//! invisible to `get` and removed by `purge_expired`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_rusqlite::{Connection, params, rusqlite};

use super::{CacheBackend, migrations};
use crate::Error;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// Cache database handle.
///
/// Wraps a tokio-rusqlite Connection that runs statements on a background
/// thread. Clones share the connection.
#[derive(Clone, Debug)]
pub struct SqliteCache {
    pub(crate) conn: Connection,
}

impl SqliteCache {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies performance pragmas,
    /// and runs any pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
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

    /// Delete expired entries.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        let now = Utc::now().timestamp_millis();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM cache_entries WHERE expires_at_ms <= ?1", params![now])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl CacheBackend for SqliteCache {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let key = key.to_string();
        let now = Utc::now().timestamp_millis();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let result = conn.query_row(
                    "SELECT value FROM cache_entries WHERE key = ?1 AND expires_at_ms > ?2",
                    params![key, now],
                    |row| row.get(0),
                );

                match result {
                    Ok(value) => Ok(Some(value)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Upsert: inserts if the key doesn't exist, replaces value and expiry if it does.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), Error> {
        let key = key.to_string();
        let value = value.to_string();
        let now = Utc::now();
        let stored_at = now.to_rfc3339();
        let expires_at_ms = now.timestamp_millis().saturating_add(ttl.as_millis().min(i64::MAX as u128) as i64);

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cache_entries (key, value, stored_at, expires_at_ms)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        stored_at = excluded.stored_at,
                        expires_at_ms = excluded.expires_at_ms",
                    params![key, value, stored_at, expires_at_ms],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, keys: &[String]) -> Result<(), Error> {
        if keys.is_empty() {
            return Ok(());
        }
        let keys = keys.to_vec();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare("DELETE FROM cache_entries WHERE key = ?1")?;
                    for key in &keys {
                        stmt.execute(params![key])?;
                    }
                }
                tx.commit()?;
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
        let db = SqliteCache::open_in_memory().await.unwrap();
        let version = db
            .conn
            .call(|conn| conn.query_row("SELECT sqlite_version()", [], |row| row.get::<_, String>(0)))
            .await
            .unwrap();
        assert!(!version.is_empty());
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let db = SqliteCache::open_in_memory().await.unwrap();
        db.set("list:abc", r#"[{"$id":"1"}]"#, Duration::from_secs(3600)).await.unwrap();

        let retrieved = db.get("list:abc").await.unwrap().unwrap();
        assert_eq!(retrieved, r#"[{"$id":"1"}]"#);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = SqliteCache::open_in_memory().await.unwrap();
        assert!(db.get("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert() {
        let db = SqliteCache::open_in_memory().await.unwrap();
        db.set("k", "old", Duration::from_secs(3600)).await.unwrap();
        db.set("k", "new", Duration::from_secs(3600)).await.unwrap();
        assert_eq!(db.get("k").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_zero_ttl_reads_as_miss() {
        let db = SqliteCache::open_in_memory().await.unwrap();
        db.set("k", "v", Duration::ZERO).await.unwrap();
        assert!(db.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expiry_and_purge() {
        let db = SqliteCache::open_in_memory().await.unwrap();
        db.set("expiring", "v", Duration::from_millis(20)).await.unwrap();
        db.set("fresh", "v", Duration::from_secs(3600)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(db.get("expiring").await.unwrap().is_none());
        assert_eq!(db.purge_expired().await.unwrap(), 1);
        assert!(db.get("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_many() {
        let db = SqliteCache::open_in_memory().await.unwrap();
        db.set("a", "1", Duration::from_secs(3600)).await.unwrap();
        db.set("b", "2", Duration::from_secs(3600)).await.unwrap();

        db.delete(&["a".to_string(), "b".to_string(), "c".to_string()]).await.unwrap();

        assert!(db.get("a").await.unwrap().is_none());
        assert!(db.get("b").await.unwrap().is_none());
    }
}
