//! Per-collection invalidation index.
//!
//! Backends cannot enumerate keys, so every derived list/count key written for
//! a collection is recorded in a secondary entry at `colidx:{db}:{collection}`.
//! Invalidating the collection deletes every recorded key and then the entry.
//!
//! Tracking is a read-modify-write over the backend. Within one process the
//! mutations for a collection are serialized behind an async lock; writers in
//! other processes sharing the backend can still race and drop an appended
//! key, which then lives until its TTL expires.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use super::{CacheBackend, keys};
use crate::Error;

const DELIMITER: char = '\n';

fn decode_entry(raw: &str) -> Vec<String> {
    raw.split(DELIMITER).filter(|k| !k.is_empty()).map(str::to_string).collect()
}

fn encode_entry(keys: &[String]) -> String {
    keys.join("\n")
}

/// Tracks derived keys per collection on top of a `CacheBackend`.
#[derive(Clone)]
pub struct InvalidationIndex {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl InvalidationIndex {
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self { backend, ttl, locks: Arc::new(Mutex::new(HashMap::new())) }
    }

    async fn collection_lock(&self, index_key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(index_key.to_string()).or_default().clone()
    }

    /// Drop the lock entry once no other task holds or waits on it.
    ///
    /// Clones are only handed out under the map lock, so the count is exact.
    async fn release_lock(&self, index_key: &str, lock: &Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        let current = locks.get(index_key).is_some_and(|held| Arc::ptr_eq(held, lock));
        if current && Arc::strong_count(lock) == 2 {
            locks.remove(index_key);
        }
    }

    /// Keys currently recorded for the collection, in insertion order.
    pub async fn tracked_keys(&self, db: &str, collection: &str) -> Result<Vec<String>, Error> {
        let raw = self.backend.get(&keys::index_key(db, collection)).await?;
        Ok(raw.as_deref().map(decode_entry).unwrap_or_default())
    }

    async fn append(&self, index_key: &str, key: &str) -> Result<(), Error> {
        let mut tracked = self.backend.get(index_key).await?.as_deref().map(decode_entry).unwrap_or_default();
        if !tracked.iter().any(|k| k == key) {
            tracked.push(key.to_string());
        }

        self.backend.set(index_key, &encode_entry(&tracked), self.ttl).await?;

        tracing::debug!(index = %index_key, key, tracked = tracked.len(), "tracked cache key");
        Ok(())
    }

    /// Record `key` for the collection.
    ///
    /// A key that is already present only refreshes the entry's TTL.
    pub async fn track(&self, db: &str, collection: &str, key: &str) -> Result<(), Error> {
        let index_key = keys::index_key(db, collection);
        let lock = self.collection_lock(&index_key).await;
        let result = {
            let _guard = lock.lock().await;
            self.append(&index_key, key).await
        };
        self.release_lock(&index_key, &lock).await;
        result
    }

    /// Record `key` and write `value` under it as one step for the collection.
    ///
    /// The collection lock covers both writes, so an invalidation can run
    /// before or after the pair but never between them. Nothing is written
    /// when tracking fails.
    pub async fn track_and_store(&self, db: &str, collection: &str, key: &str, value: &str) -> Result<(), Error> {
        let index_key = keys::index_key(db, collection);
        let lock = self.collection_lock(&index_key).await;
        let result = {
            let _guard = lock.lock().await;
            match self.append(&index_key, key).await {
                Ok(()) => self.backend.set(key, value, self.ttl).await,
                Err(e) => Err(e),
            }
        };
        self.release_lock(&index_key, &lock).await;
        result
    }

    async fn clear(&self, index_key: &str) -> Result<usize, Error> {
        let Some(raw) = self.backend.get(index_key).await? else {
            return Ok(0);
        };
        let tracked = decode_entry(&raw);

        if !tracked.is_empty() {
            self.backend.delete(&tracked).await?;
        }
        self.backend.delete(&[index_key.to_string()]).await?;

        tracing::debug!(index = %index_key, deleted = tracked.len(), "invalidated collection");
        Ok(tracked.len())
    }

    /// Delete every tracked key for the collection, then the index entry.
    ///
    /// An absent or empty entry is a no-op. Returns the number of tracked
    /// keys that were deleted.
    pub async fn invalidate_collection(&self, db: &str, collection: &str) -> Result<usize, Error> {
        let index_key = keys::index_key(db, collection);
        let lock = self.collection_lock(&index_key).await;
        let result = {
            let _guard = lock.lock().await;
            self.clear(&index_key).await
        };
        self.release_lock(&index_key, &lock).await;
        result
    }

    #[cfg(test)]
    async fn held_locks(&self) -> usize {
        self.locks.lock().await.len()
    }
}
