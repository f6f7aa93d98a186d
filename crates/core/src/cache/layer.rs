//! Read-through cache layer.
//!
//! `CacheLayer` is what the API client talks to. Every failure inside it is
//! logged and swallowed: reads degrade to misses, writes and invalidations
//! degrade to stale entries that expire with their TTL.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{CacheBackend, Codec, InvalidationIndex, JsonCodec, keys};
use crate::Error;

/// Backend, TTL, codec and invalidation index bundled together.
#[derive(Clone)]
pub struct CacheLayer {
    backend: Arc<dyn CacheBackend>,
    codec: Arc<dyn Codec>,
    index: InvalidationIndex,
    ttl: Duration,
}

impl CacheLayer {
    /// Build a layer over `backend`, or `None` when `ttl` is zero.
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Option<Self> {
        if ttl.is_zero() {
            return None;
        }
        let index = InvalidationIndex::new(backend.clone(), ttl);
        Some(Self { backend, codec: Arc::new(JsonCodec), index, ttl })
    }

    /// Replace the codec used for cached values.
    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn index(&self) -> &InvalidationIndex {
        &self.index
    }

    async fn try_read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        let Some(raw) = self.backend.get(key).await? else {
            return Ok(None);
        };
        let value = self.codec.decode(&raw)?;
        Ok(Some(serde_json::from_value(value)?))
    }

    fn encode<T: Serialize>(&self, value: &T) -> Result<String, Error> {
        self.codec.encode(&serde_json::to_value(value)?)
    }

    async fn try_write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), Error> {
        let encoded = self.encode(value)?;
        self.backend.set(key, &encoded, self.ttl).await
    }

    /// Cached value under `key`. Backend and decode failures read as a miss.
    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_read(key).await {
            Ok(Some(value)) => {
                tracing::debug!(key, "cache hit");
                Some(value)
            }
            Ok(None) => {
                tracing::debug!(key, "cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "cache read failed; treating as miss");
                None
            }
        }
    }

    /// Store `value` under a literal key such as a document point key.
    pub async fn store<T: Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = self.try_write(key, value).await {
            tracing::warn!(key, error = %e, "cache write failed");
        }
    }

    /// Store a derived list/count result and record its key in the
    /// collection's index.
    ///
    /// Tracking and the value write happen under the collection lock, so an
    /// invalidation of the same collection cannot slip between them. When the
    /// key cannot be tracked the value is not cached.
    pub async fn store_tracked<T: Serialize>(&self, db: &str, collection: &str, key: &str, value: &T) {
        let encoded = match self.encode(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache encode failed");
                return;
            }
        };

        if let Err(e) = self.index.track_and_store(db, collection, key, &encoded).await {
            tracing::warn!(key, db, collection, error = %e, "tracked cache write failed");
        }
    }

    /// Drop every cached list/count for the collection.
    pub async fn invalidate_collection(&self, db: &str, collection: &str) {
        if let Err(e) = self.index.invalidate_collection(db, collection).await {
            tracing::warn!(db, collection, error = %e, "collection invalidation failed; entries expire by TTL");
        }
    }

    /// Drop a document's point entry and every cached list/count of its collection.
    pub async fn invalidate_document(&self, db: &str, collection: &str, id: &str) {
        let key = keys::point_key(db, collection, id);
        if let Err(e) = self.backend.delete(&[key.clone()]).await {
            tracing::warn!(key = %key, error = %e, "document invalidation failed; entry expires by TTL");
        }
        self.invalidate_collection(db, collection).await;
    }
}
