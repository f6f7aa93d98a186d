//! Cache engine placed in front of the remote document API.
//!
//! This module provides:
//!
//! - A minimal `CacheBackend` trait (get/set/delete with per-key TTL, no scan)
//! - In-memory, SQLite and (feature-gated) Redis backends
//! - Deterministic key derivation for point lookups and filtered queries
//! - A per-collection invalidation index that replaces prefix deletion
//! - `CacheLayer`, which ties these together and swallows cache failures

pub mod codec;
pub mod index;
pub mod keys;
pub mod layer;
pub mod memory;
pub mod migrations;
#[cfg(feature = "redis")]
pub mod redis_impl;
pub mod sqlite;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use crate::Error;
use crate::config::{AppConfig, CacheBackendKind};

pub use codec::{Codec, JsonCodec};
pub use index::InvalidationIndex;
pub use layer::CacheLayer;
pub use memory::MemoryCache;
#[cfg(feature = "redis")]
pub use redis_impl::RedisCache;
pub use sqlite::SqliteCache;

/// Key-value store with per-key TTL.
///
/// No enumeration or pattern deletion is assumed. A missing key is
/// `Ok(None)`, never an error.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Store `value` under `key` for `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), Error>;

    /// Remove every key in `keys`. Missing keys are ignored.
    async fn delete(&self, keys: &[String]) -> Result<(), Error>;
}

/// Open the backend selected by `config`, or `None` for pass-through mode.
///
/// # Errors
///
/// Returns an error if the SQLite file or Redis server cannot be opened, or
/// if Redis is selected in a build without the `redis` feature.
pub async fn open_backend(config: &AppConfig) -> Result<Option<Arc<dyn CacheBackend>>, Error> {
    if !config.caching_enabled() {
        return Ok(None);
    }

    let backend: Arc<dyn CacheBackend> = match config.cache_backend {
        CacheBackendKind::None => return Ok(None),
        CacheBackendKind::Memory => Arc::new(MemoryCache::new()),
        CacheBackendKind::Sqlite => Arc::new(SqliteCache::open(&config.cache_db_path).await?),
        CacheBackendKind::Redis => open_redis(config).await?,
    };

    tracing::debug!(backend = ?config.cache_backend, ttl_secs = config.cache_ttl_secs, "cache backend opened");

    Ok(Some(backend))
}

#[cfg(feature = "redis")]
async fn open_redis(config: &AppConfig) -> Result<Arc<dyn CacheBackend>, Error> {
    let url = config
        .redis_url
        .as_deref()
        .ok_or_else(|| Error::InvalidInput("redis_url is required for the redis backend".into()))?;
    Ok(Arc::new(RedisCache::connect(url, &config.redis_prefix).await?))
}

#[cfg(not(feature = "redis"))]
async fn open_redis(_config: &AppConfig) -> Result<Arc<dyn CacheBackend>, Error> {
    Err(Error::InvalidInput("redis backend requires the `redis` feature".into()))
}
