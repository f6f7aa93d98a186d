//! Redis-backed cache backend.
//!
//! Every key is namespaced with an optional prefix so several applications
//! can share one Redis database. TTLs are rounded up to whole seconds.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use super::CacheBackend;
use crate::Error;

/// Maps Redis errors onto the cache error variant.
fn map_redis_error(err: redis::RedisError) -> Error {
    if err.is_connection_refusal() || err.is_timeout() || err.is_connection_dropped() {
        Error::Cache(format!("redis connection failed: {err}"))
    } else {
        Error::Cache(format!("redis operation failed: {err}"))
    }
}

/// Join `prefix` and `key` with a single `:`.
fn namespaced(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else if prefix.ends_with(':') {
        format!("{prefix}{key}")
    } else {
        format!("{prefix}:{key}")
    }
}

/// Redis cache backend using a connection manager for reconnects.
#[derive(Clone)]
pub struct RedisCache {
    conn: redis::aio::ConnectionManager,
    prefix: String,
}

impl RedisCache {
    /// Connect to Redis.
    ///
    /// # Arguments
    ///
    /// * `url` - Redis connection URL (e.g., "redis://localhost:6379")
    /// * `prefix` - Namespace for every key; empty for none
    ///
    /// # Errors
    ///
    /// Returns `Error::Cache` if the connection cannot be established.
    pub async fn connect(url: &str, prefix: &str) -> Result<Self, Error> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        let conn = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;
        Ok(Self { conn, prefix: prefix.to_string() })
    }

    fn key(&self, key: &str) -> String {
        namespaced(&self.prefix, key)
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let mut conn = self.conn.clone();
        conn.get(self.key(key)).await.map_err(map_redis_error)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), Error> {
        let mut conn = self.conn.clone();
        let key = self.key(key);
        if ttl.is_zero() {
            return conn.del::<_, ()>(key).await.map_err(map_redis_error);
        }
        let seconds = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(map_redis_error)
    }

    async fn delete(&self, keys: &[String]) -> Result<(), Error> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let keys: Vec<String> = keys.iter().map(|k| self.key(k)).collect();
        conn.del::<_, ()>(keys).await.map_err(map_redis_error)
    }
}
