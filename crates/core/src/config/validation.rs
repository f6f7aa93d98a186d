//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::{AppConfig, CacheBackendKind};
use thiserror::Error;

/// Largest page the remote API will return in one response.
const MAX_PAGE_SIZE: usize = 5000;

const MAX_PAGE_WORKERS: usize = 64;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `endpoint` or `user_agent` is empty
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `page_size` is 0 or exceeds 5000
    /// - `page_workers` is 0 or exceeds 64
    ///
    /// Returns `ConfigError::Missing` if the Redis backend is selected
    /// without a `redis_url`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.is_empty() {
            return Err(ConfigError::Invalid { field: "endpoint".into(), reason: "must not be empty".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::Invalid {
                field: "page_size".into(),
                reason: format!("must be between 1 and {MAX_PAGE_SIZE}"),
            });
        }

        if self.page_workers == 0 || self.page_workers > MAX_PAGE_WORKERS {
            return Err(ConfigError::Invalid {
                field: "page_workers".into(),
                reason: format!("must be between 1 and {MAX_PAGE_WORKERS}"),
            });
        }

        if self.cache_backend == CacheBackendKind::Redis && self.redis_url.is_none() {
            return Err(ConfigError::Missing {
                field: "redis_url".into(),
                hint: "Set CACHEWRITE_REDIS_URL when cache_backend is redis".into(),
            });
        }

        if self.cache_backend != CacheBackendKind::None && self.cache_ttl_secs == 0 {
            tracing::warn!(
                backend = ?self.cache_backend,
                "cache_ttl_secs is 0; the configured cache backend will not be used"
            );
        }

        Ok(())
    }
}
