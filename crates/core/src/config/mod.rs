//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (CACHEWRITE_*)
//! 2. TOML config file (if CACHEWRITE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Which cache backend sits in front of the remote API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// No cache; every read goes to the remote API.
    #[default]
    None,
    /// Process-local map.
    Memory,
    /// SQLite file at `cache_db_path`.
    Sqlite,
    /// Redis at `redis_url` (requires the `redis` feature).
    Redis,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (CACHEWRITE_*)
/// 2. TOML config file (if CACHEWRITE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the remote API, without the `/v1` suffix.
    ///
    /// Set via CACHEWRITE_ENDPOINT environment variable.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Project identifier sent as `X-Appwrite-Project`.
    ///
    /// Set via CACHEWRITE_PROJECT_ID environment variable.
    #[serde(default)]
    pub project_id: Option<String>,

    /// Server API key sent as `X-Appwrite-Key`.
    ///
    /// Set via CACHEWRITE_API_KEY environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via CACHEWRITE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via CACHEWRITE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Cache backend selection.
    ///
    /// Set via CACHEWRITE_CACHE_BACKEND environment variable
    /// (`none`, `memory`, `sqlite` or `redis`).
    #[serde(default)]
    pub cache_backend: CacheBackendKind,

    /// TTL applied to every cache write, in seconds. Zero disables caching.
    ///
    /// Set via CACHEWRITE_CACHE_TTL_SECS environment variable.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Path to the SQLite cache database.
    ///
    /// Set via CACHEWRITE_CACHE_DB_PATH environment variable.
    #[serde(default = "default_cache_db_path")]
    pub cache_db_path: PathBuf,

    /// Redis connection URL.
    ///
    /// Set via CACHEWRITE_REDIS_URL environment variable.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Prefix prepended to every Redis key.
    ///
    /// Set via CACHEWRITE_REDIS_PREFIX environment variable.
    #[serde(default)]
    pub redis_prefix: String,

    /// Documents requested per page when listing.
    ///
    /// Set via CACHEWRITE_PAGE_SIZE environment variable.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Number of concurrent page workers when listing.
    ///
    /// Set via CACHEWRITE_PAGE_WORKERS environment variable.
    #[serde(default = "default_page_workers")]
    pub page_workers: usize,
}

fn default_endpoint() -> String {
    "https://cloud.appwrite.io".into()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_user_agent() -> String {
    "cachewrite/0.1".into()
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_cache_db_path() -> PathBuf {
    PathBuf::from("./cachewrite-cache.sqlite")
}

fn default_page_size() -> usize {
    800
}

fn default_page_workers() -> usize {
    5
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            project_id: None,
            api_key: None,
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
            cache_backend: CacheBackendKind::None,
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_db_path: default_cache_db_path(),
            redis_url: None,
            redis_prefix: String::new(),
            page_size: default_page_size(),
            page_workers: default_page_workers(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Cache TTL as Duration. A zero duration means pass-through mode.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Whether reads will be served from a cache at all.
    pub fn caching_enabled(&self) -> bool {
        self.cache_backend != CacheBackendKind::None && self.cache_ttl_secs > 0
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `CACHEWRITE_`
    /// 2. TOML file from `CACHEWRITE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("CACHEWRITE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("CACHEWRITE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Project id for authenticated requests.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the project id is not set.
    pub fn require_project_id(&self) -> Result<&str, ConfigError> {
        self.project_id.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "project_id".into(),
            hint: "Set CACHEWRITE_PROJECT_ID environment variable".into(),
        })
    }

    /// API key for authenticated requests.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the API key is not set.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "api_key".into(),
            hint: "Set CACHEWRITE_API_KEY environment variable".into(),
        })
    }
}
