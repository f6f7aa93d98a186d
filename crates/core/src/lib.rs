//! Core types and shared functionality for cachewrite.
//!
//! This crate provides:
//! - Cache backends (in-memory, SQLite, optional Redis) behind one trait
//! - Cache key derivation and the per-collection invalidation index
//! - The query filter builder
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod query;

pub use cache::{CacheBackend, CacheLayer, Codec, InvalidationIndex, JsonCodec, MemoryCache, SqliteCache};
pub use config::{AppConfig, CacheBackendKind, ConfigError};
pub use error::Error;
