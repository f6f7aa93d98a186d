//! Unified error types for cachewrite.
//!
//! Every message carries a stable code prefix so callers can match on the
//! rendered text as well as the variant.

use tokio_rusqlite::rusqlite;

/// Unified error type shared by the cache engine and the API client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty document id).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The remote API answered with a non-success status.
    #[error("HTTP_ERROR: status {status}: {body}")]
    Http { status: u16, body: String },

    /// The request never produced a response.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// The request timed out.
    #[error("REQUEST_TIMEOUT: {0}")]
    Timeout(String),

    /// A response or cached blob could not be decoded.
    #[error("DECODE_FAILED: {0}")]
    Decode(String),

    /// Cache backend operation failed.
    #[error("CACHE_ERROR: {0}")]
    Cache(String),

    /// SQLite cache backend operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// The operation was cancelled before it completed.
    #[error("CANCELLED")]
    Cancelled,

    /// A background worker panicked or was aborted.
    #[error("TASK_FAILED: {0}")]
    TaskFailed(String),
}

impl Error {
    /// True for failures that originate in the remote API or the network.
    pub fn is_remote(&self) -> bool {
        matches!(self, Error::Http { .. } | Error::Network(_) | Error::Timeout(_))
    }

    /// True for failures of the cache backend itself.
    pub fn is_cache(&self) -> bool {
        matches!(self, Error::Cache(_) | Error::Database(_) | Error::MigrationFailed(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}
