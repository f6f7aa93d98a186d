//! Client code for cachewrite.
//!
//! This crate provides the HTTP transport to the remote document API, the
//! resource models, the concurrent paginator, and the cached document store
//! built on top of `cachewrite-core`.

pub mod databases;
pub mod documents;
pub mod models;
pub mod paginate;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use databases::DatabaseService;
pub use documents::DocumentStore;
pub use models::{Collection, Database, Document, DocumentList};
pub use paginate::{CancelToken, PageConfig, Paginator};
pub use transport::{HttpTransport, Method, Transport, TransportConfig};
