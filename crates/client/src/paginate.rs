//! Concurrent retrieval of complete document listings.
//!
//! The remote API caps every response at a fixed page size. `fetch_all` runs
//! a fixed pool of workers that each claim the next offset from a shared
//! cursor, fetch that page, and keep going until they see a short or empty
//! page. Pages arrive out of order, so the returned documents carry no
//! ordering guarantee.
//!
//! The first worker error wins and discards everything accumulated so far.
//! Cancellation is cooperative: workers check the token before each fetch,
//! requests already in flight run to completion.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::de::{DeserializeOwned, IgnoredAny};
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use cachewrite_core::cache::keys;
use cachewrite_core::{AppConfig, Error, query};

use crate::models::{Document, DocumentList};
use crate::transport::{Method, Transport, decode};

/// Cooperative cancellation flag shared between a caller and the workers.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Page size and worker count for listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageConfig {
    /// Documents requested per call (default: 800)
    pub page_size: usize,
    /// Concurrent workers for `fetch_all` (default: 5)
    pub workers: usize,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self { page_size: 800, workers: 5 }
    }
}

impl PageConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self { page_size: config.page_size.max(1), workers: config.page_workers.max(1) }
    }
}

/// Path of a collection's document endpoint.
pub(crate) fn documents_path(db: &str, collection: &str) -> String {
    format!("/databases/{db}/collections/{collection}/documents")
}

/// Listing path with the caller's filters followed by one `limit` and one `offset`.
pub(crate) fn page_path(db: &str, collection: &str, filters: &[String], limit: usize, offset: usize) -> String {
    let mut params = url::form_urlencoded::Serializer::new(String::new());
    for filter in filters {
        params.append_pair("queries[]", filter);
    }
    params.append_pair("queries[]", &query::limit(limit));
    params.append_pair("queries[]", &query::offset(offset));
    format!("{}?{}", documents_path(db, collection), params.finish())
}

async fn fetch_page<T: DeserializeOwned>(transport: &dyn Transport, path: &str) -> Result<Vec<T>, Error> {
    let bytes = transport.send_request(Method::GET, path, None).await?;
    Ok(decode::<DocumentList<T>>(&bytes)?.documents)
}

/// State shared by the workers of one `fetch_all` call.
#[derive(Default)]
struct FetchState {
    cursor: Mutex<usize>,
    documents: Mutex<Vec<Document>>,
    first_error: Mutex<Option<Error>>,
}

impl FetchState {
    async fn claim_offset(&self, page_size: usize) -> usize {
        let mut cursor = self.cursor.lock().await;
        let offset = *cursor;
        *cursor += page_size;
        offset
    }

    async fn record_error(&self, err: Error) {
        let mut first = self.first_error.lock().await;
        if first.is_none() {
            *first = Some(err);
        }
    }

    async fn has_failed(&self) -> bool {
        self.first_error.lock().await.is_some()
    }
}

struct Worker {
    id: usize,
    transport: Arc<dyn Transport>,
    db: Arc<str>,
    collection: Arc<str>,
    filters: Arc<[String]>,
    page_size: usize,
    state: Arc<FetchState>,
    cancel: CancelToken,
}

impl Worker {
    async fn run(self) {
        let mut pages = 0usize;
        loop {
            if self.cancel.is_cancelled() {
                self.state.record_error(Error::Cancelled).await;
                break;
            }
            if self.state.has_failed().await {
                break;
            }

            let offset = self.state.claim_offset(self.page_size).await;
            let path = page_path(&self.db, &self.collection, &self.filters, self.page_size, offset);

            let page = match fetch_page::<Document>(self.transport.as_ref(), &path).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::debug!(worker = self.id, offset, error = %e, "page fetch failed");
                    self.state.record_error(e).await;
                    break;
                }
            };

            let count = page.len();
            if count == 0 {
                break;
            }
            pages += 1;
            self.state.documents.lock().await.extend(page);
            if count < self.page_size {
                break;
            }
        }
        tracing::debug!(worker = self.id, pages, "page worker finished");
    }
}

/// Fetches complete listings from a collection.
#[derive(Clone)]
pub struct Paginator {
    transport: Arc<dyn Transport>,
    config: PageConfig,
}

impl Paginator {
    pub fn new(transport: Arc<dyn Transport>, config: PageConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> PageConfig {
        self.config
    }

    /// Every document matching `filters`, in no particular order.
    ///
    /// Caller `limit`/`offset` filters are ignored. Returns the first error
    /// any worker hit, or `Error::Cancelled`, and no partial results.
    pub async fn fetch_all(
        &self, db: &str, collection: &str, filters: &[String], cancel: &CancelToken,
    ) -> Result<Vec<Document>, Error> {
        let filters: Arc<[String]> = keys::strip_pagination(filters).into();
        let db: Arc<str> = Arc::from(db);
        let collection: Arc<str> = Arc::from(collection);
        let state = Arc::new(FetchState::default());

        let mut workers = JoinSet::new();
        for id in 0..self.config.workers.max(1) {
            let worker = Worker {
                id,
                transport: self.transport.clone(),
                db: db.clone(),
                collection: collection.clone(),
                filters: filters.clone(),
                page_size: self.config.page_size.max(1),
                state: state.clone(),
                cancel: cancel.clone(),
            };
            workers.spawn(worker.run());
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                state.record_error(Error::TaskFailed(e.to_string())).await;
            }
        }

        if let Some(err) = state.first_error.lock().await.take() {
            tracing::debug!(db = %db, collection = %collection, error = %err, "listing failed");
            return Err(err);
        }

        let documents = std::mem::take(&mut *state.documents.lock().await);
        tracing::debug!(db = %db, collection = %collection, documents = documents.len(), "listing complete");
        Ok(documents)
    }

    /// Number of documents matching `filters`, paging serially until a short page.
    pub async fn count_all(
        &self, db: &str, collection: &str, filters: &[String], cancel: &CancelToken,
    ) -> Result<u64, Error> {
        let filters = keys::strip_pagination(filters);
        let page_size = self.config.page_size.max(1);
        let mut offset = 0usize;
        let mut total = 0u64;

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let path = page_path(db, collection, &filters, page_size, offset);
            let count = fetch_page::<IgnoredAny>(self.transport.as_ref(), &path).await?.len();
            total += count as u64;

            if count < page_size {
                break;
            }
            offset += page_size;
        }

        tracing::debug!(db, collection, total, "count complete");
        Ok(total)
    }
}
