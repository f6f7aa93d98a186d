//! Cached document store.
//!
//! Reads check the cache first and fall back to the remote API, populating
//! the cache on the way out. Writes go to the remote API first and, only when
//! they succeed, drop the document's cached entry together with every cached
//! listing and count of its collection. Without a cache layer every call goes
//! straight to the remote API.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value, json};

use cachewrite_core::cache::{self, CacheBackend, CacheLayer, keys};
use cachewrite_core::{AppConfig, Error};

use crate::models::Document;
use crate::paginate::{CancelToken, PageConfig, Paginator, documents_path};
use crate::transport::{HttpTransport, Method, Transport, decode};

fn require(field: &str, value: &str) -> Result<(), Error> {
    if value.is_empty() {
        return Err(Error::InvalidInput(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Document API with read-through caching and write invalidation.
#[derive(Clone)]
pub struct DocumentStore {
    transport: Arc<dyn Transport>,
    paginator: Paginator,
    cache: Option<CacheLayer>,
}

impl DocumentStore {
    /// Store in pass-through mode.
    pub fn new(transport: Arc<dyn Transport>, page_config: PageConfig) -> Self {
        let paginator = Paginator::new(transport.clone(), page_config);
        Self { transport, paginator, cache: None }
    }

    /// Attach a cache layer.
    pub fn with_cache(mut self, cache: CacheLayer) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Attach a backend with a TTL. A zero TTL keeps pass-through mode.
    pub fn with_backend(mut self, backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        self.cache = CacheLayer::new(backend, ttl);
        self
    }

    /// Wire transport, paging and cache from application configuration.
    pub async fn from_config(config: &AppConfig) -> Result<Self, Error> {
        config.validate().map_err(|e| Error::InvalidInput(e.to_string()))?;

        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::from_app_config(config)?);
        let store = Self::new(transport, PageConfig::from_app_config(config));

        match cache::open_backend(config).await? {
            Some(backend) => Ok(store.with_backend(backend, config.cache_ttl())),
            None => Ok(store),
        }
    }

    pub fn cache(&self) -> Option<&CacheLayer> {
        self.cache.as_ref()
    }

    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    /// Every document matching `filters`, in no particular order.
    pub async fn list_documents(&self, db: &str, collection: &str, filters: &[String]) -> Result<Vec<Document>, Error> {
        self.list_documents_with_cancel(db, collection, filters, &CancelToken::new()).await
    }

    pub async fn list_documents_with_cancel(
        &self, db: &str, collection: &str, filters: &[String], cancel: &CancelToken,
    ) -> Result<Vec<Document>, Error> {
        require("database id", db)?;
        require("collection id", collection)?;

        let key = keys::list_key(db, collection, filters);
        if let Some(cache) = &self.cache
            && let Some(documents) = cache.read::<Vec<Document>>(&key).await
        {
            return Ok(documents);
        }

        let documents = self.paginator.fetch_all(db, collection, filters, cancel).await?;

        if let Some(cache) = &self.cache {
            cache.store_tracked(db, collection, &key, &documents).await;
        }
        Ok(documents)
    }

    /// Number of documents matching `filters`.
    pub async fn count_documents(&self, db: &str, collection: &str, filters: &[String]) -> Result<u64, Error> {
        self.count_documents_with_cancel(db, collection, filters, &CancelToken::new()).await
    }

    pub async fn count_documents_with_cancel(
        &self, db: &str, collection: &str, filters: &[String], cancel: &CancelToken,
    ) -> Result<u64, Error> {
        require("database id", db)?;
        require("collection id", collection)?;

        let key = keys::count_key(db, collection, filters);
        if let Some(cache) = &self.cache
            && let Some(count) = cache.read::<u64>(&key).await
        {
            return Ok(count);
        }

        let count = self.paginator.count_all(db, collection, filters, cancel).await?;

        if let Some(cache) = &self.cache {
            cache.store_tracked(db, collection, &key, &count).await;
        }
        Ok(count)
    }

    /// A single document by id.
    pub async fn get_document(&self, db: &str, collection: &str, id: &str) -> Result<Document, Error> {
        require("database id", db)?;
        require("collection id", collection)?;
        require("document id", id)?;

        let key = keys::point_key(db, collection, id);
        if let Some(cache) = &self.cache
            && let Some(document) = cache.read::<Document>(&key).await
        {
            return Ok(document);
        }

        let path = format!("{}/{id}", documents_path(db, collection));
        let bytes = self.transport.send_request(Method::GET, &path, None).await?;
        let document: Document = decode(&bytes)?;

        if let Some(cache) = &self.cache {
            cache.store(&key, &document).await;
        }
        Ok(document)
    }

    /// Create a document. `document_id` may be `unique()` to let the server pick one.
    pub async fn create_document(
        &self, db: &str, collection: &str, document_id: &str, data: Map<String, Value>, permissions: &[String],
    ) -> Result<Document, Error> {
        require("database id", db)?;
        require("collection id", collection)?;
        require("document id", document_id)?;

        let payload = json!({
            "documentId": document_id,
            "data": data,
            "permissions": permissions,
        });

        let bytes = self
            .transport
            .send_request(Method::POST, &documents_path(db, collection), Some(&payload))
            .await?;
        let document: Document = decode(&bytes)?;

        self.invalidate(db, collection, &document.id).await;
        Ok(document)
    }

    /// Patch a document's attributes. `None` leaves permissions unchanged.
    pub async fn update_document(
        &self, db: &str, collection: &str, id: &str, data: Map<String, Value>, permissions: Option<&[String]>,
    ) -> Result<Document, Error> {
        require("database id", db)?;
        require("collection id", collection)?;
        require("document id", id)?;

        let mut payload = json!({ "data": data });
        if let Some(permissions) = permissions {
            payload["permissions"] = json!(permissions);
        }

        let path = format!("{}/{id}", documents_path(db, collection));
        let bytes = self.transport.send_request(Method::PATCH, &path, Some(&payload)).await?;
        let document: Document = decode(&bytes)?;

        self.invalidate(db, collection, id).await;
        Ok(document)
    }

    pub async fn delete_document(&self, db: &str, collection: &str, id: &str) -> Result<(), Error> {
        require("database id", db)?;
        require("collection id", collection)?;
        require("document id", id)?;

        let path = format!("{}/{id}", documents_path(db, collection));
        self.transport.send_request(Method::DELETE, &path, None).await?;

        self.invalidate(db, collection, id).await;
        Ok(())
    }

    /// Drop every cached listing and count for a collection.
    pub async fn invalidate_collection(&self, db: &str, collection: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate_collection(db, collection).await;
        }
    }

    async fn invalidate(&self, db: &str, collection: &str, id: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate_document(db, collection, id).await;
        }
    }
}
