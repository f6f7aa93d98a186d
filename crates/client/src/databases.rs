//! Database and collection management.
//!
//! These calls are not cached. The only cache interaction is on
//! `delete_collection`, which drops every cached listing and count of the
//! removed collection.

use std::sync::Arc;

use serde_json::json;

use cachewrite_core::{CacheLayer, Error};

use crate::models::{Collection, CollectionList, Database, DatabaseList};
use crate::transport::{Method, Transport, decode};

fn require(field: &str, value: &str) -> Result<(), Error> {
    if value.is_empty() {
        return Err(Error::InvalidInput(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn database_path(db: &str) -> String {
    format!("/databases/{db}")
}

fn collection_path(db: &str, collection: &str) -> String {
    format!("/databases/{db}/collections/{collection}")
}

#[derive(Clone)]
pub struct DatabaseService {
    transport: Arc<dyn Transport>,
    cache: Option<CacheLayer>,
}

impl DatabaseService {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport, cache: None }
    }

    /// Attach the cache layer shared with the document store.
    pub fn with_cache(mut self, cache: CacheLayer) -> Self {
        self.cache = Some(cache);
        self
    }

    pub async fn list_databases(&self) -> Result<DatabaseList, Error> {
        let bytes = self.transport.send_request(Method::GET, "/databases", None).await?;
        decode(&bytes)
    }

    pub async fn create_database(&self, id: &str, name: &str, enabled: bool) -> Result<Database, Error> {
        require("database id", id)?;
        require("database name", name)?;

        let body = json!({ "databaseId": id, "name": name, "enabled": enabled });
        let bytes = self.transport.send_request(Method::POST, "/databases", Some(&body)).await?;
        decode(&bytes)
    }

    pub async fn get_database(&self, id: &str) -> Result<Database, Error> {
        require("database id", id)?;
        let bytes = self.transport.send_request(Method::GET, &database_path(id), None).await?;
        decode(&bytes)
    }

    pub async fn update_database(&self, id: &str, name: &str, enabled: bool) -> Result<Database, Error> {
        require("database id", id)?;
        require("database name", name)?;

        let body = json!({ "name": name, "enabled": enabled });
        let bytes = self.transport.send_request(Method::PUT, &database_path(id), Some(&body)).await?;
        decode(&bytes)
    }

    pub async fn delete_database(&self, id: &str) -> Result<(), Error> {
        require("database id", id)?;
        self.transport.send_request(Method::DELETE, &database_path(id), None).await?;
        Ok(())
    }

    pub async fn list_collections(&self, db: &str) -> Result<CollectionList, Error> {
        require("database id", db)?;
        let path = format!("{}/collections", database_path(db));
        let bytes = self.transport.send_request(Method::GET, &path, None).await?;
        decode(&bytes)
    }

    pub async fn create_collection(
        &self, db: &str, id: &str, name: &str, permissions: &[String], document_security: bool, enabled: bool,
    ) -> Result<Collection, Error> {
        require("database id", db)?;
        require("collection id", id)?;
        require("collection name", name)?;

        let body = json!({
            "collectionId": id,
            "name": name,
            "permissions": permissions,
            "documentSecurity": document_security,
            "enabled": enabled,
        });
        let path = format!("{}/collections", database_path(db));
        let bytes = self.transport.send_request(Method::POST, &path, Some(&body)).await?;
        decode(&bytes)
    }

    pub async fn get_collection(&self, db: &str, id: &str) -> Result<Collection, Error> {
        require("database id", db)?;
        require("collection id", id)?;
        let bytes = self.transport.send_request(Method::GET, &collection_path(db, id), None).await?;
        decode(&bytes)
    }

    pub async fn update_collection(
        &self, db: &str, id: &str, name: &str, permissions: &[String], document_security: bool, enabled: bool,
    ) -> Result<Collection, Error> {
        require("database id", db)?;
        require("collection id", id)?;
        require("collection name", name)?;

        let body = json!({
            "name": name,
            "permissions": permissions,
            "documentSecurity": document_security,
            "enabled": enabled,
        });
        let bytes = self.transport.send_request(Method::PUT, &collection_path(db, id), Some(&body)).await?;
        decode(&bytes)
    }

    /// Delete a collection and drop its cached listings and counts.
    pub async fn delete_collection(&self, db: &str, id: &str) -> Result<(), Error> {
        require("database id", db)?;
        require("collection id", id)?;

        self.transport.send_request(Method::DELETE, &collection_path(db, id), None).await?;

        if let Some(cache) = &self.cache {
            cache.invalidate_collection(db, id).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::READ_ANY;
    use crate::testing::RecordingTransport;
    use cachewrite_core::MemoryCache;
    use cachewrite_core::cache::{CacheBackend, keys};
    use std::time::Duration;

    fn service() -> (DatabaseService, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::default());
        (DatabaseService::new(transport.clone()), transport)
    }

    #[tokio::test]
    async fn test_create_database_body() {
        let (svc, transport) = service();
        transport.respond(Method::POST, "/databases", json!({ "$id": "main", "name": "Main", "enabled": true }));

        let db = svc.create_database("main", "Main", true).await.unwrap();
        assert_eq!(db.id, "main");
        assert!(db.enabled);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let (method, path, body) = &requests[0];
        assert_eq!(*method, Method::POST);
        assert_eq!(path, "/databases");
        assert_eq!(body.as_ref().unwrap(), &json!({ "databaseId": "main", "name": "Main", "enabled": true }));
    }

    #[tokio::test]
    async fn test_list_databases() {
        let (svc, transport) = service();
        transport.respond(
            Method::GET,
            "/databases",
            json!({ "total": 2, "databases": [
                { "$id": "a", "name": "A", "enabled": true },
                { "$id": "b", "name": "B", "enabled": false }
            ]}),
        );

        let list = svc.list_databases().await.unwrap();
        assert_eq!(list.total, 2);
        assert_eq!(list.databases[1].id, "b");
    }

    #[tokio::test]
    async fn test_update_and_delete_database_paths() {
        let (svc, transport) = service();
        transport.respond(Method::PUT, "/databases/main", json!({ "$id": "main", "name": "Renamed" }));

        let db = svc.update_database("main", "Renamed", false).await.unwrap();
        assert_eq!(db.name, "Renamed");
        svc.delete_database("main").await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].0, Method::PUT);
        assert_eq!(requests[1].0, Method::DELETE);
        assert_eq!(requests[1].1, "/databases/main");
        assert!(requests[1].2.is_none());
    }

    #[tokio::test]
    async fn test_create_collection_body() {
        let (svc, transport) = service();
        transport.respond(
            Method::POST,
            "/databases/main/collections",
            json!({ "$id": "books", "name": "Books", "$permissions": [READ_ANY], "documentSecurity": true }),
        );

        let permissions = vec![READ_ANY.to_string()];
        let col = svc.create_collection("main", "books", "Books", &permissions, true, true).await.unwrap();
        assert_eq!(col.id, "books");
        assert_eq!(col.permissions, permissions);
        assert!(col.document_security);

        let body = transport.requests()[0].2.clone().unwrap();
        assert_eq!(body["collectionId"], "books");
        assert_eq!(body["permissions"], json!([READ_ANY]));
        assert_eq!(body["documentSecurity"], true);
    }

    #[tokio::test]
    async fn test_get_collection_decode_failure() {
        let (svc, _) = service();
        let err = svc.get_collection("main", "books").await.unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[tokio::test]
    async fn test_empty_ids_rejected() {
        let (svc, transport) = service();
        assert!(matches!(svc.get_database("").await, Err(Error::InvalidInput(_))));
        assert!(matches!(svc.delete_collection("main", "").await, Err(Error::InvalidInput(_))));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_delete_collection_invalidates_index() {
        let transport = Arc::new(RecordingTransport::default());
        let cache = MemoryCache::new();
        let layer = CacheLayer::new(Arc::new(cache.clone()), Duration::from_secs(60)).unwrap();
        let svc = DatabaseService::new(transport.clone()).with_cache(layer.clone());

        let list_key = keys::list_key("main", "books", &[]);
        layer.store_tracked("main", "books", &list_key, &vec![1, 2, 3]).await;
        assert!(cache.get(&list_key).await.unwrap().is_some());

        svc.delete_collection("main", "books").await.unwrap();

        assert!(cache.get(&list_key).await.unwrap().is_none());
        assert!(cache.get(&keys::index_key("main", "books")).await.unwrap().is_none());
        assert_eq!(transport.requests()[0].1, "/databases/main/collections/books");
    }
}
