//! In-process fakes of the remote API for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Map, Value, json};

use cachewrite_core::{Error, query};

use crate::transport::{Method, Transport};

fn not_found(what: &str) -> Error {
    Error::Http { status: 404, body: format!(r#"{{"message":"{what} not found"}}"#) }
}

fn to_bytes(value: &Value) -> Result<Bytes, Error> {
    Ok(Bytes::from(serde_json::to_vec(value)?))
}

/// Query parameters of a listing path: every `queries[]` value, decoded.
fn listing_queries(query_string: &str) -> Vec<Value> {
    url::form_urlencoded::parse(query_string.as_bytes())
        .filter(|(k, _)| k == "queries[]")
        .filter_map(|(_, v)| serde_json::from_str(&v).ok())
        .collect()
}

fn first_number(query: &Value) -> Option<usize> {
    query["values"].get(0).and_then(Value::as_u64).map(|n| n as usize)
}

/// A single simulated collection with document CRUD and paginated listing.
///
/// Listing honours `equal` filters plus `limit`/`offset`; other filters are
/// ignored.
pub(crate) struct FakeRemote {
    db: String,
    collection: String,
    documents: Mutex<Vec<Value>>,
    fail_offset: Mutex<Option<usize>>,
    list_calls: AtomicUsize,
    get_calls: AtomicUsize,
}

impl FakeRemote {
    pub(crate) fn with_documents(db: &str, collection: &str, count: usize) -> Self {
        let documents = (0..count)
            .map(|i| {
                json!({
                    "$id": format!("doc-{i}"),
                    "$collectionId": collection,
                    "$databaseId": db,
                    "$permissions": [],
                    "n": i,
                    "parity": if i % 2 == 0 { "even" } else { "odd" },
                })
            })
            .collect();
        Self {
            db: db.to_string(),
            collection: collection.to_string(),
            documents: Mutex::new(documents),
            fail_offset: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
        }
    }

    /// Make every listing request at `offset` fail with a 500.
    pub(crate) fn fail_at_offset(&self, offset: usize) {
        *self.fail_offset.lock().unwrap() = Some(offset);
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    fn list(&self, query_string: &str) -> Result<Bytes, Error> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let queries = listing_queries(query_string);
        let mut limit = 25;
        let mut offset = 0;
        let mut equals: Vec<(String, Vec<Value>)> = Vec::new();
        for q in &queries {
            match q["method"].as_str() {
                Some(query::LIMIT) => limit = first_number(q).unwrap_or(limit),
                Some(query::OFFSET) => offset = first_number(q).unwrap_or(offset),
                Some("equal") => {
                    let attribute = q["attribute"].as_str().unwrap_or_default().to_string();
                    let values = q["values"].as_array().cloned().unwrap_or_default();
                    equals.push((attribute, values));
                }
                _ => {}
            }
        }

        if *self.fail_offset.lock().unwrap() == Some(offset) {
            return Err(Error::Http { status: 500, body: "simulated failure".into() });
        }

        let documents = self.documents.lock().unwrap();
        let matching: Vec<&Value> = documents
            .iter()
            .filter(|d| equals.iter().all(|(attr, values)| values.contains(&d[attr.as_str()])))
            .collect();
        let page: Vec<&Value> = matching.iter().skip(offset).take(limit).copied().collect();

        to_bytes(&json!({ "total": matching.len(), "documents": page }))
    }

    fn find(&self, id: &str) -> Option<Value> {
        self.documents.lock().unwrap().iter().find(|d| d["$id"] == id).cloned()
    }

    fn create(&self, body: Option<&Value>) -> Result<Bytes, Error> {
        let body = body.ok_or_else(|| Error::Http { status: 400, body: "missing body".into() })?;
        let id = body["documentId"].as_str().unwrap_or_default().to_string();
        if self.find(&id).is_some() {
            return Err(Error::Http { status: 409, body: "document already exists".into() });
        }

        let mut doc = body["data"].as_object().cloned().unwrap_or_default();
        doc.insert("$id".into(), json!(id));
        doc.insert("$collectionId".into(), json!(self.collection));
        doc.insert("$databaseId".into(), json!(self.db));
        doc.insert("$permissions".into(), body.get("permissions").cloned().unwrap_or_else(|| json!([])));

        let doc = Value::Object(doc);
        self.documents.lock().unwrap().push(doc.clone());
        to_bytes(&doc)
    }

    fn update(&self, id: &str, body: Option<&Value>) -> Result<Bytes, Error> {
        let mut documents = self.documents.lock().unwrap();
        let doc = documents.iter_mut().find(|d| d["$id"] == id).ok_or_else(|| not_found("document"))?;

        let patch: Map<String, Value> =
            body.and_then(|b| b["data"].as_object().cloned()).unwrap_or_default();
        if let Some(obj) = doc.as_object_mut() {
            obj.extend(patch);
            if let Some(permissions) = body.and_then(|b| b.get("permissions")) {
                obj.insert("$permissions".into(), permissions.clone());
            }
        }
        to_bytes(doc)
    }

    fn delete(&self, id: &str) -> Result<Bytes, Error> {
        let mut documents = self.documents.lock().unwrap();
        let before = documents.len();
        documents.retain(|d| d["$id"] != id);
        if documents.len() == before {
            return Err(not_found("document"));
        }
        Ok(Bytes::new())
    }
}

#[async_trait]
impl Transport for FakeRemote {
    async fn send_request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Bytes, Error> {
        let prefix = format!("/databases/{}/collections/{}/documents", self.db, self.collection);
        let Some(rest) = path.strip_prefix(&prefix) else {
            return Err(not_found("route"));
        };

        match (method, rest) {
            (Method::GET, rest) if rest.is_empty() || rest.starts_with('?') => {
                self.list(rest.trim_start_matches('?'))
            }
            (Method::POST, "") => self.create(body),
            (method, rest) => {
                let id = rest.trim_start_matches('/');
                match method {
                    Method::GET => {
                        self.get_calls.fetch_add(1, Ordering::SeqCst);
                        self.find(id).map(|d| to_bytes(&d)).unwrap_or_else(|| Err(not_found("document")))
                    }
                    Method::PATCH => self.update(id, body),
                    Method::DELETE => self.delete(id),
                    _ => Err(Error::Http { status: 405, body: "method not allowed".into() }),
                }
            }
        }
    }
}

/// Returns canned bodies per route and records every request.
#[derive(Default)]
pub(crate) struct RecordingTransport {
    responses: Mutex<HashMap<(Method, String), Value>>,
    requests: Mutex<Vec<(Method, String, Option<Value>)>>,
}

impl RecordingTransport {
    pub(crate) fn respond(&self, method: Method, path: &str, body: Value) {
        self.responses.lock().unwrap().insert((method, path.to_string()), body);
    }

    pub(crate) fn requests(&self) -> Vec<(Method, String, Option<Value>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Bytes, Error> {
        self.requests.lock().unwrap().push((method.clone(), path.to_string(), body.cloned()));
        match self.responses.lock().unwrap().get(&(method, path.to_string())) {
            Some(value) => to_bytes(value),
            None => Ok(Bytes::new()),
        }
    }
}
