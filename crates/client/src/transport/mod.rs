//! HTTP transport to the remote document API.
//!
//! ### Requests
//! - URL: `{endpoint}/v1{path}`
//! - Headers: `Content-Type: application/json`, `X-Appwrite-Project`,
//!   `X-Appwrite-Key`, `X-Appwrite-Response-Format`
//! - Bodies are JSON when present.
//!
//! ### Errors
//! - Any status >= 400 becomes `Error::Http` carrying the response body.
//! - Timeouts and connection failures are never retried.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use reqwest::Method;

use cachewrite_core::{AppConfig, Error};

/// Response format version requested from the server.
const RESPONSE_FORMAT: &str = "1.6.0";

/// Sends one request and returns the raw response body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Bytes, Error>;
}

/// Decode a JSON response body.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, Error> {
    serde_json::from_slice(bytes).map_err(Error::from)
}

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Base URL without the `/v1` suffix.
    pub endpoint: String,
    pub project_id: String,
    pub api_key: String,
    /// Request timeout (default: 30s)
    pub timeout: Duration,
    /// User agent string (default: "cachewrite/0.1")
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://cloud.appwrite.io".to_string(),
            project_id: String::new(),
            api_key: String::new(),
            timeout: Duration::from_millis(30_000),
            user_agent: "cachewrite/0.1".to_string(),
        }
    }
}

impl TransportConfig {
    /// Build from application configuration; project id and API key are required.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let project_id = config.require_project_id().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let api_key = config.require_api_key().map_err(|e| Error::InvalidInput(e.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            project_id: project_id.to_string(),
            api_key: api_key.to_string(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{}", self.endpoint.trim_end_matches('/'), path)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> Error {
    if err.is_timeout() { Error::Timeout(err.to_string()) } else { Error::Network(err.to_string()) }
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    config: TransportConfig,
}

impl HttpTransport {
    /// Create a new transport with the given configuration.
    pub fn new(config: TransportConfig) -> Result<Self, Error> {
        if config.project_id.is_empty() || config.api_key.is_empty() {
            return Err(Error::InvalidInput("project_id and api_key are required".into()));
        }

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Create a transport from application configuration.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        Self::new(TransportConfig::from_app_config(config)?)
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send_request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Bytes, Error> {
        let url = self.config.url(path);

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(header::CONTENT_TYPE, "application/json")
            .header("X-Appwrite-Project", &self.config.project_id)
            .header("X-Appwrite-Key", &self.config.api_key)
            .header("X-Appwrite-Response-Format", RESPONSE_FORMAT);

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;

        tracing::debug!(%method, path, status = status.as_u16(), bytes = bytes.len(), "remote request");

        if status.is_client_error() || status.is_server_error() {
            return Err(Error::Http { status: status.as_u16(), body: String::from_utf8_lossy(&bytes).into_owned() });
        }

        Ok(bytes)
    }
}
