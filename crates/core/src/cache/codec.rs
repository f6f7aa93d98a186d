//! Serialization of cached values.
//!
//! The codec is injected into `CacheLayer` rather than held as global state,
//! so tests and callers can swap the wire format of cached blobs.

use serde_json::Value;

use crate::Error;

/// Converts JSON values to and from the strings stored in a backend.
pub trait Codec: Send + Sync {
    fn encode(&self, value: &Value) -> Result<String, Error>;
    fn decode(&self, raw: &str) -> Result<Value, Error>;
}

/// Compact JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, value: &Value) -> Result<String, Error> {
        Ok(serde_json::to_string(value)?)
    }

    fn decode(&self, raw: &str) -> Result<Value, Error> {
        Ok(serde_json::from_str(raw)?)
    }
}
