//! Resource shapes returned by the remote API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const READ_ANY: &str = "read(\"any\")";
pub const WRITE_ANY: &str = "write(\"any\")";
pub const READ_USERS: &str = "read(\"users\")";
pub const WRITE_USERS: &str = "write(\"users\")";

/// A database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    #[serde(rename = "$id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseList {
    #[serde(default)]
    pub total: u64,
    pub databases: Vec<Database>,
}

/// A collection and its schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(rename = "$id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "$permissions", default)]
    pub permissions: Vec<String>,
    #[serde(rename = "documentSecurity", default)]
    pub document_security: bool,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub attributes: Vec<Value>,
    #[serde(default)]
    pub indexes: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionList {
    #[serde(default)]
    pub total: u64,
    pub collections: Vec<Collection>,
}

/// A document: system fields plus the free-form attribute bag.
///
/// Every key that is not a known system field lands in `data`, and is written
/// back at the top level when the document is serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "$collectionId", default)]
    pub collection: String,
    #[serde(rename = "$databaseId", default)]
    pub database: String,
    #[serde(rename = "$permissions", default)]
    pub permissions: Vec<String>,
    #[serde(rename = "$createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(rename = "$updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl Document {
    /// Attribute from the data bag.
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.data.get(attribute)
    }
}

/// One page of a document listing.
///
/// The element type defaults to `Document`; counting decodes pages with
/// `serde::de::IgnoredAny` to skip the document bodies.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentList<T = Document> {
    #[serde(default)]
    pub total: u64,
    pub documents: Vec<T>,
}
