//! Query filter builder.
//!
//! The remote API accepts filters as JSON objects of the shape
//! `{"method": ..., "attribute": ..., "values": [...]}`, passed as repeated
//! `queries[]` URL parameters. Each builder returns the encoded string.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Method name of the page-size control.
pub const LIMIT: &str = "limit";

/// Method name of the page-start control.
pub const OFFSET: &str = "offset";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Query {
    method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<Vec<Value>>,
}

fn encode(method: &str, attribute: Option<&str>, values: Option<Vec<Value>>) -> String {
    let query = Query { method: method.to_string(), attribute: attribute.map(str::to_string), values };
    serde_json::to_string(&query).unwrap_or_default()
}

/// Scalars become a one-element list, arrays pass through, null means "no values".
fn to_values(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Null => None,
        Value::Array(items) => Some(items),
        other => Some(vec![other]),
    }
}

fn compare(method: &str, attribute: &str, value: impl Into<Value>) -> String {
    encode(method, Some(attribute), to_values(value.into()))
}

fn nested(method: &str, queries: &[String]) -> String {
    let parsed: Vec<Value> = queries
        .iter()
        .filter_map(|q| match serde_json::from_str::<Value>(q) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(query = %q, error = %e, "skipping malformed nested query");
                None
            }
        })
        .collect();
    encode(method, None, Some(parsed))
}

pub fn equal(attribute: &str, value: impl Into<Value>) -> String {
    compare("equal", attribute, value)
}

pub fn not_equal(attribute: &str, value: impl Into<Value>) -> String {
    compare("notEqual", attribute, value)
}

pub fn less_than(attribute: &str, value: impl Into<Value>) -> String {
    compare("lessThan", attribute, value)
}

pub fn less_than_equal(attribute: &str, value: impl Into<Value>) -> String {
    compare("lessThanEqual", attribute, value)
}

pub fn greater_than(attribute: &str, value: impl Into<Value>) -> String {
    compare("greaterThan", attribute, value)
}

pub fn greater_than_equal(attribute: &str, value: impl Into<Value>) -> String {
    compare("greaterThanEqual", attribute, value)
}

/// Full-text search; requires a fulltext index on the attribute.
pub fn search(attribute: &str, value: impl Into<Value>) -> String {
    compare("search", attribute, value)
}

pub fn is_null(attribute: &str) -> String {
    encode("isNull", Some(attribute), None)
}

pub fn is_not_null(attribute: &str) -> String {
    encode("isNotNull", Some(attribute), None)
}

pub fn between(attribute: &str, start: impl Into<Value>, end: impl Into<Value>) -> String {
    encode("between", Some(attribute), Some(vec![start.into(), end.into()]))
}

pub fn starts_with(attribute: &str, value: impl Into<Value>) -> String {
    compare("startsWith", attribute, value)
}

pub fn ends_with(attribute: &str, value: impl Into<Value>) -> String {
    compare("endsWith", attribute, value)
}

pub fn contains(attribute: &str, value: impl Into<Value>) -> String {
    compare("contains", attribute, value)
}

/// Restrict returned attributes.
pub fn select(attributes: impl Into<Value>) -> String {
    encode("select", None, to_values(attributes.into()))
}

pub fn order_asc(attribute: &str) -> String {
    encode("orderAsc", Some(attribute), None)
}

pub fn order_desc(attribute: &str) -> String {
    encode("orderDesc", Some(attribute), None)
}

pub fn cursor_before(document_id: &str) -> String {
    encode("cursorBefore", None, Some(vec![Value::from(document_id)]))
}

pub fn cursor_after(document_id: &str) -> String {
    encode("cursorAfter", None, Some(vec![Value::from(document_id)]))
}

pub fn limit(limit: usize) -> String {
    encode(LIMIT, None, Some(vec![Value::from(limit)]))
}

pub fn offset(offset: usize) -> String {
    encode(OFFSET, None, Some(vec![Value::from(offset)]))
}

/// Combine queries with logical OR. Malformed entries are dropped.
pub fn or(queries: &[String]) -> String {
    nested("or", queries)
}

/// Combine queries with logical AND. Malformed entries are dropped.
pub fn and(queries: &[String]) -> String {
    nested("and", queries)
}

/// Method name of an encoded query, or `None` if it is not a query object.
pub fn method_of(query: &str) -> Option<String> {
    serde_json::from_str::<Query>(query).ok().map(|q| q.method)
}

/// Whether the query controls pagination (`limit` or `offset`).
pub fn is_pagination(query: &str) -> bool {
    matches!(method_of(query).as_deref(), Some(LIMIT) | Some(OFFSET))
}
