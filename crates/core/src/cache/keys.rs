//! Cache key derivation.
//!
//! Point lookups use literal keys. Filtered list and count queries use a
//! SHA-256 digest over the database id, collection id and the ordered filter
//! strings, with pagination controls removed first so that page size and
//! offset never change the identity of a query.

use sha2::{Digest, Sha256};

use crate::query;

pub const DOC_PREFIX: &str = "doc:";
pub const LIST_PREFIX: &str = "list:";
pub const COUNT_PREFIX: &str = "count:";
pub const INDEX_PREFIX: &str = "colidx:";

/// Key for a single document.
pub fn point_key(db: &str, collection: &str, id: &str) -> String {
    format!("{DOC_PREFIX}{db}:{collection}:{id}")
}

/// Key of the invalidation index for a collection.
pub fn index_key(db: &str, collection: &str) -> String {
    format!("{INDEX_PREFIX}{db}:{collection}")
}

/// Drop `limit` and `offset` filters, keeping everything else in order.
pub fn strip_pagination(filters: &[String]) -> Vec<String> {
    filters.iter().filter(|f| !query::is_pagination(f)).cloned().collect()
}

/// Digest identifying a filtered query over a collection.
///
/// Order of the remaining filters is significant.
pub fn query_hash(db: &str, collection: &str, filters: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(db.as_bytes());
    hasher.update(b"\0");
    hasher.update(collection.as_bytes());
    for filter in filters.iter().filter(|f| !query::is_pagination(f)) {
        hasher.update(b"\0");
        hasher.update(filter.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Key for the full result of a filtered listing.
pub fn list_key(db: &str, collection: &str, filters: &[String]) -> String {
    format!("{LIST_PREFIX}{}", query_hash(db, collection, filters))
}

/// Key for the document count of a filtered listing.
pub fn count_key(db: &str, collection: &str, filters: &[String]) -> String {
    format!("{COUNT_PREFIX}{}", query_hash(db, collection, filters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{equal, greater_than, limit, offset};

    #[test]
    fn test_point_key_format() {
        assert_eq!(point_key("main", "users", "abc"), "doc:main:users:abc");
        assert_eq!(index_key("main", "users"), "colidx:main:users");
    }

    #[test]
    fn test_hash_stability() {
        let filters = vec![equal("status", "active")];
        assert_eq!(query_hash("db", "col", &filters), query_hash("db", "col", &filters));
    }

    #[test]
    fn test_hash_format() {
        let hash = query_hash("db", "col", &[]);
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_ignores_pagination() {
        let a = vec![equal("status", "active"), limit(10), offset(20)];
        let b = vec![limit(800), equal("status", "active"), offset(0)];
        let c = vec![equal("status", "active")];
        assert_eq!(query_hash("db", "col", &a), query_hash("db", "col", &b));
        assert_eq!(query_hash("db", "col", &a), query_hash("db", "col", &c));
    }

    #[test]
    fn test_hash_is_order_sensitive() {
        let a = vec![equal("status", "active"), greater_than("age", 18)];
        let b = vec![greater_than("age", 18), equal("status", "active")];
        assert_ne!(query_hash("db", "col", &a), query_hash("db", "col", &b));
    }

    #[test]
    fn test_hash_different_content() {
        let a = vec![equal("status", "active")];
        let b = vec![equal("status", "archived")];
        assert_ne!(query_hash("db", "col", &a), query_hash("db", "col", &b));
    }

    #[test]
    fn test_hash_separates_ids() {
        // "ab" + "c" must not alias "a" + "bc".
        assert_ne!(query_hash("ab", "c", &[]), query_hash("a", "bc", &[]));
        assert_ne!(query_hash("db", "col", &[]), query_hash("db", "other", &[]));
    }

    #[test]
    fn test_list_and_count_keys_disjoint() {
        let filters = vec![equal("status", "active")];
        let list = list_key("db", "col", &filters);
        let count = count_key("db", "col", &filters);
        assert!(list.starts_with(LIST_PREFIX));
        assert!(count.starts_with(COUNT_PREFIX));
        assert_ne!(list, count);
        assert_eq!(list[LIST_PREFIX.len()..], count[COUNT_PREFIX.len()..]);
    }

    #[test]
    fn test_strip_pagination_keeps_order() {
        let filters = vec![equal("a", 1), limit(5), equal("b", 2), offset(5), "raw".to_string()];
        assert_eq!(strip_pagination(&filters), vec![equal("a", 1), equal("b", 2), "raw".to_string()]);
    }

    #[test]
    fn test_raw_filter_is_part_of_identity() {
        let raw = vec!["status=active".to_string()];
        assert_ne!(list_key("db", "col", &raw), list_key("db", "col", &[]));
    }
}
