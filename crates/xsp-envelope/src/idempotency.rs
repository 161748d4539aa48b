//! ---
//! xsp_section: "02-envelope-contract"
//! xsp_subsection: "module"
//! xsp_type: "source"
//! xsp_scope: "code"
//! xsp_description: "Envelope schema, factory, and validation contract."
//! xsp_version: "v0.1.0"
//! xsp_owner: "tbd"
//! ---
use std::collections::BTreeMap;

use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};

/// Content mapping hashed into an idempotency key.
///
/// A `BTreeMap` keeps top-level keys sorted, and `serde_json`'s default map
/// representation keeps nested object keys sorted too, so the serialized
/// form is canonical regardless of field-insertion order.
pub type ContentMap = BTreeMap<String, JsonValue>;

/// Length of a derived key in hex characters (128 bits).
pub const KEY_LENGTH: usize = 32;

/// Derive the deterministic idempotency key for a content mapping.
///
/// The key is a truncated SHA-256 digest of the canonical JSON encoding of
/// `content`. Timing fields that vary on retry (`createdAt`, processing
/// timestamps) must not be part of the mapping: a genuine retry of the same
/// content must reproduce the same key, or downstream deduplication stores
/// cannot recognize it.
///
/// Total function; never fails on a well-formed content mapping.
pub fn derive_key(content: &ContentMap) -> String {
    let canonical = serde_json::to_vec(content).expect("JSON value trees always serialize");
    let digest = Sha256::digest(&canonical);
    let mut key = hex::encode(digest);
    key.truncate(KEY_LENGTH);
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn content(pairs: &[(&str, JsonValue)]) -> ContentMap {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), value.clone()))
            .collect()
    }

    #[test]
    fn identical_content_yields_identical_keys() {
        let fields = content(&[
            ("deviceId", json!("dev-1")),
            ("capturedAt", json!("2024-01-01T00:00:00Z")),
            ("payload", json!("abc123")),
        ]);
        assert_eq!(derive_key(&fields), derive_key(&fields));
    }

    #[test]
    fn insertion_order_never_affects_the_key() {
        let forward = content(&[("a", json!(1)), ("b", json!(2)), ("c", json!(3))]);
        let reversed = content(&[("c", json!(3)), ("b", json!(2)), ("a", json!(1))]);
        assert_eq!(derive_key(&forward), derive_key(&reversed));
    }

    #[test]
    fn nested_objects_are_canonicalized_too() {
        let left = content(&[("meta", json!({ "x": 1, "y": 2 }))]);
        let right = content(&[("meta", json!({ "y": 2, "x": 1 }))]);
        assert_eq!(derive_key(&left), derive_key(&right));
    }

    #[test]
    fn different_content_yields_different_keys() {
        let one = content(&[("payload", json!("abc123"))]);
        let two = content(&[("payload", json!("abc124"))]);
        assert_ne!(derive_key(&one), derive_key(&two));
    }

    #[test]
    fn keys_are_fixed_length_hex() {
        let key = derive_key(&content(&[("payload", json!("abc123"))]));
        assert_eq!(key.len(), KEY_LENGTH);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
