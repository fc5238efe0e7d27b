//! Canonical serialization + SHA-256 digests.
//!
//! Every hash in the system is computed over output of this module.
//! Rules:
//!   - Caller supplies the top-level key order; listed keys come first,
//!     unlisted keys follow in their existing map order
//!   - Nested objects keep their own key order (callers construct them
//!     deterministically — serde struct field order)
//!   - Arrays preserve element order
//!   - UTF-8 JSON, no whitespace, lowercase hex digests

use sha2::{Digest, Sha256};
use serde_json::{Map, Value};

/// Canonical serialization of a JSON value with an explicit top-level
/// key order. Two logically identical values produce byte-identical
/// output regardless of construction order.
pub fn canonical_json(value: &Value, key_order: &[&str]) -> String {
    let canonical = match value {
        Value::Object(map) => {
            let mut ordered = Map::new();
            for key in key_order {
                if let Some(v) = map.get(*key) {
                    ordered.insert((*key).to_string(), v.clone());
                }
            }
            for (key, v) in map {
                if !key_order.contains(&key.as_str()) {
                    ordered.insert(key.clone(), v.clone());
                }
            }
            Value::Object(ordered)
        }
        other => other.clone(),
    };
    serde_json::to_string(&canonical)
        .expect("canonical_json: JSON serialization failed")
}

/// SHA-256 of a byte sequence. Lowercase hex string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Content hash of a stimulus word list: SHA-256 over the UTF-8 bytes of
/// the newline-joined words. Word order is significant — packs are ordered
/// documents, not sets.
pub fn hash_word_list<S: AsRef<str>>(words: &[S]) -> String {
    let joined = words
        .iter()
        .map(|w| w.as_ref())
        .collect::<Vec<_>>()
        .join("\n");
    sha256_hex(joined.as_bytes())
}
