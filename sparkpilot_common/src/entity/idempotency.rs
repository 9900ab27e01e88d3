//! Idempotency records and the canonical request fingerprint.

use ::core::fmt::Write;

use ::serde::{Deserialize, Serialize};
use ::serde_json::Value;
use ::sha2::{Digest, Sha256};
use ::time::OffsetDateTime;

use super::{new_id, utc_now};

/// Stored outcome of one mutating request, keyed by `(scope, key)`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct IdempotencyRecord {
    pub id: String,
    /// Operation the key applies to, e.g. `POST:/v1/tenants`.
    pub scope: String,
    pub key: String,
    pub fingerprint: String,
    pub response: Value,
    pub status_code: u16,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl IdempotencyRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scope: String,
        key: String,
        fingerprint: String,
        response: Value,
        status_code: u16,
        resource_type: Option<String>,
        resource_id: Option<String>,
    ) -> Self {
        Self {
            id: new_id(),
            scope,
            key,
            fingerprint,
            response,
            status_code,
            resource_type,
            resource_id,
            created_at: utc_now(),
        }
    }
}

/// SHA-256 over the canonical JSON encoding of a request payload.
///
/// `serde_json::Value` keeps object keys in a sorted map, so serializing a
/// re-parsed payload yields keys in lexicographic order with compact
/// separators; payloads that differ only in key order or whitespace
/// fingerprint identically.
pub fn payload_fingerprint(payload: &Value) -> String {
    let canonical = payload.to_string();
    let digest = Sha256::digest(canonical.as_bytes());
    digest.iter().fold(String::new(), |mut out, byte| {
        let _ = write!(out, "{:02x}", byte);
        out
    })
}

#[cfg(test)]
mod tests {
    use ::serde_json::json;

    use super::*;

    #[test]
    fn fingerprint_is_order_insensitive() {
        let a: Value = serde_json::from_str(r#"{"b": 1, "a": {"y": 2, "x": 3}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a": {"x": 3, "y": 2}, "b": 1}"#).unwrap();
        assert_eq!(payload_fingerprint(&a), payload_fingerprint(&b));
    }

    #[test]
    fn fingerprint_is_whitespace_insensitive() {
        let a: Value = serde_json::from_str(r#"{ "name" :  "Acme" }"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"name":"Acme"}"#).unwrap();
        assert_eq!(payload_fingerprint(&a), payload_fingerprint(&b));
    }

    #[test]
    fn different_payloads_differ() {
        assert_ne!(
            payload_fingerprint(&json!({"name": "A"})),
            payload_fingerprint(&json!({"name": "B"}))
        );
    }

    #[test]
    fn fingerprint_is_lowercase_hex() {
        let fingerprint = payload_fingerprint(&json!({"name": "Acme"}));
        assert_eq!(fingerprint.len(), 64);
        assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
