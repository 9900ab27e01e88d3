//! Per-request caller context read from headers.

use ::http::HeaderMap;
use ::sparkpilot_common::{anyhow::anyhow, error::SparkPilotError};

use crate::error::ApiError;

const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";
const ACTOR_HEADER: &str = "x-actor";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Actor and source address recorded in the audit trail.
pub(crate) struct RequestContext {
    pub actor: String,
    pub source_ip: Option<String>,
}

impl RequestContext {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Self {
        let actor = headers
            .get(ACTOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .unwrap_or("anonymous")
            .to_owned();
        let source_ip = headers
            .get(FORWARDED_FOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        Self { actor, source_ip }
    }
}

pub(crate) fn require_idempotency_key(headers: &HeaderMap) -> Result<String, ApiError> {
    let key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    if key.is_empty() {
        return Err(SparkPilotError::missing_idempotency_key(anyhow!(
            "Idempotency-Key header is required."
        ))
        .into());
    }
    if key.len() > 255 {
        return Err(SparkPilotError::missing_idempotency_key(anyhow!(
            "Idempotency-Key header must be at most 255 bytes."
        ))
        .into());
    }
    Ok(key.to_owned())
}

#[cfg(test)]
mod tests {
    use ::http::HeaderValue;

    use super::*;

    #[test]
    fn actor_defaults_to_anonymous() {
        let context = RequestContext::from_headers(&HeaderMap::new());
        assert_eq!(context.actor, "anonymous");
        assert_eq!(context.source_ip, None);
    }

    #[test]
    fn forwarded_for_takes_the_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_HEADER, HeaderValue::from_static("test-user"));
        headers.insert(
            FORWARDED_FOR_HEADER,
            HeaderValue::from_static("10.1.2.3, 172.16.0.1"),
        );
        let context = RequestContext::from_headers(&headers);
        assert_eq!(context.actor, "test-user");
        assert_eq!(context.source_ip.as_deref(), Some("10.1.2.3"));
    }

    #[test]
    fn missing_key_is_rejected() {
        let result = require_idempotency_key(&HeaderMap::new());
        assert!(result.is_err());
    }

    #[test]
    fn oversized_key_is_rejected() {
        let mut headers = HeaderMap::new();
        let long = "k".repeat(256);
        headers.insert(
            IDEMPOTENCY_KEY_HEADER,
            HeaderValue::from_str(&long).unwrap(),
        );
        assert!(require_idempotency_key(&headers).is_err());
    }

    #[test]
    fn key_is_returned_verbatim() {
        let mut headers = HeaderMap::new();
        headers.insert(IDEMPOTENCY_KEY_HEADER, HeaderValue::from_static("K1"));
        assert_eq!(require_idempotency_key(&headers).unwrap(), "K1");
    }
}
