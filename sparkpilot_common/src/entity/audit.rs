use ::serde::{Deserialize, Serialize};
use ::serde_json::Value;
use ::time::OffsetDateTime;

use super::{new_id, utc_now};

/// Append-only record of one state-changing action.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct AuditEvent {
    pub id: String,
    pub tenant_id: Option<String>,
    pub actor: String,
    /// Dotted verb, e.g. `run.cancel.request`.
    pub action: String,
    pub source_ip: Option<String>,
    pub entity_type: String,
    pub entity_id: String,
    pub details: Value,
    pub upstream_request_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl AuditEvent {
    pub fn new(actor: &str, action: &str, entity_type: &str, entity_id: &str) -> Self {
        Self {
            id: new_id(),
            tenant_id: None,
            actor: actor.to_owned(),
            action: action.to_owned(),
            source_ip: None,
            entity_type: entity_type.to_owned(),
            entity_id: entity_id.to_owned(),
            details: Value::Object(serde_json::Map::new()),
            upstream_request_id: None,
            created_at: utc_now(),
        }
    }

    pub fn tenant(mut self, tenant_id: &str) -> Self {
        self.tenant_id = Some(tenant_id.to_owned());
        self
    }

    pub fn source_ip(mut self, source_ip: Option<String>) -> Self {
        self.source_ip = source_ip;
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn upstream_request_id(mut self, upstream_request_id: Option<String>) -> Self {
        self.upstream_request_id = upstream_request_id;
        self
    }
}

#[cfg(test)]
mod tests {
    use ::serde_json::json;

    use super::*;

    #[test]
    fn builder_fills_optional_fields() {
        let event = AuditEvent::new("test-user", "tenant.create", "tenant", "t-1")
            .tenant("t-1")
            .source_ip(Some("10.0.0.1".to_owned()))
            .details(json!({"name": "Acme"}));
        assert_eq!(event.tenant_id.as_deref(), Some("t-1"));
        assert_eq!(event.source_ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(event.details, json!({"name": "Acme"}));
        assert_eq!(event.upstream_request_id, None);
    }
}
