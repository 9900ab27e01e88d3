use ::anyhow::anyhow;
use ::serde::{Deserialize, Serialize};
use ::time::OffsetDateTime;

use crate::error::{Result, SparkPilotError};

use super::{new_id, utc_now};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Tenant {
    pub fn new(name: String) -> Self {
        let now = utc_now();
        Self {
            id: new_id(),
            name,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Request body to register a tenant.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CreateTenantRequest {
    pub name: String,
}

impl CreateTenantRequest {
    pub fn validate(&self) -> Result<()> {
        if self.name.len() < 3 || self.name.len() > 255 {
            return Err(SparkPilotError::validation(anyhow!(
                "Tenant name must be between 3 and 255 characters."
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_name_too_short() {
        let request = CreateTenantRequest {
            name: "ab".to_owned(),
        };
        assert!(request.validate().is_err_and(|e| e
            .to_string()
            .starts_with("Invalid request: Tenant name must be between")));
    }

    #[test]
    fn tenant_name_in_bounds() {
        let request = CreateTenantRequest {
            name: "Acme Data".to_owned(),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn deny_unknown_fields() {
        let result: std::result::Result<CreateTenantRequest, _> =
            serde_json::from_value(serde_json::json!({"name": "Acme", "other": 1}));
        assert!(result.is_err());
    }
}
