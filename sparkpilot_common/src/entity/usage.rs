use ::serde::{Deserialize, Serialize};
use ::time::OffsetDateTime;

use super::{new_id, utc_now};

/// Billing record, exactly one per terminal run.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct UsageRecord {
    pub id: String,
    pub tenant_id: String,
    pub run_id: String,
    pub vcpu_seconds: u64,
    pub memory_gb_seconds: u64,
    pub estimated_cost_usd_micros: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}

impl UsageRecord {
    pub fn new(
        tenant_id: String,
        run_id: String,
        vcpu_seconds: u64,
        memory_gb_seconds: u64,
        estimated_cost_usd_micros: u64,
    ) -> Self {
        Self {
            id: new_id(),
            tenant_id,
            run_id,
            vcpu_seconds,
            memory_gb_seconds,
            estimated_cost_usd_micros,
            recorded_at: utc_now(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct UsageItem {
    pub run_id: String,
    pub vcpu_seconds: u64,
    pub memory_gb_seconds: u64,
    pub estimated_cost_usd_micros: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}

impl From<UsageRecord> for UsageItem {
    fn from(value: UsageRecord) -> Self {
        Self {
            run_id: value.run_id,
            vcpu_seconds: value.vcpu_seconds,
            memory_gb_seconds: value.memory_gb_seconds,
            estimated_cost_usd_micros: value.estimated_cost_usd_micros,
            recorded_at: value.recorded_at,
        }
    }
}

/// Usage window reported back to the caller, bounds inclusive.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct UsageResponse {
    pub tenant_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub from_ts: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub to_ts: OffsetDateTime,
    pub items: Vec<UsageItem>,
}
