//! Entities persisted by the control plane, with their request types.

use ::std::collections::BTreeMap;

use ::time::OffsetDateTime;
use ::uuid::Uuid;

mod audit;
mod environment;
mod idempotency;
mod job;
mod provisioning;
mod run;
mod tenant;
mod usage;

pub use audit::AuditEvent;
pub use environment::{
    CreateEnvironmentRequest, Environment, EnvironmentQuotas, EnvironmentStatus, ProvisioningMode,
};
pub use idempotency::{payload_fingerprint, IdempotencyRecord};
pub use job::{CreateJobRequest, Job};
pub use provisioning::{ProvisioningOperation, ProvisioningState};
pub use run::{CreateRunRequest, LogsResponse, RequestedResources, Run, RunState};
pub use tenant::{CreateTenantRequest, Tenant};
pub use usage::{UsageItem, UsageRecord, UsageResponse};

/// Spark configuration, ordered for deterministic serialization.
pub type SparkConf = BTreeMap<String, String>;

/// Generate an opaque entity identifier.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a short hex suffix for synthesized provider identifiers.
pub fn hex_suffix(len: usize) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..len.min(hex.len())].to_owned()
}

pub fn utc_now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}
