//! Execution environments and the request that creates them.

use ::core::fmt::Display;

use ::anyhow::anyhow;
use ::serde::{Deserialize, Serialize};
use ::time::OffsetDateTime;

use crate::error::{Result, SparkPilotError};

use super::{new_id, utc_now};

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningMode {
    Full,
    ByocLite,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentStatus {
    Provisioning,
    Ready,
    Degraded,
    Upgrading,
    Deleting,
    Deleted,
    Failed,
}

impl Display for EnvironmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EnvironmentStatus::Provisioning => "provisioning",
            EnvironmentStatus::Ready => "ready",
            EnvironmentStatus::Degraded => "degraded",
            EnvironmentStatus::Upgrading => "upgrading",
            EnvironmentStatus::Deleting => "deleting",
            EnvironmentStatus::Deleted => "deleted",
            EnvironmentStatus::Failed => "failed",
        };
        write!(f, "{}", label)
    }
}

/// Resource caps enforced at run admission.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentQuotas {
    #[serde(default = "default_max_concurrent_runs")]
    pub max_concurrent_runs: u32,
    #[serde(default = "default_max_vcpu")]
    pub max_vcpu: u64,
    #[serde(default = "default_max_run_seconds")]
    pub max_run_seconds: u64,
}

fn default_max_concurrent_runs() -> u32 {
    10
}

fn default_max_vcpu() -> u64 {
    256
}

fn default_max_run_seconds() -> u64 {
    7200
}

impl Default for EnvironmentQuotas {
    fn default() -> Self {
        Self {
            max_concurrent_runs: default_max_concurrent_runs(),
            max_vcpu: default_max_vcpu(),
            max_run_seconds: default_max_run_seconds(),
        }
    }
}

impl EnvironmentQuotas {
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_runs < 1 || self.max_concurrent_runs > 1000 {
            return Err(SparkPilotError::validation(anyhow!(
                "max_concurrent_runs must be between 1 and 1000."
            )));
        }
        if self.max_vcpu < 1 || self.max_vcpu > 20000 {
            return Err(SparkPilotError::validation(anyhow!(
                "max_vcpu must be between 1 and 20000."
            )));
        }
        if self.max_run_seconds < 60 || self.max_run_seconds > 172_800 {
            return Err(SparkPilotError::validation(anyhow!(
                "max_run_seconds must be between 60 and 172800."
            )));
        }
        Ok(())
    }
}

/// Execution context owned by one tenant: region, customer role, cluster
/// binding and quotas.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Environment {
    pub id: String,
    pub tenant_id: String,
    pub cloud: String,
    pub region: String,
    pub engine: String,
    pub provisioning_mode: ProvisioningMode,
    pub status: EnvironmentStatus,
    pub customer_role_arn: String,
    pub eks_cluster_arn: Option<String>,
    pub eks_namespace: Option<String>,
    /// Engine-side handle; non-empty iff `status` is `ready`.
    pub engine_virtual_cluster_id: Option<String>,
    pub warm_pool_enabled: bool,
    pub max_concurrent_runs: u32,
    pub max_vcpu: u64,
    pub max_run_seconds: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Environment {
    pub fn touch(&mut self) {
        self.updated_at = utc_now();
    }

    /// Short id slug used in synthesized provider identifiers.
    pub fn short_id(&self) -> &str {
        &self.id[..8.min(self.id.len())]
    }
}

/// Request body to create an environment.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CreateEnvironmentRequest {
    pub tenant_id: String,
    #[serde(default = "default_provisioning_mode")]
    pub provisioning_mode: ProvisioningMode,
    #[serde(default = "default_region")]
    pub region: String,
    pub customer_role_arn: String,
    #[serde(default)]
    pub eks_cluster_arn: Option<String>,
    #[serde(default)]
    pub eks_namespace: Option<String>,
    #[serde(default)]
    pub warm_pool_enabled: bool,
    #[serde(default)]
    pub quotas: EnvironmentQuotas,
}

fn default_provisioning_mode() -> ProvisioningMode {
    ProvisioningMode::Full
}

fn default_region() -> String {
    "us-east-1".to_owned()
}

impl CreateEnvironmentRequest {
    pub fn validate(&self) -> Result<()> {
        if self.provisioning_mode == ProvisioningMode::ByocLite {
            if self.eks_cluster_arn.as_deref().unwrap_or("").is_empty() {
                return Err(SparkPilotError::validation(anyhow!(
                    "eks_cluster_arn is required for byoc_lite."
                )));
            }
            if self.eks_namespace.as_deref().unwrap_or("").is_empty() {
                return Err(SparkPilotError::validation(anyhow!(
                    "eks_namespace is required for byoc_lite."
                )));
            }
        }
        if let Some(namespace) = &self.eks_namespace {
            if namespace.len() > 255 {
                return Err(SparkPilotError::validation(anyhow!(
                    "eks_namespace must be at most 255 characters."
                )));
            }
        }
        self.quotas.validate()
    }
}

impl TryFrom<CreateEnvironmentRequest> for Environment {
    type Error = SparkPilotError;

    fn try_from(value: CreateEnvironmentRequest) -> Result<Self> {
        value.validate()?;
        let now = utc_now();
        Ok(Environment {
            id: new_id(),
            tenant_id: value.tenant_id,
            cloud: "aws".to_owned(),
            region: value.region,
            engine: "emr_on_eks".to_owned(),
            provisioning_mode: value.provisioning_mode,
            status: EnvironmentStatus::Provisioning,
            customer_role_arn: value.customer_role_arn,
            eks_cluster_arn: value.eks_cluster_arn,
            eks_namespace: value.eks_namespace,
            engine_virtual_cluster_id: None,
            warm_pool_enabled: value.warm_pool_enabled,
            max_concurrent_runs: value.quotas.max_concurrent_runs,
            max_vcpu: value.quotas.max_vcpu,
            max_run_seconds: value.quotas.max_run_seconds,
            created_at: now,
            updated_at: now,
        })
    }
}
