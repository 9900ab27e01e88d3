//! Runs: the unit of scheduling, quota accounting and billing.

use ::core::fmt::Display;

use ::anyhow::anyhow;
use ::serde::{Deserialize, Serialize};
use ::time::OffsetDateTime;

use crate::error::{Result, SparkPilotError};

use super::{new_id, utc_now, Environment, Job, SparkConf};

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Queued,
    Dispatching,
    Accepted,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    TimedOut,
}

impl RunState {
    /// States that count against the environment quotas.
    pub const ACTIVE: [RunState; 4] = [
        RunState::Queued,
        RunState::Dispatching,
        RunState::Accepted,
        RunState::Running,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Succeeded | RunState::Failed | RunState::Cancelled | RunState::TimedOut
        )
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }
}

impl Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RunState::Queued => "queued",
            RunState::Dispatching => "dispatching",
            RunState::Accepted => "accepted",
            RunState::Running => "running",
            RunState::Succeeded => "succeeded",
            RunState::Failed => "failed",
            RunState::Cancelled => "cancelled",
            RunState::TimedOut => "timed_out",
        };
        write!(f, "{}", label)
    }
}

/// Driver and executor sizing requested for one run.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RequestedResources {
    #[serde(default = "default_driver_vcpu")]
    pub driver_vcpu: u64,
    #[serde(default = "default_driver_memory_gb")]
    pub driver_memory_gb: u64,
    #[serde(default = "default_executor_vcpu")]
    pub executor_vcpu: u64,
    #[serde(default = "default_executor_memory_gb")]
    pub executor_memory_gb: u64,
    #[serde(default = "default_executor_instances")]
    pub executor_instances: u64,
}

fn default_driver_vcpu() -> u64 {
    1
}

fn default_driver_memory_gb() -> u64 {
    4
}

fn default_executor_vcpu() -> u64 {
    2
}

fn default_executor_memory_gb() -> u64 {
    8
}

fn default_executor_instances() -> u64 {
    2
}

impl Default for RequestedResources {
    fn default() -> Self {
        Self {
            driver_vcpu: default_driver_vcpu(),
            driver_memory_gb: default_driver_memory_gb(),
            executor_vcpu: default_executor_vcpu(),
            executor_memory_gb: default_executor_memory_gb(),
            executor_instances: default_executor_instances(),
        }
    }
}

impl RequestedResources {
    pub fn total_vcpu(&self) -> u64 {
        self.driver_vcpu + self.executor_vcpu * self.executor_instances
    }

    pub fn total_memory_gb(&self) -> u64 {
        self.driver_memory_gb + self.executor_memory_gb * self.executor_instances
    }

    pub fn validate(&self) -> Result<()> {
        if self.driver_vcpu < 1 || self.driver_vcpu > 64 {
            return Err(SparkPilotError::validation(anyhow!(
                "driver_vcpu must be between 1 and 64."
            )));
        }
        if self.executor_vcpu < 1 || self.executor_vcpu > 64 {
            return Err(SparkPilotError::validation(anyhow!(
                "executor_vcpu must be between 1 and 64."
            )));
        }
        if self.driver_memory_gb < 1 || self.driver_memory_gb > 512 {
            return Err(SparkPilotError::validation(anyhow!(
                "driver_memory_gb must be between 1 and 512."
            )));
        }
        if self.executor_memory_gb < 1 || self.executor_memory_gb > 512 {
            return Err(SparkPilotError::validation(anyhow!(
                "executor_memory_gb must be between 1 and 512."
            )));
        }
        if self.executor_instances > 1000 {
            return Err(SparkPilotError::validation(anyhow!(
                "executor_instances must be at most 1000."
            )));
        }
        Ok(())
    }
}

/// One attempt to execute a [Job].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Run {
    pub id: String,
    pub job_id: String,
    pub environment_id: String,
    pub state: RunState,
    pub attempt: u32,
    /// Unique per `job_id`.
    pub idempotency_key: String,
    pub requested_resources: RequestedResources,
    pub args_overrides: Vec<String>,
    pub spark_conf_overrides: SparkConf,
    pub timeout_seconds: u64,
    pub engine_run_id: Option<String>,
    pub cancellation_requested: bool,
    pub log_group: Option<String>,
    pub log_stream_prefix: Option<String>,
    pub driver_log_uri: Option<String>,
    pub spark_ui_uri: Option<String>,
    pub error_message: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub ended_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Run {
    /// Build a queued run from a request. The caller has already checked the
    /// environment status and quotas; `timeout_seconds` falls back to the job
    /// default and the args overrides fall back to the job args.
    pub fn new(
        job: &Job,
        environment: &Environment,
        request: &CreateRunRequest,
        idempotency_key: String,
    ) -> Self {
        let now = utc_now();
        Self {
            id: new_id(),
            job_id: job.id.clone(),
            environment_id: environment.id.clone(),
            state: RunState::Queued,
            attempt: 1,
            idempotency_key,
            requested_resources: request.requested_resources.clone(),
            args_overrides: request.args.clone().unwrap_or_else(|| job.args.clone()),
            spark_conf_overrides: request.spark_conf.clone().unwrap_or_default(),
            timeout_seconds: request.timeout_seconds.unwrap_or(job.timeout_seconds),
            engine_run_id: None,
            cancellation_requested: false,
            log_group: None,
            log_stream_prefix: None,
            driver_log_uri: None,
            spark_ui_uri: None,
            error_message: None,
            started_at: None,
            ended_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = utc_now();
    }
}

/// Request body to submit a run against a job.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CreateRunRequest {
    #[serde(default)]
    pub args: Option<Vec<String>>,
    #[serde(default)]
    pub spark_conf: Option<SparkConf>,
    #[serde(default)]
    pub requested_resources: RequestedResources,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl CreateRunRequest {
    pub fn validate(&self) -> Result<()> {
        self.requested_resources.validate()?;
        if let Some(timeout) = self.timeout_seconds {
            if !(60..=172_800).contains(&timeout) {
                return Err(SparkPilotError::validation(anyhow!(
                    "timeout_seconds must be between 60 and 172800."
                )));
            }
        }
        Ok(())
    }
}

/// Bounded log snapshot for one run.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct LogsResponse {
    pub run_id: String,
    pub log_group: Option<String>,
    pub log_stream_prefix: Option<String>,
    pub lines: Vec<String>,
}
