//! Abstract interface to the Spark execution engine, with a dry-run and an
//! EMR-on-EKS implementation. The control plane depends only on
//! [EngineAdapter].

pub mod dry_run;
pub mod emr_eks;

use ::core::fmt::Display;

use ::async_trait::async_trait;
use ::sparkpilot_common::{
    entity::{Environment, Job, Run, SparkConf},
    error::Result,
};

/// Engine-side lifecycle states of a job run, as reported on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineRunState {
    Pending,
    Submitted,
    Running,
    Completed,
    Failed,
    Cancelled,
    CancelPending,
    /// Anything outside the documented set; carries the raw value.
    Unknown(String),
}

impl EngineRunState {
    pub fn from_api(value: &str) -> Self {
        match value {
            "PENDING" => EngineRunState::Pending,
            "SUBMITTED" => EngineRunState::Submitted,
            "RUNNING" => EngineRunState::Running,
            "COMPLETED" => EngineRunState::Completed,
            "FAILED" => EngineRunState::Failed,
            "CANCELLED" => EngineRunState::Cancelled,
            "CANCEL_PENDING" => EngineRunState::CancelPending,
            other => EngineRunState::Unknown(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EngineRunState::Pending => "PENDING",
            EngineRunState::Submitted => "SUBMITTED",
            EngineRunState::Running => "RUNNING",
            EngineRunState::Completed => "COMPLETED",
            EngineRunState::Failed => "FAILED",
            EngineRunState::Cancelled => "CANCELLED",
            EngineRunState::CancelPending => "CANCEL_PENDING",
            EngineRunState::Unknown(value) => value,
        }
    }
}

impl Display for EngineRunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a successful dispatch to the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineDispatch {
    pub engine_run_id: String,
    pub log_group: String,
    pub log_stream_prefix: String,
    pub driver_log_uri: Option<String>,
    pub spark_ui_uri: Option<String>,
    pub upstream_request_id: Option<String>,
}

/// Log group an environment's runs write to.
pub fn log_group(prefix: &str, environment_id: &str) -> String {
    format!("{}/{}", prefix, environment_id)
}

/// Stream prefix of one run attempt inside its environment's log group.
pub fn log_stream_prefix(run: &Run) -> String {
    format!("{}/attempt-{}", run.id, run.attempt)
}

/// Job-level spark conf overlaid with the run's overrides.
pub fn merged_spark_conf(job: &Job, run: &Run) -> SparkConf {
    let mut merged = job.spark_conf.clone();
    merged.extend(
        run.spark_conf_overrides
            .iter()
            .map(|(key, value)| (key.clone(), value.clone())),
    );
    merged
}

/// Capability set the core consumes, polymorphic over the cloud backend.
#[async_trait]
pub trait EngineAdapter: Send + Sync + 'static {
    /// Register a virtual cluster for the environment and return its id.
    /// Invoked at most once per environment in the happy path; repeat-call
    /// idempotency is the adapter's responsibility.
    async fn create_virtual_cluster(&self, environment: &Environment) -> Result<String>;

    /// Submit one run attempt to the engine.
    async fn start_job_run(
        &self,
        environment: &Environment,
        job: &Job,
        run: &Run,
    ) -> Result<EngineDispatch>;

    /// Engine state of the run plus an optional failure reason.
    async fn describe_job_run(
        &self,
        environment: &Environment,
        run: &Run,
    ) -> Result<(EngineRunState, Option<String>)>;

    /// Request cancellation; no-op without a remote id. Returns the upstream
    /// request id when the engine produced one.
    async fn cancel_job_run(&self, environment: &Environment, run: &Run)
        -> Result<Option<String>>;

    /// Bounded snapshot of log lines. Returns an empty list when no log
    /// group exists yet or the backend reports a benign "not found".
    async fn fetch_log_lines<'a>(
        &self,
        role_arn: &str,
        region: &str,
        log_group: Option<&'a str>,
        log_stream_prefix: Option<&'a str>,
        limit: usize,
    ) -> Result<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use ::sparkpilot_common::entity::{
        CreateEnvironmentRequest, CreateJobRequest, CreateRunRequest, EnvironmentQuotas,
        ProvisioningMode,
    };

    use super::*;

    pub(crate) fn test_environment() -> Environment {
        Environment::try_from(CreateEnvironmentRequest {
            tenant_id: "t-1".to_owned(),
            provisioning_mode: ProvisioningMode::Full,
            region: "us-east-1".to_owned(),
            customer_role_arn: "arn:aws:iam::123456789012:role/Pilot".to_owned(),
            eks_cluster_arn: None,
            eks_namespace: None,
            warm_pool_enabled: false,
            quotas: EnvironmentQuotas::default(),
        })
        .unwrap()
    }

    pub(crate) fn test_job(environment: &Environment) -> Job {
        Job::from(CreateJobRequest {
            environment_id: environment.id.clone(),
            name: "daily".to_owned(),
            artifact_uri: "s3://bucket/daily.jar".to_owned(),
            artifact_digest: "sha256:abc123".to_owned(),
            entrypoint: "com.acme.Daily".to_owned(),
            args: vec!["--date".to_owned(), "2026-02-17".to_owned()],
            spark_conf: [
                ("spark.executor.memory".to_owned(), "8g".to_owned()),
                ("spark.sql.shuffle.partitions".to_owned(), "64".to_owned()),
            ]
            .into_iter()
            .collect(),
            retry_max_attempts: 2,
            timeout_seconds: 1800,
        })
    }

    #[test]
    fn engine_state_from_api_roundtrip() {
        for value in [
            "PENDING",
            "SUBMITTED",
            "RUNNING",
            "COMPLETED",
            "FAILED",
            "CANCELLED",
            "CANCEL_PENDING",
        ] {
            assert_eq!(EngineRunState::from_api(value).as_str(), value);
        }
        assert_eq!(
            EngineRunState::from_api("THROTTLED"),
            EngineRunState::Unknown("THROTTLED".to_owned())
        );
    }

    #[test]
    fn run_overrides_win_in_merged_conf() {
        let environment = test_environment();
        let job = test_job(&environment);
        let mut run = Run::new(
            &job,
            &environment,
            &CreateRunRequest::default(),
            "k-1".to_owned(),
        );
        run.spark_conf_overrides
            .insert("spark.executor.memory".to_owned(), "16g".to_owned());

        let merged = merged_spark_conf(&job, &run);
        assert_eq!(merged.get("spark.executor.memory").map(String::as_str), Some("16g"));
        assert_eq!(
            merged.get("spark.sql.shuffle.partitions").map(String::as_str),
            Some("64")
        );
    }

    #[test]
    fn log_identifiers_follow_the_layout() {
        let environment = test_environment();
        let job = test_job(&environment);
        let run = Run::new(
            &job,
            &environment,
            &CreateRunRequest::default(),
            "k-1".to_owned(),
        );
        assert_eq!(
            log_group("/sparkpilot/runs", &environment.id),
            format!("/sparkpilot/runs/{}", environment.id)
        );
        assert_eq!(log_stream_prefix(&run), format!("{}/attempt-1", run.id));
    }
}
