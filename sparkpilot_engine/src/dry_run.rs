//! Dry-run engine: synthesises identifiers and simulates run progression by
//! wall time. Backs tests and local development.

use ::async_trait::async_trait;
use ::sparkpilot_common::{
    anyhow::anyhow,
    config::Settings,
    entity::{hex_suffix, utc_now, Environment, Job, Run},
    error::{Result, SparkPilotError},
    tracing::debug,
};

use super::{log_group, log_stream_prefix, EngineAdapter, EngineDispatch, EngineRunState};

pub struct DryRunEngine {
    settings: Settings,
}

impl DryRunEngine {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl EngineAdapter for DryRunEngine {
    async fn create_virtual_cluster(&self, environment: &Environment) -> Result<String> {
        if environment.eks_cluster_arn.is_none() {
            return Err(SparkPilotError::validation(anyhow!(
                "Missing EKS cluster ARN."
            )));
        }
        if environment.eks_namespace.is_none() {
            return Err(SparkPilotError::validation(anyhow!(
                "Missing EKS namespace."
            )));
        }
        Ok(format!("vc-{}", hex_suffix(10)))
    }

    async fn start_job_run(
        &self,
        environment: &Environment,
        _job: &Job,
        run: &Run,
    ) -> Result<EngineDispatch> {
        let log_group = log_group(&self.settings.log_group_prefix, &environment.id);
        let log_stream_prefix = log_stream_prefix(run);
        debug!("Dry-run dispatch for run {}", run.id);
        Ok(EngineDispatch {
            engine_run_id: format!("jr-{}", hex_suffix(12)),
            driver_log_uri: Some(format!(
                "cloudwatch://{}/{}/driver",
                log_group, log_stream_prefix
            )),
            spark_ui_uri: Some(format!("https://sparkhistory.local/{}", run.id)),
            upstream_request_id: None,
            log_group,
            log_stream_prefix,
        })
    }

    async fn describe_job_run(
        &self,
        _environment: &Environment,
        run: &Run,
    ) -> Result<(EngineRunState, Option<String>)> {
        if run.cancellation_requested {
            return Ok((EngineRunState::Cancelled, None));
        }
        let Some(started_at) = run.started_at else {
            return Ok((EngineRunState::Pending, None));
        };
        let elapsed = (utc_now() - started_at).whole_seconds();
        let state = if elapsed < 10 {
            EngineRunState::Submitted
        } else if elapsed < 40 {
            EngineRunState::Running
        } else {
            EngineRunState::Completed
        };
        Ok((state, None))
    }

    async fn cancel_job_run(
        &self,
        _environment: &Environment,
        _run: &Run,
    ) -> Result<Option<String>> {
        Ok(None)
    }

    async fn fetch_log_lines<'a>(
        &self,
        _role_arn: &str,
        _region: &str,
        log_group: Option<&'a str>,
        log_stream_prefix: Option<&'a str>,
        _limit: usize,
    ) -> Result<Vec<String>> {
        if log_group.is_none() {
            return Ok(vec![]);
        }
        let run_hint = log_stream_prefix.unwrap_or("unknown-run");
        Ok(vec![
            format!("[{}] Spark application started", run_hint),
            format!("[{}] Executors requested", run_hint),
            format!("[{}] Job completed successfully", run_hint),
        ])
    }
}
