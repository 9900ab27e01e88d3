//! EMR-on-EKS engine adapter.
//!
//! Every call assumes the customer-owned role in the environment's region
//! before touching the provider APIs; nothing is cached across calls.

use ::async_trait::async_trait;
use ::aws_config::sts::AssumeRoleProvider;
use ::aws_config::{BehaviorVersion, Region, SdkConfig};
use ::aws_sdk_cloudwatchlogs as cloudwatchlogs;
use ::aws_sdk_emrcontainers as emrcontainers;
use ::aws_sdk_emrcontainers::error::DisplayErrorContext;
use ::aws_sdk_emrcontainers::operation::RequestId;
use ::aws_sdk_emrcontainers::types::{
    CloudWatchMonitoringConfiguration, ConfigurationOverrides, ContainerInfo, ContainerProvider,
    ContainerProviderType, EksInfo, JobDriver, MonitoringConfiguration, RetryPolicyConfiguration,
    SparkSubmitJobDriver,
};
use ::sparkpilot_common::{
    anyhow::anyhow,
    config::Settings,
    entity::{hex_suffix, Environment, Job, Run},
    error::{Result, SparkPilotError},
    tracing::warn,
};

use super::{
    log_group, log_stream_prefix, merged_spark_conf, EngineAdapter, EngineDispatch, EngineRunState,
};

pub struct EmrEksEngine {
    settings: Settings,
}

impl EmrEksEngine {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    fn eks_cluster_name_from_arn(cluster_arn: &str) -> Result<&str> {
        cluster_arn
            .split_once("cluster/")
            .map(|(_, name)| name)
            .ok_or_else(|| SparkPilotError::validation(anyhow!("Invalid EKS cluster ARN.")))
    }

    fn virtual_cluster_id<'a>(environment: &'a Environment) -> Result<&'a str> {
        environment
            .engine_virtual_cluster_id
            .as_deref()
            .ok_or_else(|| {
                SparkPilotError::validation(anyhow!("Environment has no virtual cluster id."))
            })
    }

    /// SDK configuration with credentials assumed from the customer role.
    async fn customer_config(&self, role_arn: &str, region: &str) -> SdkConfig {
        let region = Region::new(region.to_owned());
        let provider = AssumeRoleProvider::builder(role_arn.to_owned())
            .region(region.clone())
            .session_name(format!("sparkpilot-{}", hex_suffix(8)))
            .build()
            .await;
        aws_config::defaults(BehaviorVersion::latest())
            .region(region)
            .credentials_provider(provider)
            .load()
            .await
    }

    async fn emr_client(&self, environment: &Environment) -> emrcontainers::Client {
        let config = self
            .customer_config(&environment.customer_role_arn, &environment.region)
            .await;
        emrcontainers::Client::new(&config)
    }

    fn spark_submit_parameters(job: &Job, run: &Run) -> String {
        merged_spark_conf(job, run)
            .iter()
            .map(|(key, value)| format!("--conf {}={}", key, value))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl EngineAdapter for EmrEksEngine {
    async fn create_virtual_cluster(&self, environment: &Environment) -> Result<String> {
        let cluster_arn = environment
            .eks_cluster_arn
            .as_deref()
            .ok_or_else(|| SparkPilotError::validation(anyhow!("Missing EKS cluster ARN.")))?;
        let namespace = environment
            .eks_namespace
            .as_deref()
            .ok_or_else(|| SparkPilotError::validation(anyhow!("Missing EKS namespace.")))?;
        let cluster_name = Self::eks_cluster_name_from_arn(cluster_arn)?;

        let container_provider = ContainerProvider::builder()
            .id(cluster_name)
            .r#type(ContainerProviderType::Eks)
            .info(ContainerInfo::EksInfo(
                EksInfo::builder().namespace(namespace).build(),
            ))
            .build()
            .map_err(SparkPilotError::upstream_transient)?;

        let client = self.emr_client(environment).await;
        let result = client
            .create_virtual_cluster()
            .name(format!("sparkpilot-{}", environment.short_id()))
            .container_provider(container_provider)
            .tags("sparkpilot:managed", "true")
            .send()
            .await
            .map_err(|error| {
                SparkPilotError::upstream_transient(anyhow!("{}", DisplayErrorContext(&error)))
            })?;
        result.id().map(str::to_owned).ok_or_else(|| {
            SparkPilotError::upstream_transient(anyhow!(
                "Virtual cluster creation returned no id."
            ))
        })
    }

    async fn start_job_run(
        &self,
        environment: &Environment,
        job: &Job,
        run: &Run,
    ) -> Result<EngineDispatch> {
        let virtual_cluster_id = Self::virtual_cluster_id(environment)?;
        let log_group = log_group(&self.settings.log_group_prefix, &environment.id);
        let log_stream_prefix = log_stream_prefix(run);

        let job_driver = JobDriver::builder()
            .spark_submit_job_driver(
                SparkSubmitJobDriver::builder()
                    .entry_point(&job.artifact_uri)
                    .set_entry_point_arguments(Some(run.args_overrides.clone()))
                    .spark_submit_parameters(Self::spark_submit_parameters(job, run))
                    .build()
                    .map_err(SparkPilotError::upstream_transient)?,
            )
            .build();
        let configuration_overrides = ConfigurationOverrides::builder()
            .monitoring_configuration(
                MonitoringConfiguration::builder()
                    .cloud_watch_monitoring_configuration(
                        CloudWatchMonitoringConfiguration::builder()
                            .log_group_name(&log_group)
                            .log_stream_name_prefix(&log_stream_prefix)
                            .build()
                            .map_err(SparkPilotError::upstream_transient)?,
                    )
                    .build(),
            )
            .build();
        let retry_policy = RetryPolicyConfiguration::builder()
            .max_attempts(job.retry_max_attempts as i32)
            .build()
            .map_err(SparkPilotError::upstream_transient)?;

        let client = self.emr_client(environment).await;
        let result = client
            .start_job_run()
            .virtual_cluster_id(virtual_cluster_id)
            .name(format!("{}-{}", job.name, run.id))
            .execution_role_arn(&self.settings.emr_execution_role_arn)
            .release_label(&self.settings.emr_release_label)
            .job_driver(job_driver)
            .configuration_overrides(configuration_overrides)
            .retry_policy_configuration(retry_policy)
            .send()
            .await
            .map_err(|error| {
                SparkPilotError::upstream_transient(anyhow!("{}", DisplayErrorContext(&error)))
            })?;

        let upstream_request_id = result.request_id().map(str::to_owned);
        let engine_run_id = result.id().map(str::to_owned).ok_or_else(|| {
            SparkPilotError::upstream_transient(anyhow!("Job run submission returned no id."))
        })?;
        Ok(EngineDispatch {
            engine_run_id,
            driver_log_uri: Some(format!(
                "cloudwatch://{}/{}/driver",
                log_group, log_stream_prefix
            )),
            spark_ui_uri: None,
            upstream_request_id,
            log_group,
            log_stream_prefix,
        })
    }

    async fn describe_job_run(
        &self,
        environment: &Environment,
        run: &Run,
    ) -> Result<(EngineRunState, Option<String>)> {
        if run.cancellation_requested && run.engine_run_id.is_none() {
            return Ok((EngineRunState::Cancelled, None));
        }
        let Some(engine_run_id) = run.engine_run_id.as_deref() else {
            return Ok((
                EngineRunState::Failed,
                Some("Missing engine run id.".to_owned()),
            ));
        };
        let virtual_cluster_id = Self::virtual_cluster_id(environment)?;
        let client = self.emr_client(environment).await;
        let result = client
            .describe_job_run()
            .virtual_cluster_id(virtual_cluster_id)
            .id(engine_run_id)
            .send()
            .await;
        match result {
            Ok(output) => {
                let job_run = output.job_run();
                let state = job_run
                    .and_then(|job_run| job_run.state())
                    .map(|state| EngineRunState::from_api(state.as_str()))
                    .unwrap_or(EngineRunState::Failed);
                let failure = job_run
                    .and_then(|job_run| job_run.failure_reason())
                    .map(|reason| reason.as_str().to_owned());
                Ok((state, failure))
            }
            // The engine rejecting the lookup is a definitive answer, not an
            // infrastructure failure: surface it as a failed run.
            Err(error) => Ok((
                EngineRunState::Failed,
                Some(DisplayErrorContext(&error).to_string()),
            )),
        }
    }

    async fn cancel_job_run(
        &self,
        environment: &Environment,
        run: &Run,
    ) -> Result<Option<String>> {
        let Some(engine_run_id) = run.engine_run_id.as_deref() else {
            return Ok(None);
        };
        let virtual_cluster_id = Self::virtual_cluster_id(environment)?;
        let client = self.emr_client(environment).await;
        let result = client
            .cancel_job_run()
            .virtual_cluster_id(virtual_cluster_id)
            .id(engine_run_id)
            .send()
            .await
            .map_err(|error| {
                SparkPilotError::upstream_transient(anyhow!("{}", DisplayErrorContext(&error)))
            })?;
        Ok(result.request_id().map(str::to_owned))
    }

    async fn fetch_log_lines<'a>(
        &self,
        role_arn: &str,
        region: &str,
        log_group: Option<&'a str>,
        log_stream_prefix: Option<&'a str>,
        limit: usize,
    ) -> Result<Vec<String>> {
        let Some(log_group) = log_group else {
            return Ok(vec![]);
        };
        let config = self.customer_config(role_arn, region).await;
        let client = cloudwatchlogs::Client::new(&config);
        let mut request = client
            .filter_log_events()
            .log_group_name(log_group)
            .limit(limit as i32);
        if let Some(prefix) = log_stream_prefix {
            request = request.log_stream_name_prefix(prefix);
        }
        match request.send().await {
            Ok(output) => Ok(output
                .events()
                .iter()
                .filter_map(|event| event.message().map(str::to_owned))
                .collect()),
            Err(error) => {
                if error
                    .as_service_error()
                    .is_some_and(|service_error| service_error.is_resource_not_found_exception())
                {
                    return Ok(vec![]);
                }
                warn!(
                    "CloudWatch log fetch failed for group={} prefix={:?} region={}: {}",
                    log_group,
                    log_stream_prefix,
                    region,
                    DisplayErrorContext(&error)
                );
                Err(SparkPilotError::upstream_transient(anyhow!(
                    "{}",
                    DisplayErrorContext(&error)
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_name_is_the_arn_suffix() {
        let name = EmrEksEngine::eks_cluster_name_from_arn(
            "arn:aws:eks:us-east-1:123456789012:cluster/data-platform",
        )
        .unwrap();
        assert_eq!(name, "data-platform");
    }

    #[test]
    fn malformed_cluster_arn_is_rejected() {
        let result = EmrEksEngine::eks_cluster_name_from_arn("arn:aws:eks:us-east-1:1:nodegroup/x");
        assert!(result.is_err_and(|e| e.to_string().contains("Invalid EKS cluster ARN.")));
    }

    #[test]
    fn spark_submit_parameters_join_merged_conf() {
        let environment = crate::tests::test_environment();
        let job = crate::tests::test_job(&environment);
        let run = Run::new(
            &job,
            &environment,
            &Default::default(),
            "k-1".to_owned(),
        );
        let parameters = EmrEksEngine::spark_submit_parameters(&job, &run);
        assert_eq!(
            parameters,
            "--conf spark.executor.memory=8g --conf spark.sql.shuffle.partitions=64"
        );
    }
}
