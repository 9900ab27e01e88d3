//! Usage recorder: vCPU-seconds, memory-GB-seconds and estimated cost for a
//! terminal run. Idempotent per run id.

use ::sparkpilot_common::{
    entity::{Environment, Run, UsageRecord},
    error::Result,
    store::Store,
    tracing::debug,
};

/// Placeholder rate card in micros (1 USD = 1_000_000 micros).
const VCPU_SECOND_USD_MICROS: u64 = 35;
const MEMORY_GB_SECOND_USD_MICROS: u64 = 4;

fn usage_amounts(run: &Run) -> (u64, u64, u64) {
    let duration_seconds = match (run.started_at, run.ended_at) {
        (Some(started_at), Some(ended_at)) => (ended_at - started_at).whole_seconds().max(0) as u64,
        _ => 0,
    };
    let resources = &run.requested_resources;
    let vcpu_seconds = duration_seconds * resources.total_vcpu();
    let memory_gb_seconds = duration_seconds * resources.total_memory_gb();
    let estimated_cost_usd_micros =
        vcpu_seconds * VCPU_SECOND_USD_MICROS + memory_gb_seconds * MEMORY_GB_SECOND_USD_MICROS;
    (vcpu_seconds, memory_gb_seconds, estimated_cost_usd_micros)
}

/// Write the usage record for a terminal run, unless one already exists.
pub async fn record_usage_if_needed<S: Store>(
    store: &S,
    run: &Run,
    environment: &Environment,
) -> Result<()> {
    let (vcpu_seconds, memory_gb_seconds, estimated_cost_usd_micros) = usage_amounts(run);
    let inserted = store
        .insert_usage_if_absent(UsageRecord::new(
            environment.tenant_id.clone(),
            run.id.clone(),
            vcpu_seconds,
            memory_gb_seconds,
            estimated_cost_usd_micros,
        ))
        .await?;
    if !inserted {
        debug!("Usage already recorded for run {}", run.id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ::sparkpilot_common::entity::{
        utc_now, CreateEnvironmentRequest, CreateJobRequest, CreateRunRequest, EnvironmentQuotas,
        ProvisioningMode,
    };
    use ::sparkpilot_common::time::Duration;

    use super::*;

    fn terminal_run(duration_seconds: i64) -> Run {
        let environment = Environment::try_from(CreateEnvironmentRequest {
            tenant_id: "t-1".to_owned(),
            provisioning_mode: ProvisioningMode::Full,
            region: "us-east-1".to_owned(),
            customer_role_arn: "arn:aws:iam::123456789012:role/Pilot".to_owned(),
            eks_cluster_arn: None,
            eks_namespace: None,
            warm_pool_enabled: false,
            quotas: EnvironmentQuotas::default(),
        })
        .unwrap();
        let job = sparkpilot_common::entity::Job::from(CreateJobRequest {
            environment_id: environment.id.clone(),
            name: "daily".to_owned(),
            artifact_uri: "s3://bucket/daily.jar".to_owned(),
            artifact_digest: "sha256:abc123".to_owned(),
            entrypoint: "com.acme.Daily".to_owned(),
            args: vec![],
            spark_conf: Default::default(),
            retry_max_attempts: 1,
            timeout_seconds: 7200,
        });
        let mut run = Run::new(
            &job,
            &environment,
            &CreateRunRequest::default(),
            "k-1".to_owned(),
        );
        let ended = utc_now();
        run.ended_at = Some(ended);
        run.started_at = Some(ended - Duration::seconds(duration_seconds));
        run
    }

    #[test]
    fn amounts_scale_with_duration_and_resources() {
        // default resources: 5 total vCPU, 20 total memory GB
        let run = terminal_run(300);
        let (vcpu_seconds, memory_gb_seconds, cost) = usage_amounts(&run);
        assert_eq!(vcpu_seconds, 1500);
        assert_eq!(memory_gb_seconds, 6000);
        assert_eq!(cost, 1500 * 35 + 6000 * 4);
    }

    #[test]
    fn missing_timestamps_mean_zero_usage() {
        let mut run = terminal_run(300);
        run.started_at = None;
        assert_eq!(usage_amounts(&run), (0, 0, 0));
    }

    #[test]
    fn negative_duration_clamps_to_zero() {
        let run = terminal_run(-60);
        assert_eq!(usage_amounts(&run), (0, 0, 0));
    }
}
