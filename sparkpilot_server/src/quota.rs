//! Admission control: pre-flight checks before a run is accepted.

use ::sparkpilot_common::{
    anyhow::anyhow,
    entity::{Environment, RequestedResources, RunState},
    error::SparkPilotError,
    store::Store,
};

use crate::error::ApiError;

/// Reject the run when the environment is already at its concurrency or
/// vCPU cap. The check reads current state without serialization; two
/// concurrent admissions may both pass (accepted, see the deployment notes).
pub(crate) async fn enforce_quota_for_run<S: Store>(
    store: &S,
    environment: &Environment,
    requested: &RequestedResources,
) -> Result<(), ApiError> {
    let active = store
        .list_runs_in_states(Some(&environment.id), &RunState::ACTIVE)
        .await?;
    if active.len() as u32 >= environment.max_concurrent_runs {
        return Err(SparkPilotError::quota_exceeded(anyhow!(
            "Concurrent run limit reached ({}).",
            environment.max_concurrent_runs
        ))
        .into());
    }
    let active_vcpu: u64 = active
        .iter()
        .map(|run| run.requested_resources.total_vcpu())
        .sum();
    if active_vcpu + requested.total_vcpu() > environment.max_vcpu {
        return Err(SparkPilotError::quota_exceeded(anyhow!(
            "vCPU quota exceeded ({}).",
            environment.max_vcpu
        ))
        .into());
    }
    Ok(())
}
