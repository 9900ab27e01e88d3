//! Scheduler loop: dispatches queued runs to the engine.

use ::serde_json::json;
use ::sparkpilot_common::{
    anyhow::anyhow,
    entity::{utc_now, AuditEvent, Run, RunState},
    error::{Result, SparkPilotError},
    store::Store,
    tracing::{info, warn},
};
use ::sparkpilot_engine::EngineAdapter;

const ACTOR: &str = "worker:scheduler";

/// One scheduler pass over up to `limit` queued runs, oldest first.
/// Returns the number of runs touched.
pub async fn process_scheduler_once<S, E>(store: &S, engine: &E, limit: usize) -> Result<usize>
where
    S: Store,
    E: EngineAdapter,
{
    let mut queued = store
        .list_runs_in_states(None, &[RunState::Queued])
        .await?;
    queued.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    queued.truncate(limit);

    let mut processed = 0;
    for mut run in queued {
        // Pre-dispatch cancellation never reaches the engine.
        if run.cancellation_requested {
            run.state = RunState::Cancelled;
            run.ended_at = Some(utc_now());
            run.touch();
            store.update_run(&run).await?;
            processed += 1;
            continue;
        }
        if let Err(error) = dispatch_run(store, engine, &mut run).await {
            run.state = RunState::Failed;
            run.error_message = Some(error.to_string());
            run.ended_at = Some(utc_now());
            run.touch();
            store.update_run(&run).await?;
            let tenant_id = store
                .get_environment(&run.environment_id)
                .await
                .ok()
                .flatten()
                .map(|environment| environment.tenant_id);
            let mut event = AuditEvent::new(ACTOR, "run.dispatch_failed", "run", &run.id)
                .details(json!({"error": error.to_string()}));
            if let Some(tenant_id) = &tenant_id {
                event = event.tenant(tenant_id);
            }
            store.append_audit(event).await?;
            warn!("Dispatch failed for run {}: {}", run.id, error);
        }
        processed += 1;
    }
    if processed > 0 {
        info!("Scheduler processed {} runs", processed);
    }
    Ok(processed)
}

async fn dispatch_run<S, E>(store: &S, engine: &E, run: &mut Run) -> Result<()>
where
    S: Store,
    E: EngineAdapter,
{
    let job = store
        .get_job(&run.job_id)
        .await?
        .ok_or_else(|| SparkPilotError::not_found(anyhow!("Job not found.")))?;
    let environment = store
        .get_environment(&run.environment_id)
        .await?
        .ok_or_else(|| SparkPilotError::not_found(anyhow!("Environment not found.")))?;

    run.state = RunState::Dispatching;
    run.touch();
    store.update_run(run).await?;

    let dispatch = engine.start_job_run(&environment, &job, run).await?;
    run.state = RunState::Accepted;
    run.started_at = Some(utc_now());
    run.engine_run_id = Some(dispatch.engine_run_id);
    run.log_group = Some(dispatch.log_group);
    run.log_stream_prefix = Some(dispatch.log_stream_prefix);
    run.driver_log_uri = dispatch.driver_log_uri;
    run.spark_ui_uri = dispatch.spark_ui_uri;
    run.touch();
    store.update_run(run).await?;
    store
        .append_audit(
            AuditEvent::new(ACTOR, "run.dispatched", "run", &run.id)
                .tenant(&environment.tenant_id)
                .upstream_request_id(dispatch.upstream_request_id)
                .details(json!({"engine_run_id": run.engine_run_id})),
        )
        .await?;
    info!("Dispatched run {} to the engine", run.id);
    Ok(())
}
