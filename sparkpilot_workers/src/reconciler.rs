//! Reconciler loop: mirrors engine state back to the platform, enforces
//! run-level timeouts, propagates cancellation and writes usage on terminal
//! transitions.

use ::serde_json::json;
use ::sparkpilot_common::{
    entity::{utc_now, AuditEvent, Environment, Run, RunState},
    error::Result,
    store::Store,
    tracing::{info, warn},
};
use ::sparkpilot_engine::{EngineAdapter, EngineRunState};

use crate::usage::record_usage_if_needed;

const ACTOR: &str = "worker:reconciler";

/// Map an engine state onto the platform run state machine. Unknown engine
/// states are treated as failures.
pub fn platform_state(engine_state: &EngineRunState) -> RunState {
    match engine_state {
        EngineRunState::Pending | EngineRunState::Submitted => RunState::Accepted,
        EngineRunState::Running => RunState::Running,
        EngineRunState::Completed => RunState::Succeeded,
        EngineRunState::Failed => RunState::Failed,
        EngineRunState::Cancelled => RunState::Cancelled,
        EngineRunState::CancelPending => RunState::Running,
        EngineRunState::Unknown(_) => RunState::Failed,
    }
}

/// One reconciler pass over up to `limit` accepted/running runs, stalest
/// first. Returns the number of runs touched.
pub async fn process_reconciler_once<S, E>(store: &S, engine: &E, limit: usize) -> Result<usize>
where
    S: Store,
    E: EngineAdapter,
{
    let mut active = store
        .list_runs_in_states(None, &[RunState::Accepted, RunState::Running])
        .await?;
    active.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
    active.truncate(limit);

    let mut processed = 0;
    for mut run in active {
        let Some(environment) = store.get_environment(&run.environment_id).await? else {
            mark_failed(store, &mut run, "Environment not found.".to_owned(), None).await?;
            processed += 1;
            continue;
        };
        if let Err(error) = reconcile_run(store, engine, &environment, &mut run).await {
            mark_failed(store, &mut run, error.to_string(), Some(&environment)).await?;
            warn!("Reconciliation failed for run {}: {}", run.id, error);
        }
        processed += 1;
    }
    if processed > 0 {
        info!("Reconciler processed {} runs", processed);
    }
    Ok(processed)
}

async fn reconcile_run<S, E>(
    store: &S,
    engine: &E,
    environment: &Environment,
    run: &mut Run,
) -> Result<()>
where
    S: Store,
    E: EngineAdapter,
{
    // Timeout enforcement comes first; a timed-out run never reaches the
    // engine-state mirror below.
    if let Some(started_at) = run.started_at {
        let elapsed = (utc_now() - started_at).whole_seconds();
        if elapsed > run.timeout_seconds as i64 {
            run.cancellation_requested = true;
            if run.engine_run_id.is_some() {
                let upstream_request_id = engine.cancel_job_run(environment, run).await?;
                store
                    .append_audit(
                        AuditEvent::new(ACTOR, "run.timeout_cancel.dispatched", "run", &run.id)
                            .tenant(&environment.tenant_id)
                            .upstream_request_id(upstream_request_id),
                    )
                    .await?;
            }
            run.state = RunState::TimedOut;
            run.error_message = Some("Run exceeded timeout_seconds.".to_owned());
            run.ended_at = Some(utc_now());
            run.touch();
            store.update_run(run).await?;
            record_usage_if_needed(store, run, environment).await?;
            store
                .append_audit(
                    AuditEvent::new(ACTOR, "run.timed_out", "run", &run.id)
                        .tenant(&environment.tenant_id),
                )
                .await?;
            info!("Run {} timed out", run.id);
            return Ok(());
        }
    }

    if run.cancellation_requested && run.engine_run_id.is_some() {
        let upstream_request_id = engine.cancel_job_run(environment, run).await?;
        store
            .append_audit(
                AuditEvent::new(ACTOR, "run.cancel.dispatched", "run", &run.id)
                    .tenant(&environment.tenant_id)
                    .upstream_request_id(upstream_request_id),
            )
            .await?;
    }

    let (engine_state, error_message) = engine.describe_job_run(environment, run).await?;
    if let EngineRunState::Unknown(raw_state) = &engine_state {
        store
            .append_audit(
                AuditEvent::new(ACTOR, "run.reconcile.unknown_state", "run", &run.id)
                    .tenant(&environment.tenant_id)
                    .details(json!({"engine_state": raw_state})),
            )
            .await?;
    }
    let mapped = platform_state(&engine_state);
    run.state = mapped;
    if mapped.is_terminal() && run.ended_at.is_none() {
        run.ended_at = Some(utc_now());
    }
    if let Some(error_message) = error_message {
        run.error_message = Some(error_message);
    }
    run.touch();
    store.update_run(run).await?;
    if mapped.is_terminal() {
        record_usage_if_needed(store, run, environment).await?;
    }
    store
        .append_audit(
            AuditEvent::new(ACTOR, "run.reconciled", "run", &run.id)
                .tenant(&environment.tenant_id)
                .details(json!({
                    "engine_state": engine_state.as_str(),
                    "platform_state": mapped,
                })),
        )
        .await?;
    Ok(())
}

/// Per-item failure handling: the run is failed, billed and audited, and the
/// pass moves on.
async fn mark_failed<S: Store>(
    store: &S,
    run: &mut Run,
    error_message: String,
    environment: Option<&Environment>,
) -> Result<()> {
    run.state = RunState::Failed;
    run.error_message = Some(error_message.clone());
    if run.ended_at.is_none() {
        run.ended_at = Some(utc_now());
    }
    run.touch();
    store.update_run(run).await?;
    let mut event = AuditEvent::new(ACTOR, "run.reconcile_failed", "run", &run.id)
        .details(json!({"error": error_message}));
    if let Some(environment) = environment {
        event = event.tenant(&environment.tenant_id);
        record_usage_if_needed(store, run, environment).await?;
    }
    store.append_audit(event).await?;
    Ok(())
}
