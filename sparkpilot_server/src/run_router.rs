//! Restful API for run submission, cancellation and logs.

use ::axum::extract::{Path, Query, State};
use ::axum::routing::{get, post};
use ::axum::{Json, Router};
use ::http::{HeaderMap, StatusCode};
use ::serde::Deserialize;
use ::serde_json::json;
use ::sparkpilot_common::{
    anyhow::anyhow,
    entity::{
        utc_now, AuditEvent, CreateRunRequest, Environment, EnvironmentStatus, LogsResponse, Run,
        RunState,
    },
    error::SparkPilotError,
    store::Store,
    tracing::info,
};
use ::sparkpilot_engine::EngineAdapter;

use crate::context::{require_idempotency_key, RequestContext};
use crate::error::ApiError;
use crate::idempotency::{with_idempotency, HandlerEffect, IdempotentOutcome};
use crate::quota::enforce_quota_for_run;
use crate::state::AppState;

async fn create_run<S: Store, E: EngineAdapter>(
    Path(job_id): Path<String>,
    State(state): State<AppState<S, E>>,
    headers: HeaderMap,
    Json(body): Json<CreateRunRequest>,
) -> Result<IdempotentOutcome, ApiError> {
    let key = require_idempotency_key(&headers)?;
    let context = RequestContext::from_headers(&headers);
    body.validate()?;
    let payload = serde_json::to_value(&body).map_err(SparkPilotError::validation)?;

    let store = state.get_store();
    let scope = format!("POST:/v1/jobs/{}/runs", job_id);
    let idempotency_key = key.clone();
    with_idempotency(store, scope, key, &payload, move || async move {
        let job = store
            .get_job(&job_id)
            .await?
            .ok_or_else(|| SparkPilotError::not_found(anyhow!("Job not found.")))?;
        let environment = store
            .get_environment(&job.environment_id)
            .await?
            .ok_or_else(|| SparkPilotError::not_found(anyhow!("Environment not found.")))?;
        if environment.status != EnvironmentStatus::Ready {
            return Err(SparkPilotError::conflict(anyhow!("Environment is not ready.")).into());
        }

        enforce_quota_for_run(store, &environment, &body.requested_resources).await?;
        let timeout_seconds = body.timeout_seconds.unwrap_or(job.timeout_seconds);
        if timeout_seconds > environment.max_run_seconds {
            return Err(SparkPilotError::validation(anyhow!(
                "Run timeout exceeds environment max_run_seconds ({}).",
                environment.max_run_seconds
            ))
            .into());
        }

        // Belt and suspenders alongside the idempotency guard: the same key
        // resubmitted against this job returns the existing run.
        if let Some(existing) = store
            .find_run_by_idempotency(&job.id, &idempotency_key)
            .await?
        {
            return Ok(HandlerEffect {
                status: StatusCode::CREATED,
                body: serde_json::to_value(&existing).map_err(SparkPilotError::validation)?,
                resource_type: Some("run"),
                resource_id: Some(existing.id),
            });
        }

        let run = store
            .insert_run(Run::new(&job, &environment, &body, idempotency_key))
            .await?;
        store
            .append_audit(
                AuditEvent::new(&context.actor, "run.create", "run", &run.id)
                    .tenant(&environment.tenant_id)
                    .source_ip(context.source_ip.clone())
                    .details(json!({
                        "job_id": job.id,
                        "requested_resources": run.requested_resources,
                    })),
            )
            .await?;
        info!("Created run {} for job {}", run.id, job.id);
        Ok(HandlerEffect {
            status: StatusCode::CREATED,
            body: serde_json::to_value(&run).map_err(SparkPilotError::validation)?,
            resource_type: Some("run"),
            resource_id: Some(run.id.clone()),
        })
    })
    .await
}

async fn cancel_run<S: Store, E: EngineAdapter>(
    Path(run_id): Path<String>,
    State(state): State<AppState<S, E>>,
    headers: HeaderMap,
) -> Result<IdempotentOutcome, ApiError> {
    let key = require_idempotency_key(&headers)?;
    let context = RequestContext::from_headers(&headers);
    let payload = json!({ "run_id": run_id });

    let store = state.get_store();
    let scope = format!("POST:/v1/runs/{}/cancel", run_id);
    with_idempotency(store, scope, key, &payload, move || async move {
        let mut run = require_run(store, &run_id).await?;
        let environment = require_environment(store, &run.environment_id).await?;
        if run.state.is_terminal() {
            return Ok(run_effect(StatusCode::OK, &run)?);
        }

        if matches!(run.state, RunState::Queued | RunState::Dispatching) {
            run.state = RunState::Cancelled;
            run.ended_at = Some(utc_now());
        } else {
            run.cancellation_requested = true;
        }
        run.touch();
        store.update_run(&run).await?;
        store
            .append_audit(
                AuditEvent::new(&context.actor, "run.cancel.request", "run", &run.id)
                    .tenant(&environment.tenant_id)
                    .source_ip(context.source_ip.clone()),
            )
            .await?;
        info!("Cancellation requested for run {}", run.id);
        Ok(run_effect(StatusCode::OK, &run)?)
    })
    .await
}

async fn get_run<S: Store, E: EngineAdapter>(
    Path(id): Path<String>,
    State(state): State<AppState<S, E>>,
) -> Result<Json<Run>, ApiError> {
    let run = require_run(state.get_store(), &id).await?;
    Ok(Json(run))
}

#[derive(Deserialize)]
struct ListRunsQuery {
    tenant_id: Option<String>,
    state: Option<RunState>,
}

async fn list_runs<S: Store, E: EngineAdapter>(
    Query(query): Query<ListRunsQuery>,
    State(state): State<AppState<S, E>>,
) -> Result<Json<Vec<Run>>, ApiError> {
    let runs = state
        .get_store()
        .list_runs(query.tenant_id.as_deref(), query.state)
        .await?;
    Ok(Json(runs))
}

#[derive(Deserialize)]
struct LogsQuery {
    limit: Option<usize>,
}

async fn get_run_logs<S: Store, E: EngineAdapter>(
    Path(id): Path<String>,
    Query(query): Query<LogsQuery>,
    State(state): State<AppState<S, E>>,
) -> Result<Json<LogsResponse>, ApiError> {
    let limit = query.limit.unwrap_or(200);
    if !(1..=2000).contains(&limit) {
        return Err(
            SparkPilotError::validation(anyhow!("limit must be between 1 and 2000.")).into(),
        );
    }
    let store = state.get_store();
    let run = require_run(store, &id).await?;
    let environment = require_environment(store, &run.environment_id).await?;
    let lines = state
        .get_engine()
        .fetch_log_lines(
            &environment.customer_role_arn,
            &environment.region,
            run.log_group.as_deref(),
            run.log_stream_prefix.as_deref(),
            limit,
        )
        .await?;
    Ok(Json(LogsResponse {
        run_id: run.id,
        log_group: run.log_group,
        log_stream_prefix: run.log_stream_prefix,
        lines,
    }))
}

async fn require_run<S: Store>(store: &S, id: &str) -> Result<Run, ApiError> {
    store
        .get_run(id)
        .await?
        .ok_or_else(|| SparkPilotError::not_found(anyhow!("Run not found.")).into())
}

async fn require_environment<S: Store>(store: &S, id: &str) -> Result<Environment, ApiError> {
    store
        .get_environment(id)
        .await?
        .ok_or_else(|| SparkPilotError::not_found(anyhow!("Environment not found.")).into())
}

fn run_effect(status: StatusCode, run: &Run) -> Result<HandlerEffect, ApiError> {
    Ok(HandlerEffect {
        status,
        body: serde_json::to_value(run).map_err(SparkPilotError::validation)?,
        resource_type: Some("run"),
        resource_id: Some(run.id.clone()),
    })
}

pub(crate) fn get_run_router<S: Store, E: EngineAdapter>() -> Router<AppState<S, E>> {
    Router::new()
        .route("/jobs/:job_id/runs", post(create_run::<S, E>))
        .route("/runs", get(list_runs::<S, E>))
        .route("/runs/:id", get(get_run::<S, E>))
        .route("/runs/:id/cancel", post(cancel_run::<S, E>))
        .route("/runs/:id/logs", get(get_run_logs::<S, E>))
}
