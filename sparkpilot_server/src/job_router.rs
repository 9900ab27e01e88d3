//! Restful API for job registration.

use ::axum::extract::State;
use ::axum::routing::post;
use ::axum::{Json, Router};
use ::http::{HeaderMap, StatusCode};
use ::serde_json::json;
use ::sparkpilot_common::{
    anyhow::anyhow,
    entity::{AuditEvent, CreateJobRequest, EnvironmentStatus, Job},
    error::SparkPilotError,
    store::Store,
    tracing::info,
};
use ::sparkpilot_engine::EngineAdapter;

use crate::context::{require_idempotency_key, RequestContext};
use crate::error::ApiError;
use crate::idempotency::{with_idempotency, HandlerEffect, IdempotentOutcome};
use crate::state::AppState;

async fn create_job<S: Store, E: EngineAdapter>(
    State(state): State<AppState<S, E>>,
    headers: HeaderMap,
    Json(body): Json<CreateJobRequest>,
) -> Result<IdempotentOutcome, ApiError> {
    let key = require_idempotency_key(&headers)?;
    let context = RequestContext::from_headers(&headers);
    body.validate()?;
    let payload = serde_json::to_value(&body).map_err(SparkPilotError::validation)?;

    let store = state.get_store();
    with_idempotency(
        store,
        "POST:/v1/jobs".to_owned(),
        key,
        &payload,
        move || async move {
            let environment = store
                .get_environment(&body.environment_id)
                .await?
                .ok_or_else(|| SparkPilotError::not_found(anyhow!("Environment not found.")))?;
            if environment.status == EnvironmentStatus::Deleted {
                return Err(
                    SparkPilotError::conflict(anyhow!("Environment is deleted.")).into(),
                );
            }
            let job = store.insert_job(Job::from(body)).await?;
            store
                .append_audit(
                    AuditEvent::new(&context.actor, "job.create", "job", &job.id)
                        .tenant(&environment.tenant_id)
                        .source_ip(context.source_ip.clone())
                        .details(json!({
                            "name": job.name,
                            "artifact_uri": job.artifact_uri,
                            "artifact_digest": job.artifact_digest,
                        })),
                )
                .await?;
            info!("Created job {} in environment {}", job.id, environment.id);
            Ok(HandlerEffect {
                status: StatusCode::CREATED,
                body: serde_json::to_value(&job).map_err(SparkPilotError::validation)?,
                resource_type: Some("job"),
                resource_id: Some(job.id.clone()),
            })
        },
    )
    .await
}

pub(crate) fn get_job_router<S: Store, E: EngineAdapter>() -> Router<AppState<S, E>> {
    Router::new().route("/jobs", post(create_job::<S, E>))
}
