//! Restful API for environments and their provisioning operations.

use ::axum::extract::{Path, Query, State};
use ::axum::routing::{get, post};
use ::axum::{Json, Router};
use ::http::{HeaderMap, StatusCode};
use ::serde::Deserialize;
use ::serde_json::json;
use ::sparkpilot_common::{
    anyhow::anyhow,
    entity::{
        AuditEvent, CreateEnvironmentRequest, Environment, ProvisioningOperation,
    },
    error::SparkPilotError,
    store::Store,
    tracing::info,
};
use ::sparkpilot_engine::EngineAdapter;

use crate::context::{require_idempotency_key, RequestContext};
use crate::error::ApiError;
use crate::idempotency::{with_idempotency, HandlerEffect, IdempotentOutcome};
use crate::state::AppState;

async fn create_environment<S: Store, E: EngineAdapter>(
    State(state): State<AppState<S, E>>,
    headers: HeaderMap,
    Json(body): Json<CreateEnvironmentRequest>,
) -> Result<IdempotentOutcome, ApiError> {
    let key = require_idempotency_key(&headers)?;
    let context = RequestContext::from_headers(&headers);
    let payload = serde_json::to_value(&body).map_err(SparkPilotError::validation)?;

    let store = state.get_store();
    let idempotency_key = key.clone();
    with_idempotency(
        store,
        "POST:/v1/environments".to_owned(),
        key,
        &payload,
        move || async move {
            store
                .get_tenant(&body.tenant_id)
                .await?
                .ok_or_else(|| SparkPilotError::not_found(anyhow!("Tenant not found.")))?;
            let environment = Environment::try_from(body)?;
            let operation = ProvisioningOperation::new(&environment, idempotency_key);
            store
                .insert_environment(environment.clone(), operation.clone())
                .await?;
            store
                .append_audit(
                    AuditEvent::new(
                        &context.actor,
                        "environment.create",
                        "environment",
                        &environment.id,
                    )
                    .tenant(&environment.tenant_id)
                    .source_ip(context.source_ip.clone())
                    .details(json!({
                        "region": environment.region,
                        "provisioning_mode": environment.provisioning_mode,
                        "eks_cluster_arn": environment.eks_cluster_arn.as_deref().unwrap_or(""),
                        "eks_namespace": environment.eks_namespace.as_deref().unwrap_or(""),
                        "warm_pool_enabled": environment.warm_pool_enabled,
                        "max_concurrent_runs": environment.max_concurrent_runs,
                        "max_vcpu": environment.max_vcpu,
                        "max_run_seconds": environment.max_run_seconds,
                    })),
                )
                .await?;
            info!(
                "Created environment {}, queued provisioning operation {}",
                environment.id, operation.id
            );
            Ok(HandlerEffect {
                status: StatusCode::CREATED,
                body: serde_json::to_value(&operation).map_err(SparkPilotError::validation)?,
                resource_type: Some("provisioning_operation"),
                resource_id: Some(operation.id.clone()),
            })
        },
    )
    .await
}

async fn get_environment<S: Store, E: EngineAdapter>(
    Path(id): Path<String>,
    State(state): State<AppState<S, E>>,
) -> Result<Json<Environment>, ApiError> {
    state
        .get_store()
        .get_environment(&id)
        .await?
        .map(Json)
        .ok_or_else(|| SparkPilotError::not_found(anyhow!("Environment not found.")).into())
}

#[derive(Deserialize)]
struct ListEnvironmentsQuery {
    tenant_id: Option<String>,
}

async fn list_environments<S: Store, E: EngineAdapter>(
    Query(query): Query<ListEnvironmentsQuery>,
    State(state): State<AppState<S, E>>,
) -> Result<Json<Vec<Environment>>, ApiError> {
    let environments = state
        .get_store()
        .list_environments(query.tenant_id.as_deref())
        .await?;
    Ok(Json(environments))
}

async fn get_provisioning_operation<S: Store, E: EngineAdapter>(
    Path(id): Path<String>,
    State(state): State<AppState<S, E>>,
) -> Result<Json<ProvisioningOperation>, ApiError> {
    state
        .get_store()
        .get_operation(&id)
        .await?
        .map(Json)
        .ok_or_else(|| {
            SparkPilotError::not_found(anyhow!("Provisioning operation not found.")).into()
        })
}

pub(crate) fn get_environment_router<S: Store, E: EngineAdapter>() -> Router<AppState<S, E>> {
    Router::new()
        .route(
            "/environments",
            post(create_environment::<S, E>).get(list_environments::<S, E>),
        )
        .route("/environments/:id", get(get_environment::<S, E>))
        .route(
            "/provisioning-operations/:id",
            get(get_provisioning_operation::<S, E>),
        )
}
