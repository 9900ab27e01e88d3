//! Restful API for tenant management.

use ::axum::extract::State;
use ::axum::routing::post;
use ::axum::{Json, Router};
use ::http::{HeaderMap, StatusCode};
use ::serde_json::json;
use ::sparkpilot_common::{
    anyhow::anyhow,
    entity::{AuditEvent, CreateTenantRequest, Tenant},
    error::SparkPilotError,
    store::Store,
    tracing::info,
};
use ::sparkpilot_engine::EngineAdapter;

use crate::context::{require_idempotency_key, RequestContext};
use crate::error::ApiError;
use crate::idempotency::{with_idempotency, HandlerEffect, IdempotentOutcome};
use crate::state::AppState;

async fn create_tenant<S: Store, E: EngineAdapter>(
    State(state): State<AppState<S, E>>,
    headers: HeaderMap,
    Json(body): Json<CreateTenantRequest>,
) -> Result<IdempotentOutcome, ApiError> {
    let key = require_idempotency_key(&headers)?;
    let context = RequestContext::from_headers(&headers);
    body.validate()?;
    let payload = serde_json::to_value(&body).map_err(SparkPilotError::validation)?;

    let store = state.get_store();
    with_idempotency(
        store,
        "POST:/v1/tenants".to_owned(),
        key,
        &payload,
        move || async move {
            if store.find_tenant_by_name(&body.name).await?.is_some() {
                return Err(
                    SparkPilotError::conflict(anyhow!("Tenant name already exists.")).into(),
                );
            }
            let tenant = store.insert_tenant(Tenant::new(body.name.clone())).await?;
            store
                .append_audit(
                    AuditEvent::new(&context.actor, "tenant.create", "tenant", &tenant.id)
                        .tenant(&tenant.id)
                        .source_ip(context.source_ip.clone())
                        .details(json!({"name": tenant.name})),
                )
                .await?;
            info!("Created tenant {}", tenant.id);
            Ok(HandlerEffect {
                status: StatusCode::CREATED,
                body: serde_json::to_value(&tenant).map_err(SparkPilotError::validation)?,
                resource_type: Some("tenant"),
                resource_id: Some(tenant.id.clone()),
            })
        },
    )
    .await
}

pub(crate) fn get_tenant_router<S: Store, E: EngineAdapter>() -> Router<AppState<S, E>> {
    Router::new().route("/tenants", post(create_tenant::<S, E>))
}
