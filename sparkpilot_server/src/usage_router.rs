//! Usage reporting for one tenant over an inclusive time window.

use ::axum::extract::{Query, State};
use ::axum::routing::get;
use ::axum::{Json, Router};
use ::serde::Deserialize;
use ::sparkpilot_common::{
    anyhow::anyhow,
    entity::{utc_now, UsageItem, UsageResponse},
    error::SparkPilotError,
    store::Store,
    time::format_description::well_known::Rfc3339,
    time::{Duration, OffsetDateTime},
};
use ::sparkpilot_engine::EngineAdapter;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
struct UsageQuery {
    tenant_id: String,
    from_ts: Option<String>,
    to_ts: Option<String>,
}

fn parse_bound(value: Option<&str>) -> Result<Option<OffsetDateTime>, ApiError> {
    value
        .map(|value| {
            OffsetDateTime::parse(value, &Rfc3339).map_err(|_| {
                SparkPilotError::validation(anyhow!(
                    "Timestamp bounds must be RFC 3339, got {:?}.",
                    value
                ))
                .into()
            })
        })
        .transpose()
}

async fn get_usage<S: Store, E: EngineAdapter>(
    Query(query): Query<UsageQuery>,
    State(state): State<AppState<S, E>>,
) -> Result<Json<UsageResponse>, ApiError> {
    let store = state.get_store();
    store
        .get_tenant(&query.tenant_id)
        .await?
        .ok_or_else(|| SparkPilotError::not_found(anyhow!("Tenant not found.")))?;

    // Caller-supplied bounds are honored verbatim; both are inclusive.
    let to_ts = parse_bound(query.to_ts.as_deref())?.unwrap_or_else(utc_now);
    let from_ts = parse_bound(query.from_ts.as_deref())?.unwrap_or(to_ts - Duration::days(30));

    let items: Vec<UsageItem> = store
        .list_usage(&query.tenant_id)
        .await?
        .into_iter()
        .filter(|record| record.recorded_at >= from_ts && record.recorded_at <= to_ts)
        .map(UsageItem::from)
        .collect();
    Ok(Json(UsageResponse {
        tenant_id: query.tenant_id,
        from_ts,
        to_ts,
        items,
    }))
}

pub(crate) fn get_usage_router<S: Store, E: EngineAdapter>() -> Router<AppState<S, E>> {
    Router::new().route("/usage", get(get_usage::<S, E>))
}
