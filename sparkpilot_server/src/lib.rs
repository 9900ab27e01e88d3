use ::axum::routing::get;
use ::axum::{Json, Router};
use ::http::{header, HeaderName, HeaderValue, Method};
use ::serde_json::json;
use ::sparkpilot_common::{config::Settings, error::Result, error::SparkPilotError, store::Store};
use ::sparkpilot_engine::EngineAdapter;
use ::tower_http::cors::{AllowOrigin, CorsLayer};
use ::tower_http::trace::TraceLayer;

use environment_router::get_environment_router;
use job_router::get_job_router;
use run_router::get_run_router;
use state::AppState;
use tenant_router::get_tenant_router;
use usage_router::get_usage_router;

pub(crate) mod context;
pub(crate) mod environment_router;
pub(crate) mod error;
pub(crate) mod idempotency;
pub(crate) mod job_router;
pub(crate) mod quota;
pub(crate) mod run_router;
pub(crate) mod state;
pub(crate) mod tenant_router;
pub(crate) mod usage_router;

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// This is the only entry for users to get the SparkPilot server.
/// # Return the router for the server
pub fn get_server<S, E>(store: S, engine: E, settings: Settings) -> Result<Router>
where
    S: Store,
    E: EngineAdapter,
{
    let origins = settings
        .cors_origin_list()
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(SparkPilotError::fail_to_start_server)
        })
        .collect::<Result<Vec<_>>>()?;
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("idempotency-key"),
            HeaderName::from_static("x-actor"),
        ])
        .allow_credentials(true);

    let app_state = AppState::new(store, engine);

    // go through the router from outer to inner
    let router = Router::new()
        .route("/healthz", get(healthz))
        .nest(
            "/v1",
            Router::new()
                .merge(get_tenant_router::<S, E>())
                .merge(get_environment_router::<S, E>())
                .merge(get_job_router::<S, E>())
                .merge(get_run_router::<S, E>())
                .merge(get_usage_router::<S, E>()),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);
    Ok(router)
}
