//! Idempotency guard wrapping every mutating handler.

use ::core::future::Future;

use ::axum::response::{IntoResponse, Response};
use ::axum::Json;
use ::http::{HeaderName, HeaderValue, StatusCode};
use ::serde_json::Value;
use ::sparkpilot_common::{
    anyhow::anyhow,
    entity::{payload_fingerprint, IdempotencyRecord},
    error::SparkPilotError,
    store::Store,
};

use crate::error::ApiError;

const REPLAY_HEADER: &str = "x-idempotent-replay";

/// What a handler produced: response plus the created resource, if any.
pub(crate) struct HandlerEffect {
    pub status: StatusCode,
    pub body: Value,
    pub resource_type: Option<&'static str>,
    pub resource_id: Option<String>,
}

/// Response of the guard; replays carry the marker header.
pub(crate) struct IdempotentOutcome {
    pub status: StatusCode,
    pub body: Value,
    pub replayed: bool,
}

impl IntoResponse for IdempotentOutcome {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        if self.replayed {
            response.headers_mut().insert(
                HeaderName::from_static(REPLAY_HEADER),
                HeaderValue::from_static("true"),
            );
        }
        response
    }
}

/// Replay a stored response for `(scope, key)` or run `execute` exactly once
/// and store its outcome. A key reused with a different payload fingerprint
/// is a conflict.
pub(crate) async fn with_idempotency<S, F, Fut>(
    store: &S,
    scope: String,
    key: String,
    payload: &Value,
    execute: F,
) -> Result<IdempotentOutcome, ApiError>
where
    S: Store,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<HandlerEffect, ApiError>>,
{
    let fingerprint = payload_fingerprint(payload);
    if let Some(existing) = store.get_idempotency(&scope, &key).await? {
        if existing.fingerprint != fingerprint {
            return Err(SparkPilotError::idempotency_key_reuse(anyhow!(
                "Idempotency-Key already used with a different request body."
            ))
            .into());
        }
        return Ok(IdempotentOutcome {
            status: StatusCode::from_u16(existing.status_code).unwrap_or(StatusCode::OK),
            body: existing.response,
            replayed: true,
        });
    }

    let effect = execute().await?;
    store
        .insert_idempotency(IdempotencyRecord::new(
            scope,
            key,
            fingerprint,
            effect.body.clone(),
            effect.status.as_u16(),
            effect.resource_type.map(str::to_owned),
            effect.resource_id,
        ))
        .await?;
    Ok(IdempotentOutcome {
        status: effect.status,
        body: effect.body,
        replayed: false,
    })
}
