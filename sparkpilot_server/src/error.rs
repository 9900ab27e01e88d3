use ::core::fmt::Display;

use ::axum::response::{IntoResponse, Response};
use ::axum::Json;
use ::http::StatusCode;
use ::serde_json::json;
use ::sparkpilot_common::error::{ErrorKind::*, SparkPilotError};

/// [ApiError] is a wrapper for [SparkPilotError] to convert it into an Axum
/// response. This is the only place error kinds map to status codes.
#[derive(Debug)]
pub struct ApiError(SparkPilotError);

impl ApiError {
    fn get_status_code(&self) -> StatusCode {
        match self.0.get_kind() {
            Validation => StatusCode::UNPROCESSABLE_ENTITY,
            MissingIdempotencyKey => StatusCode::BAD_REQUEST,
            NotFound => StatusCode::NOT_FOUND,
            Conflict => StatusCode::CONFLICT,
            IdempotencyKeyReuse => StatusCode::CONFLICT,
            QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            UpstreamTransient => StatusCode::BAD_GATEWAY,
            UpstreamPermanent => StatusCode::BAD_GATEWAY,
            FailToConnectDatastore => StatusCode::INTERNAL_SERVER_ERROR,
            FailToReadDatastore => StatusCode::INTERNAL_SERVER_ERROR,
            FailToUpdateDatastore => StatusCode::INTERNAL_SERVER_ERROR,
            FailToStartServer => StatusCode::INTERNAL_SERVER_ERROR,
            FailToStartWorker => StatusCode::INTERNAL_SERVER_ERROR,
            FailToLoadConfig => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SparkPilotError> for ApiError {
    fn from(error: SparkPilotError) -> Self {
        Self(error)
    }
}

/// [ApiError] displays in the same way as [SparkPilotError]
impl Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.get_status_code();
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl<T> From<ApiError> for Result<T, ApiError> {
    fn from(val: ApiError) -> Self {
        Result::Err(val)
    }
}
