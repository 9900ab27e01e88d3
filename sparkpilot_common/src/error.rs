//! Error type shared by all SparkPilot crates.

use ::core::fmt::Display;

pub type Result<T> = std::result::Result<T, SparkPilotError>;

/// Classification of a [SparkPilotError].
/// The HTTP layer owns the only mapping from kind to response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request is syntactically valid but violates a semantic rule.
    Validation,
    /// A mutating request arrived without an `Idempotency-Key` header.
    MissingIdempotencyKey,
    NotFound,
    /// Unique or state constraint violation.
    Conflict,
    /// Same idempotency key, different request fingerprint.
    IdempotencyKeyReuse,
    /// Concurrency or vCPU cap hit.
    QuotaExceeded,
    /// The engine or log backend failed in a way that a later retry may fix.
    UpstreamTransient,
    /// The engine reported a definitive failure.
    UpstreamPermanent,
    FailToConnectDatastore,
    FailToReadDatastore,
    FailToUpdateDatastore,
    FailToStartServer,
    FailToStartWorker,
    FailToLoadConfig,
}

impl ErrorKind {
    fn label(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "Invalid request",
            ErrorKind::MissingIdempotencyKey => "Bad request",
            ErrorKind::NotFound => "Not found",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::IdempotencyKeyReuse => "Idempotency key reuse",
            ErrorKind::QuotaExceeded => "Quota exceeded",
            ErrorKind::UpstreamTransient => "Upstream transient failure",
            ErrorKind::UpstreamPermanent => "Upstream failure",
            ErrorKind::FailToConnectDatastore => "Fail to connect to datastore",
            ErrorKind::FailToReadDatastore => "Fail to read datastore",
            ErrorKind::FailToUpdateDatastore => "Fail to update datastore",
            ErrorKind::FailToStartServer => "Fail to start server",
            ErrorKind::FailToStartWorker => "Fail to start worker",
            ErrorKind::FailToLoadConfig => "Fail to load config",
        }
    }
}

#[derive(Debug)]
pub struct SparkPilotError {
    kind: ErrorKind,
    source: anyhow::Error,
}

macro_rules! error_constructor {
    ($fn_name: ident, $kind: expr) => {
        pub fn $fn_name<E>(error: E) -> Self
        where
            E: Into<anyhow::Error>,
        {
            Self::new($kind, error)
        }
    };
}

impl SparkPilotError {
    fn new<E>(kind: ErrorKind, error: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self {
            kind,
            source: error.into(),
        }
    }

    pub fn get_kind(&self) -> ErrorKind {
        self.kind
    }

    error_constructor!(validation, ErrorKind::Validation);
    error_constructor!(missing_idempotency_key, ErrorKind::MissingIdempotencyKey);
    error_constructor!(not_found, ErrorKind::NotFound);
    error_constructor!(conflict, ErrorKind::Conflict);
    error_constructor!(idempotency_key_reuse, ErrorKind::IdempotencyKeyReuse);
    error_constructor!(quota_exceeded, ErrorKind::QuotaExceeded);
    error_constructor!(upstream_transient, ErrorKind::UpstreamTransient);
    error_constructor!(upstream_permanent, ErrorKind::UpstreamPermanent);
    error_constructor!(fail_to_connect_datastore, ErrorKind::FailToConnectDatastore);
    error_constructor!(fail_to_read_datastore, ErrorKind::FailToReadDatastore);
    error_constructor!(fail_to_update_datastore, ErrorKind::FailToUpdateDatastore);
    error_constructor!(fail_to_start_server, ErrorKind::FailToStartServer);
    error_constructor!(fail_to_start_worker, ErrorKind::FailToStartWorker);
    error_constructor!(fail_to_load_config, ErrorKind::FailToLoadConfig);
}

impl Display for SparkPilotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.source)
    }
}

impl std::error::Error for SparkPilotError {}

impl<T> From<SparkPilotError> for Result<T> {
    fn from(val: SparkPilotError) -> Self {
        Result::Err(val)
    }
}

#[cfg(test)]
mod tests {
    use ::anyhow::anyhow;

    use super::*;

    #[test]
    fn display_not_found() {
        let error = SparkPilotError::not_found(anyhow!("Tenant abc not found."));
        assert_eq!(error.to_string(), "Not found: Tenant abc not found.");
    }

    #[test]
    fn display_quota_exceeded() {
        let error = SparkPilotError::quota_exceeded(anyhow!("Concurrent run limit reached (5)."));
        assert_eq!(
            error.to_string(),
            "Quota exceeded: Concurrent run limit reached (5)."
        );
    }

    #[test]
    fn kind_is_preserved() {
        let error = SparkPilotError::idempotency_key_reuse(anyhow!(
            "Idempotency-Key already used with a different request body."
        ));
        assert_eq!(error.get_kind(), ErrorKind::IdempotencyKeyReuse);
    }
}
