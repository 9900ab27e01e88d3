//! Stepped provisioning operations, one per environment create.

use ::core::fmt::Display;

use ::serde::{Deserialize, Serialize};
use ::time::OffsetDateTime;

use super::{new_id, utc_now, Environment};

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningState {
    Queued,
    ValidatingBootstrap,
    ProvisioningNetwork,
    ProvisioningEks,
    ProvisioningEmr,
    ValidatingRuntime,
    Ready,
    Failed,
}

impl ProvisioningState {
    /// Fixed step sequence walked by the full provisioning path.
    pub const FULL_STEPS: [ProvisioningState; 5] = [
        ProvisioningState::ValidatingBootstrap,
        ProvisioningState::ProvisioningNetwork,
        ProvisioningState::ProvisioningEks,
        ProvisioningState::ProvisioningEmr,
        ProvisioningState::ValidatingRuntime,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProvisioningState::Ready | ProvisioningState::Failed)
    }
}

impl Display for ProvisioningState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ProvisioningState::Queued => "queued",
            ProvisioningState::ValidatingBootstrap => "validating_bootstrap",
            ProvisioningState::ProvisioningNetwork => "provisioning_network",
            ProvisioningState::ProvisioningEks => "provisioning_eks",
            ProvisioningState::ProvisioningEmr => "provisioning_emr",
            ProvisioningState::ValidatingRuntime => "validating_runtime",
            ProvisioningState::Ready => "ready",
            ProvisioningState::Failed => "failed",
        };
        write!(f, "{}", label)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ProvisioningOperation {
    pub id: String,
    pub environment_id: String,
    pub state: ProvisioningState,
    /// Mirror of `state` kept for UI consumption.
    pub step: ProvisioningState,
    pub message: Option<String>,
    pub logs_uri: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub ended_at: Option<OffsetDateTime>,
    pub idempotency_key: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ProvisioningOperation {
    pub fn new(environment: &Environment, idempotency_key: String) -> Self {
        let now = utc_now();
        Self {
            id: new_id(),
            environment_id: environment.id.clone(),
            state: ProvisioningState::Queued,
            step: ProvisioningState::Queued,
            message: Some("Queued for provisioning.".to_owned()),
            logs_uri: Some(format!(
                "s3://sparkpilot-ops/provisioning/{}/{}.log",
                environment.id,
                new_id()
            )),
            started_at: now,
            ended_at: None,
            idempotency_key,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to an intermediate step.
    pub fn advance(&mut self, state: ProvisioningState, message: String) {
        self.state = state;
        self.step = state;
        self.message = Some(message);
        self.updated_at = utc_now();
    }

    pub fn finish_ready(&mut self, message: String) {
        self.state = ProvisioningState::Ready;
        self.step = ProvisioningState::Ready;
        self.message = Some(message);
        self.ended_at = Some(utc_now());
        self.updated_at = utc_now();
    }

    pub fn finish_failed(&mut self, message: String) {
        self.state = ProvisioningState::Failed;
        self.step = ProvisioningState::Failed;
        self.message = Some(message);
        self.ended_at = Some(utc_now());
        self.updated_at = utc_now();
    }
}
