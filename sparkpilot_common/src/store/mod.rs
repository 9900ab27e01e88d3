//! Datastore interface consumed by the API and the background loops.

pub mod surrealdb_client;

use ::async_trait::async_trait;

use crate::entity::{
    AuditEvent, Environment, IdempotencyRecord, Job, ProvisioningOperation, Run, RunState, Tenant,
    UsageRecord,
};
use crate::error::Result;

/// Persistence for all control-plane entities.
///
/// Implementations must uphold the uniqueness constraints `(tenant.name)`,
/// `(idempotency.scope, key)`, `(run.job_id, run.idempotency_key)` and
/// `(usage.run_id)`, and apply each mutation atomically.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn insert_tenant(&self, tenant: Tenant) -> Result<Tenant>;

    async fn get_tenant(&self, id: &str) -> Result<Option<Tenant>>;

    async fn find_tenant_by_name(&self, name: &str) -> Result<Option<Tenant>>;

    /// Persist an environment and its queued provisioning operation in one
    /// transaction.
    async fn insert_environment(
        &self,
        environment: Environment,
        operation: ProvisioningOperation,
    ) -> Result<()>;

    async fn get_environment(&self, id: &str) -> Result<Option<Environment>>;

    /// Environments, newest first, optionally filtered by tenant.
    async fn list_environments(&self, tenant_id: Option<&str>) -> Result<Vec<Environment>>;

    async fn update_environment(&self, environment: &Environment) -> Result<()>;

    async fn get_operation(&self, id: &str) -> Result<Option<ProvisioningOperation>>;

    /// Non-terminal provisioning operations, oldest first.
    async fn list_pending_operations(&self) -> Result<Vec<ProvisioningOperation>>;

    async fn update_operation(&self, operation: &ProvisioningOperation) -> Result<()>;

    async fn insert_job(&self, job: Job) -> Result<Job>;

    async fn get_job(&self, id: &str) -> Result<Option<Job>>;

    async fn insert_run(&self, run: Run) -> Result<Run>;

    async fn get_run(&self, id: &str) -> Result<Option<Run>>;

    async fn find_run_by_idempotency(
        &self,
        job_id: &str,
        idempotency_key: &str,
    ) -> Result<Option<Run>>;

    /// Runs, newest first, optionally filtered by owning tenant and state.
    async fn list_runs(
        &self,
        tenant_id: Option<&str>,
        state: Option<RunState>,
    ) -> Result<Vec<Run>>;

    /// Runs in any of `states`, optionally scoped to one environment.
    /// Unordered; callers sort by the timestamp they care about.
    async fn list_runs_in_states(
        &self,
        environment_id: Option<&str>,
        states: &[RunState],
    ) -> Result<Vec<Run>>;

    async fn update_run(&self, run: &Run) -> Result<()>;

    /// Insert the usage record unless one already exists for its run.
    /// Returns whether a row was written.
    async fn insert_usage_if_absent(&self, record: UsageRecord) -> Result<bool>;

    /// Usage for one tenant, oldest first.
    async fn list_usage(&self, tenant_id: &str) -> Result<Vec<UsageRecord>>;

    async fn append_audit(&self, event: AuditEvent) -> Result<()>;

    /// Audit rows, oldest first, optionally filtered by entity id.
    async fn list_audit_events(&self, entity_id: Option<&str>) -> Result<Vec<AuditEvent>>;

    async fn get_idempotency(&self, scope: &str, key: &str) -> Result<Option<IdempotencyRecord>>;

    async fn insert_idempotency(&self, record: IdempotencyRecord) -> Result<()>;
}
