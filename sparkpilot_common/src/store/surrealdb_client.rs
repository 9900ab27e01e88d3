//! SurrealDB client for the control-plane store.
//!
//! Record format in the database: `{ id: <record id>, info: <entity> }`.
//! Uniqueness constraints are unique indexes over `info.*` fields; result
//! ordering happens client-side on the decoded entities.

use ::std::collections::HashSet;

use ::anyhow::anyhow;
use ::async_trait::async_trait;
use ::serde::de::DeserializeOwned;
use ::serde::Serialize;
use ::surrealdb::engine::any::{connect, Any};
use ::surrealdb::opt::auth::Root;
use ::surrealdb::Surreal;

use crate::config::{Credentials, DatabaseConfig};
use crate::entity::{
    AuditEvent, Environment, IdempotencyRecord, Job, ProvisioningOperation, ProvisioningState, Run,
    RunState, Tenant, UsageRecord,
};
use crate::error::{Result, SparkPilotError};

use super::Store;

const SCHEMA: &str = r#"
    DEFINE TABLE IF NOT EXISTS tenants SCHEMALESS;
    DEFINE TABLE IF NOT EXISTS environments SCHEMALESS;
    DEFINE TABLE IF NOT EXISTS provisioning_operations SCHEMALESS;
    DEFINE TABLE IF NOT EXISTS jobs SCHEMALESS;
    DEFINE TABLE IF NOT EXISTS runs SCHEMALESS;
    DEFINE TABLE IF NOT EXISTS usage_records SCHEMALESS;
    DEFINE TABLE IF NOT EXISTS audit_events SCHEMALESS;
    DEFINE TABLE IF NOT EXISTS idempotency_records SCHEMALESS;
    DEFINE INDEX IF NOT EXISTS uniq_tenants_name ON TABLE tenants FIELDS info.name UNIQUE;
    DEFINE INDEX IF NOT EXISTS uniq_idempotency_scope_key ON TABLE idempotency_records FIELDS info.scope, info.key UNIQUE;
    DEFINE INDEX IF NOT EXISTS uniq_runs_job_idempotency ON TABLE runs FIELDS info.job_id, info.idempotency_key UNIQUE;
    DEFINE INDEX IF NOT EXISTS uniq_usage_run ON TABLE usage_records FIELDS info.run_id UNIQUE;
"#;

/// Client to interact with the datastore.
#[derive(Clone)]
pub struct SurrealStore {
    client: Surreal<Any>,
}

impl SurrealStore {
    const NAMESPACE: &'static str = "sparkpilot";
    const DATABASE: &'static str = "sparkpilot";

    const TENANTS: &'static str = "tenants";
    const ENVIRONMENTS: &'static str = "environments";
    const OPERATIONS: &'static str = "provisioning_operations";
    const JOBS: &'static str = "jobs";
    const RUNS: &'static str = "runs";
    const USAGE: &'static str = "usage_records";
    const AUDIT: &'static str = "audit_events";
    const IDEMPOTENCY: &'static str = "idempotency_records";

    /// Connect to the configured endpoint (`mem://` or `ws://…`), sign in
    /// when credentials are given and install the schema.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let client = connect(config.uri.as_str())
            .await
            .map_err(SparkPilotError::fail_to_connect_datastore)?;
        if let Some(Credentials { username, password }) = &config.credentials {
            client
                .signin(Root {
                    username: username.as_str(),
                    password: password.as_str(),
                })
                .await
                .map_err(SparkPilotError::fail_to_connect_datastore)?;
        }
        client
            .use_ns(Self::NAMESPACE)
            .use_db(Self::DATABASE)
            .await
            .map_err(SparkPilotError::fail_to_connect_datastore)?;
        client
            .query(SCHEMA)
            .await
            .map_err(SparkPilotError::fail_to_connect_datastore)?
            .check()
            .map_err(SparkPilotError::fail_to_connect_datastore)?;
        Ok(Self { client })
    }

    /// A unique-index violation surfaces as a datastore error whose message
    /// names the index; everything else is an infrastructure failure.
    fn map_create_error(error: surrealdb::Error) -> SparkPilotError {
        if error.to_string().contains("already contains") {
            SparkPilotError::conflict(error)
        } else {
            SparkPilotError::fail_to_update_datastore(error)
        }
    }

    async fn create<T>(&self, table: &'static str, id: String, info: T) -> Result<()>
    where
        T: Serialize + Send + Sync + 'static,
    {
        let sql = r#"
            CREATE type::thing($tb, $id) SET info = $info RETURN NONE;
        "#;
        self.client
            .query(sql)
            .bind(("tb", table))
            .bind(("id", id))
            .bind(("info", info))
            .await
            .map_err(SparkPilotError::fail_to_update_datastore)?
            .check()
            .map_err(Self::map_create_error)?;
        Ok(())
    }

    async fn update<T>(&self, table: &'static str, id: String, info: T) -> Result<()>
    where
        T: Serialize + Send + Sync + 'static,
    {
        let sql = r#"
            UPDATE type::thing($tb, $id) SET info = $info RETURN NONE;
        "#;
        self.client
            .query(sql)
            .bind(("tb", table))
            .bind(("id", id))
            .bind(("info", info))
            .await
            .map_err(SparkPilotError::fail_to_update_datastore)?
            .check()
            .map_err(SparkPilotError::fail_to_update_datastore)?;
        Ok(())
    }

    async fn get<T>(&self, table: &'static str, id: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let sql = r#"
            SELECT VALUE info FROM ONLY type::thing($tb, $id);
        "#;
        let info: Option<T> = self
            .client
            .query(sql)
            .bind(("tb", table))
            .bind(("id", id.to_owned()))
            .await
            .map_err(SparkPilotError::fail_to_read_datastore)?
            .take(0)
            .map_err(SparkPilotError::fail_to_read_datastore)?;
        Ok(info)
    }

    async fn select_all<T>(&self, table: &'static str) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let sql = r#"
            SELECT VALUE info FROM type::table($tb);
        "#;
        let rows: Vec<T> = self
            .client
            .query(sql)
            .bind(("tb", table))
            .await
            .map_err(SparkPilotError::fail_to_read_datastore)?
            .take(0)
            .map_err(SparkPilotError::fail_to_read_datastore)?;
        Ok(rows)
    }
}

#[async_trait]
impl Store for SurrealStore {
    async fn insert_tenant(&self, tenant: Tenant) -> Result<Tenant> {
        self.create(Self::TENANTS, tenant.id.clone(), tenant.clone())
            .await?;
        Ok(tenant)
    }

    async fn get_tenant(&self, id: &str) -> Result<Option<Tenant>> {
        self.get(Self::TENANTS, id).await
    }

    async fn find_tenant_by_name(&self, name: &str) -> Result<Option<Tenant>> {
        let sql = r#"
            SELECT VALUE info FROM type::table($tb) WHERE info.name = $name;
        "#;
        let tenants: Vec<Tenant> = self
            .client
            .query(sql)
            .bind(("tb", Self::TENANTS))
            .bind(("name", name.to_owned()))
            .await
            .map_err(SparkPilotError::fail_to_read_datastore)?
            .take(0)
            .map_err(SparkPilotError::fail_to_read_datastore)?;
        Ok(tenants.into_iter().next())
    }

    async fn insert_environment(
        &self,
        environment: Environment,
        operation: ProvisioningOperation,
    ) -> Result<()> {
        let sql = r#"
            BEGIN TRANSACTION;
            CREATE type::thing($env_tb, $env_id) SET info = $env RETURN NONE;
            CREATE type::thing($op_tb, $op_id) SET info = $op RETURN NONE;
            COMMIT TRANSACTION;
        "#;
        self.client
            .query(sql)
            .bind(("env_tb", Self::ENVIRONMENTS))
            .bind(("env_id", environment.id.clone()))
            .bind(("env", environment))
            .bind(("op_tb", Self::OPERATIONS))
            .bind(("op_id", operation.id.clone()))
            .bind(("op", operation))
            .await
            .map_err(SparkPilotError::fail_to_update_datastore)?
            .check()
            .map_err(SparkPilotError::fail_to_update_datastore)?;
        Ok(())
    }

    async fn get_environment(&self, id: &str) -> Result<Option<Environment>> {
        self.get(Self::ENVIRONMENTS, id).await
    }

    async fn list_environments(&self, tenant_id: Option<&str>) -> Result<Vec<Environment>> {
        let mut environments: Vec<Environment> = match tenant_id {
            Some(tenant_id) => {
                let sql = r#"
                    SELECT VALUE info FROM type::table($tb) WHERE info.tenant_id = $tenant_id;
                "#;
                self.client
                    .query(sql)
                    .bind(("tb", Self::ENVIRONMENTS))
                    .bind(("tenant_id", tenant_id.to_owned()))
                    .await
                    .map_err(SparkPilotError::fail_to_read_datastore)?
                    .take(0)
                    .map_err(SparkPilotError::fail_to_read_datastore)?
            }
            None => self.select_all(Self::ENVIRONMENTS).await?,
        };
        environments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(environments)
    }

    async fn update_environment(&self, environment: &Environment) -> Result<()> {
        self.update(
            Self::ENVIRONMENTS,
            environment.id.clone(),
            environment.clone(),
        )
        .await
    }

    async fn get_operation(&self, id: &str) -> Result<Option<ProvisioningOperation>> {
        self.get(Self::OPERATIONS, id).await
    }

    async fn list_pending_operations(&self) -> Result<Vec<ProvisioningOperation>> {
        let mut states = vec![ProvisioningState::Queued];
        states.extend(ProvisioningState::FULL_STEPS);
        let sql = r#"
            SELECT VALUE info FROM type::table($tb) WHERE info.state IN $states;
        "#;
        let mut operations: Vec<ProvisioningOperation> = self
            .client
            .query(sql)
            .bind(("tb", Self::OPERATIONS))
            .bind(("states", states))
            .await
            .map_err(SparkPilotError::fail_to_read_datastore)?
            .take(0)
            .map_err(SparkPilotError::fail_to_read_datastore)?;
        operations.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(operations)
    }

    async fn update_operation(&self, operation: &ProvisioningOperation) -> Result<()> {
        self.update(Self::OPERATIONS, operation.id.clone(), operation.clone())
            .await
    }

    async fn insert_job(&self, job: Job) -> Result<Job> {
        self.create(Self::JOBS, job.id.clone(), job.clone()).await?;
        Ok(job)
    }

    async fn get_job(&self, id: &str) -> Result<Option<Job>> {
        self.get(Self::JOBS, id).await
    }

    async fn insert_run(&self, run: Run) -> Result<Run> {
        self.create(Self::RUNS, run.id.clone(), run.clone()).await?;
        Ok(run)
    }

    async fn get_run(&self, id: &str) -> Result<Option<Run>> {
        self.get(Self::RUNS, id).await
    }

    async fn find_run_by_idempotency(
        &self,
        job_id: &str,
        idempotency_key: &str,
    ) -> Result<Option<Run>> {
        let sql = r#"
            SELECT VALUE info FROM type::table($tb)
            WHERE info.job_id = $job_id AND info.idempotency_key = $key;
        "#;
        let runs: Vec<Run> = self
            .client
            .query(sql)
            .bind(("tb", Self::RUNS))
            .bind(("job_id", job_id.to_owned()))
            .bind(("key", idempotency_key.to_owned()))
            .await
            .map_err(SparkPilotError::fail_to_read_datastore)?
            .take(0)
            .map_err(SparkPilotError::fail_to_read_datastore)?;
        Ok(runs.into_iter().next())
    }

    async fn list_runs(
        &self,
        tenant_id: Option<&str>,
        state: Option<RunState>,
    ) -> Result<Vec<Run>> {
        let mut runs: Vec<Run> = match state {
            Some(state) => {
                let sql = r#"
                    SELECT VALUE info FROM type::table($tb) WHERE info.state = $state;
                "#;
                self.client
                    .query(sql)
                    .bind(("tb", Self::RUNS))
                    .bind(("state", state))
                    .await
                    .map_err(SparkPilotError::fail_to_read_datastore)?
                    .take(0)
                    .map_err(SparkPilotError::fail_to_read_datastore)?
            }
            None => self.select_all(Self::RUNS).await?,
        };
        if let Some(tenant_id) = tenant_id {
            let environment_ids: HashSet<String> = self
                .list_environments(Some(tenant_id))
                .await?
                .into_iter()
                .map(|environment| environment.id)
                .collect();
            runs.retain(|run| environment_ids.contains(&run.environment_id));
        }
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(runs)
    }

    async fn list_runs_in_states(
        &self,
        environment_id: Option<&str>,
        states: &[RunState],
    ) -> Result<Vec<Run>> {
        let runs: Vec<Run> = match environment_id {
            Some(environment_id) => {
                let sql = r#"
                    SELECT VALUE info FROM type::table($tb)
                    WHERE info.environment_id = $env_id AND info.state IN $states;
                "#;
                self.client
                    .query(sql)
                    .bind(("tb", Self::RUNS))
                    .bind(("env_id", environment_id.to_owned()))
                    .bind(("states", states.to_vec()))
                    .await
                    .map_err(SparkPilotError::fail_to_read_datastore)?
                    .take(0)
                    .map_err(SparkPilotError::fail_to_read_datastore)?
            }
            None => {
                let sql = r#"
                    SELECT VALUE info FROM type::table($tb) WHERE info.state IN $states;
                "#;
                self.client
                    .query(sql)
                    .bind(("tb", Self::RUNS))
                    .bind(("states", states.to_vec()))
                    .await
                    .map_err(SparkPilotError::fail_to_read_datastore)?
                    .take(0)
                    .map_err(SparkPilotError::fail_to_read_datastore)?
            }
        };
        Ok(runs)
    }

    async fn update_run(&self, run: &Run) -> Result<()> {
        self.update(Self::RUNS, run.id.clone(), run.clone()).await
    }

    async fn insert_usage_if_absent(&self, record: UsageRecord) -> Result<bool> {
        let sql = r#"
            BEGIN TRANSACTION;
            {
                LET $existing = (SELECT VALUE info FROM type::table($tb) WHERE info.run_id = $run_id);
                IF array::len($existing) > 0 {
                    RETURN false;
                } ELSE {
                    CREATE type::thing($tb, $id) SET info = $info RETURN NONE;
                    RETURN true;
                };
            };
            COMMIT TRANSACTION;
        "#;
        let inserted: Option<bool> = self
            .client
            .query(sql)
            .bind(("tb", Self::USAGE))
            .bind(("run_id", record.run_id.clone()))
            .bind(("id", record.id.clone()))
            .bind(("info", record))
            .await
            .map_err(SparkPilotError::fail_to_update_datastore)?
            .take(0)
            .map_err(SparkPilotError::fail_to_update_datastore)?;
        inserted.map_or_else(
            || {
                SparkPilotError::fail_to_update_datastore(anyhow!(
                    "Conditional usage insert returned no result."
                ))
                .into()
            },
            Ok,
        )
    }

    async fn list_usage(&self, tenant_id: &str) -> Result<Vec<UsageRecord>> {
        let sql = r#"
            SELECT VALUE info FROM type::table($tb) WHERE info.tenant_id = $tenant_id;
        "#;
        let mut records: Vec<UsageRecord> = self
            .client
            .query(sql)
            .bind(("tb", Self::USAGE))
            .bind(("tenant_id", tenant_id.to_owned()))
            .await
            .map_err(SparkPilotError::fail_to_read_datastore)?
            .take(0)
            .map_err(SparkPilotError::fail_to_read_datastore)?;
        records.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at));
        Ok(records)
    }

    async fn append_audit(&self, event: AuditEvent) -> Result<()> {
        self.create(Self::AUDIT, event.id.clone(), event).await
    }

    async fn list_audit_events(&self, entity_id: Option<&str>) -> Result<Vec<AuditEvent>> {
        let mut events: Vec<AuditEvent> = match entity_id {
            Some(entity_id) => {
                let sql = r#"
                    SELECT VALUE info FROM type::table($tb) WHERE info.entity_id = $entity_id;
                "#;
                self.client
                    .query(sql)
                    .bind(("tb", Self::AUDIT))
                    .bind(("entity_id", entity_id.to_owned()))
                    .await
                    .map_err(SparkPilotError::fail_to_read_datastore)?
                    .take(0)
                    .map_err(SparkPilotError::fail_to_read_datastore)?
            }
            None => self.select_all(Self::AUDIT).await?,
        };
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(events)
    }

    async fn get_idempotency(&self, scope: &str, key: &str) -> Result<Option<IdempotencyRecord>> {
        let sql = r#"
            SELECT VALUE info FROM type::table($tb)
            WHERE info.scope = $scope AND info.key = $key;
        "#;
        let records: Vec<IdempotencyRecord> = self
            .client
            .query(sql)
            .bind(("tb", Self::IDEMPOTENCY))
            .bind(("scope", scope.to_owned()))
            .bind(("key", key.to_owned()))
            .await
            .map_err(SparkPilotError::fail_to_read_datastore)?
            .take(0)
            .map_err(SparkPilotError::fail_to_read_datastore)?;
        Ok(records.into_iter().next())
    }

    async fn insert_idempotency(&self, record: IdempotencyRecord) -> Result<()> {
        self.create(Self::IDEMPOTENCY, record.id.clone(), record)
            .await
    }
}

#[cfg(test)]
mod tests {
    use ::serde_json::json;

    use crate::entity::{
        new_id, CreateEnvironmentRequest, CreateJobRequest, CreateRunRequest, EnvironmentQuotas,
        ProvisioningMode,
    };
    use crate::error::ErrorKind;

    use super::*;

    async fn mem_store() -> SurrealStore {
        SurrealStore::connect(&DatabaseConfig {
            uri: "mem://".to_owned(),
            credentials: None,
        })
        .await
        .unwrap()
    }

    fn environment(tenant_id: &str) -> Environment {
        Environment::try_from(CreateEnvironmentRequest {
            tenant_id: tenant_id.to_owned(),
            provisioning_mode: ProvisioningMode::Full,
            region: "us-east-1".to_owned(),
            customer_role_arn: "arn:aws:iam::123456789012:role/Pilot".to_owned(),
            eks_cluster_arn: None,
            eks_namespace: None,
            warm_pool_enabled: false,
            quotas: EnvironmentQuotas::default(),
        })
        .unwrap()
    }

    fn job(environment_id: &str) -> Job {
        Job::from(CreateJobRequest {
            environment_id: environment_id.to_owned(),
            name: "daily".to_owned(),
            artifact_uri: "s3://bucket/daily.jar".to_owned(),
            artifact_digest: "sha256:abc123".to_owned(),
            entrypoint: "com.acme.Daily".to_owned(),
            args: vec![],
            spark_conf: Default::default(),
            retry_max_attempts: 1,
            timeout_seconds: 7200,
        })
    }

    #[tokio::test]
    async fn tenant_roundtrip() {
        let store = mem_store().await;
        let tenant = store.insert_tenant(Tenant::new("Acme".to_owned())).await.unwrap();
        let fetched = store.get_tenant(&tenant.id).await.unwrap();
        assert_eq!(fetched, Some(tenant.clone()));
        let by_name = store.find_tenant_by_name("Acme").await.unwrap();
        assert_eq!(by_name, Some(tenant));
        assert_eq!(store.find_tenant_by_name("Other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_tenant_name_is_a_conflict() {
        let store = mem_store().await;
        store.insert_tenant(Tenant::new("Acme".to_owned())).await.unwrap();
        let error = store
            .insert_tenant(Tenant::new("Acme".to_owned()))
            .await
            .unwrap_err();
        assert_eq!(error.get_kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn environment_and_operation_are_created_together() {
        let store = mem_store().await;
        let env = environment("t-1");
        let op = ProvisioningOperation::new(&env, "k-1".to_owned());
        store.insert_environment(env.clone(), op.clone()).await.unwrap();

        assert_eq!(store.get_environment(&env.id).await.unwrap(), Some(env.clone()));
        assert_eq!(store.get_operation(&op.id).await.unwrap(), Some(op.clone()));

        let pending = store.list_pending_operations().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, op.id);
    }

    #[tokio::test]
    async fn terminal_operations_are_not_pending() {
        let store = mem_store().await;
        let env = environment("t-1");
        let mut op = ProvisioningOperation::new(&env, "k-1".to_owned());
        store.insert_environment(env, op.clone()).await.unwrap();
        op.finish_ready("done".to_owned());
        store.update_operation(&op).await.unwrap();
        assert!(store.list_pending_operations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_environments_filters_by_tenant() {
        let store = mem_store().await;
        let env_a = environment("t-a");
        let op_a = ProvisioningOperation::new(&env_a, "k-a".to_owned());
        let env_b = environment("t-b");
        let op_b = ProvisioningOperation::new(&env_b, "k-b".to_owned());
        store.insert_environment(env_a.clone(), op_a).await.unwrap();
        store.insert_environment(env_b, op_b).await.unwrap();

        let for_a = store.list_environments(Some("t-a")).await.unwrap();
        assert_eq!(for_a.len(), 1);
        assert_eq!(for_a[0].id, env_a.id);
        assert_eq!(store.list_environments(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn duplicate_run_idempotency_key_is_a_conflict() {
        let store = mem_store().await;
        let env = environment("t-1");
        let job = job(&env.id);
        let request = CreateRunRequest::default();
        let first = Run::new(&job, &env, &request, "run-key".to_owned());
        let second = Run::new(&job, &env, &request, "run-key".to_owned());
        store.insert_run(first.clone()).await.unwrap();
        let error = store.insert_run(second).await.unwrap_err();
        assert_eq!(error.get_kind(), ErrorKind::Conflict);

        let found = store
            .find_run_by_idempotency(&job.id, "run-key")
            .await
            .unwrap();
        assert_eq!(found.map(|run| run.id), Some(first.id));
    }

    #[tokio::test]
    async fn list_runs_in_states_scopes_to_environment() {
        let store = mem_store().await;
        let env = environment("t-1");
        let other = environment("t-1");
        let job_a = job(&env.id);
        let job_b = job(&other.id);
        let request = CreateRunRequest::default();
        store
            .insert_run(Run::new(&job_a, &env, &request, new_id()))
            .await
            .unwrap();
        store
            .insert_run(Run::new(&job_b, &other, &request, new_id()))
            .await
            .unwrap();

        let scoped = store
            .list_runs_in_states(Some(&env.id), &RunState::ACTIVE)
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].environment_id, env.id);

        let queued = store
            .list_runs_in_states(None, &[RunState::Queued])
            .await
            .unwrap();
        assert_eq!(queued.len(), 2);
        assert!(store
            .list_runs_in_states(None, &[RunState::Running])
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn run_update_is_read_back() {
        let store = mem_store().await;
        let env = environment("t-1");
        let job = job(&env.id);
        let mut run = store
            .insert_run(Run::new(
                &job,
                &env,
                &CreateRunRequest::default(),
                new_id(),
            ))
            .await
            .unwrap();
        run.state = RunState::Dispatching;
        run.touch();
        store.update_run(&run).await.unwrap();
        let fetched = store.get_run(&run.id).await.unwrap().unwrap();
        assert_eq!(fetched.state, RunState::Dispatching);
    }

    #[tokio::test]
    async fn usage_insert_is_idempotent_per_run() {
        let store = mem_store().await;
        let first = UsageRecord::new("t-1".to_owned(), "r-1".to_owned(), 100, 400, 5100);
        let second = UsageRecord::new("t-1".to_owned(), "r-1".to_owned(), 999, 999, 999);
        assert!(store.insert_usage_if_absent(first).await.unwrap());
        assert!(!store.insert_usage_if_absent(second).await.unwrap());

        let records = store.list_usage("t-1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].vcpu_seconds, 100);
    }

    #[tokio::test]
    async fn idempotency_record_roundtrip() {
        let store = mem_store().await;
        let record = IdempotencyRecord::new(
            "POST:/v1/tenants".to_owned(),
            "k-1".to_owned(),
            "fp".to_owned(),
            json!({"id": "t-1"}),
            201,
            Some("tenant".to_owned()),
            Some("t-1".to_owned()),
        );
        store.insert_idempotency(record.clone()).await.unwrap();
        let fetched = store
            .get_idempotency("POST:/v1/tenants", "k-1")
            .await
            .unwrap();
        assert_eq!(fetched, Some(record));
        assert_eq!(
            store.get_idempotency("POST:/v1/jobs", "k-1").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn audit_events_filter_by_entity() {
        let store = mem_store().await;
        store
            .append_audit(AuditEvent::new("u", "tenant.create", "tenant", "t-1"))
            .await
            .unwrap();
        store
            .append_audit(AuditEvent::new("u", "run.create", "run", "r-1"))
            .await
            .unwrap();
        let for_run = store.list_audit_events(Some("r-1")).await.unwrap();
        assert_eq!(for_run.len(), 1);
        assert_eq!(for_run[0].action, "run.create");
        assert_eq!(store.list_audit_events(None).await.unwrap().len(), 2);
    }
}
