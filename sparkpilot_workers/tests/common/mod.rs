use ::sparkpilot_common::{
    config::{DatabaseConfig, Settings},
    entity::{
        CreateEnvironmentRequest, CreateJobRequest, CreateRunRequest, Environment,
        EnvironmentQuotas, Job, ProvisioningMode, ProvisioningOperation, Run, Tenant,
    },
    store::{surrealdb_client::SurrealStore, Store},
};
use ::sparkpilot_engine::dry_run::DryRunEngine;

pub async fn mem_store() -> SurrealStore {
    SurrealStore::connect(&DatabaseConfig {
        uri: "mem://".to_owned(),
        credentials: None,
    })
    .await
    .unwrap()
}

pub fn dry_run_engine() -> DryRunEngine {
    DryRunEngine::new(Settings::default())
}

/// Tenant plus a provisioning environment with its queued operation.
pub async fn seeded_environment(
    store: &SurrealStore,
    mode: ProvisioningMode,
    customer_role_arn: &str,
    eks_cluster_arn: Option<&str>,
    eks_namespace: Option<&str>,
) -> (Tenant, Environment, ProvisioningOperation) {
    let tenant = store
        .insert_tenant(Tenant::new(format!("tenant-{}", sparkpilot_common::entity::new_id())))
        .await
        .unwrap();
    let environment = Environment::try_from(CreateEnvironmentRequest {
        tenant_id: tenant.id.clone(),
        provisioning_mode: mode,
        region: "us-east-1".to_owned(),
        customer_role_arn: customer_role_arn.to_owned(),
        eks_cluster_arn: eks_cluster_arn.map(str::to_owned),
        eks_namespace: eks_namespace.map(str::to_owned),
        warm_pool_enabled: false,
        quotas: EnvironmentQuotas {
            max_concurrent_runs: 5,
            max_vcpu: 128,
            max_run_seconds: 7200,
        },
    })
    .unwrap();
    let operation = ProvisioningOperation::new(&environment, "env-key".to_owned());
    store
        .insert_environment(environment.clone(), operation.clone())
        .await
        .unwrap();
    (tenant, environment, operation)
}

pub async fn seeded_job(store: &SurrealStore, environment: &Environment) -> Job {
    store
        .insert_job(Job::from(CreateJobRequest {
            environment_id: environment.id.clone(),
            name: "daily-aggregation".to_owned(),
            artifact_uri: "s3://acme-artifacts/jobs/daily.jar".to_owned(),
            artifact_digest: "sha256:abc123".to_owned(),
            entrypoint: "com.acme.jobs.Daily".to_owned(),
            args: vec!["--date".to_owned(), "2026-02-17".to_owned()],
            spark_conf: Default::default(),
            retry_max_attempts: 2,
            timeout_seconds: 1800,
        }))
        .await
        .unwrap()
}

pub async fn queued_run(
    store: &SurrealStore,
    job: &Job,
    environment: &Environment,
    idempotency_key: &str,
) -> Run {
    store
        .insert_run(Run::new(
            job,
            environment,
            &CreateRunRequest::default(),
            idempotency_key.to_owned(),
        ))
        .await
        .unwrap()
}
