use ::axum_test::{TestResponse, TestServer};
use ::http::{HeaderName, HeaderValue};
use ::serde_json::{json, Value};
use ::sparkpilot_common::{
    config::{DatabaseConfig, Settings},
    entity::EnvironmentStatus,
    error::{Result, SparkPilotError},
    store::{surrealdb_client::SurrealStore, Store},
};
use ::sparkpilot_engine::dry_run::DryRunEngine;
use ::sparkpilot_server::get_server;

/// Server over a fresh in-memory store and the dry-run engine. The store is
/// returned so tests can adjust entities between requests.
pub async fn get_test_server() -> Result<(TestServer, SurrealStore)> {
    let settings = Settings::default();
    let store = SurrealStore::connect(&DatabaseConfig {
        uri: "mem://".to_owned(),
        credentials: None,
    })
    .await?;
    let engine = DryRunEngine::new(settings.clone());
    let app = get_server(store.clone(), engine, settings)?;
    let server = TestServer::new(app).map_err(SparkPilotError::fail_to_start_server)?;
    Ok((server, store))
}

pub async fn post_json(server: &TestServer, path: &str, key: &str, body: &Value) -> TestResponse {
    server
        .post(path)
        .add_header(
            HeaderName::from_static("idempotency-key"),
            HeaderValue::from_str(key).unwrap(),
        )
        .add_header(
            HeaderName::from_static("x-actor"),
            HeaderValue::from_static("test-user"),
        )
        .json(body)
        .await
}

pub async fn create_tenant(server: &TestServer, name: &str, key: &str) -> Value {
    let response = post_json(server, "/v1/tenants", key, &json!({ "name": name })).await;
    response.assert_status(::http::StatusCode::CREATED);
    response.json::<Value>()
}

pub async fn create_environment(
    server: &TestServer,
    tenant_id: &str,
    max_concurrent_runs: u32,
    max_vcpu: u64,
    key: &str,
) -> Value {
    let response = post_json(
        server,
        "/v1/environments",
        key,
        &json!({
            "tenant_id": tenant_id,
            "region": "us-east-1",
            "customer_role_arn": "arn:aws:iam::123456789012:role/SparkPilotCustomerRole",
            "warm_pool_enabled": false,
            "quotas": {
                "max_concurrent_runs": max_concurrent_runs,
                "max_vcpu": max_vcpu,
                "max_run_seconds": 7200,
            },
        }),
    )
    .await;
    response.assert_status(::http::StatusCode::CREATED);
    response.json::<Value>()
}

/// Flip an environment to ready the way the provisioner would.
pub async fn make_environment_ready(store: &SurrealStore, environment_id: &str) {
    let mut environment = store
        .get_environment(environment_id)
        .await
        .unwrap()
        .unwrap();
    environment.status = EnvironmentStatus::Ready;
    environment.engine_virtual_cluster_id = Some("vc-test123456".to_owned());
    environment.touch();
    store.update_environment(&environment).await.unwrap();
}

pub async fn create_job(server: &TestServer, environment_id: &str, key: &str) -> Value {
    let response = post_json(
        server,
        "/v1/jobs",
        key,
        &json!({
            "environment_id": environment_id,
            "name": "daily-aggregation",
            "artifact_uri": "s3://acme-artifacts/jobs/daily.jar",
            "artifact_digest": "sha256:abc123",
            "entrypoint": "com.acme.jobs.Daily",
            "args": ["--date", "2026-02-17"],
            "spark_conf": {"spark.dynamicAllocation.enabled": "true"},
            "retry_max_attempts": 2,
            "timeout_seconds": 1800,
        }),
    )
    .await;
    response.assert_status(::http::StatusCode::CREATED);
    response.json::<Value>()
}

/// A ready environment with a registered job; returns (tenant, environment
/// id, job id).
pub async fn ready_stack(
    server: &TestServer,
    store: &SurrealStore,
    tenant_name: &str,
    max_concurrent_runs: u32,
    max_vcpu: u64,
) -> (Value, String, String) {
    let tenant = create_tenant(server, tenant_name, "tenant-key").await;
    let tenant_id = tenant["id"].as_str().unwrap().to_owned();
    let operation =
        create_environment(server, &tenant_id, max_concurrent_runs, max_vcpu, "env-key").await;
    let environment_id = operation["environment_id"].as_str().unwrap().to_owned();
    make_environment_ready(store, &environment_id).await;
    let job = create_job(server, &environment_id, "job-key").await;
    let job_id = job["id"].as_str().unwrap().to_owned();
    (tenant, environment_id, job_id)
}
