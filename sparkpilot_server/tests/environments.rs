mod common;

use ::http::StatusCode;
use ::serde_json::{json, Value};
use ::sparkpilot_common::{error::Result, tokio};

use common::{create_environment, create_tenant, get_test_server, post_json};

#[tokio::test]
async fn create_environment_returns_a_queued_operation() -> Result<()> {
    let (server, _store) = get_test_server().await?;
    let tenant = create_tenant(&server, "Pilot Corp", "tenant-1").await;
    let tenant_id = tenant["id"].as_str().unwrap();

    let operation = create_environment(&server, tenant_id, 5, 128, "env-1").await;
    assert_eq!(operation["state"], "queued");
    assert_eq!(operation["step"], "queued");
    assert!(operation["ended_at"].is_null());
    assert!(operation["logs_uri"]
        .as_str()
        .unwrap()
        .starts_with("s3://sparkpilot-ops/provisioning/"));

    let environment_id = operation["environment_id"].as_str().unwrap();
    let environment = server
        .get(&format!("/v1/environments/{}", environment_id))
        .await;
    environment.assert_status_ok();
    let environment = environment.json::<Value>();
    assert_eq!(environment["status"], "provisioning");
    assert_eq!(environment["tenant_id"], tenant_id);
    assert_eq!(environment["max_concurrent_runs"], 5);
    assert!(environment["engine_virtual_cluster_id"].is_null());
    Ok(())
}

#[tokio::test]
async fn environment_for_unknown_tenant_is_not_found() -> Result<()> {
    let (server, _store) = get_test_server().await?;
    let response = post_json(
        &server,
        "/v1/environments",
        "env-1",
        &json!({
            "tenant_id": "no-such-tenant",
            "customer_role_arn": "arn:aws:iam::123456789012:role/Pilot",
        }),
    )
    .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert!(response.text().contains("Tenant not found."));
    Ok(())
}

#[tokio::test]
async fn byoc_lite_requires_cluster_arn_and_namespace() -> Result<()> {
    let (server, _store) = get_test_server().await?;
    let tenant = create_tenant(&server, "Pilot Corp", "tenant-1").await;
    let tenant_id = tenant["id"].as_str().unwrap();

    let missing_cluster = post_json(
        &server,
        "/v1/environments",
        "env-1",
        &json!({
            "tenant_id": tenant_id,
            "provisioning_mode": "byoc_lite",
            "customer_role_arn": "arn:aws:iam::123456789012:role/Pilot",
            "eks_namespace": "spark",
        }),
    )
    .await;
    missing_cluster.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert!(missing_cluster
        .text()
        .contains("eks_cluster_arn is required for byoc_lite."));

    let missing_namespace = post_json(
        &server,
        "/v1/environments",
        "env-2",
        &json!({
            "tenant_id": tenant_id,
            "provisioning_mode": "byoc_lite",
            "customer_role_arn": "arn:aws:iam::123456789012:role/Pilot",
            "eks_cluster_arn": "arn:aws:eks:us-east-1:123456789012:cluster/byoc",
        }),
    )
    .await;
    missing_namespace.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert!(missing_namespace
        .text()
        .contains("eks_namespace is required for byoc_lite."));
    Ok(())
}

#[tokio::test]
async fn list_environments_filters_by_tenant() -> Result<()> {
    let (server, _store) = get_test_server().await?;
    let tenant_a = create_tenant(&server, "Tenant A", "tenant-a").await;
    let tenant_b = create_tenant(&server, "Tenant B", "tenant-b").await;
    let tenant_a_id = tenant_a["id"].as_str().unwrap();
    let tenant_b_id = tenant_b["id"].as_str().unwrap();
    create_environment(&server, tenant_a_id, 5, 128, "env-a").await;
    create_environment(&server, tenant_b_id, 5, 128, "env-b").await;

    let all = server.get("/v1/environments").await.json::<Value>();
    assert_eq!(all.as_array().unwrap().len(), 2);

    let for_a = server
        .get(&format!("/v1/environments?tenant_id={}", tenant_a_id))
        .await
        .json::<Value>();
    assert_eq!(for_a.as_array().unwrap().len(), 1);
    assert_eq!(for_a[0]["tenant_id"], tenant_a_id);
    Ok(())
}

#[tokio::test]
async fn get_provisioning_operation_by_id() -> Result<()> {
    let (server, _store) = get_test_server().await?;
    let tenant = create_tenant(&server, "Pilot Corp", "tenant-1").await;
    let operation =
        create_environment(&server, tenant["id"].as_str().unwrap(), 5, 128, "env-1").await;
    let operation_id = operation["id"].as_str().unwrap();

    let fetched = server
        .get(&format!("/v1/provisioning-operations/{}", operation_id))
        .await;
    fetched.assert_status_ok();
    assert_eq!(fetched.json::<Value>()["id"], operation_id);

    let missing = server.get("/v1/provisioning-operations/nope").await;
    missing.assert_status_not_found();
    Ok(())
}

#[tokio::test]
async fn get_unknown_environment_is_not_found() -> Result<()> {
    let (server, _store) = get_test_server().await?;
    let response = server.get("/v1/environments/nope").await;
    response.assert_status_not_found();
    assert!(response.text().contains("Environment not found."));
    Ok(())
}

#[tokio::test]
async fn environment_create_replays_the_operation() -> Result<()> {
    let (server, _store) = get_test_server().await?;
    let tenant = create_tenant(&server, "Pilot Corp", "tenant-1").await;
    let tenant_id = tenant["id"].as_str().unwrap();

    let first = create_environment(&server, tenant_id, 5, 128, "env-1").await;
    let second = create_environment(&server, tenant_id, 5, 128, "env-1").await;
    assert_eq!(first["id"], second["id"]);
    assert_eq!(first["environment_id"], second["environment_id"]);

    let environments = server.get("/v1/environments").await.json::<Value>();
    assert_eq!(environments.as_array().unwrap().len(), 1);
    Ok(())
}
