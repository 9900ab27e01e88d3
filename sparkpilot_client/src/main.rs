//! SparkPilot CLI.

use ::clap::{Parser, Subcommand};
use ::sparkpilot_client::ControlClient;
use ::sparkpilot_common::{
    anyhow::Result,
    entity::{
        CreateEnvironmentRequest, CreateJobRequest, CreateRunRequest, CreateTenantRequest,
        EnvironmentQuotas, ProvisioningMode, RequestedResources,
    },
    serde::Serialize,
    serde_json, tokio,
};

#[derive(Parser, Debug)]
#[command(version, about = "SparkPilot CLI", long_about = None)]
struct Cli {
    #[arg(long, default_value = "http://localhost:8000")]
    base_url: String,

    #[arg(long, default_value = "cli-user")]
    actor: String,

    #[arg(long)]
    idempotency_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a tenant.
    TenantCreate {
        #[arg(long)]
        name: String,
    },
    /// Create an execution environment.
    EnvCreate {
        #[arg(long)]
        tenant_id: String,
        #[arg(long)]
        customer_role_arn: String,
        #[arg(long, value_enum, default_value_t = ProvisioningModeArg::Full)]
        provisioning_mode: ProvisioningModeArg,
        #[arg(long)]
        eks_cluster_arn: Option<String>,
        #[arg(long)]
        eks_namespace: Option<String>,
        #[arg(long, default_value = "us-east-1")]
        region: String,
        #[arg(long)]
        warm_pool_enabled: bool,
        #[arg(long, default_value_t = 10)]
        max_concurrent_runs: u32,
        #[arg(long, default_value_t = 256)]
        max_vcpu: u64,
        #[arg(long, default_value_t = 7200)]
        max_run_seconds: u64,
    },
    /// List environments.
    EnvList {
        #[arg(long)]
        tenant_id: Option<String>,
    },
    /// Show one environment.
    EnvGet {
        #[arg(long)]
        environment_id: String,
    },
    /// Show one provisioning operation.
    OpGet {
        #[arg(long)]
        operation_id: String,
    },
    /// Register a job.
    JobCreate {
        #[arg(long)]
        environment_id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        artifact_uri: String,
        #[arg(long)]
        artifact_digest: String,
        #[arg(long)]
        entrypoint: String,
        #[arg(long)]
        arg: Vec<String>,
        #[arg(long, default_value_t = 1)]
        retry_max_attempts: u32,
        #[arg(long, default_value_t = 7200)]
        timeout_seconds: u64,
    },
    /// Submit a run for a job.
    RunSubmit {
        #[arg(long)]
        job_id: String,
        #[arg(long, default_value_t = 1)]
        driver_vcpu: u64,
        #[arg(long, default_value_t = 4)]
        driver_memory_gb: u64,
        #[arg(long, default_value_t = 2)]
        executor_vcpu: u64,
        #[arg(long, default_value_t = 8)]
        executor_memory_gb: u64,
        #[arg(long, default_value_t = 2)]
        executor_instances: u64,
        #[arg(long)]
        timeout_seconds: Option<u64>,
    },
    /// Show one run.
    RunGet {
        #[arg(long)]
        run_id: String,
    },
    /// List runs.
    RunList {
        #[arg(long)]
        tenant_id: Option<String>,
        #[arg(long)]
        state: Option<String>,
    },
    /// Request cancellation of a run.
    RunCancel {
        #[arg(long)]
        run_id: String,
    },
    /// Fetch a bounded log snapshot for a run.
    RunLogs {
        #[arg(long)]
        run_id: String,
        #[arg(long, default_value_t = 200)]
        limit: usize,
    },
    /// Report usage for a tenant.
    Usage {
        #[arg(long)]
        tenant_id: String,
        #[arg(long)]
        from_ts: Option<String>,
        #[arg(long)]
        to_ts: Option<String>,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ProvisioningModeArg {
    Full,
    ByocLite,
}

impl From<ProvisioningModeArg> for ProvisioningMode {
    fn from(value: ProvisioningModeArg) -> Self {
        match value {
            ProvisioningModeArg::Full => ProvisioningMode::Full,
            ProvisioningModeArg::ByocLite => ProvisioningMode::ByocLite,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = ControlClient::new(&cli.base_url, &cli.actor);
    let key = cli.idempotency_key.as_deref();

    match cli.command {
        Command::TenantCreate { name } => {
            let tenant = client
                .create_tenant(&CreateTenantRequest { name }, key)
                .await?;
            print_json(&tenant)
        }
        Command::EnvCreate {
            tenant_id,
            customer_role_arn,
            provisioning_mode,
            eks_cluster_arn,
            eks_namespace,
            region,
            warm_pool_enabled,
            max_concurrent_runs,
            max_vcpu,
            max_run_seconds,
        } => {
            let request = CreateEnvironmentRequest {
                tenant_id,
                provisioning_mode: provisioning_mode.into(),
                region,
                customer_role_arn,
                eks_cluster_arn,
                eks_namespace,
                warm_pool_enabled,
                quotas: EnvironmentQuotas {
                    max_concurrent_runs,
                    max_vcpu,
                    max_run_seconds,
                },
            };
            let operation = client.create_environment(&request, key).await?;
            print_json(&operation)
        }
        Command::EnvList { tenant_id } => {
            let environments = client.list_environments(tenant_id.as_deref()).await?;
            print_json(&environments)
        }
        Command::EnvGet { environment_id } => {
            let environment = client.get_environment(&environment_id).await?;
            print_json(&environment)
        }
        Command::OpGet { operation_id } => {
            let operation = client.get_provisioning_operation(&operation_id).await?;
            print_json(&operation)
        }
        Command::JobCreate {
            environment_id,
            name,
            artifact_uri,
            artifact_digest,
            entrypoint,
            arg,
            retry_max_attempts,
            timeout_seconds,
        } => {
            let request = CreateJobRequest {
                environment_id,
                name,
                artifact_uri,
                artifact_digest,
                entrypoint,
                args: arg,
                spark_conf: Default::default(),
                retry_max_attempts,
                timeout_seconds,
            };
            let job = client.create_job(&request, key).await?;
            print_json(&job)
        }
        Command::RunSubmit {
            job_id,
            driver_vcpu,
            driver_memory_gb,
            executor_vcpu,
            executor_memory_gb,
            executor_instances,
            timeout_seconds,
        } => {
            let request = CreateRunRequest {
                args: None,
                spark_conf: None,
                requested_resources: RequestedResources {
                    driver_vcpu,
                    driver_memory_gb,
                    executor_vcpu,
                    executor_memory_gb,
                    executor_instances,
                },
                timeout_seconds,
            };
            let run = client.submit_run(&job_id, &request, key).await?;
            print_json(&run)
        }
        Command::RunGet { run_id } => {
            let run = client.get_run(&run_id).await?;
            print_json(&run)
        }
        Command::RunList { tenant_id, state } => {
            let runs = client
                .list_runs(tenant_id.as_deref(), state.as_deref())
                .await?;
            print_json(&runs)
        }
        Command::RunCancel { run_id } => {
            let run = client.cancel_run(&run_id, key).await?;
            print_json(&run)
        }
        Command::RunLogs { run_id, limit } => {
            let logs = client.run_logs(&run_id, limit).await?;
            print_json(&logs)
        }
        Command::Usage {
            tenant_id,
            from_ts,
            to_ts,
        } => {
            let usage = client
                .usage(&tenant_id, from_ts.as_deref(), to_ts.as_deref())
                .await?;
            print_json(&usage)
        }
    }
}
