use ::core::fmt::Display;
use ::std::time::Duration;

use ::clap::{Parser, ValueEnum};
use ::sparkpilot_common::{
    config::Settings,
    error::Result,
    store::{surrealdb_client::SurrealStore, Store},
    tokio,
    tracing::{error, info},
    tracing_subscriber,
};
use ::sparkpilot_engine::{dry_run::DryRunEngine, emr_eks::EmrEksEngine, EngineAdapter};
use ::sparkpilot_workers::{
    provisioner::process_provisioner_once, reconciler::process_reconciler_once,
    scheduler::process_scheduler_once,
};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum WorkerKind {
    Provisioner,
    Scheduler,
    Reconciler,
}

impl Display for WorkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            WorkerKind::Provisioner => "provisioner",
            WorkerKind::Scheduler => "scheduler",
            WorkerKind::Reconciler => "reconciler",
        };
        write!(f, "{}", label)
    }
}

/// Command line arguments for the SparkPilot worker process.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct WorkerArgs {
    /// Worker loop to run.
    #[arg(value_enum)]
    worker: WorkerKind,

    /// Run one pass and exit.
    #[arg(long)]
    once: bool,

    #[command(flatten)]
    settings: Settings,
}

#[tokio::main]
async fn main() -> Result<()> {
    // setup tracing
    tracing_subscriber::fmt::init();

    let args = WorkerArgs::parse();
    info!("Start SparkPilot {} worker", args.worker);
    let store = SurrealStore::connect(&args.settings.database()).await?;
    if args.settings.dry_run_mode {
        let engine = DryRunEngine::new(args.settings.clone());
        run_worker(args, store, engine).await
    } else {
        let engine = EmrEksEngine::new(args.settings.clone());
        run_worker(args, store, engine).await
    }
}

async fn run_worker<S, E>(args: WorkerArgs, store: S, engine: E) -> Result<()>
where
    S: Store,
    E: EngineAdapter,
{
    let limit = args.settings.queue_batch_size;
    let interval = Duration::from_secs(args.settings.poll_interval_seconds);
    loop {
        let result = match args.worker {
            WorkerKind::Provisioner => process_provisioner_once(&store, &engine).await,
            WorkerKind::Scheduler => process_scheduler_once(&store, &engine, limit).await,
            WorkerKind::Reconciler => process_reconciler_once(&store, &engine, limit).await,
        };
        match result {
            Ok(processed) => info!("[{}] processed={}", args.worker, processed),
            // failed batches are re-picked on the next pass
            Err(pass_error) => error!("[{}] pass failed: {}", args.worker, pass_error),
        }
        if args.once {
            return Ok(());
        }
        // the in-flight pass always completes; shutdown lands between passes
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("[{}] shutting down", args.worker);
                return Ok(());
            }
        }
    }
}
