use ::sparkpilot_common::{
    config::ServerArgs,
    error::{Result, SparkPilotError},
    store::surrealdb_client::SurrealStore,
    tokio,
    tracing::info,
    tracing_subscriber,
};
use ::sparkpilot_engine::{dry_run::DryRunEngine, emr_eks::EmrEksEngine};
use ::sparkpilot_server::get_server;

#[tokio::main]
/// Start the SparkPilot control-plane server
async fn main() -> Result<()> {
    // setup tracing
    tracing_subscriber::fmt::init();

    let ServerArgs { settings } = ServerArgs::parse_args();
    let store = SurrealStore::connect(&settings.database()).await?;
    let bind_addr = settings.bind_addr.clone();

    let app = if settings.dry_run_mode {
        let engine = DryRunEngine::new(settings.clone());
        get_server(store, engine, settings)?
    } else {
        let engine = EmrEksEngine::new(settings.clone());
        get_server(store, engine, settings)?
    };

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(SparkPilotError::fail_to_start_server)?;
    info!(
        "SparkPilot server is listening on {}",
        listener
            .local_addr()
            .map_err(SparkPilotError::fail_to_start_server)?
    );
    axum::serve(listener, app)
        .await
        .map_err(SparkPilotError::fail_to_start_server)
}
