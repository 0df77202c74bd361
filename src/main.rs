use anyhow::Context;
use dotenv::dotenv;
use std::sync::Arc;
use tracing::info;

use complaint_workflow::{
    app::create_router,
    app_state::AppState,
    config, db,
    db::{PgDirectory, PgWorkflowStore},
    telemetry::{init_telemetry, TelemetryConfig},
    workflow::WorkflowEngine,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = config::init().context("Failed to load configuration")?;
    let telemetry = init_telemetry(Some(TelemetryConfig::for_environment(
        config.app.environment.as_str(),
    )))
    .await?;

    let pool = db::init_pool(&config.database)
        .await
        .context("Failed to initialize database pool")?;

    let engine = WorkflowEngine::new(
        Arc::new(PgWorkflowStore::new(pool.clone())),
        Arc::new(PgDirectory::new(pool)),
    );
    let state = AppState::new(config.clone(), Arc::new(engine));
    let app = create_router(state);

    let addr = config.server_addr();
    info!("{} listening on {}", config.app.name, addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Failed to serve application")?;

    telemetry.shutdown().await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
