use missionctl_core::{logging, Config};
use mission_control::{router, AppState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    logging::init_from_config(&config.logging);

    let state = Arc::new(AppState::new(&config)?);
    info!(
        database = %config.database.path.display(),
        subscriber_queue_capacity = config.stream.subscriber_queue_capacity,
        "Mission log and point cloud service ready"
    );

    let app = router(state);

    let bind_addr = config.server.bind_addr();
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Mission control listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Mission control stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
