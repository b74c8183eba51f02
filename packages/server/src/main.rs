use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use server::config::AppConfig;
use server::registry::{SessionRegistry, spawn_sweeper_task};
use server::state::AppState;
use server::storage::init_store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let store = init_store(&config.storage)
        .await
        .context("Failed to initialize object storage")?;

    let sessions = Arc::new(SessionRegistry::new(Arc::clone(&store)));
    let sweeper = spawn_sweeper_task(
        Arc::clone(&sessions),
        Duration::from_secs(config.sessions.sweep_interval_secs),
        Duration::from_secs(config.sessions.idle_timeout_secs),
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        sessions: Arc::clone(&sessions),
        store,
        config,
    };
    let app = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    sweeper.abort();
    let closed = sessions.close_all().await;
    info!(closed, "Closed open edit sessions on shutdown");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
