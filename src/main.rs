//! topic-hub server entry point.
//!
//! Starts the Axum HTTP server with the REST API and the WebSocket hub.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use topic_hub::app_state::AppState;
use topic_hub::config::{HubConfig, LogFormat};
use topic_hub::server::{build_app, shutdown_signal};
use topic_hub::service::Hub;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = HubConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, ws_path = %config.ws_path, "starting topic-hub");

    // Build hub and its process-wide heartbeat
    let hub = Hub::new(config.connection_buffer);
    let heartbeat = hub.spawn_heartbeat(config.heartbeat_interval);

    let listen_addr = config.listen_addr;
    let state = AppState::new(hub, config);
    let app = build_app(state.clone());

    // Start server
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    tracing::info!(addr = %listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    heartbeat.stop();
    tracing::info!("server stopped");

    Ok(())
}
