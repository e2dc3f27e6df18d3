//! Herald Notification Hub - Entry Point
//!
//! Starts the hub loop and the HTTP/WebSocket server with graceful shutdown support.

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use herald::api::ApiServer;
use herald::config::LogConfig;
use herald::{Config, Hub, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log);

    info!("Starting Herald notification hub");

    // Create shutdown channel
    let (shutdown_tx, _) = watch::channel(false);

    // Start the hub loop
    let (hub, hub_handle) = Hub::new(config.hub.queue_capacity);
    let hub_task = tokio::spawn(hub.run(shutdown_tx.subscribe()));

    // Start the API server
    let api_server = ApiServer::new(
        config.server.clone(),
        config.websocket.clone(),
        hub_handle,
    );
    let api_shutdown = shutdown_tx.subscribe();
    let api_task = tokio::spawn(async move {
        if let Err(e) = api_server.run(api_shutdown).await {
            error!("API server error: {}", e);
        }
    });

    info!(
        "Server started on {} (mailbox capacity {}, read timeout {:?}, ping interval {:?})",
        config.server_addr(),
        config.websocket.mailbox_capacity,
        config.websocket.read_timeout,
        config.websocket.ping_interval
    );

    // Wait for shutdown signal
    shutdown_signal().await;
    info!("Shutdown signal received");

    // The hub closes every mailbox and the server waits for each connection
    // to send its close frame before its task completes.
    let _ = shutdown_tx.send(true);

    let grace = config.server.shutdown_grace;
    if tokio::time::timeout(grace, async { tokio::join!(hub_task, api_task) })
        .await
        .is_err()
    {
        warn!("Shutdown grace period of {:?} elapsed, exiting anyway", grace);
    }

    info!("Herald notification hub stopped");
    Ok(())
}

fn init_tracing(log: &LogConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("herald={},tower_http=debug", log.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if log.format == "pretty" {
        registry.with(tracing_subscriber::fmt::layer()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
