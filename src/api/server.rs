//! HTTP server using Axum
//!
//! Serves the WebSocket upgrade endpoint, the notification delivery endpoint
//! and health/status checks.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::task::TaskTracker;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::config::{ServerConfig, WebSocketConfig};
use crate::error::{HeraldError, Result};
use crate::hub::HubHandle;
use crate::services::NotificationService;

use super::routes;

/// Shared state for API handlers
#[derive(Clone)]
pub struct AppState {
    pub hub: HubHandle,
    pub notifications: NotificationService,
    pub websocket: WebSocketConfig,
    pub started_at: Instant,
    /// Upgraded sockets; axum's graceful shutdown does not wait for them
    pub connections: TaskTracker,
}

impl AppState {
    pub fn new(hub: HubHandle, websocket: WebSocketConfig) -> Self {
        let notifications = NotificationService::new(Arc::new(hub.clone()));
        Self {
            hub,
            notifications,
            websocket,
            started_at: Instant::now(),
            connections: TaskTracker::new(),
        }
    }
}

/// API server
pub struct ApiServer {
    config: ServerConfig,
    state: AppState,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(config: ServerConfig, websocket: WebSocketConfig, hub: HubHandle) -> Self {
        Self {
            config,
            state: AppState::new(hub, websocket),
        }
    }

    /// Build the router
    fn build_router(&self) -> Router {
        routes::create_router(self.state.clone()).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| HeraldError::InvalidConfig(format!("Invalid server address: {}", e)))?;

        info!("API server listening on {}", addr);
        info!(
            "WebSocket endpoint available at ws://{}{}",
            addr, self.state.websocket.path
        );

        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on a bound listener until shutdown, then wait for every
    /// WebSocket connection to finish its close handshake.
    pub async fn serve(
        &self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let router = self.build_router();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            })
            .await
            .map_err(|e| HeraldError::Internal(e.to_string()))?;

        // The hub closed every mailbox, so each connection is sending its close frame.
        let connections = &self.state.connections;
        connections.close();
        if !connections.is_empty() {
            info!("Waiting for {} WebSocket connections to close", connections.len());
        }
        connections.wait().await;

        info!("API server shut down");
        Ok(())
    }
}
