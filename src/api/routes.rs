//! API route definitions

use axum::routing::{get, post};
use axum::Router;

use super::handlers;
use super::server::AppState;
use super::websocket;

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    let ws_path = state.websocket.path.clone();

    Router::new()
        // Health check
        .route("/health", get(handlers::health::health_check))
        .route("/api/status", get(handlers::health::status))
        // Notification delivery
        .route(
            "/api/notifications",
            post(handlers::notification::send_notification),
        )
        // WebSocket upgrade
        .route(&ws_path, get(websocket::notifications::notifications_ws))
        .with_state(state)
}
