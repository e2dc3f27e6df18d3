//! Health and status endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::api::server::AppState;
use crate::error::Result;

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "herald"
        })),
    )
}

/// Hub statistics and uptime
pub async fn status(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let stats = state.hub.stats().await?;

    Ok(Json(json!({
        "connections": stats.connections,
        "broadcasts": stats.broadcasts,
        "evictions": stats.evictions,
        "uptime_secs": state.started_at.elapsed().as_secs(),
    })))
}
