//! Notification delivery endpoint

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::{error, info};

use crate::api::server::AppState;
use crate::error::{HeraldError, Result};
use crate::models::{SendNotificationRequest, SendNotificationResponse};

/// Broadcast a notification to all connected WebSocket clients
pub async fn send_notification(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SendNotificationRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(request) = payload.map_err(|e| HeraldError::InvalidRequest(e.body_text()))?;

    info!("Received SendNotification request for user: {}", request.user_id);

    if let Err(e) = state
        .notifications
        .send_notification(request.user_id, &request.message)
        .await
    {
        error!("Failed to send notification: {}", e);
        return Err(e);
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(SendNotificationResponse { success: true }),
    ))
}
