use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified error type for the Herald service
#[derive(Error, Debug)]
pub enum HeraldError {
    // Hub errors
    #[error("Notification hub is not running")]
    HubUnavailable,

    // Notification errors
    #[error("Invalid user ID provided")]
    InvalidUserId,

    #[error("Invalid or empty message provided")]
    InvalidMessage,

    // Request errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Herald operations
pub type Result<T> = std::result::Result<T, HeraldError>;

impl HeraldError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            HeraldError::InvalidUserId
            | HeraldError::InvalidMessage
            | HeraldError::InvalidRequest(_)
            | HeraldError::InvalidConfig(_) => StatusCode::BAD_REQUEST,

            // 503 Service Unavailable
            HeraldError::HubUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            HeraldError::Serialization(_) | HeraldError::Io(_) | HeraldError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for HeraldError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_code_mapping() {
        assert_eq!(
            HeraldError::InvalidUserId.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HeraldError::InvalidMessage.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HeraldError::InvalidRequest("bad".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HeraldError::HubUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            HeraldError::Internal("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_client_server_helpers() {
        assert!(HeraldError::InvalidMessage.is_client_error());
        assert!(!HeraldError::InvalidMessage.is_server_error());

        assert!(HeraldError::HubUnavailable.is_server_error());
        assert!(!HeraldError::HubUnavailable.is_client_error());
    }

    #[tokio::test]
    async fn test_error_into_response_body() {
        let response = HeraldError::InvalidUserId.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "Invalid user ID provided");
    }
}
