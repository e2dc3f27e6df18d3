use serde::{Deserialize, Serialize};

/// Notification pushed to every connected client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: u64,
    pub message: String,
}

impl Notification {
    pub fn new(user_id: u64, message: impl Into<String>) -> Self {
        Self {
            user_id,
            message: message.into(),
        }
    }
}

/// Request body for sending a notification
#[derive(Debug, Clone, Deserialize)]
pub struct SendNotificationRequest {
    pub user_id: u64,
    pub message: String,
}

/// Response body for a notification hand-off
#[derive(Debug, Clone, Serialize)]
pub struct SendNotificationResponse {
    pub success: bool,
}
