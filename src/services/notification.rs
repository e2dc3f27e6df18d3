//! Notification delivery service
//!
//! Validates a notification, encodes it as JSON and hands it to the hub.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, instrument};

use crate::error::{HeraldError, Result};
use crate::hub::Publisher;
use crate::models::Notification;

#[derive(Clone)]
pub struct NotificationService {
    publisher: Arc<dyn Publisher>,
}

impl NotificationService {
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self { publisher }
    }

    /// Broadcast a notification to every connected client
    #[instrument(skip(self, message))]
    pub async fn send_notification(&self, user_id: u64, message: &str) -> Result<()> {
        if user_id == 0 {
            return Err(HeraldError::InvalidUserId);
        }
        if message.trim().is_empty() {
            return Err(HeraldError::InvalidMessage);
        }

        let notification = Notification::new(user_id, message);
        let payload = serde_json::to_vec(&notification)?;
        self.publisher.publish(Bytes::from(payload)).await?;

        info!("Notification sent to user {}", user_id);
        Ok(())
    }
}
