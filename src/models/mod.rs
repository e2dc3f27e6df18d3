//! Data models

mod notification;

pub use notification::{Notification, SendNotificationRequest, SendNotificationResponse};
