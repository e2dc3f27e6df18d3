//! WebSocket handlers
//!
//! Each upgraded socket becomes a hub connection with its own bounded mailbox.

pub mod notifications;
