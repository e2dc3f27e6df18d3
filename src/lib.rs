//! Herald - Notification Fan-out Hub
//!
//! A real-time WebSocket broadcast hub written in Rust.
//!
//! ## Features
//!
//! - Single coordination loop owning the live-connection registry
//! - Bounded per-connection mailboxes with evict-on-full backpressure
//! - Keepalive pings and read-inactivity timeouts per connection
//! - JSON notification delivery endpoint publishing through the hub
//! - Graceful shutdown that closes every client with a close frame

pub mod api;
pub mod config;
pub mod error;
pub mod hub;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{HeraldError, Result};
pub use hub::{Hub, HubHandle, Publisher};
