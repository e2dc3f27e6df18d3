//! API server implementation
//!
//! Provides the WebSocket upgrade endpoint and the REST endpoints around it.

pub mod handlers;
pub mod routes;
pub mod server;
pub mod websocket;

pub use server::{ApiServer, AppState};
