use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Boundary for handing a payload to the hub for fan-out
///
/// Implementations return as soon as the payload is handed off. There is no
/// per-recipient acknowledgement; an error means the hub itself is gone.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, payload: Bytes) -> Result<()>;
}
