//! Notification hub
//!
//! A single coordination loop owns the registry of live connections. Every
//! registration, unregistration and broadcast is a command sent to that loop
//! and handled one at a time in arrival order, so the registry needs no lock
//! and a broadcast is never blocked by a slow consumer.

pub mod connection;
pub mod mailbox;
mod publisher;
mod registry;

pub use connection::{Connection, ConnectionId, ConnectionState};
pub use mailbox::Outbox;
pub use publisher::Publisher;
pub use registry::{FanOut, Registry};

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, instrument, warn};

use crate::error::{HeraldError, Result};

/// Requests handled by the hub loop
#[derive(Debug)]
enum Command {
    Register(Connection),
    Unregister(ConnectionId),
    Broadcast(Bytes),
    Stats(oneshot::Sender<HubStats>),
}

/// Point-in-time hub counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    /// Connections currently registered
    pub connections: usize,
    /// Broadcasts fanned out since start
    pub broadcasts: u64,
    /// Connections evicted for backpressure since start
    pub evictions: u64,
}

/// The hub coordination loop. Create with [`Hub::new`], then spawn [`Hub::run`].
pub struct Hub {
    commands: mpsc::Receiver<Command>,
    registry: Registry,
    stats: HubStats,
}

impl Hub {
    /// Create a hub and the handle used to reach it
    ///
    /// # Panics
    ///
    /// Panics if `queue_capacity` is zero.
    pub fn new(queue_capacity: usize) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(queue_capacity);
        let hub = Self {
            commands: rx,
            registry: Registry::new(),
            stats: HubStats::default(),
        };
        (hub, HubHandle { commands: tx })
    }

    /// Run the hub until shutdown is signalled or every handle is dropped.
    ///
    /// On exit every mailbox is closed, which tells each outbound pump to
    /// send a close frame and stop.
    #[instrument(skip_all)]
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Starting notification hub");

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => {
                        debug!("All hub handles dropped");
                        break;
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Notification hub shutting down");
                        break;
                    }
                }
            }
        }

        self.commands.close();
        let closed = self.registry.clear();
        info!("Notification hub stopped, closed {} connections", closed);
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Register(connection) => {
                debug!(connection = %connection.id(), "Registering connection");
                self.registry.insert(connection);
                self.stats.connections = self.registry.len();
            }
            Command::Unregister(id) => {
                if self.registry.remove(id) {
                    debug!(connection = %id, "Unregistered connection");
                }
                self.stats.connections = self.registry.len();
            }
            Command::Broadcast(payload) => {
                let result = self.registry.fan_out(&payload);
                self.stats.broadcasts += 1;
                self.stats.evictions += result.evicted.len() as u64;
                self.stats.connections = self.registry.len();

                for id in &result.evicted {
                    warn!(connection = %id, "Evicted connection that could not keep up");
                }
                debug!(
                    "Broadcast {} bytes to {} connections",
                    payload.len(),
                    result.delivered
                );
            }
            Command::Stats(reply) => {
                let _ = reply.send(self.stats);
            }
        }
    }
}

/// Cloneable handle for sending commands to the hub loop
#[derive(Clone, Debug)]
pub struct HubHandle {
    commands: mpsc::Sender<Command>,
}

impl HubHandle {
    /// Add a connection to the registry
    pub async fn register(&self, connection: Connection) -> Result<()> {
        self.send(Command::Register(connection)).await
    }

    /// Remove a connection and close its mailbox; unknown ids are a no-op
    pub async fn unregister(&self, id: ConnectionId) -> Result<()> {
        self.send(Command::Unregister(id)).await
    }

    /// Queue a payload for fan-out to every registered connection.
    ///
    /// Returns once the hub has accepted the payload; delivery is best effort.
    pub async fn broadcast(&self, payload: impl Into<Bytes>) -> Result<()> {
        self.send(Command::Broadcast(payload.into())).await
    }

    /// Current counters, read in order with other commands
    pub async fn stats(&self) -> Result<HubStats> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Stats(tx)).await?;
        rx.await.map_err(|_| HeraldError::HubUnavailable)
    }

    /// Whether the hub loop has stopped
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| HeraldError::HubUnavailable)
    }
}

#[async_trait]
impl Publisher for HubHandle {
    async fn publish(&self, payload: Bytes) -> Result<()> {
        self.broadcast(payload).await
    }
}
