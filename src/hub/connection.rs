//! Client connections and their transport pumps
//!
//! Each upgraded socket is split in two halves. The inbound pump reads
//! frames and enforces read-inactivity liveness; the outbound pump drains the
//! connection's mailbox and sends keepalive pings. When either exits, the
//! connection is unregistered from the hub before the transport is released.

use std::fmt;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, trace, warn};
use uuid::Uuid;

use super::mailbox::{self, Mailbox, Outbox};
use super::HubHandle;
use crate::config::WebSocketConfig;

/// Identity of one transport session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A connection as the hub sees it: identity plus the write side of its mailbox
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    mailbox: Mailbox,
}

impl Connection {
    /// Create a connection with a fresh id and a mailbox of `capacity` messages
    pub fn new(capacity: usize) -> (Self, Outbox) {
        let (mailbox, outbox) = mailbox::channel(capacity);
        let connection = Self {
            id: ConnectionId::new(),
            mailbox,
        };
        (connection, outbox)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub(crate) fn into_parts(self) -> (ConnectionId, Mailbox) {
        (self.id, self.mailbox)
    }
}

/// Connection lifecycle states, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnectionState {
    Connecting,
    Active,
    Closing,
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Active => "active",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}

/// Forward-only state tracker for one connection
#[derive(Debug)]
pub struct Lifecycle {
    id: ConnectionId,
    state: ConnectionState,
}

impl Lifecycle {
    pub fn new(id: ConnectionId) -> Self {
        Self {
            id,
            state: ConnectionState::Connecting,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Move to `next`. Returns false, leaving the state alone, when `next`
    /// is not ahead of the current state.
    pub fn advance(&mut self, next: ConnectionState) -> bool {
        if next <= self.state {
            return false;
        }
        debug!(
            connection = %self.id,
            "Connection {} -> {}",
            self.state.as_str(),
            next.as_str()
        );
        self.state = next;
        true
    }
}

/// Why a pump stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PumpExit {
    /// Hub closed the mailbox (unregistration, eviction or shutdown)
    MailboxClosed,
    /// Peer sent a close frame
    PeerClosed,
    /// Transport stream ended without a close frame
    StreamEnded,
    /// Nothing arrived within the read-inactivity timeout
    ReadTimeout,
    /// Read failed, including frames over the size limit
    ReadFailed(String),
    /// Write did not finish within the write deadline
    WriteTimeout,
    WriteFailed(String),
}

/// Per-connection timing taken from [`WebSocketConfig`]
#[derive(Debug, Clone, Copy)]
pub struct PumpSettings {
    pub write_timeout: Duration,
    pub read_timeout: Duration,
    pub ping_interval: Duration,
}

impl From<&WebSocketConfig> for PumpSettings {
    fn from(config: &WebSocketConfig) -> Self {
        Self {
            write_timeout: config.write_timeout,
            read_timeout: config.read_timeout,
            ping_interval: config.ping_interval,
        }
    }
}

/// Run one upgraded socket until it terminates
#[instrument(skip_all)]
pub async fn serve(socket: WebSocket, hub: HubHandle, config: WebSocketConfig) {
    let settings = PumpSettings::from(&config);
    let (connection, outbox) = Connection::new(config.mailbox_capacity);
    let id = connection.id();
    let mut lifecycle = Lifecycle::new(id);

    if let Err(e) = hub.register(connection).await {
        warn!(connection = %id, "Rejecting connection: {}", e);
        return;
    }
    lifecycle.advance(ConnectionState::Active);
    info!(connection = %id, "WebSocket connected");

    let (sink, stream) = socket.split();
    let mut outbound = tokio::spawn(outbound_pump(sink, outbox, settings));
    let mut inbound = tokio::spawn(inbound_pump(stream, settings.read_timeout));

    tokio::select! {
        exit = &mut inbound => {
            lifecycle.advance(ConnectionState::Closing);
            debug!(connection = %id, "Inbound pump stopped: {:?}", exit);

            unregister(&hub, id).await;
            // Unregistering closes the mailbox, so the outbound pump sends a
            // close frame and stops on its own within the write deadline.
            if timeout(settings.write_timeout, &mut outbound).await.is_err() {
                outbound.abort();
                let _ = outbound.await;
            }
        }
        exit = &mut outbound => {
            lifecycle.advance(ConnectionState::Closing);
            match exit {
                Ok(PumpExit::MailboxClosed) => {
                    debug!(connection = %id, "Mailbox closed by hub")
                }
                other => debug!(connection = %id, "Outbound pump stopped: {:?}", other),
            }

            unregister(&hub, id).await;
            inbound.abort();
            let _ = inbound.await;
        }
    }

    lifecycle.advance(ConnectionState::Closed);
    info!(connection = %id, "WebSocket disconnected");
}

async fn unregister(hub: &HubHandle, id: ConnectionId) {
    if let Err(e) = hub.unregister(id).await {
        debug!(connection = %id, "Unregister skipped: {}", e);
    }
}

/// Read frames until the peer goes away or stays silent past `read_timeout`.
///
/// Every frame counts as activity. Clients are receive-only, so payloads are
/// not routed anywhere.
pub async fn inbound_pump<R, E>(mut stream: R, read_timeout: Duration) -> PumpExit
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
{
    loop {
        match timeout(read_timeout, stream.next()).await {
            Err(_) => return PumpExit::ReadTimeout,
            Ok(None) => return PumpExit::StreamEnded,
            Ok(Some(Err(e))) => return PumpExit::ReadFailed(e.to_string()),
            Ok(Some(Ok(Message::Close(frame)))) => {
                debug!("Peer closed connection: {:?}", frame);
                return PumpExit::PeerClosed;
            }
            Ok(Some(Ok(Message::Pong(_)))) => trace!("Keepalive acknowledged"),
            Ok(Some(Ok(_))) => trace!("Ignoring inbound frame"),
        }
    }
}

/// Drain the mailbox to the transport and keep the peer alive with pings.
pub async fn outbound_pump<S>(mut sink: S, mut outbox: Outbox, settings: PumpSettings) -> PumpExit
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    let mut keepalive = interval_at(
        Instant::now() + settings.ping_interval,
        settings.ping_interval,
    );
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            next = outbox.recv() => {
                let Some(payload) = next else {
                    let _ = timeout(settings.write_timeout, sink.send(Message::Close(None))).await;
                    return PumpExit::MailboxClosed;
                };

                let batch = write_batch(&mut sink, &mut outbox, payload);
                match timeout(settings.write_timeout, batch).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => return PumpExit::WriteFailed(e.to_string()),
                    Err(_) => return PumpExit::WriteTimeout,
                }
            }
            _ = keepalive.tick() => {
                match timeout(settings.write_timeout, sink.send(Message::Ping(Vec::new()))).await {
                    Ok(Ok(())) => trace!("Keepalive ping sent"),
                    Ok(Err(e)) => return PumpExit::WriteFailed(e.to_string()),
                    Err(_) => return PumpExit::WriteTimeout,
                }
            }
        }
    }
}

/// Feed `first` plus whatever is already queued, then flush once.
async fn write_batch<S>(sink: &mut S, outbox: &mut Outbox, first: Bytes) -> Result<(), S::Error>
where
    S: Sink<Message> + Unpin,
{
    sink.feed(frame(first)).await?;

    let mut batched = 1;
    while batched < outbox.capacity() {
        let Some(payload) = outbox.try_recv() else {
            break;
        };
        sink.feed(frame(payload)).await?;
        batched += 1;
    }
    if batched > 1 {
        trace!("Coalesced {} messages into one flush", batched);
    }

    sink.flush().await
}

/// Payloads go out as text frames; anything that is not UTF-8 goes out as binary.
fn frame(payload: Bytes) -> Message {
    match String::from_utf8(payload.to_vec()) {
        Ok(text) => Message::Text(text),
        Err(e) => Message::Binary(e.into_bytes()),
    }
}
