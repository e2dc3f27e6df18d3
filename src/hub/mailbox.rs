//! Bounded per-connection outbound queue
//!
//! The hub holds the [`Mailbox`] (write side) and the connection's outbound
//! pump holds the [`Outbox`] (read side). Dropping the mailbox closes it.

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};

/// Outcome of a non-blocking enqueue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// Consumer is not keeping up
    Full,
    /// Outbound pump is gone
    Closed,
}

/// Create a mailbox pair with the given capacity
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn channel(capacity: usize) -> (Mailbox, Outbox) {
    let (tx, rx) = mpsc::channel(capacity);
    (Mailbox { tx }, Outbox { rx, capacity })
}

/// Write side of a connection's mailbox, owned by the hub
#[derive(Debug)]
pub struct Mailbox {
    tx: mpsc::Sender<Bytes>,
}

impl Mailbox {
    /// Enqueue without waiting
    pub fn try_deliver(&self, payload: &Bytes) -> Delivery {
        match self.tx.try_send(payload.clone()) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => Delivery::Full,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}

/// Read side of a connection's mailbox, drained by the outbound pump
#[derive(Debug)]
pub struct Outbox {
    rx: mpsc::Receiver<Bytes>,
    capacity: usize,
}

impl Outbox {
    /// Wait for the next message; `None` once the mailbox is closed and empty
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// Take a message only if one is already queued
    pub fn try_recv(&mut self) -> Option<Bytes> {
        match self.rx.try_recv() {
            Ok(payload) => Some(payload),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
