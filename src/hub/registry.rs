//! Live connection registry, private to the hub loop

use std::collections::HashMap;

use bytes::Bytes;

use super::connection::{Connection, ConnectionId};
use super::mailbox::{Delivery, Mailbox};

/// Result of one fan-out pass
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FanOut {
    /// Connections that accepted the payload
    pub delivered: usize,
    /// Connections removed because their mailbox was full or closed
    pub evicted: Vec<ConnectionId>,
}

/// Set of registered connections and their mailboxes
#[derive(Debug, Default)]
pub struct Registry {
    members: HashMap<ConnectionId, Mailbox>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, connection: Connection) {
        let (id, mailbox) = connection.into_parts();
        self.members.insert(id, mailbox);
    }

    /// Remove a connection, closing its mailbox. Absent ids are ignored.
    pub fn remove(&mut self, id: ConnectionId) -> bool {
        self.members.remove(&id).is_some()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.members.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Enqueue `payload` on every mailbox without waiting.
    ///
    /// A mailbox that cannot take the payload is closed and its connection
    /// dropped from the registry before the pass moves on.
    pub fn fan_out(&mut self, payload: &Bytes) -> FanOut {
        let mut result = FanOut::default();

        self.members
            .retain(|id, mailbox| match mailbox.try_deliver(payload) {
                Delivery::Queued => {
                    result.delivered += 1;
                    true
                }
                Delivery::Full | Delivery::Closed => {
                    result.evicted.push(*id);
                    false
                }
            });

        result
    }

    /// Close every mailbox and empty the registry
    pub fn clear(&mut self) -> usize {
        let closed = self.members.len();
        self.members.clear();
        closed
    }
}
