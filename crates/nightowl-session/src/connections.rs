//! Outbound sinks: the "deliver event E to connection C" capability.
//!
//! Each connection handler owns the receiving half of an unbounded
//! channel and writes whatever arrives to its socket. The core only ever
//! pushes onto the sending half, so delivery never waits on the network
//! and a dead peer cannot stall anyone else.

use std::collections::HashMap;

use nightowl_protocol::ServerEvent;
use nightowl_transport::ConnectionId;
use tokio::sync::mpsc;

/// Sending half of a connection's outbound channel.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;
/// Receiving half, drained by the connection's writer.
pub type EventReceiver = mpsc::UnboundedReceiver<ServerEvent>;

/// Every live connection's outbound sink, joined or not.
#[derive(Default)]
pub struct ConnectionRegistry {
    sinks: HashMap<ConnectionId, EventSender>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sink, replacing any previous one for the connection.
    pub fn register(&mut self, conn: ConnectionId, sink: EventSender) {
        self.sinks.insert(conn, sink);
    }

    pub fn unregister(&mut self, conn: ConnectionId) -> bool {
        self.sinks.remove(&conn).is_some()
    }

    /// `true` if the connection is registered and its writer is alive.
    pub fn is_reachable(&self, conn: ConnectionId) -> bool {
        self.sinks.get(&conn).is_some_and(|s| !s.is_closed())
    }

    /// Fire-and-forget delivery. Returns `false` if the event was dropped.
    pub fn deliver(&self, conn: ConnectionId, event: ServerEvent) -> bool {
        let Some(sink) = self.sinks.get(&conn) else {
            tracing::debug!(%conn, "deliver to unknown connection dropped");
            return false;
        };
        if sink.send(event).is_err() {
            tracing::debug!(%conn, "deliver to closed connection dropped");
            return false;
        }
        true
    }

    /// Delivers a copy of `event` to every registered connection.
    /// Returns how many accepted it.
    pub fn broadcast(&self, event: &ServerEvent) -> usize {
        self.sinks
            .values()
            .filter(|sink| sink.send(event.clone()).is_ok())
            .count()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}
