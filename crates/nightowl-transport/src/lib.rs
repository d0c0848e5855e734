//! Connection plumbing for Nightowl.
//!
//! The chat core never touches sockets. It only needs two primitives from
//! the layer below it: "receive the next frame from connection C" and
//! "deliver this frame to connection C". The [`Transport`] and
//! [`Connection`] traits describe exactly that, and [`WebSocketTransport`]
//! is the production implementation.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketIncoming, WebSocketTransport};

use std::fmt;

/// Opaque handle naming one live duplex connection.
///
/// Allocated by the transport on accept and never reused within a
/// process, so it doubles as the key for outbound sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Incoming: Incoming<Connection = Self::Connection, Error = Self::Error>;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next socket.
    ///
    /// No protocol handshake happens here, so a peer that never finishes
    /// one cannot hold up the sockets behind it. Run
    /// [`Incoming::upgrade`] on its own task.
    async fn accept(&mut self) -> Result<Self::Incoming, Self::Error>;

    /// The address the transport is listening on.
    fn local_addr(&self) -> std::io::Result<std::net::SocketAddr>;
}

/// An accepted socket whose protocol handshake has not run yet.
pub trait Incoming: Send + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Performs the handshake. May wait on the peer indefinitely; callers
    /// put their own deadline on it.
    async fn upgrade(self) -> Result<Self::Connection, Self::Error>;
}

/// A single connection that carries whole frames in both directions.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Sends one frame to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_round_trips_raw_value() {
        assert_eq!(ConnectionId::new(42).into_inner(), 42);
    }

    #[test]
    fn test_connection_id_orders_by_allocation() {
        assert!(ConnectionId::new(1) < ConnectionId::new(2));
    }
}
