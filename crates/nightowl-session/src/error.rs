//! Error types for the session layer.

use nightowl_transport::ConnectionId;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The connection never joined, or already left.
    #[error("no user for connection {0}")]
    NotIdentified(ConnectionId),

    /// The requested state change is not an edge of the connection
    /// lifecycle, e.g. `Queued` for a connection that is already matched.
    #[error("connection {conn} cannot move from {from} to {to}")]
    InvalidTransition {
        conn: ConnectionId,
        from: &'static str,
        to: &'static str,
    },
}
