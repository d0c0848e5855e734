//! Unified error type for the Nightowl server.

use nightowl_protocol::ProtocolError;
use nightowl_transport::TransportError;

/// Top-level error for the server and its connection handlers.
///
/// None of these are fatal to the server as a whole: a connection
/// handler that returns one simply ends that connection. Session and
/// match errors never get this far; the core logs them and drops the
/// offending request.
#[derive(Debug, thiserror::Error)]
pub enum NightowlError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The dispatcher task has stopped; no more commands are accepted.
    #[error("core dispatcher is unavailable")]
    CoreUnavailable,
}
