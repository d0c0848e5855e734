//! Events and identifiers that travel on the wire.
//!
//! Every frame is a JSON object of the form
//! `{"event": "<snake_case name>", "data": {...}}` with camelCase field
//! names, which is what the browser client emits and listens for.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Allocates a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(
    /// Identifies one anonymous user for the lifetime of their connection.
    UserId
);
uuid_id!(
    /// Identifies one pairing of two users.
    MatchId
);
uuid_id!(
    /// Identifies one relayed chat message.
    MessageId
);

// ---------------------------------------------------------------------------
// Payload structs
// ---------------------------------------------------------------------------

/// The other participant, as shown to a freshly matched user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerInfo {
    pub id: UserId,
    pub display_name: String,
}

/// A relayed chat message as both participants receive it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: MessageId,
    pub user_id: UserId,
    pub display_name: String,
    pub body: String,
    /// Milliseconds since the Unix epoch.
    pub sent_at: i64,
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Events a connection may send. Disconnect is implicit (socket close).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Identify with a self-reported name and ask to be paired.
    Join {
        #[serde(default)]
        display_name: String,
    },

    /// Send a chat line into a match the sender belongs to.
    SendMessage { match_id: MatchId, body: String },
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Events the server delivers to a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// The connection now has an identity.
    Joined { user_id: UserId, display_name: String },

    /// Window state at join time. `next_open` (epoch ms) is only present
    /// while the window is closed.
    Status {
        open: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        next_open: Option<i64>,
    },

    /// The user is in the queue.
    Waiting {},

    Matched { match_id: MatchId, partner: PartnerInfo },

    NewMessage(ChatMessage),

    /// The other participant left; the match will carry no more messages.
    PartnerDisconnected {},

    /// Final-minutes countdown, re-sent on every presence tick.
    TimeWarning { remaining_seconds: i64 },

    /// Periodic window state broadcast.
    TimeCheck { open: bool },

    Error { reason: String },
}
