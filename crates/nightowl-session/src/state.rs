//! Per-connection lifecycle.

use std::fmt;

use nightowl_protocol::MatchId;

/// Where a connection is in its lifecycle.
///
/// ```text
///  Anonymous ──join──→ Identified ──gate closed──→ WaitingForWindow
///                          │                          │ (join again)
///                          └──gate open──→ Queued ←───┘
///                                            │ paired
///                                            ▼
///                                         Matched ──first message──→ Active
///                                            │                         │
///                                            └──partner left──→ PartnerLeft
/// ```
///
/// Any state ends when the connection itself disconnects. There is no
/// way back to `Queued` once a match exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connected, but has not sent `join`.
    Anonymous,
    /// Has a user; the gate has not been consulted yet.
    Identified,
    /// Joined while the window was closed.
    WaitingForWindow,
    Queued,
    /// Paired, no message relayed yet.
    Matched { match_id: MatchId },
    /// Paired and at least one message has been relayed.
    Active { match_id: MatchId },
    /// The partner disconnected. Terminal apart from own disconnect.
    PartnerLeft { match_id: MatchId },
}

impl ConnectionState {
    /// `true` if the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: &ConnectionState) -> bool {
        use ConnectionState::*;
        match (self, next) {
            (Anonymous, Identified) => true,
            (Identified | WaitingForWindow, WaitingForWindow | Queued) => true,
            (Queued, Matched { .. }) => true,
            (Matched { match_id: a }, Active { match_id: b }) => a == b,
            (Matched { match_id: a } | Active { match_id: a }, PartnerLeft { match_id: b }) => {
                a == b
            }
            _ => false,
        }
    }

    /// The match this connection belongs to, if any.
    pub fn match_id(&self) -> Option<MatchId> {
        match self {
            Self::Matched { match_id } | Self::Active { match_id } | Self::PartnerLeft { match_id } => {
                Some(*match_id)
            }
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Identified => "identified",
            Self::WaitingForWindow => "waiting_for_window",
            Self::Queued => "queued",
            Self::Matched { .. } => "matched",
            Self::Active { .. } => "active",
            Self::PartnerLeft { .. } => "partner_left",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
