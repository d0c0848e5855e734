//! Error types for the match layer.
//!
//! Only [`MatchError::WindowClosed`] is ever shown to a user. Every other
//! variant describes a message the relay dropped on purpose; callers log
//! it and move on.

use chrono::{DateTime, Utc};
use nightowl_protocol::{MatchId, UserId};

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// Enqueue attempted outside the access window.
    #[error("pairing is only open from 21:00 to 24:00")]
    WindowClosed { next_open: DateTime<Utc> },

    #[error("match {0} not found")]
    NotFound(MatchId),

    #[error("user {0} is not a participant of match {1}")]
    NotParticipant(UserId, MatchId),

    /// One participant has disconnected.
    #[error("match {0} has ended")]
    PartnerLeft(MatchId),

    /// Both participants are still indexed but a sink is gone.
    #[error("a participant of match {0} is unreachable")]
    Unreachable(MatchId),

    #[error("message body is blank")]
    BlankBody,

    #[error("message body has {len} characters, limit is {max}")]
    BodyTooLong { len: usize, max: usize },
}
