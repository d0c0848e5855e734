//! The message relay.

use chrono::{DateTime, Utc};
use nightowl_protocol::{MatchId, MessageId, ServerEvent, UserId};
use nightowl_session::ConnectionRegistry;

use crate::{MatchError, MatchStatus, Message, SessionRegistry};

/// Appends chat lines to a match and delivers them to both participants.
///
/// Every rejection comes back as a [`MatchError`] so the caller can log
/// it, but none of them is ever reported to the sender: a message to a
/// dead or foreign match just vanishes.
#[derive(Debug, Clone, Copy)]
pub struct MessageRelay {
    max_body_chars: usize,
}

impl MessageRelay {
    pub const MAX_BODY_CHARS: usize = 2000;

    pub fn new() -> Self {
        Self {
            max_body_chars: Self::MAX_BODY_CHARS,
        }
    }

    /// Relays `body` from `author` into `match_id`.
    ///
    /// On success the message is appended, the author's count goes up by
    /// one, and `new_message` is pushed to participant A then B, so both
    /// see the match's messages in append order.
    ///
    /// # Errors
    /// - [`MatchError::BlankBody`] / [`MatchError::BodyTooLong`]
    /// - [`MatchError::NotFound`]: no such match
    /// - [`MatchError::NotParticipant`]: the author is not in it
    /// - [`MatchError::PartnerLeft`]: the match has ended
    /// - [`MatchError::Unreachable`]: a participant's sink is gone
    pub fn send(
        &self,
        registry: &mut SessionRegistry,
        connections: &ConnectionRegistry,
        match_id: MatchId,
        author: UserId,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<MessageId, MatchError> {
        if body.trim().is_empty() {
            return Err(MatchError::BlankBody);
        }
        let len = body.chars().count();
        if len > self.max_body_chars {
            return Err(MatchError::BodyTooLong {
                len,
                max: self.max_body_chars,
            });
        }

        let m = registry
            .get_mut(match_id)
            .ok_or(MatchError::NotFound(match_id))?;
        let author_name = m
            .participant(author)
            .map(|u| u.display_name.clone())
            .ok_or(MatchError::NotParticipant(author, match_id))?;
        if m.status() != MatchStatus::Active {
            return Err(MatchError::PartnerLeft(match_id));
        }
        let conns = m.participants().map(|u| u.connection);
        if !conns.iter().all(|c| connections.is_reachable(*c)) {
            return Err(MatchError::Unreachable(match_id));
        }

        let message = Message {
            id: MessageId::new(),
            author_id: author,
            author_name,
            body: body.to_owned(),
            sent_at: now,
        };
        let message_id = message.id;
        let wire = message.to_wire();
        m.append(message);

        for conn in conns {
            connections.deliver(conn, ServerEvent::NewMessage(wire.clone()));
        }
        tracing::debug!(%match_id, %message_id, author = %author, "message relayed");
        Ok(message_id)
    }
}

impl Default for MessageRelay {
    fn default() -> Self {
        Self::new()
    }
}
