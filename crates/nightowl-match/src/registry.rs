//! Match records and the user → match index.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use nightowl_protocol::{ChatMessage, MatchId, MessageId, UserId};
use nightowl_session::User;

/// Whether a match can still carry messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    Active,
    /// One participant disconnected. History and counts are kept.
    PartnerLeft,
}

/// One relayed chat line. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub author_id: UserId,
    pub author_name: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn to_wire(&self) -> ChatMessage {
        ChatMessage {
            id: self.id,
            user_id: self.author_id,
            display_name: self.author_name.clone(),
            body: self.body.clone(),
            sent_at: self.sent_at.timestamp_millis(),
        }
    }
}

/// A pairing of exactly two users and the history between them.
#[derive(Debug, Clone)]
pub struct Match {
    id: MatchId,
    participant_a: User,
    participant_b: User,
    messages: Vec<Message>,
    message_counts: HashMap<UserId, u32>,
    created_at: DateTime<Utc>,
    status: MatchStatus,
}

impl Match {
    fn new(participant_a: User, participant_b: User, created_at: DateTime<Utc>) -> Self {
        let message_counts = HashMap::from([(participant_a.id, 0), (participant_b.id, 0)]);
        Self {
            id: MatchId::new(),
            participant_a,
            participant_b,
            messages: Vec::new(),
            message_counts,
            created_at,
            status: MatchStatus::Active,
        }
    }

    pub fn id(&self) -> MatchId {
        self.id
    }

    /// Both participants, in pairing order (longer-waiting first).
    pub fn participants(&self) -> [&User; 2] {
        [&self.participant_a, &self.participant_b]
    }

    /// The participant with `user_id`, or `None` if they are not in this match.
    pub fn participant(&self, user_id: UserId) -> Option<&User> {
        self.participants().into_iter().find(|u| u.id == user_id)
    }

    /// The other participant, or `None` if `user_id` is not in this match.
    pub fn partner_of(&self, user_id: UserId) -> Option<&User> {
        if self.participant_a.id == user_id {
            Some(&self.participant_b)
        } else if self.participant_b.id == user_id {
            Some(&self.participant_a)
        } else {
            None
        }
    }

    /// History in append order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages authored by `user_id`; `None` for non-participants.
    pub fn message_count(&self, user_id: UserId) -> Option<u32> {
        self.message_counts.get(&user_id).copied()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub(crate) fn append(&mut self, message: Message) {
        if let Some(count) = self.message_counts.get_mut(&message.author_id) {
            *count += 1;
        }
        self.messages.push(message);
    }
}

/// Every match made during this process, plus the index of users who are
/// currently in one.
///
/// Matches are never removed: once a participant leaves, the match is
/// marked [`MatchStatus::PartnerLeft`] and stays so late operations can
/// still be attributed.
#[derive(Default)]
pub struct SessionRegistry {
    matches: HashMap<MatchId, Match>,
    /// A user appears at most once. Removed when that user disconnects.
    user_matches: HashMap<UserId, MatchId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an active match for two users who just left the queue and
    /// indexes it under both of them.
    pub fn create_match(&mut self, a: User, b: User, now: DateTime<Utc>) -> MatchId {
        let m = Match::new(a, b, now);
        let match_id = m.id;
        self.user_matches.insert(m.participant_a.id, match_id);
        self.user_matches.insert(m.participant_b.id, match_id);
        tracing::info!(
            %match_id,
            user_a = %m.participant_a.id,
            user_b = %m.participant_b.id,
            "match created"
        );
        self.matches.insert(match_id, m);
        match_id
    }

    pub fn get(&self, match_id: MatchId) -> Option<&Match> {
        self.matches.get(&match_id)
    }

    pub(crate) fn get_mut(&mut self, match_id: MatchId) -> Option<&mut Match> {
        self.matches.get_mut(&match_id)
    }

    /// The match `user_id` is indexed under, active or not.
    pub fn match_for_user(&self, user_id: UserId) -> Option<&Match> {
        self.user_matches
            .get(&user_id)
            .and_then(|id| self.matches.get(id))
    }

    /// Records that `user_id` disconnected.
    ///
    /// Drops the user's index entry. If their match was still active it
    /// becomes [`MatchStatus::PartnerLeft`] and the partner is returned so
    /// the caller can tell them; otherwise (no match, or the partner had
    /// already left) nothing is returned. This makes the partner
    /// notification happen at most once per match.
    pub fn record_disconnect(&mut self, user_id: UserId) -> Option<User> {
        let match_id = self.user_matches.remove(&user_id)?;
        let m = self.matches.get_mut(&match_id)?;

        if m.status != MatchStatus::Active {
            return None;
        }
        m.status = MatchStatus::PartnerLeft;
        tracing::info!(%match_id, %user_id, "participant left match");
        m.partner_of(user_id).cloned()
    }

    /// Total matches made, including ended ones.
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.matches
            .values()
            .filter(|m| m.status == MatchStatus::Active)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nightowl_transport::ConnectionId;

    fn user(n: u64, name: &str) -> User {
        User::new(ConnectionId::new(n), name)
    }

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
    }

    #[test]
    fn test_create_match_starts_empty_with_zero_counts() {
        let mut reg = SessionRegistry::new();
        let (a, b) = (user(1, "a"), user(2, "b"));

        let id = reg.create_match(a.clone(), b.clone(), now());

        let m = reg.get(id).expect("created");
        assert_eq!(m.status(), MatchStatus::Active);
        assert!(m.messages().is_empty());
        assert_eq!(m.message_count(a.id), Some(0));
        assert_eq!(m.message_count(b.id), Some(0));
        assert_eq!(m.created_at(), now());
    }

    #[test]
    fn test_create_match_indexes_both_users() {
        let mut reg = SessionRegistry::new();
        let (a, b) = (user(1, "a"), user(2, "b"));

        let id = reg.create_match(a.clone(), b.clone(), now());

        assert_eq!(reg.match_for_user(a.id).map(Match::id), Some(id));
        assert_eq!(reg.match_for_user(b.id).map(Match::id), Some(id));
    }

    #[test]
    fn test_partner_of_is_symmetric() {
        let mut reg = SessionRegistry::new();
        let (a, b) = (user(1, "a"), user(2, "b"));
        let id = reg.create_match(a.clone(), b.clone(), now());
        let m = reg.get(id).expect("created");

        assert_eq!(m.partner_of(a.id), Some(&b));
        assert_eq!(m.partner_of(b.id), Some(&a));
        assert_eq!(m.partner_of(user(3, "c").id), None);
    }

    #[test]
    fn test_participant_finds_only_members() {
        let mut reg = SessionRegistry::new();
        let (a, b) = (user(1, "a"), user(2, "b"));
        let id = reg.create_match(a.clone(), b.clone(), now());
        let m = reg.get(id).expect("created");

        assert_eq!(m.participant(a.id), Some(&a));
        assert_eq!(m.participant(b.id), Some(&b));
        assert_eq!(m.participant(user(3, "c").id), None);
    }

    #[test]
    fn test_lookup_unknown_is_none() {
        let reg = SessionRegistry::new();
        assert!(reg.get(MatchId::new()).is_none());
        assert!(reg.match_for_user(user(1, "a").id).is_none());
    }

    #[test]
    fn test_record_disconnect_returns_partner_once() {
        let mut reg = SessionRegistry::new();
        let (a, b) = (user(1, "a"), user(2, "b"));
        let id = reg.create_match(a.clone(), b.clone(), now());

        assert_eq!(reg.record_disconnect(a.id), Some(b.clone()));
        assert_eq!(reg.get(id).map(Match::status), Some(MatchStatus::PartnerLeft));

        // The partner leaving afterwards notifies nobody.
        assert_eq!(reg.record_disconnect(b.id), None);
        assert!(reg.match_for_user(b.id).is_none());
    }

    #[test]
    fn test_record_disconnect_keeps_match_record() {
        let mut reg = SessionRegistry::new();
        let (a, b) = (user(1, "a"), user(2, "b"));
        let id = reg.create_match(a.clone(), b, now());

        reg.record_disconnect(a.id);

        assert_eq!(reg.len(), 1);
        assert_eq!(reg.active_count(), 0);
        assert!(reg.get(id).is_some());
    }

    #[test]
    fn test_record_disconnect_unmatched_user_is_noop() {
        let mut reg = SessionRegistry::new();
        assert_eq!(reg.record_disconnect(user(1, "a").id), None);
    }

    #[test]
    fn test_message_to_wire_uses_epoch_millis() {
        let msg = Message {
            id: MessageId::new(),
            author_id: user(1, "a").id,
            author_name: "a".into(),
            body: "hi".into(),
            sent_at: now() + chrono::TimeDelta::milliseconds(1500),
        };
        assert_eq!(msg.to_wire().sent_at, 1500);
    }
}
