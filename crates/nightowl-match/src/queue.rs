//! The waiting queue.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use nightowl_clock::AccessWindowGate;
use nightowl_protocol::{MatchId, ServerEvent};
use nightowl_session::{ConnectionRegistry, User};
use nightowl_transport::ConnectionId;

use crate::{MatchError, SessionRegistry};

/// Result of a successful [`MatchQueue::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// Appended; `position` is zero-based from the head.
    Queued { position: usize },
    /// The connection was already waiting. Nothing changed.
    AlreadyQueued,
}

/// Users waiting for a partner, oldest first.
///
/// At most one entry per connection. Pairing is strict FIFO: the two
/// longest-waiting users are always the next pair.
pub struct MatchQueue {
    gate: AccessWindowGate,
    entries: VecDeque<User>,
}

impl MatchQueue {
    pub fn new(gate: AccessWindowGate) -> Self {
        Self {
            gate,
            entries: VecDeque::new(),
        }
    }

    /// Appends `user` to the tail.
    ///
    /// # Errors
    /// Returns [`MatchError::WindowClosed`] when the gate is closed at
    /// `now`. This is meant for the caller only, never broadcast.
    pub fn enqueue(&mut self, user: User, now: DateTime<Utc>) -> Result<Enqueued, MatchError> {
        if !self.gate.is_open(now) {
            return Err(MatchError::WindowClosed {
                next_open: self.gate.next_open_time(now),
            });
        }
        if self.contains(user.connection) {
            return Ok(Enqueued::AlreadyQueued);
        }

        tracing::debug!(user_id = %user.id, conn = %user.connection, "user queued");
        self.entries.push_back(user);
        Ok(Enqueued::Queued {
            position: self.entries.len() - 1,
        })
    }

    /// Removes the connection's entry. Returns `false` if it had none.
    pub fn remove(&mut self, conn: ConnectionId) -> bool {
        let Some(index) = self.entries.iter().position(|u| u.connection == conn) else {
            return false;
        };
        self.entries.remove(index);
        tracing::debug!(%conn, "user left queue");
        true
    }

    pub fn contains(&self, conn: ConnectionId) -> bool {
        self.entries.iter().any(|u| u.connection == conn)
    }

    /// Pairs waiting users two at a time, oldest first, until fewer than
    /// two remain.
    ///
    /// Each pair gets a new match in `registry` and both users are sent
    /// `matched`. Pairs made during the final warning period also get an
    /// immediate `time_warning`, since they would otherwise wait up to a
    /// full presence period for their first one. Returns the new match
    /// ids in pairing order.
    pub fn try_pair_all(
        &mut self,
        registry: &mut SessionRegistry,
        connections: &ConnectionRegistry,
        now: DateTime<Utc>,
    ) -> Vec<MatchId> {
        let mut created = Vec::new();

        while self.entries.len() >= 2 {
            let (Some(a), Some(b)) = (self.entries.pop_front(), self.entries.pop_front()) else {
                break;
            };
            let (conn_a, conn_b) = (a.connection, b.connection);
            let (info_a, info_b) = (a.as_partner(), b.as_partner());

            let match_id = registry.create_match(a, b, now);
            connections.deliver(
                conn_a,
                ServerEvent::Matched {
                    match_id,
                    partner: info_b,
                },
            );
            connections.deliver(
                conn_b,
                ServerEvent::Matched {
                    match_id,
                    partner: info_a,
                },
            );

            if self.gate.is_final_warning_period(now) {
                let remaining_seconds = self.gate.seconds_until_close(now);
                for conn in [conn_a, conn_b] {
                    connections.deliver(conn, ServerEvent::TimeWarning { remaining_seconds });
                }
            }

            created.push(match_id);
        }

        created
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queued connections, oldest first.
    pub fn waiting(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.entries.iter().map(|u| u.connection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use nightowl_session::EventReceiver;
    use tokio::sync::mpsc;

    fn taipei(h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        chrono_tz::Asia::Taipei
            .with_ymd_and_hms(2026, 3, 1, h, mi, s)
            .single()
            .expect("valid")
            .with_timezone(&Utc)
    }

    fn open() -> DateTime<Utc> {
        taipei(21, 30, 0)
    }

    struct Fixture {
        queue: MatchQueue,
        registry: SessionRegistry,
        connections: ConnectionRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                queue: MatchQueue::new(AccessWindowGate::new()),
                registry: SessionRegistry::new(),
                connections: ConnectionRegistry::new(),
            }
        }

        fn user(&mut self, n: u64) -> (User, EventReceiver) {
            let (tx, rx) = mpsc::unbounded_channel();
            self.connections.register(ConnectionId::new(n), tx);
            (User::new(ConnectionId::new(n), &format!("u{n}")), rx)
        }

        fn pair(&mut self, now: DateTime<Utc>) -> Vec<MatchId> {
            self.queue.try_pair_all(&mut self.registry, &self.connections, now)
        }
    }

    fn drain(rx: &mut EventReceiver) -> Vec<ServerEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[test]
    fn test_enqueue_when_closed_is_window_closed() {
        let mut f = Fixture::new();
        let (u, _rx) = f.user(1);

        let result = f.queue.enqueue(u, taipei(20, 59, 59));

        match result {
            Err(MatchError::WindowClosed { next_open }) => assert_eq!(next_open, taipei(21, 0, 0)),
            other => panic!("expected WindowClosed, got {other:?}"),
        }
        assert!(f.queue.is_empty());
    }

    #[test]
    fn test_enqueue_duplicate_is_noop() {
        let mut f = Fixture::new();
        let (u, _rx) = f.user(1);

        assert_eq!(f.queue.enqueue(u.clone(), open()).ok(), Some(Enqueued::Queued { position: 0 }));
        assert_eq!(f.queue.enqueue(u, open()).ok(), Some(Enqueued::AlreadyQueued));
        assert_eq!(f.queue.len(), 1);
    }

    #[test]
    fn test_remove_present_and_absent() {
        let mut f = Fixture::new();
        let (u, _rx) = f.user(1);
        f.queue.enqueue(u, open()).expect("open");

        assert!(f.queue.remove(ConnectionId::new(1)));
        assert!(!f.queue.remove(ConnectionId::new(1)));
        assert!(f.queue.is_empty());
    }

    #[test]
    fn test_single_user_stays_queued() {
        let mut f = Fixture::new();
        let (u, mut rx) = f.user(1);
        f.queue.enqueue(u, open()).expect("open");

        assert!(f.pair(open()).is_empty());
        assert_eq!(f.queue.len(), 1);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_pairs_in_strict_arrival_order() {
        let mut f = Fixture::new();
        let mut users = Vec::new();
        for n in 1..=7 {
            let (u, rx) = f.user(n);
            f.queue.enqueue(u.clone(), open()).expect("open");
            users.push((u, rx));
        }

        let created = f.pair(open());

        assert_eq!(created.len(), 3);
        for (i, match_id) in created.iter().enumerate() {
            let m = f.registry.get(*match_id).expect("exists");
            let [a, b] = m.participants();
            assert_eq!(a.id, users[2 * i].0.id);
            assert_eq!(b.id, users[2 * i + 1].0.id);
        }
        assert_eq!(f.queue.waiting().collect::<Vec<_>>(), vec![ConnectionId::new(7)]);
    }

    #[test]
    fn test_pairing_notifies_each_side_with_the_other() {
        let mut f = Fixture::new();
        let (a, mut rx_a) = f.user(1);
        let (b, mut rx_b) = f.user(2);
        f.queue.enqueue(a.clone(), open()).expect("open");
        f.queue.enqueue(b.clone(), open()).expect("open");

        let match_id = f.pair(open())[0];

        assert_eq!(
            drain(&mut rx_a),
            vec![ServerEvent::Matched { match_id, partner: b.as_partner() }]
        );
        assert_eq!(
            drain(&mut rx_b),
            vec![ServerEvent::Matched { match_id, partner: a.as_partner() }]
        );
    }

    #[test]
    fn test_pairing_in_final_minutes_adds_warning() {
        let mut f = Fixture::new();
        let (a, mut rx_a) = f.user(1);
        let (b, mut rx_b) = f.user(2);
        let now = taipei(23, 55, 0);
        f.queue.enqueue(a, now).expect("open");
        f.queue.enqueue(b, now).expect("open");

        f.pair(now);

        for rx in [&mut rx_a, &mut rx_b] {
            let events = drain(rx);
            assert_eq!(events.len(), 2);
            assert_eq!(events[1], ServerEvent::TimeWarning { remaining_seconds: 300 });
        }
    }

    #[test]
    fn test_pairing_leaves_fewer_than_two() {
        let mut f = Fixture::new();
        for n in 1..=4 {
            let (u, _rx) = f.user(n);
            f.queue.enqueue(u, open()).expect("open");
        }

        f.pair(open());

        assert!(f.queue.len() < 2);
        assert_eq!(f.registry.len(), 2);
    }
}
