//! Integration tests for queue → registry → relay working together.

use chrono::{DateTime, TimeZone, Utc};
use nightowl_clock::AccessWindowGate;
use nightowl_match::{MatchError, MatchQueue, MatchStatus, MessageRelay, SessionRegistry};
use nightowl_protocol::{MatchId, ServerEvent};
use nightowl_session::{ConnectionRegistry, EventReceiver, User};
use nightowl_transport::ConnectionId;
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

fn open() -> DateTime<Utc> {
    chrono_tz::Asia::Taipei
        .with_ymd_and_hms(2026, 3, 1, 22, 0, 0)
        .single()
        .expect("valid")
        .with_timezone(&Utc)
}

struct World {
    queue: MatchQueue,
    registry: SessionRegistry,
    connections: ConnectionRegistry,
    relay: MessageRelay,
}

struct Peer {
    user: User,
    rx: EventReceiver,
}

impl Peer {
    fn drain(&mut self) -> Vec<ServerEvent> {
        std::iter::from_fn(|| self.rx.try_recv().ok()).collect()
    }

    fn bodies(&mut self) -> Vec<String> {
        self.drain()
            .into_iter()
            .filter_map(|e| match e {
                ServerEvent::NewMessage(m) => Some(m.body),
                _ => None,
            })
            .collect()
    }
}

impl World {
    fn new() -> Self {
        Self {
            queue: MatchQueue::new(AccessWindowGate::new()),
            registry: SessionRegistry::new(),
            connections: ConnectionRegistry::new(),
            relay: MessageRelay::new(),
        }
    }

    fn connect(&mut self, n: u64, name: &str) -> Peer {
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.register(ConnectionId::new(n), tx);
        Peer {
            user: User::new(ConnectionId::new(n), name),
            rx,
        }
    }

    /// Queues two peers and pairs them, discarding the `matched` events.
    fn matched_pair(&mut self) -> (Peer, Peer, MatchId) {
        let mut a = self.connect(1, "alice");
        let mut b = self.connect(2, "bob");
        self.queue.enqueue(a.user.clone(), open()).expect("open");
        self.queue.enqueue(b.user.clone(), open()).expect("open");
        let match_id = self.queue.try_pair_all(&mut self.registry, &self.connections, open())[0];
        a.drain();
        b.drain();
        (a, b, match_id)
    }

    fn send(&mut self, match_id: MatchId, from: &Peer, body: &str) -> Result<(), MatchError> {
        self.relay
            .send(&mut self.registry, &self.connections, match_id, from.user.id, body, open())
            .map(|_| ())
    }
}

// =========================================================================
// Tests
// =========================================================================

#[test]
fn test_message_reaches_both_participants() {
    let mut w = World::new();
    let (mut a, mut b, match_id) = w.matched_pair();

    w.send(match_id, &a, "hello").expect("relayed");

    let expected = vec!["hello".to_string()];
    assert_eq!(a.bodies(), expected);
    assert_eq!(b.bodies(), expected);
}

#[test]
fn test_delivery_order_equals_send_order() {
    let mut w = World::new();
    let (mut a, mut b, match_id) = w.matched_pair();

    w.send(match_id, &a, "1").expect("relayed");
    w.send(match_id, &b, "2").expect("relayed");
    w.send(match_id, &a, "3").expect("relayed");

    let expected: Vec<String> = ["1", "2", "3"].map(String::from).to_vec();
    assert_eq!(a.bodies(), expected);
    assert_eq!(b.bodies(), expected);

    let m = w.registry.get(match_id).expect("exists");
    let history: Vec<&str> = m.messages().iter().map(|msg| msg.body.as_str()).collect();
    assert_eq!(history, ["1", "2", "3"]);
}

#[test]
fn test_counts_equal_authored_messages() {
    let mut w = World::new();
    let (a, b, match_id) = w.matched_pair();

    for _ in 0..3 {
        w.send(match_id, &a, "ping").expect("relayed");
    }
    w.send(match_id, &b, "pong").expect("relayed");

    let m = w.registry.get(match_id).expect("exists");
    assert_eq!(m.message_count(a.user.id), Some(3));
    assert_eq!(m.message_count(b.user.id), Some(1));
}

#[test]
fn test_new_message_carries_author_identity() {
    let mut w = World::new();
    let (a, mut b, match_id) = w.matched_pair();

    w.send(match_id, &a, "hi").expect("relayed");

    match b.drain().as_slice() {
        [ServerEvent::NewMessage(msg)] => {
            assert_eq!(msg.user_id, a.user.id);
            assert_eq!(msg.display_name, "alice");
            assert_eq!(msg.sent_at, open().timestamp_millis());
        }
        other => panic!("expected one new_message, got {other:?}"),
    }
}

#[test]
fn test_unknown_match_is_dropped_silently() {
    let mut w = World::new();
    let (mut a, mut b, _) = w.matched_pair();

    let result = w.send(MatchId::new(), &a, "hello?");

    assert!(matches!(result, Err(MatchError::NotFound(_))));
    assert!(a.drain().is_empty());
    assert!(b.drain().is_empty());
}

#[test]
fn test_outsider_cannot_post_into_match() {
    let mut w = World::new();
    let (mut a, mut b, match_id) = w.matched_pair();
    let outsider = w.connect(3, "eve");

    let result = w.send(match_id, &outsider, "boo");

    assert!(matches!(result, Err(MatchError::NotParticipant(..))));
    assert!(a.drain().is_empty());
    assert!(b.drain().is_empty());
    assert!(w.registry.get(match_id).expect("exists").messages().is_empty());
}

#[test]
fn test_send_after_partner_left_is_dropped() {
    let mut w = World::new();
    let (a, mut b, match_id) = w.matched_pair();

    w.registry.record_disconnect(a.user.id);
    w.connections.unregister(a.user.connection);
    let result = w.send(match_id, &b, "anyone?");

    assert!(matches!(result, Err(MatchError::PartnerLeft(_))));
    assert!(b.drain().is_empty());
    assert_eq!(
        w.registry.get(match_id).map(|m| m.status()),
        Some(MatchStatus::PartnerLeft)
    );
}

#[test]
fn test_unreachable_partner_drops_message() {
    let mut w = World::new();
    let (a, b, match_id) = w.matched_pair();
    drop(b);

    let result = w.send(match_id, &a, "still there?");

    assert!(matches!(result, Err(MatchError::Unreachable(_))));
    assert!(w.registry.get(match_id).expect("exists").messages().is_empty());
}

#[test]
fn test_blank_and_oversized_bodies_are_dropped() {
    let mut w = World::new();
    let (a, _b, match_id) = w.matched_pair();

    assert!(matches!(w.send(match_id, &a, "   "), Err(MatchError::BlankBody)));
    let huge = "x".repeat(MessageRelay::MAX_BODY_CHARS + 1);
    assert!(matches!(w.send(match_id, &a, &huge), Err(MatchError::BodyTooLong { .. })));
    assert!(w.registry.get(match_id).expect("exists").messages().is_empty());
}
