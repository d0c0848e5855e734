//! The core aggregate and the per-connection coordinator logic.
//!
//! [`Core`] owns every piece of mutable shared state: the user directory,
//! the outbound sinks, the waiting queue, and the match registry. It is
//! constructed once and handed to the dispatcher task, which feeds it one
//! event at a time. Each method therefore runs to completion before the
//! next event is looked at, and none of them lock.
//!
//! Every method takes `now` explicitly so the whole state machine can be
//! driven at any wall-clock time in tests.

use chrono::{DateTime, Utc};
use nightowl_clock::AccessWindowGate;
use nightowl_match::{Enqueued, MatchError, MatchQueue, MessageRelay, SessionRegistry};
use nightowl_protocol::{MatchId, ServerEvent};
use nightowl_session::{ConnectionRegistry, ConnectionState, EventSender, UserDirectory};
use nightowl_transport::ConnectionId;

/// Counts for logging and health checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoreStats {
    /// Live connections, joined or not.
    pub connections: usize,
    pub users: usize,
    pub queued: usize,
    /// Matches made since start, including ended ones.
    pub matches: usize,
    pub active_matches: usize,
    /// Number of the last presence tick, 0 before the first.
    pub last_tick: u64,
}

/// All shared chat state.
pub struct Core {
    gate: AccessWindowGate,
    users: UserDirectory,
    connections: ConnectionRegistry,
    queue: MatchQueue,
    registry: SessionRegistry,
    relay: MessageRelay,
    last_tick: u64,
}

impl Core {
    pub fn new(gate: AccessWindowGate) -> Self {
        Self {
            gate,
            users: UserDirectory::new(),
            connections: ConnectionRegistry::new(),
            queue: MatchQueue::new(gate),
            registry: SessionRegistry::new(),
            relay: MessageRelay::new(),
            last_tick: 0,
        }
    }

    /// A new connection: register its outbound sink. The connection stays
    /// anonymous until it joins, but receives presence broadcasts.
    pub fn connect(&mut self, conn: ConnectionId, sink: EventSender) {
        self.connections.register(conn, sink);
        tracing::debug!(%conn, "connection registered");
    }

    /// Handles `join`.
    ///
    /// First join: allocate the user, reply `joined`, then `status`. If the
    /// window is open the user is queued (`waiting`) and pairing runs.
    ///
    /// A connection waiting for the window may join again to retry; a
    /// retry while the window is still closed is answered with `error`.
    /// Joins from a queued or matched connection change nothing.
    pub fn join(&mut self, conn: ConnectionId, display_name: &str, now: DateTime<Utc>) {
        let state = self.users.state(conn);
        match state {
            ConnectionState::Anonymous | ConnectionState::Identified => {}
            ConnectionState::WaitingForWindow => {
                self.enqueue(conn, now);
                return;
            }
            ConnectionState::Queued
            | ConnectionState::Matched { .. }
            | ConnectionState::Active { .. }
            | ConnectionState::PartnerLeft { .. } => {
                tracing::debug!(%conn, %state, "join ignored");
                return;
            }
        }

        let (user, _) = self.users.identify(conn, display_name);
        self.connections.deliver(
            conn,
            ServerEvent::Joined {
                user_id: user.id,
                display_name: user.display_name,
            },
        );

        let status = self.gate.status(now);
        self.connections.deliver(
            conn,
            ServerEvent::Status {
                open: status.open,
                next_open: status.next_open.map(|t| t.timestamp_millis()),
            },
        );

        if status.open {
            self.enqueue(conn, now);
        } else {
            self.set_state(conn, ConnectionState::WaitingForWindow);
        }
    }

    /// Handles `send_message`. Anything the relay rejects is dropped
    /// without telling anyone.
    pub fn send_message(
        &mut self,
        conn: ConnectionId,
        match_id: MatchId,
        body: &str,
        now: DateTime<Utc>,
    ) {
        let Some(author) = self.users.user(conn).map(|u| u.id) else {
            tracing::debug!(%conn, "message before join dropped");
            return;
        };

        match self
            .relay
            .send(&mut self.registry, &self.connections, match_id, author, body, now)
        {
            Ok(_) => {
                let conns = self
                    .registry
                    .get(match_id)
                    .map(|m| m.participants().map(|u| u.connection));
                for participant in conns.into_iter().flatten() {
                    if self.users.state(participant) == (ConnectionState::Matched { match_id }) {
                        self.set_state(participant, ConnectionState::Active { match_id });
                    }
                }
            }
            Err(reason) => {
                tracing::debug!(%conn, %match_id, %reason, "message dropped");
            }
        }
    }

    /// Handles the connection going away, from any state.
    ///
    /// The user leaves the queue, their sink is dropped, and if they were
    /// in an active match their partner gets exactly one
    /// `partner_disconnected`.
    pub fn disconnect(&mut self, conn: ConnectionId) {
        self.connections.unregister(conn);
        self.queue.remove(conn);

        let Ok(user) = self.users.remove(conn) else {
            tracing::debug!(%conn, "anonymous connection closed");
            return;
        };
        tracing::info!(%conn, user_id = %user.id, "user disconnected");

        let Some(partner) = self.registry.record_disconnect(user.id) else {
            return;
        };
        self.connections
            .deliver(partner.connection, ServerEvent::PartnerDisconnected {});
        if let Some(match_id) = self.users.state(partner.connection).match_id() {
            self.set_state(partner.connection, ConnectionState::PartnerLeft { match_id });
        }
    }

    /// One presence tick: `time_check` to everyone, plus `time_warning`
    /// during the final minutes. Warnings repeat on every tick in that
    /// period; clients decide how to show them.
    pub fn presence_tick(&mut self, tick: u64, now: DateTime<Utc>) {
        self.last_tick = tick;
        let open = self.gate.is_open(now);
        let reached = self.connections.broadcast(&ServerEvent::TimeCheck { open });

        if self.gate.is_final_warning_period(now) {
            let remaining_seconds = self.gate.seconds_until_close(now);
            self.connections
                .broadcast(&ServerEvent::TimeWarning { remaining_seconds });
        }

        let stats = self.stats();
        tracing::info!(
            tick,
            open,
            reached,
            users = stats.users,
            queued = stats.queued,
            active_matches = stats.active_matches,
            "presence tick"
        );
    }

    pub fn stats(&self) -> CoreStats {
        CoreStats {
            connections: self.connections.len(),
            users: self.users.len(),
            queued: self.queue.len(),
            matches: self.registry.len(),
            active_matches: self.registry.active_count(),
            last_tick: self.last_tick,
        }
    }

    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    pub fn queue(&self) -> &MatchQueue {
        &self.queue
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    fn enqueue(&mut self, conn: ConnectionId, now: DateTime<Utc>) {
        let Some(user) = self.users.user(conn).cloned() else {
            return;
        };

        match self.queue.enqueue(user, now) {
            Ok(Enqueued::Queued { position }) => {
                tracing::info!(%conn, position, "user waiting for a partner");
                self.set_state(conn, ConnectionState::Queued);
                self.connections.deliver(conn, ServerEvent::Waiting {});
                self.pair(now);
            }
            Ok(Enqueued::AlreadyQueued) => {}
            Err(err @ MatchError::WindowClosed { .. }) => {
                self.set_state(conn, ConnectionState::WaitingForWindow);
                self.connections.deliver(
                    conn,
                    ServerEvent::Error {
                        reason: err.to_string(),
                    },
                );
            }
            Err(err) => {
                tracing::warn!(%conn, error = %err, "enqueue failed");
            }
        }
    }

    fn pair(&mut self, now: DateTime<Utc>) {
        let created = self
            .queue
            .try_pair_all(&mut self.registry, &self.connections, now);

        for match_id in created {
            let Some(m) = self.registry.get(match_id) else {
                continue;
            };
            for conn in m.participants().map(|u| u.connection) {
                self.set_state(conn, ConnectionState::Matched { match_id });
            }
        }
    }

    fn set_state(&mut self, conn: ConnectionId, next: ConnectionState) {
        if let Err(err) = self.users.transition(conn, next) {
            tracing::warn!(%conn, error = %err, "connection state not updated");
        }
    }
}
