//! The user directory: which connection is which user, and in what state.
//!
//! Like the rest of the core state, the directory is a plain `HashMap`
//! owned by the dispatcher task. It does no locking of its own.

use std::collections::HashMap;

use nightowl_transport::ConnectionId;

use crate::{ConnectionState, SessionError, User};

struct Entry {
    user: User,
    state: ConnectionState,
}

/// Maps joined connections to their [`User`] and [`ConnectionState`].
///
/// Connections that have not joined are not stored; their state reads
/// as [`ConnectionState::Anonymous`].
#[derive(Default)]
pub struct UserDirectory {
    entries: HashMap<ConnectionId, Entry>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the connection's user, creating it on the first join.
    ///
    /// The second element is `true` when the user was just created. A
    /// repeated join keeps the original identity and name.
    pub fn identify(&mut self, conn: ConnectionId, reported_name: &str) -> (User, bool) {
        if let Some(entry) = self.entries.get(&conn) {
            return (entry.user.clone(), false);
        }

        let user = User::new(conn, reported_name);
        self.entries.insert(
            conn,
            Entry {
                user: user.clone(),
                state: ConnectionState::Identified,
            },
        );
        tracing::info!(%conn, user_id = %user.id, name = %user.display_name, "user identified");
        (user, true)
    }

    pub fn user(&self, conn: ConnectionId) -> Option<&User> {
        self.entries.get(&conn).map(|e| &e.user)
    }

    pub fn state(&self, conn: ConnectionId) -> ConnectionState {
        self.entries
            .get(&conn)
            .map_or(ConnectionState::Anonymous, |e| e.state)
    }

    /// Moves a connection along its lifecycle.
    ///
    /// # Errors
    /// - [`SessionError::NotIdentified`]: the connection has no user
    /// - [`SessionError::InvalidTransition`]: not a lifecycle edge
    pub fn transition(
        &mut self,
        conn: ConnectionId,
        next: ConnectionState,
    ) -> Result<(), SessionError> {
        let entry = self
            .entries
            .get_mut(&conn)
            .ok_or(SessionError::NotIdentified(conn))?;

        if !entry.state.can_transition_to(&next) {
            return Err(SessionError::InvalidTransition {
                conn,
                from: entry.state.name(),
                to: next.name(),
            });
        }

        tracing::debug!(%conn, from = %entry.state, to = %next, "connection state changed");
        entry.state = next;
        Ok(())
    }

    /// Forgets a connection's user.
    ///
    /// # Errors
    /// Returns [`SessionError::NotIdentified`] if the connection never
    /// joined.
    pub fn remove(&mut self, conn: ConnectionId) -> Result<User, SessionError> {
        let entry = self
            .entries
            .remove(&conn)
            .ok_or(SessionError::NotIdentified(conn))?;
        Ok(entry.user)
    }

    /// Number of joined connections.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
