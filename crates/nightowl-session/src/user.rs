//! The anonymous user record.

use nightowl_protocol::{PartnerInfo, UserId};
use nightowl_transport::ConnectionId;

/// A joined connection's identity.
///
/// There is no account behind a user: the id is minted on join and the
/// display name is whatever the client reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    /// The live connection this user speaks through.
    pub connection: ConnectionId,
}

impl User {
    /// Longest display name kept, in characters.
    pub const MAX_DISPLAY_NAME_CHARS: usize = 32;

    /// Creates a user with a fresh id.
    ///
    /// The reported name is trimmed and capped. A blank name is replaced
    /// by a short name derived from the new id, e.g. `user-3f2a9`.
    pub fn new(connection: ConnectionId, reported_name: &str) -> Self {
        let id = UserId::new();
        let trimmed = reported_name.trim();
        let display_name = if trimmed.is_empty() {
            let hex = id.0.simple().to_string();
            format!("user-{}", &hex[..5])
        } else {
            trimmed.chars().take(Self::MAX_DISPLAY_NAME_CHARS).collect()
        };
        Self {
            id,
            display_name,
            connection,
        }
    }

    /// How this user is introduced to their partner.
    pub fn as_partner(&self) -> PartnerInfo {
        PartnerInfo {
            id: self.id,
            display_name: self.display_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> ConnectionId {
        ConnectionId::new(1)
    }

    #[test]
    fn test_new_keeps_reported_name_trimmed() {
        let user = User::new(conn(), "  night owl \n");
        assert_eq!(user.display_name, "night owl");
    }

    #[test]
    fn test_new_blank_name_is_derived_from_id() {
        let user = User::new(conn(), "   ");
        let hex = user.id.0.simple().to_string();
        assert_eq!(user.display_name, format!("user-{}", &hex[..5]));
    }

    #[test]
    fn test_new_caps_long_names_on_char_boundary() {
        let long = "貓".repeat(40);
        let user = User::new(conn(), &long);
        assert_eq!(user.display_name.chars().count(), User::MAX_DISPLAY_NAME_CHARS);
    }

    #[test]
    fn test_new_users_get_distinct_ids() {
        assert_ne!(User::new(conn(), "a").id, User::new(conn(), "a").id);
    }

    #[test]
    fn test_as_partner_copies_identity() {
        let user = User::new(conn(), "owl");
        let partner = user.as_partner();
        assert_eq!(partner.id, user.id);
        assert_eq!(partner.display_name, "owl");
    }
}
