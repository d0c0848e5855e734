//! Who is connected, and how to reach them.
//!
//! 1. **Users**: the anonymous identity a connection takes on when it
//!    joins ([`User`], [`UserDirectory`]).
//! 2. **Connection state**: where each connection is in its lifecycle
//!    ([`ConnectionState`]).
//! 3. **Outbound sinks**: the "deliver event E to connection C"
//!    capability the core is handed ([`ConnectionRegistry`]).
//!
//! ```text
//! Match Layer (above)  ← queues and pairs users, relays messages
//!     ↕
//! Session Layer (this crate)  ← identities, states, sinks
//!     ↕
//! Protocol / Transport (below)  ← UserId, ServerEvent, ConnectionId
//! ```

mod connections;
mod directory;
mod error;
mod state;
mod user;

pub use connections::{ConnectionRegistry, EventReceiver, EventSender};
pub use directory::UserDirectory;
pub use error::SessionError;
pub use state::ConnectionState;
pub use user::User;
