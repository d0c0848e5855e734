//! Pairing and relaying for Nightowl.
//!
//! # Key types
//!
//! - [`MatchQueue`]: FIFO of users waiting for a partner; pairs the two
//!   longest-waiting users whenever it can
//! - [`SessionRegistry`]: every [`Match`] ever made, and which match each
//!   user is currently in
//! - [`MessageRelay`]: appends a chat line to a match and delivers it to
//!   both participants
//!
//! None of these types lock. They are owned by the dispatcher task, which
//! applies one inbound event to completion before looking at the next.

mod error;
mod queue;
mod registry;
mod relay;

pub use error::MatchError;
pub use queue::{Enqueued, MatchQueue};
pub use registry::{Match, MatchStatus, Message, SessionRegistry};
pub use relay::MessageRelay;
