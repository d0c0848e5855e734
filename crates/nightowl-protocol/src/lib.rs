//! Wire protocol for Nightowl.
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], the id newtypes):
//!   the events that travel between a browser and the server.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those events are
//!   turned into frames and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer knows nothing about queues or matches; it only
//! knows the shape of each event.
//!
//! ```text
//! Transport (frames) → Protocol (events) → Session / Match (state)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ChatMessage, ClientEvent, MatchId, MessageId, PartnerInfo, ServerEvent, UserId,
};
