//! # Nightowl
//!
//! Anonymous one-on-one chat that only pairs people during a nightly
//! window (21:00 to midnight, Taipei time).
//!
//! A browser connects over WebSocket, sends `join`, and waits in a FIFO
//! queue until someone else joins. The two are matched, exchange
//! messages until one of them leaves, and everyone connected gets a
//! presence broadcast once a minute with the window state.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nightowl::prelude::*;
//!
//! # async fn start() -> Result<(), NightowlError> {
//! let server = NightowlServer::builder()
//!     .bind("0.0.0.0:3000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod coordinator;
mod dispatcher;
mod error;
mod handler;
mod server;

pub use coordinator::{Core, CoreStats};
pub use dispatcher::{CoreHandle, spawn_core};
pub use error::NightowlError;
pub use server::{
    DEFAULT_COMMAND_BUFFER, DEFAULT_HANDSHAKE_TIMEOUT, NightowlServer, NightowlServerBuilder,
};

pub use nightowl_clock as clock;
pub use nightowl_match as matching;
pub use nightowl_protocol as protocol;
pub use nightowl_session as session;
pub use nightowl_transport as transport;

/// The types most servers and tests need.
pub mod prelude {
    pub use crate::{CoreHandle, CoreStats, NightowlError, NightowlServer, NightowlServerBuilder};
    pub use nightowl_clock::{AccessWindowGate, Clock, ManualClock, SystemClock, TickConfig};
    pub use nightowl_protocol::{
        ChatMessage, ClientEvent, Codec, JsonCodec, MatchId, MessageId, PartnerInfo,
        ServerEvent, UserId,
    };
}
