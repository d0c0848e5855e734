//! Time for Nightowl: when pairing is allowed, what "now" is, and when
//! the presence broadcast fires.
//!
//! - [`AccessWindowGate`]: pure function of wall-clock time that answers
//!   "is the window open", "when does it open next", and "how long until
//!   it closes". Always evaluated in one canonical civil zone.
//! - [`Clock`]: injection seam for the current instant. Production uses
//!   [`SystemClock`]; tests drive a [`ManualClock`].
//! - [`TickScheduler`]: fixed-period tick that sits inside the core
//!   dispatcher's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         _ = scheduler.wait_for_tick() => { /* presence broadcast */ }
//!     }
//! }
//! ```

mod clock;
mod scheduler;
mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use scheduler::{TickConfig, TickInfo, TickScheduler};
pub use window::{AccessWindowGate, WindowStatus};
