//! Fixed-period tick for the presence broadcast.
//!
//! The presence monitor fires once a minute for the life of the process.
//! A late wake-up (runtime starved, machine suspended) never produces a
//! burst of catch-up ticks: the missed ticks are counted, logged, and the
//! next tick is scheduled one period from now.

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

/// Configuration for the tick scheduler.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Time between ticks. Zero disables the tick entirely.
    pub period: Duration,
    /// Upper bound of a random delay added to the first tick only, so
    /// that several servers started together do not broadcast in
    /// lock-step.
    pub initial_jitter: Duration,
}

impl TickConfig {
    /// Presence broadcast period.
    pub const PRESENCE_PERIOD: Duration = Duration::from_secs(60);

    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            ..Default::default()
        }
    }
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            period: Self::PRESENCE_PERIOD,
            initial_jitter: Duration::ZERO,
        }
    }
}

/// Information about a fired tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// `true` if this tick fired more than a tenth of a period late.
    pub overrun: bool,
    /// Whole periods that were skipped because of the overrun.
    pub ticks_skipped: u64,
}

/// Fixed-period tick scheduler. One per dispatcher.
pub struct TickScheduler {
    period: Option<Duration>,
    tick_count: u64,
    next_tick: Option<Instant>,
}

impl TickScheduler {
    pub fn new(config: TickConfig) -> Self {
        let period = (!config.period.is_zero()).then_some(config.period);

        let next_tick = period.map(|p| {
            let jitter = if config.initial_jitter.is_zero() {
                Duration::ZERO
            } else {
                let max = config.initial_jitter.as_micros() as u64;
                Duration::from_micros(rand::rng().random_range(0..max))
            };
            Instant::now() + p + jitter
        });

        match period {
            Some(p) => debug!(period_secs = p.as_secs_f64(), "tick scheduler created"),
            None => debug!("tick scheduler created with ticks disabled"),
        }

        Self {
            period,
            tick_count: 0,
            next_tick,
        }
    }

    /// Waits until the next tick is due.
    ///
    /// With ticks disabled this future never resolves, which lets it sit
    /// in a `select!` next to the command channel unconditionally.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let (next, period) = match (self.next_tick, self.period) {
            (Some(next), Some(period)) => (next, period),
            _ => std::future::pending().await,
        };

        time::sleep_until(next).await;

        let now = Instant::now();
        self.tick_count += 1;

        let late_by = now.saturating_duration_since(next);
        let overrun = late_by > period / 10;
        let ticks_skipped = if overrun {
            (late_by.as_nanos() / period.as_nanos()) as u64
        } else {
            0
        };
        if ticks_skipped > 0 {
            warn!(
                tick = self.tick_count,
                skipped = ticks_skipped,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "tick overrun, skipping ahead"
            );
        }

        self.next_tick = Some(now + period);
        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            overrun,
            ticks_skipped,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// The configured period, or `None` when ticks are disabled.
    pub fn period(&self) -> Option<Duration> {
        self.period
    }
}
