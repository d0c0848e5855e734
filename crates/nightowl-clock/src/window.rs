//! The daily access window.
//!
//! Pairing is allowed from 21:00:00 through 23:59:59 local time and the
//! window closes at the following midnight. The last ten minutes are the
//! final warning period, during which clients are told how many seconds
//! remain.
//!
//! "Local" is one fixed zone, [`AccessWindowGate::CANONICAL_ZONE`], not
//! the host's: two servers deployed in different regions must agree on
//! when the evening starts.

use chrono::offset::LocalResult;
use chrono::{
    DateTime, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;

/// Window state at one instant, as reported to a joining user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowStatus {
    pub open: bool,
    /// Start of the next window. `None` while the window is open.
    pub next_open: Option<DateTime<Utc>>,
}

/// Answers every question the core asks about the access window.
///
/// Pure: every method is a function of the `now` argument and the zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessWindowGate {
    zone: Tz,
}

impl AccessWindowGate {
    /// First local hour of the window (inclusive).
    pub const OPEN_HOUR: u32 = 21;
    /// Last local hour of the window (inclusive); the window ends at 24:00.
    pub const LAST_HOUR: u32 = 23;
    /// Minute of [`Self::LAST_HOUR`] at which the final warning starts.
    pub const FINAL_WARNING_MINUTE: u32 = 50;
    pub const CANONICAL_ZONE: Tz = chrono_tz::Asia::Taipei;

    pub fn new() -> Self {
        Self::with_zone(Self::CANONICAL_ZONE)
    }

    /// A gate evaluated in a different zone. Only tests should need this.
    pub fn with_zone(zone: Tz) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        let hour = self.local(now).hour();
        (Self::OPEN_HOUR..=Self::LAST_HOUR).contains(&hour)
    }

    /// 21:00:00 today, or 21:00:00 tomorrow once today's window has
    /// started.
    pub fn next_open_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local = self.local(now);
        let mut date = local.date_naive();
        if local.hour() >= Self::OPEN_HOUR {
            date = next_day(date);
        }
        let open_at = NaiveTime::MIN + TimeDelta::hours(i64::from(Self::OPEN_HOUR));
        self.resolve(date.and_time(open_at))
    }

    pub fn is_final_warning_period(&self, now: DateTime<Utc>) -> bool {
        let local = self.local(now);
        local.hour() == Self::LAST_HOUR && local.minute() >= Self::FINAL_WARNING_MINUTE
    }

    /// Whole seconds until the next local midnight.
    pub fn seconds_until_close(&self, now: DateTime<Utc>) -> i64 {
        let midnight = self.resolve(next_day(self.local(now).date_naive()).and_time(NaiveTime::MIN));
        (midnight - now).num_seconds()
    }

    pub fn status(&self, now: DateTime<Utc>) -> WindowStatus {
        if self.is_open(now) {
            WindowStatus {
                open: true,
                next_open: None,
            }
        } else {
            WindowStatus {
                open: false,
                next_open: Some(self.next_open_time(now)),
            }
        }
    }

    fn local(&self, now: DateTime<Utc>) -> DateTime<Tz> {
        now.with_timezone(&self.zone)
    }

    /// Maps a wall-clock time in the gate's zone to an instant.
    fn resolve(&self, local: NaiveDateTime) -> DateTime<Utc> {
        match self.zone.from_local_datetime(&local) {
            LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => t.with_timezone(&Utc),
            // Wall time skipped by a DST jump: keep the offset in force a
            // day earlier, which is the pre-jump one.
            LocalResult::None => {
                let before = local - TimeDelta::days(1);
                let offset = self.zone.offset_from_utc_datetime(&before).fix();
                Utc.from_utc_datetime(&(local - offset))
            }
        }
    }
}

impl Default for AccessWindowGate {
    fn default() -> Self {
        Self::new()
    }
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(NaiveDate::MAX)
}
