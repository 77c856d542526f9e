//! Time window used to query calendar events.
//!
//! [`TimeWindow`] is a half-open `[start, end)` interval in UTC. The CLI
//! asks for [`TimeWindow::current_hour`], the hour the clock is closest to.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

const SECS_PER_HOUR: i64 = 3600;

/// A time window for querying calendar events.
///
/// Represents a half-open interval `[start, end)` in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// Creates a time window from a start time and duration.
    pub fn from_duration(start: DateTime<Utc>, duration: Duration) -> Self {
        Self::new(start, start + duration)
    }

    /// The one-hour window starting at `now` rounded to the nearest hour.
    ///
    /// Half past rounds up, so 10:30 yields `[11:00, 12:00)` and 10:29:59
    /// yields `[10:00, 11:00)`.
    pub fn current_hour(now: DateTime<Utc>) -> Self {
        Self::from_duration(round_to_hour(now), Duration::hours(1))
    }

}

fn round_to_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    let secs = now.timestamp();
    let rem = secs.rem_euclid(SECS_PER_HOUR);
    let rounded = if rem >= SECS_PER_HOUR / 2 {
        secs - rem + SECS_PER_HOUR
    } else {
        secs - rem
    };
    DateTime::from_timestamp(rounded, 0).unwrap_or(now)
}
