//! Trailing time windows and clocks
//!
//! A trailing window ends at "now" and extends a fixed number of hours into the
//! past. Both ends are inclusive. "Now" comes from a [`Clock`] so windowed logic
//! can be driven by a synthetic clock.

use chrono::{DateTime, Duration, Utc};
use std::sync::RwLock;

/// Source of the current wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for replay and tests
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Move the clock to a new instant
    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.write() {
            *guard = now;
        }
    }

    /// Advance the clock by a duration
    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.write() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Longest window accepted; larger lengths are clamped (about 1000 years)
pub const MAX_WINDOW_HOURS: i64 = 24 * 366 * 1000;

/// Time window `[now - hours, now]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailingWindow {
    hours: i64,
}

impl TrailingWindow {
    /// Window of `hours`, clamped to `0..=MAX_WINDOW_HOURS`
    pub fn hours(hours: i64) -> Self {
        Self {
            hours: hours.clamp(0, MAX_WINDOW_HOURS),
        }
    }

    pub fn length(&self) -> Duration {
        Duration::try_hours(self.hours).unwrap_or_else(Duration::zero)
    }

    /// Window bounds for a given instant
    ///
    /// The start saturates at the earliest representable instant.
    pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = now
            .checked_sub_signed(self.length())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        (start, now)
    }

    /// Check whether a timestamp falls within the window ending at `now`
    pub fn contains(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let (start, end) = self.bounds(now);
        timestamp >= start && timestamp <= end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, h, m, 0).unwrap()
    }

    #[test]
    fn test_window_bounds_inclusive() {
        let now = at(12, 0);
        let window = TrailingWindow::hours(2);

        assert!(window.contains(at(10, 0), now));
        assert!(window.contains(at(12, 0), now));
        assert!(window.contains(at(11, 30), now));
        assert!(!window.contains(at(9, 59), now));
        assert!(!window.contains(at(12, 1), now));
    }

    #[test]
    fn test_negative_hours_clamped() {
        let window = TrailingWindow::hours(-5);
        assert_eq!(window.length(), Duration::zero());
    }

    #[test]
    fn test_huge_hours_saturate() {
        let now = at(12, 0);
        let window = TrailingWindow::hours(i64::MAX);

        assert_eq!(window.length(), Duration::hours(MAX_WINDOW_HOURS));
        assert!(window.contains(at(0, 0), now));
        assert!(!window.contains(at(12, 1), now));

        let (start, _) = window.bounds(DateTime::<Utc>::MIN_UTC + Duration::hours(1));
        assert_eq!(start, DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn test_fixed_clock_advance() {
        let clock = FixedClock::new(at(8, 0));
        clock.advance(Duration::minutes(90));
        assert_eq!(clock.now(), at(9, 30));

        clock.set(at(1, 0));
        assert_eq!(clock.now(), at(1, 0));
    }
}
