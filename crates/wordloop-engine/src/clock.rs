//! Time source used by the engine.
//!
//! "Today" is the UTC calendar date of [`Clock::now`].

use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Supplies the current time to queue building, level updates and summaries.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Returns the current UTC calendar date.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually driven clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Creates a clock frozen at `now`.
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
            .lock()
            .map_or_else(|poisoned| *poisoned.into_inner(), |now| *now)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_fixed_clock_today() {
        let clock = FixedClock::new(at("2026-02-03T23:30:00Z"));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 2, 3).unwrap());
    }

    #[test]
    fn test_fixed_clock_advance() {
        let clock = FixedClock::new(at("2026-02-03T23:30:00Z"));
        clock.advance(Duration::minutes(45));
        assert_eq!(clock.now(), at("2026-02-04T00:15:00Z"));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 2, 4).unwrap());
    }

    #[test]
    fn test_system_clock_is_recent() {
        let elapsed = Utc::now() - SystemClock.now();
        assert!(elapsed.num_seconds() < 1);
    }
}
