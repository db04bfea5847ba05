//! Time management for the engine
//!
//! Readings carry wall-clock UTC instants. The ingestion boundary stamps
//! readings that arrive without one using an injected [`TimeSource`]:
//! - System clock in production
//! - Fixed clock in tests (settable, advanceable)

use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

/// Wall-clock instant of a reading
pub type Timestamp = DateTime<Utc>;

/// Source of time for the ingestion boundary
pub trait TimeSource: Send + Sync {
    /// Current instant
    fn now(&self) -> Timestamp;
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Fixed time source for testing
///
/// Shared behind an `Arc`, so the instant is held behind a lock and can be
/// moved from the test while the ingestor keeps reading it.
#[derive(Debug)]
pub struct FixedClock {
    timestamp: RwLock<Timestamp>,
}

impl FixedClock {
    /// Clock stopped at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp: RwLock::new(timestamp),
        }
    }

    /// Move the clock to `timestamp`
    pub fn set(&self, timestamp: Timestamp) {
        let mut guard = self.timestamp.write().unwrap_or_else(|e| e.into_inner());
        *guard = timestamp;
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut guard = self.timestamp.write().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl TimeSource for FixedClock {
    fn now(&self) -> Timestamp {
        *self.timestamp.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Minutes elapsed from `earlier` to `later`
///
/// Negative when the readings arrived out of timestamp order.
pub fn elapsed_minutes(earlier: Timestamp, later: Timestamp) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 60_000.0
}

/// Convert a value delta over a span to a per-minute rate
///
/// Zero or negative spans yield 0.0 so identical or out-of-order timestamps
/// never produce an infinite or undefined rate.
pub fn rate_per_minute(value_delta: f64, minutes: f64) -> f64 {
    if minutes > 0.0 {
        value_delta / minutes
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base() -> Timestamp {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn fixed_clock_advances() {
        let clock = FixedClock::new(base());
        assert_eq!(clock.now(), base());

        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now(), base() + Duration::seconds(90));

        clock.set(base());
        assert_eq!(clock.now(), base());
    }

    #[test]
    fn elapsed_minutes_is_signed() {
        let later = base() + Duration::seconds(150);
        assert_eq!(elapsed_minutes(base(), later), 2.5);
        assert_eq!(elapsed_minutes(later, base()), -2.5);
    }

    #[test]
    fn rate_calculation() {
        // 100 units over 2 minutes = 50 units/minute
        assert_eq!(rate_per_minute(100.0, 2.0), 50.0);

        // Zero and negative spans
        assert_eq!(rate_per_minute(100.0, 0.0), 0.0);
        assert_eq!(rate_per_minute(100.0, -1.0), 0.0);
    }
}
