//! Time management for the sampling pipeline
//!
//! Provides a clock abstraction so readings can be stamped from:
//! - The system wall clock (UTC) in production
//! - A manual clock that moves in fixed steps for deterministic tests

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Wall-clock instant attached to readings and measurements
pub type Timestamp = DateTime<Utc>;

/// Source of wall-clock time
///
/// Implementations must be shareable between the sampler task and the
/// code that constructs it.
pub trait Clock: Send + Sync {
    /// Current instant in UTC
    fn now(&self) -> Timestamp;
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Controllable clock for testing
///
/// Every call to [`Clock::now`] returns the current instant and then
/// advances it by `step`, so a sampler driven by this clock produces
/// evenly spaced timestamps regardless of scheduling jitter.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<Timestamp>,
    step: chrono::Duration,
}

impl ManualClock {
    /// Clock frozen at `start`
    pub fn new(start: Timestamp) -> Self {
        Self {
            current: Mutex::new(start),
            step: chrono::Duration::zero(),
        }
    }

    /// Clock that advances by `step` after every reading of the time
    pub fn with_step(start: Timestamp, step: Duration) -> Self {
        Self {
            current: Mutex::new(start),
            step: to_chrono(step),
        }
    }

    /// Set the current instant
    pub fn set(&self, timestamp: Timestamp) {
        *self.lock() = timestamp;
    }

    /// Move the clock forward without reading it
    pub fn advance(&self, by: Duration) {
        let mut current = self.lock();
        *current += to_chrono(by);
    }

    /// Current instant without advancing
    pub fn peek(&self) -> Timestamp {
        *self.lock()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Timestamp> {
        // The guarded value is a plain timestamp, so a poisoned lock is still usable
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let mut current = self.lock();
        let now = *current;
        *current += self.step;
        now
    }
}

/// Elapsed time from `start` to `end`, or `None` if `end` is earlier
pub fn elapsed(start: Timestamp, end: Timestamp) -> Option<Duration> {
    (end - start).to_std().ok()
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn epoch() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn manual_clock_steps() {
        let clock = ManualClock::with_step(epoch(), Duration::from_millis(100));
        let a = clock.now();
        let b = clock.now();
        assert_eq!(a, epoch());
        assert_eq!(elapsed(a, b), Some(Duration::from_millis(100)));
        assert_eq!(elapsed(a, clock.peek()), Some(Duration::from_millis(200)));
    }

    #[test]
    fn manual_clock_frozen() {
        let clock = ManualClock::new(epoch());
        assert_eq!(clock.now(), clock.now());

        clock.advance(Duration::from_secs(2));
        assert_eq!(elapsed(epoch(), clock.now()), Some(Duration::from_secs(2)));

        clock.set(epoch());
        assert_eq!(clock.peek(), epoch());
    }

    #[test]
    fn elapsed_backwards_is_none() {
        let later = epoch() + chrono::Duration::seconds(1);
        assert_eq!(elapsed(later, epoch()), None);
        assert_eq!(elapsed(epoch(), epoch()), Some(Duration::ZERO));
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
