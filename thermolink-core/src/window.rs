//! Streaming min/max/average aggregation over reading-driven windows
//!
//! ## Overview
//!
//! The aggregator folds readings into exactly one in-progress window. Each
//! reading updates the running statistics in O(1) without keeping the
//! readings themselves:
//!
//! ```text
//! average' = average + (t - average) / (count + 1)
//! min'     = min(min, t)
//! max'     = max(max, t)
//! ```
//!
//! The incremental mean is algebraically equal to the arithmetic mean and
//! never accumulates a large running sum. Rounding to two decimals happens
//! only when a [`Measurement`] is built, so accumulated values stay exact.
//!
//! ## Window Boundaries
//!
//! Boundaries are driven by reading timestamps, not by a timer. A window
//! starts at its first reading and completes on the first reading whose
//! timestamp is at least `window_duration` after the start:
//!
//! ```text
//! duration = 2s, tick = 100ms
//!
//! t: 0.0  0.1  0.2 ... 1.9  2.0 │ 2.1  2.2 ...
//!    ├──────── window 1 ───────┤ ├─ window 2 ...
//!    start                end   emit
//! ```
//!
//! Published spans are therefore never shorter than the configured
//! duration. A pause in the readings stalls completion; nothing is flushed
//! until the next reading arrives.

use std::time::Duration;

use crate::errors::{CoreError, CoreResult};
use crate::events::{Measurement, Reading};
use crate::time::{elapsed, Timestamp};

/// Running statistics of the in-progress window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowState {
    /// Timestamp of the first reading, `None` while empty
    pub start: Option<Timestamp>,
    /// Timestamp of the latest reading, `None` while empty
    pub end: Option<Timestamp>,
    /// Readings folded into the window
    pub count: u64,
    /// Running mean, unrounded
    pub average: f64,
    /// Lowest temperature seen, `+∞` while empty
    pub min: f64,
    /// Highest temperature seen, `-∞` while empty
    pub max: f64,
}

impl WindowState {
    /// A fresh window with sentinel extremes
    pub const fn empty() -> Self {
        Self {
            start: None,
            end: None,
            count: 0,
            average: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// No reading folded in yet
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Time covered between the first and latest reading
    pub fn span(&self) -> Option<Duration> {
        elapsed(self.start?, self.end?)
    }

    fn fold(&mut self, reading: &Reading) {
        if self.count == 0 {
            self.start = Some(reading.timestamp);
        }

        self.average += (reading.temperature - self.average) / (self.count + 1) as f64;
        self.min = self.min.min(reading.temperature);
        self.max = self.max.max(reading.temperature);

        self.end = Some(reading.timestamp);
        self.count += 1;
    }

    fn to_measurement(self) -> Option<Measurement> {
        let (start, end) = (self.start?, self.end?);
        Some(Measurement::new(start, end, self.min, self.max, self.average))
    }
}

impl Default for WindowState {
    fn default() -> Self {
        Self::empty()
    }
}

/// Folds readings into consecutive, non-overlapping windows
#[derive(Debug, Clone)]
pub struct WindowAggregator {
    window_duration: Duration,
    state: WindowState,
    windows_emitted: u64,
}

impl WindowAggregator {
    /// Aggregator publishing once a window spans `window_duration`
    pub fn new(window_duration: Duration) -> CoreResult<Self> {
        if window_duration.is_zero() {
            return Err(CoreError::InvalidDuration {
                name: "window_duration",
            });
        }

        Ok(Self {
            window_duration,
            state: WindowState::empty(),
            windows_emitted: 0,
        })
    }

    /// Fold one reading, returning the completed measurement if the window closed
    ///
    /// The returned measurement includes `reading`; the next call starts a
    /// fresh window.
    pub fn push(&mut self, reading: Reading) -> Option<Measurement> {
        self.state.fold(&reading);

        if !self.is_complete() {
            return None;
        }

        let measurement = self.state.to_measurement();
        log::trace!(
            "window {} complete after {} readings",
            self.windows_emitted + 1,
            self.state.count
        );
        self.reset();
        self.windows_emitted += 1;
        measurement
    }

    /// Emit the in-progress window regardless of its span
    ///
    /// Returns `None` when no reading has been folded in since the last emit.
    pub fn flush_partial(&mut self) -> Option<Measurement> {
        let measurement = self.state.to_measurement();
        self.reset();
        measurement
    }

    /// Discard the in-progress window
    pub fn reset(&mut self) {
        self.state = WindowState::empty();
    }

    /// Readings in the in-progress window
    pub fn count(&self) -> u64 {
        self.state.count
    }

    /// Snapshot of the in-progress window
    pub fn state(&self) -> &WindowState {
        &self.state
    }

    /// Configured window span
    pub fn window_duration(&self) -> Duration {
        self.window_duration
    }

    /// Completed windows emitted through [`push`](Self::push)
    pub fn windows_emitted(&self) -> u64 {
        self.windows_emitted
    }

    fn is_complete(&self) -> bool {
        // A clock stepping backwards yields no span and keeps the window open
        self.state
            .span()
            .is_some_and(|span| span >= self.window_duration)
    }
}
