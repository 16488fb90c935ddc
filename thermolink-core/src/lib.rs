//! Core domain logic for thermolink
//!
//! Turns raw 12-bit sensor samples into calibrated readings, folds them into
//! reading-driven windows and keeps failed measurements in a bounded retry
//! buffer. Everything here is synchronous and runtime-agnostic; the async
//! stages in `thermolink-agent` drive it.
//!
//! ```no_run
//! use std::time::Duration;
//! use thermolink_core::{
//!     calibration::parse_raw_sample,
//!     time::{Clock, SystemClock},
//!     Reading, WindowAggregator,
//! };
//!
//! let mut aggregator = WindowAggregator::new(Duration::from_secs(2))?;
//! let raw = parse_raw_sample("2048")?;
//!
//! if let Some(measurement) = aggregator.push(Reading::from_raw(raw, SystemClock.now())) {
//!     println!("{measurement:?}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod buffer;
pub mod calibration;
pub mod constants;
pub mod errors;
pub mod events;
pub mod time;
pub mod window;

// Public API
pub use buffer::{CircularBuffer, RetryBuffer};
pub use calibration::RawSample;
pub use errors::{CoreError, CoreResult, SampleError};
pub use events::{Measurement, MeasurementTime, Reading};
pub use window::{WindowAggregator, WindowState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
