//! Calibration, timing and delivery constants
//!
//! All numeric values used by the sampling pipeline live here so the
//! stages never carry magic numbers of their own.

use core::time::Duration;

// ===== SENSOR CALIBRATION =====

/// Largest value the analog front-end can report (12-bit ADC).
pub const RAW_MAX: u16 = 4095;

/// Temperature mapped to a raw reading of 0 (°C).
pub const MIN_TEMP_C: f64 = -50.0;

/// Temperature mapped to a raw reading of [`RAW_MAX`] (°C).
pub const MAX_TEMP_C: f64 = 50.0;

// ===== TIMING =====

/// Default interval between two samples.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Default span a window must cover before it is published.
pub const DEFAULT_WINDOW_DURATION: Duration = Duration::from_secs(2);

// ===== DELIVERY =====

/// Number of failed measurements kept for redelivery.
///
/// When a further measurement fails the oldest buffered one is evicted.
pub const RETRY_BUFFER_CAPACITY: usize = 10;

/// Collector path accepting a single measurement.
pub const TEMPERATURE_PATH: &str = "/api/temperature";

/// Collector path accepting a JSON array of previously failed measurements.
pub const MISSING_PATH: &str = "/api/temperature/missing";

/// Default collector base URL.
pub const DEFAULT_COLLECTOR_URL: &str = "http://localhost:5000";

/// Number of decimal places kept in published measurements.
pub const MEASUREMENT_DECIMALS: i32 = 2;
