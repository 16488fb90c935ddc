//! Reading and measurement types flowing through the pipeline
//!
//! ## Event Flow
//!
//! ```text
//! Sampler ──Reading──▶ Aggregator ──Measurement──▶ Publisher ──JSON──▶ Collector
//! ```
//!
//! 1. **Reading**: one calibrated, timestamped temperature per sampler tick
//! 2. **Measurement**: min/max/average summary of one completed window
//!
//! Both are immutable once built and are moved, never shared, between stages.
//!
//! ## Wire Format
//!
//! A measurement serializes to the collector's JSON shape:
//!
//! ```json
//! {"time":{"start":"2024-01-01T00:00:00Z","end":"2024-01-01T00:00:02.100Z"},
//!  "min":-1.25,"max":3.5,"avg":0.87}
//! ```

use serde::{Deserialize, Serialize};

use crate::calibration::{raw_to_celsius, round2, RawSample};
use crate::time::Timestamp;

/// One calibrated temperature observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Temperature in °C
    pub temperature: f64,
    /// Wall-clock instant the sample was taken (UTC)
    pub timestamp: Timestamp,
}

impl Reading {
    /// Build a reading from an already calibrated temperature
    pub fn new(temperature: f64, timestamp: Timestamp) -> Self {
        Self {
            temperature,
            timestamp,
        }
    }

    /// Calibrate a raw sample and stamp it
    pub fn from_raw(raw: RawSample, timestamp: Timestamp) -> Self {
        Self::new(raw_to_celsius(raw), timestamp)
    }
}

/// Start and end of the window a measurement summarises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementTime {
    /// Timestamp of the first reading in the window
    pub start: Timestamp,
    /// Timestamp of the last reading in the window
    pub end: Timestamp,
}

/// Published summary of one completed window
///
/// All numeric fields are rounded to two decimals at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Window boundaries
    pub time: MeasurementTime,
    /// Lowest temperature in the window
    pub min: f64,
    /// Highest temperature in the window
    pub max: f64,
    /// Arithmetic mean of the window's temperatures
    #[serde(rename = "avg")]
    pub average: f64,
}

impl Measurement {
    /// Build a measurement, rounding the statistics for publication
    pub fn new(start: Timestamp, end: Timestamp, min: f64, max: f64, average: f64) -> Self {
        Self {
            time: MeasurementTime { start, end },
            min: round2(min),
            max: round2(max),
            average: round2(average),
        }
    }

    /// Timestamp of the first reading
    pub fn window_start(&self) -> Timestamp {
        self.time.start
    }

    /// Timestamp of the last reading
    pub fn window_end(&self) -> Timestamp {
        self.time.end
    }
}
