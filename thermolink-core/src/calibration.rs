//! Raw ADC sample parsing and linear temperature calibration
//!
//! The sensor front-end reports a 12-bit value in `[0, 4095]` that maps
//! linearly onto `[-50 °C, 50 °C]`:
//!
//! ```text
//! temperature = (raw / RAW_MAX) * (MAX_TEMP - MIN_TEMP) + MIN_TEMP
//!
//!    raw:   0 ──────────── 2047.5 ──────────── 4095
//!    °C:  -50 ────────────    0   ────────────   50
//! ```
//!
//! Parsing is strict: a token that is not an unsigned integer, or that is
//! larger than [`RAW_MAX`], is reported as a [`SampleError`] instead of being
//! coerced to some default value.

use crate::constants::{MAX_TEMP_C, MEASUREMENT_DECIMALS, MIN_TEMP_C, RAW_MAX};
use crate::errors::SampleError;

/// A validated raw ADC sample in `[0, RAW_MAX]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawSample(u16);

impl RawSample {
    /// Wrap a raw value, rejecting anything above [`RAW_MAX`]
    pub fn new(value: u16) -> Result<Self, SampleError> {
        if value > RAW_MAX {
            return Err(SampleError::OutOfRange { value: value.into() });
        }
        Ok(Self(value))
    }

    /// The raw ADC count
    pub fn value(self) -> u16 {
        self.0
    }

    /// Calibrated temperature in °C
    pub fn to_celsius(self) -> f64 {
        raw_to_celsius(self)
    }
}

impl TryFrom<u16> for RawSample {
    type Error = SampleError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Parse one whitespace-trimmed token from the raw source
pub fn parse_raw_sample(token: &str) -> Result<RawSample, SampleError> {
    let token = token.trim();
    let value: u64 = token.parse().map_err(|_| SampleError::Malformed {
        token: token.to_string(),
    })?;

    if value > u64::from(RAW_MAX) {
        return Err(SampleError::OutOfRange { value });
    }

    // Bounded by RAW_MAX above, so the narrowing cannot truncate
    Ok(RawSample(value as u16))
}

/// Convert a raw sample to °C using the linear calibration curve
pub fn raw_to_celsius(raw: RawSample) -> f64 {
    lerp(f64::from(raw.value()) / f64::from(RAW_MAX), MIN_TEMP_C, MAX_TEMP_C)
}

/// Linear interpolation between `min` and `max` for `t` in `[0, 1]`
pub fn lerp(t: f64, min: f64, max: f64) -> f64 {
    t * (max - min) + min
}

/// Round to the number of decimals carried by published measurements
///
/// Halves round away from zero.
pub fn round2(value: f64) -> f64 {
    let scale = 10f64.powi(MEASUREMENT_DECIMALS);
    (value * scale).round() / scale
}
