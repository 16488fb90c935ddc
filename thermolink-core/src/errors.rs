//! Error types for sample parsing and core configuration
//!
//! ## Error Categories
//!
//! ### Sample Errors
//! - `Malformed`: the raw token is not an unsigned integer
//! - `OutOfRange`: the token parsed but exceeds the 12-bit ADC range
//!
//! Neither is fatal on its own. The sampler decides whether a bad sample is
//! skipped or stops the pipeline (see `MalformedPolicy` in the agent crate).
//!
//! ### Configuration Errors
//! - `InvalidDuration`: a tick or window duration of zero
//!
//! ```rust
//! use thermolink_core::{calibration::parse_raw_sample, SampleError};
//!
//! match parse_raw_sample("12a") {
//!     Ok(raw) => println!("raw = {}", raw.value()),
//!     Err(SampleError::Malformed { token }) => println!("bad token {token:?}"),
//!     Err(e) => println!("{e}"),
//! }
//! ```

use thiserror::Error;

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// A raw sample could not be turned into a reading
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SampleError {
    /// Token is not an unsigned integer
    #[error("Malformed sample: {token:?} is not an unsigned integer")]
    Malformed {
        /// The trimmed token as read from the source
        token: String,
    },

    /// Token parsed but lies outside `[0, RAW_MAX]` (`RAW_MAX` = 4095)
    #[error("Sample {value} outside range [0, 4095]")]
    OutOfRange {
        /// The parsed value
        value: u64,
    },
}

/// Errors raised while configuring core components
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Durations must be strictly positive
    #[error("Invalid duration for {name}: must be greater than zero")]
    InvalidDuration {
        /// Name of the offending setting
        name: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = SampleError::Malformed { token: "x1".into() };
        assert_eq!(err.to_string(), "Malformed sample: \"x1\" is not an unsigned integer");

        let err = SampleError::OutOfRange { value: 5000 };
        assert_eq!(err.to_string(), "Sample 5000 outside range [0, 4095]");

        let err = CoreError::InvalidDuration { name: "window_duration" };
        assert!(err.to_string().contains("window_duration"));
    }
}
