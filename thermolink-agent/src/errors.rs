//! Error types for the agent runtime

use std::io;
use std::path::PathBuf;

use thermolink_core::{CoreError, SampleError};
use thiserror::Error;

/// Result type for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Failures of the raw sample source
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source could not be opened; fatal at startup
    #[error("Failed to open raw source {}: {source}", path.display())]
    Open {
        /// Path that was opened
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Reading from an open source failed
    #[error("Failed to read raw source: {0}")]
    Read(#[from] io::Error),

    /// A line could not be parsed into a raw sample
    #[error("Line {line}: {source}")]
    Sample {
        /// 1-based line number within the source
        line: u64,
        /// Parse failure
        #[source]
        source: SampleError,
    },
}

impl SourceError {
    /// Whether this is a bad sample rather than a broken source
    pub fn is_malformed_sample(&self) -> bool {
        matches!(self, Self::Sample { .. })
    }
}

/// Top-level agent errors
#[derive(Debug, Error)]
pub enum AgentError {
    /// Raw source failure
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Core component misconfigured
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connector could not be created
    #[error("Connector error: {0}")]
    Connector(String),

    /// A pipeline stage panicked or was cancelled
    #[error("Stage {stage} terminated abnormally: {reason}")]
    Stage {
        /// Stage name
        stage: &'static str,
        /// Join failure description
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_error_display() {
        let err = SourceError::Sample {
            line: 7,
            source: SampleError::Malformed { token: "x".into() },
        };
        assert_eq!(
            err.to_string(),
            "Line 7: Malformed sample: \"x\" is not an unsigned integer"
        );
        assert!(err.is_malformed_sample());

        let err = SourceError::Open {
            path: PathBuf::from("missing.txt"),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().starts_with("Failed to open raw source missing.txt"));
        assert!(!err.is_malformed_sample());
    }
}
