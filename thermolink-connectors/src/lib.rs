//! Collector connectors for edge-to-cloud delivery
//!
//! ## Overview
//!
//! A connector moves serialized measurements from the device to the remote
//! collector. The publisher only sees the [`AsyncConnector`] trait, so the
//! transport can be swapped (or mocked in tests) without touching the
//! retry logic.
//!
//! ## Failure Classification
//!
//! Every connector error says whether delivery may succeed later:
//!
//! | Failure                     | Retryable | Publisher action     |
//! |-----------------------------|-----------|----------------------|
//! | Network / transport error   | yes       | park in retry buffer |
//! | Server error (5xx)          | yes       | park in retry buffer |
//! | Unexpected status (1xx/3xx) | yes       | park in retry buffer |
//! | Rejected request (4xx)      | no        | drop and log         |
//! | Serialization error         | no        | drop and log         |
//!
//! Connectors never retry on their own. Redelivery is owned by the
//! publisher's bounded retry buffer.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use thermolink_connectors::{AsyncConnector, http::{HttpConfig, HttpConnector}};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut http = HttpConnector::new(HttpConfig::new("http://localhost:5000"))?;
//! http.send("/api/temperature", br#"{"min":1.0}"#).await?;
//! # Ok(())
//! # }
//! ```

pub mod http;

pub use http::{HttpConfig, HttpConnector, HttpError, StatusPolicy};

/// Error returned by a connector's send path
pub trait DeliveryFailure: std::error::Error + Send + Sync + 'static {
    /// Whether sending the same payload later may succeed
    fn is_retryable(&self) -> bool;
}

/// Trait for all collector connectors
#[async_trait::async_trait]
pub trait AsyncConnector: Send {
    /// Connector-specific failure
    type Error: DeliveryFailure;

    /// Send one payload to `topic` (an endpoint path for HTTP)
    async fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error>;

    /// Whether the last delivery attempt reached the collector
    fn is_connected(&self) -> bool;

    /// Get connection statistics
    fn stats(&self) -> ConnectionStats;
}

/// Connection statistics common to all connectors
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConnectionStats {
    /// Total messages delivered
    pub messages_sent: u64,
    /// Total messages that failed to deliver
    pub messages_failed: u64,
    /// Total payload bytes delivered
    pub bytes_sent: u64,
    /// Last error message
    pub last_error: Option<String>,
}

impl ConnectionStats {
    /// Record a delivered payload of `bytes` bytes
    pub fn record_success(&mut self, bytes: usize) {
        self.messages_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    /// Record a failed delivery
    pub fn record_failure(&mut self, error: &impl std::fmt::Display) {
        self.messages_failed += 1;
        self.last_error = Some(error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_accumulate() {
        let mut stats = ConnectionStats::default();
        stats.record_success(10);
        stats.record_success(5);
        stats.record_failure(&"boom");

        assert_eq!(stats.messages_sent, 2);
        assert_eq!(stats.bytes_sent, 15);
        assert_eq!(stats.messages_failed, 1);
        assert_eq!(stats.last_error.as_deref(), Some("boom"));
    }
}
