//! HTTP connector for delivering measurements to a REST collector
//!
//! ## Overview
//!
//! Measurements are POSTed as JSON to paths below a base URL:
//!
//! ```text
//! POST {base_url}/api/temperature           one measurement object
//! POST {base_url}/api/temperature/missing   array of buffered measurements
//! ```
//!
//! The client is the lightweight blocking `ureq` agent. Requests run on
//! tokio's blocking pool so the publisher task never stalls the runtime.
//!
//! ## Status Classification
//!
//! How a response status maps onto delivery is selected by [`StatusPolicy`]:
//!
//! | Status      | `Strict` (default)  | `Legacy`            |
//! |-------------|---------------------|---------------------|
//! | 2xx         | delivered           | delivered           |
//! | 1xx, 3xx    | retryable           | delivered           |
//! | 4xx         | rejected            | delivered           |
//! | 500         | retryable           | retryable           |
//! | other 5xx   | retryable           | delivered           |
//! | no response | retryable           | retryable           |
//!
//! `Legacy` reproduces collectors that only ever signal failure with 500.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use thermolink_connectors::http::{HttpConfig, HttpConnector, StatusPolicy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HttpConfig::new("http://collector.local:5000")
//!     .timeout_secs(5)
//!     .status_policy(StatusPolicy::Strict);
//!
//! let mut http = HttpConnector::new(config)?;
//! http.post_json("/api/temperature", &serde_json::json!({"min": 1.0})).await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::{AsyncConnector, ConnectionStats, DeliveryFailure};

/// HTTP-specific errors
#[derive(Debug, Error)]
pub enum HttpError {
    /// Network error, timeout or no response at all
    #[error("Request failed: {0}")]
    Transport(String),

    /// Collector failed while handling the request
    #[error("Server error {status}")]
    ServerError {
        /// Response status code
        status: u16,
    },

    /// Informational or redirect status; the payload was not accepted
    #[error("Unexpected status {status}")]
    UnexpectedStatus {
        /// Response status code
        status: u16,
    },

    /// Collector refused the request; resending it unchanged will not help
    #[error("Request rejected with status {status}")]
    Rejected {
        /// Response status code
        status: u16,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DeliveryFailure for HttpError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::ServerError { .. } | Self::UnexpectedStatus { .. }
        )
    }
}

/// Outcome of a response status under a [`StatusPolicy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// Payload accepted
    Delivered,
    /// Payload may be accepted if sent again later
    Retryable,
    /// Payload refused for good
    Rejected,
}

/// Mapping from response status to delivery outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusPolicy {
    /// 2xx delivered, 4xx rejected, anything else retryable
    #[default]
    Strict,
    /// Only 500 fails (retryable), everything else counts as delivered
    Legacy,
}

impl StatusPolicy {
    /// Classify a response status
    pub fn classify(self, status: u16) -> StatusClass {
        match self {
            // ureq does not follow redirects for POST; a 3xx never reached the collector
            Self::Strict => match status {
                200..=299 => StatusClass::Delivered,
                400..=499 => StatusClass::Rejected,
                _ => StatusClass::Retryable,
            },
            Self::Legacy => match status {
                500 => StatusClass::Retryable,
                _ => StatusClass::Delivered,
            },
        }
    }
}

impl FromStr for StatusPolicy {
    type Err = HttpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "legacy" => Ok(Self::Legacy),
            other => Err(HttpError::Config(format!(
                "unknown status policy {other:?} (expected \"strict\" or \"legacy\")"
            ))),
        }
    }
}

impl fmt::Display for StatusPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::Legacy => f.write_str("legacy"),
        }
    }
}

/// HTTP configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL of the collector, without a trailing slash
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Status classification
    pub status_policy: StatusPolicy,
    /// User agent string
    pub user_agent: String,
}

impl HttpConfig {
    /// Create new configuration with base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(10),
            status_policy: StatusPolicy::default(),
            user_agent: format!("thermolink/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set request timeout in seconds
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Set request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set status classification
    pub fn status_policy(mut self, policy: StatusPolicy) -> Self {
        self.status_policy = policy;
        self
    }

    /// Full URL for an endpoint path
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

/// HTTP connector using lightweight ureq client
pub struct HttpConnector {
    config: HttpConfig,
    agent: ureq::Agent,
    stats: ConnectionStats,
    reachable: bool,
}

impl HttpConnector {
    /// Create new HTTP connector
    pub fn new(config: HttpConfig) -> Result<Self, HttpError> {
        if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
            return Err(HttpError::Config(
                "Base URL must start with http:// or https://".into(),
            ));
        }
        if config.timeout.is_zero() {
            return Err(HttpError::Config("Timeout must be greater than zero".into()));
        }

        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build();

        Ok(Self {
            config,
            agent,
            stats: ConnectionStats::default(),
            reachable: true,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Serialize `data` as JSON and POST it to `path`
    pub async fn post_json<T: Serialize + ?Sized>(
        &mut self,
        path: &str,
        data: &T,
    ) -> Result<(), HttpError> {
        let body =
            serde_json::to_vec(data).map_err(|e| HttpError::Serialization(e.to_string()))?;
        self.send(path, &body).await
    }

    /// Execute a POST on the blocking pool and return the response status
    async fn execute(&self, url: String, body: Vec<u8>) -> Result<u16, HttpError> {
        let agent = self.agent.clone();

        let response = tokio::task::spawn_blocking(move || {
            agent
                .post(&url)
                .set("Content-Type", "application/json")
                .set("Accept", "application/json")
                .send_bytes(&body)
        })
        .await
        .map_err(|e| HttpError::Transport(format!("request task failed: {e}")))?;

        match response {
            Ok(resp) => Ok(resp.status()),
            Err(ureq::Error::Status(code, _)) => Ok(code),
            Err(ureq::Error::Transport(e)) => Err(HttpError::Transport(e.to_string())),
        }
    }
}

#[async_trait::async_trait]
impl AsyncConnector for HttpConnector {
    type Error = HttpError;

    async fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error> {
        let url = self.config.url_for(topic);
        log::debug!("POST {} ({} bytes)", url, data.len());

        let result = match self.execute(url, data.to_vec()).await {
            Ok(status) => {
                self.reachable = true;
                match self.config.status_policy.classify(status) {
                    StatusClass::Delivered => Ok(()),
                    StatusClass::Retryable if status >= 500 => {
                        Err(HttpError::ServerError { status })
                    }
                    StatusClass::Retryable => Err(HttpError::UnexpectedStatus { status }),
                    StatusClass::Rejected => Err(HttpError::Rejected { status }),
                }
            }
            Err(e) => {
                self.reachable = false;
                Err(e)
            }
        };

        match &result {
            Ok(()) => self.stats.record_success(data.len()),
            Err(e) => self.stats.record_failure(e),
        }
        result
    }

    fn is_connected(&self) -> bool {
        self.reachable
    }

    fn stats(&self) -> ConnectionStats {
        self.stats.clone()
    }
}
