//! Command-line and environment configuration for the agent binary
//!
//! Every flag can also be set through a `THERMOLINK_*` environment
//! variable. Durations are given in whole milliseconds (HTTP timeout in
//! seconds) and must be non-zero.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thermolink_connectors::http::{HttpConfig, HttpConnector, StatusPolicy};
use thermolink_core::constants::DEFAULT_COLLECTOR_URL;

use crate::aggregator::{AggregatorConfig, PartialWindow};
use crate::errors::{AgentError, AgentResult};
use crate::pipeline::PipelineConfig;
use crate::publisher::PublisherConfig;
use crate::sampler::{MalformedPolicy, SamplerConfig};

/// thermolink agent: sample a temperature feed and publish windowed summaries
#[derive(Debug, Clone, Parser)]
#[command(name = "thermolink", version, about)]
pub struct AgentConfig {
    /// Line-oriented raw sample file
    #[arg(long, env = "THERMOLINK_SOURCE", default_value = "temperature.txt")]
    pub source: PathBuf,

    /// Collector base URL
    #[arg(long, env = "THERMOLINK_COLLECTOR_URL", default_value = DEFAULT_COLLECTOR_URL)]
    pub collector_url: String,

    /// Sampling interval in milliseconds
    #[arg(long, env = "THERMOLINK_TICK_MS", default_value_t = 100)]
    pub tick_ms: u64,

    /// Publishing window in milliseconds
    #[arg(long, env = "THERMOLINK_WINDOW_MS", default_value_t = 2000)]
    pub window_ms: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "THERMOLINK_HTTP_TIMEOUT_SECS", default_value_t = 10)]
    pub http_timeout_secs: u64,

    /// Response classification: "strict" or "legacy"
    #[arg(long, env = "THERMOLINK_STATUS_POLICY", default_value_t = StatusPolicy::Strict)]
    pub status_policy: StatusPolicy,

    /// Malformed sample handling: "skip" or "abort"
    #[arg(long, env = "THERMOLINK_MALFORMED", default_value_t = MalformedPolicy::Skip)]
    pub malformed: MalformedPolicy,

    /// Final partial window handling: "drop" or "emit"
    #[arg(long, env = "THERMOLINK_PARTIAL_WINDOW", default_value_t = PartialWindow::Drop)]
    pub partial_window: PartialWindow,
}

impl AgentConfig {
    /// Reject values no stage can run with
    pub fn validate(&self) -> AgentResult<()> {
        if self.tick_ms == 0 {
            return Err(AgentError::Config("tick-ms must be greater than zero".into()));
        }
        if self.window_ms == 0 {
            return Err(AgentError::Config("window-ms must be greater than zero".into()));
        }
        if self.http_timeout_secs == 0 {
            return Err(AgentError::Config(
                "http-timeout-secs must be greater than zero".into(),
            ));
        }
        if !self.collector_url.starts_with("http://") && !self.collector_url.starts_with("https://")
        {
            return Err(AgentError::Config(format!(
                "collector-url {:?} must start with http:// or https://",
                self.collector_url
            )));
        }
        Ok(())
    }

    /// Stage configuration derived from the flags
    pub fn pipeline_config(&self) -> AgentResult<PipelineConfig> {
        self.validate()?;
        Ok(PipelineConfig {
            sampler: SamplerConfig::new(Duration::from_millis(self.tick_ms))
                .malformed_policy(self.malformed),
            aggregator: AggregatorConfig::new(Duration::from_millis(self.window_ms))
                .partial_window(self.partial_window),
            publisher: PublisherConfig::default(),
        })
    }

    /// HTTP connector configuration derived from the flags
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig::new(self.collector_url.as_str())
            .timeout_secs(self.http_timeout_secs)
            .status_policy(self.status_policy)
    }

    /// HTTP connector for the configured collector
    pub fn connector(&self) -> AgentResult<HttpConnector> {
        HttpConnector::new(self.http_config()).map_err(|e| AgentError::Connector(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> AgentConfig {
        let mut argv = vec!["thermolink"];
        argv.extend_from_slice(args);
        AgentConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults() {
        let config = parse(&[]);
        assert_eq!(config.source, PathBuf::from("temperature.txt"));
        assert_eq!(config.collector_url, "http://localhost:5000");
        assert_eq!(config.tick_ms, 100);
        assert_eq!(config.window_ms, 2000);
        assert_eq!(config.status_policy, StatusPolicy::Strict);
        assert_eq!(config.malformed, MalformedPolicy::Skip);
        assert_eq!(config.partial_window, PartialWindow::Drop);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn flags_map_to_stage_config() {
        let config = parse(&[
            "--tick-ms",
            "50",
            "--window-ms",
            "500",
            "--malformed",
            "abort",
            "--partial-window",
            "emit",
            "--status-policy",
            "legacy",
            "--collector-url",
            "http://collector:8080/",
        ]);

        let pipeline = config.pipeline_config().unwrap();
        assert_eq!(pipeline.sampler.tick_interval, Duration::from_millis(50));
        assert_eq!(pipeline.sampler.malformed_policy, MalformedPolicy::Abort);
        assert_eq!(pipeline.aggregator.window_duration, Duration::from_millis(500));
        assert_eq!(pipeline.aggregator.partial_window, PartialWindow::Emit);
        assert_eq!(pipeline.publisher.measurement_path, "/api/temperature");

        let http = config.http_config();
        assert_eq!(http.base_url, "http://collector:8080");
        assert_eq!(http.status_policy, StatusPolicy::Legacy);
        assert_eq!(http.timeout, Duration::from_secs(10));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(parse(&["--tick-ms", "0"]).validate().is_err());
        assert!(parse(&["--window-ms", "0"]).pipeline_config().is_err());
        assert!(parse(&["--http-timeout-secs", "0"]).validate().is_err());
        assert!(parse(&["--collector-url", "ftp://x"]).validate().is_err());
        assert!(AgentConfig::try_parse_from(["thermolink", "--malformed", "zero"]).is_err());
    }

    #[test]
    fn connector_errors_are_agent_errors() {
        let config = parse(&[]);
        let connector = config.connector().unwrap();
        assert_eq!(connector.config().base_url, "http://localhost:5000");

        // Skipping validation, the connector still refuses a bad scheme
        let mut config = parse(&[]);
        config.collector_url = "collector:5000".into();
        assert!(matches!(config.connector(), Err(AgentError::Connector(_))));
    }
}
