//! Window aggregation stage
//!
//! Drives a [`WindowAggregator`] from the reading channel and forwards every
//! completed window to the publisher. The stage runs until the reading
//! channel closes; what happens to a window still in progress at that point
//! is decided by [`PartialWindow`].

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thermolink_core::{constants::DEFAULT_WINDOW_DURATION, Measurement, Reading, WindowAggregator};
use tokio::sync::mpsc;

use crate::errors::AgentError;

/// Handling of the in-progress window when input ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartialWindow {
    /// Discard it; every published window spans the full duration
    #[default]
    Drop,
    /// Publish it even though it is shorter than the window duration
    Emit,
}

impl FromStr for PartialWindow {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "emit" => Ok(Self::Emit),
            other => Err(AgentError::Config(format!(
                "unknown partial window policy {other:?} (expected \"drop\" or \"emit\")"
            ))),
        }
    }
}

impl fmt::Display for PartialWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drop => f.write_str("drop"),
            Self::Emit => f.write_str("emit"),
        }
    }
}

/// Aggregator configuration
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Minimum span of a published window
    pub window_duration: Duration,
    /// Handling of the final partial window
    pub partial_window: PartialWindow,
}

impl AggregatorConfig {
    /// Configuration with the given window span
    pub fn new(window_duration: Duration) -> Self {
        Self {
            window_duration,
            partial_window: PartialWindow::default(),
        }
    }

    /// Set final partial window handling
    pub fn partial_window(mut self, policy: PartialWindow) -> Self {
        self.partial_window = policy;
        self
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_DURATION)
    }
}

/// Counters kept by the aggregator
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AggregatorStats {
    /// Readings received
    pub readings: u64,
    /// Full windows forwarded
    pub windows_emitted: u64,
    /// Whether a final partial window was forwarded
    pub partial_emitted: bool,
    /// Readings discarded with the final partial window
    pub partial_dropped_readings: u64,
}

/// Aggregation stage
#[derive(Debug)]
pub struct Aggregator {
    window: WindowAggregator,
    partial_window: PartialWindow,
}

impl Aggregator {
    /// Build the stage; fails on a zero window duration
    pub fn new(config: AggregatorConfig) -> Result<Self, AgentError> {
        Ok(Self {
            window: WindowAggregator::new(config.window_duration)?,
            partial_window: config.partial_window,
        })
    }

    /// Run until the reading channel closes
    pub async fn run(
        mut self,
        mut readings: mpsc::Receiver<Reading>,
        measurements: mpsc::Sender<Measurement>,
    ) -> AggregatorStats {
        let mut stats = AggregatorStats::default();
        log::info!(
            "Aggregator started (window {:?})",
            self.window.window_duration()
        );

        while let Some(reading) = readings.recv().await {
            stats.readings += 1;

            let Some(measurement) = self.window.push(reading) else {
                continue;
            };

            log::debug!("measurement: {:?}", measurement);
            if measurements.send(measurement).await.is_err() {
                log::warn!("Measurement channel closed; aggregator stopping");
                return stats;
            }
            stats.windows_emitted += 1;
        }

        self.finish_partial(&measurements, &mut stats).await;
        log::info!(
            "Aggregator stopped: {} readings, {} windows",
            stats.readings,
            stats.windows_emitted
        );
        stats
    }

    async fn finish_partial(
        &mut self,
        measurements: &mpsc::Sender<Measurement>,
        stats: &mut AggregatorStats,
    ) {
        let pending = self.window.count();
        if pending == 0 {
            return;
        }

        match self.partial_window {
            PartialWindow::Drop => {
                log::info!("Dropping partial window of {} readings", pending);
                self.window.reset();
                stats.partial_dropped_readings = pending;
            }
            PartialWindow::Emit => {
                let Some(measurement) = self.window.flush_partial() else {
                    return;
                };
                log::info!("Emitting partial window of {} readings", pending);
                if measurements.send(measurement).await.is_ok() {
                    stats.partial_emitted = true;
                } else {
                    log::warn!("Measurement channel closed; partial window lost");
                    stats.partial_dropped_readings = pending;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn reading(temperature: f64, ms: i64) -> Reading {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + chrono::Duration::milliseconds(ms);
        Reading::new(temperature, t)
    }

    async fn run_with(
        config: AggregatorConfig,
        input: Vec<Reading>,
    ) -> (AggregatorStats, Vec<Measurement>) {
        let (reading_tx, reading_rx) = mpsc::channel(1);
        let (measurement_tx, mut measurement_rx) = mpsc::channel(1);
        let stage = Aggregator::new(config).unwrap();
        let handle = tokio::spawn(stage.run(reading_rx, measurement_tx));

        let feeder = tokio::spawn(async move {
            for r in input {
                reading_tx.send(r).await.unwrap();
            }
        });

        let mut out = Vec::new();
        while let Some(m) = measurement_rx.recv().await {
            out.push(m);
        }
        feeder.await.unwrap();
        (handle.await.unwrap(), out)
    }

    #[test]
    fn policy_parsing() {
        assert_eq!("drop".parse::<PartialWindow>().unwrap(), PartialWindow::Drop);
        assert_eq!("EMIT".parse::<PartialWindow>().unwrap(), PartialWindow::Emit);
        assert!("flush".parse::<PartialWindow>().is_err());
        assert_eq!(PartialWindow::Emit.to_string(), "emit");
    }

    #[test]
    fn rejects_zero_window() {
        assert!(matches!(
            Aggregator::new(AggregatorConfig::new(Duration::ZERO)),
            Err(AgentError::Core(_))
        ));
    }

    #[tokio::test]
    async fn forwards_completed_windows_and_drops_partial() {
        let input: Vec<Reading> = (0..25).map(|i| reading(i as f64, i * 100)).collect();
        let (stats, out) = run_with(AggregatorConfig::default(), input).await;

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].min, 0.0);
        assert_eq!(out[0].max, 20.0);
        assert_eq!(stats.readings, 25);
        assert_eq!(stats.windows_emitted, 1);
        assert_eq!(stats.partial_dropped_readings, 4);
        assert!(!stats.partial_emitted);
    }

    #[tokio::test]
    async fn emits_partial_when_configured() {
        let input: Vec<Reading> = (0..25).map(|i| reading(i as f64, i * 100)).collect();
        let config = AggregatorConfig::default().partial_window(PartialWindow::Emit);
        let (stats, out) = run_with(config, input).await;

        assert_eq!(out.len(), 2);
        assert_eq!(out[1].min, 21.0);
        assert_eq!(out[1].max, 24.0);
        assert_eq!(out[1].average, 22.5);
        assert!(stats.partial_emitted);
        assert_eq!(stats.partial_dropped_readings, 0);
    }

    #[tokio::test]
    async fn empty_input_emits_nothing() {
        let config = AggregatorConfig::default().partial_window(PartialWindow::Emit);
        let (stats, out) = run_with(config, Vec::new()).await;
        assert!(out.is_empty());
        assert_eq!(stats, AggregatorStats::default());
    }

    #[tokio::test]
    async fn preserves_window_order() {
        let config = AggregatorConfig::new(Duration::from_millis(200));
        let input: Vec<Reading> = (0..9).map(|i| reading(i as f64, i * 100)).collect();
        let (_, out) = run_with(config, input).await;

        let starts: Vec<_> = out.iter().map(|m| m.min).collect();
        assert_eq!(starts, vec![0.0, 3.0, 6.0]);
    }
}
