//! Publishing stage with bounded redelivery
//!
//! ## Publish Cycle
//!
//! For every measurement received:
//!
//! ```text
//! 1. retry buffer non-empty?  ──▶ POST whole buffer to /missing
//!                                   ok        → clear buffer
//!                                   retryable → keep buffer unchanged
//!                                   rejected  → clear buffer (collector refuses it)
//! 2. POST measurement to /api/temperature
//! 3. retryable failure        ──▶ push into retry buffer (evicts oldest when full)
//!    rejected                 ──▶ drop
//! ```
//!
//! A flush is all-or-nothing: the buffer is sent as one JSON array and
//! either fully acknowledged or left untouched.
//!
//! The retry buffer is owned by this stage alone. Measurements are handled
//! strictly one at a time, so there is never more than one request in
//! flight and flush-then-send happens atomically per measurement.
//!
//! When the measurement channel closes the stage makes one last flush
//! attempt; whatever is still buffered afterwards is reported as lost.

use thermolink_connectors::{AsyncConnector, DeliveryFailure};
use thermolink_core::{
    constants::{MISSING_PATH, TEMPERATURE_PATH},
    Measurement, RetryBuffer,
};
use tokio::sync::mpsc;

/// Publisher configuration
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Endpoint path for single measurements
    pub measurement_path: String,
    /// Endpoint path for retry batches
    pub missing_path: String,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            measurement_path: TEMPERATURE_PATH.to_string(),
            missing_path: MISSING_PATH.to_string(),
        }
    }
}

/// Counters kept by the publisher
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublisherStats {
    /// Measurements delivered on their first attempt
    pub published: u64,
    /// First attempts that failed and were buffered
    pub failed: u64,
    /// Measurements the collector refused and that were dropped
    pub rejected: u64,
    /// Successful retry-buffer flushes
    pub flushes_ok: u64,
    /// Retry-buffer flushes that failed and kept the buffer
    pub flushes_failed: u64,
    /// Measurements delivered through flushes
    pub flushed_measurements: u64,
    /// Buffered measurements discarded because the collector refused the batch
    pub discarded: u64,
    /// Buffered measurements evicted to make room for newer failures
    pub evicted: u64,
    /// Measurements still buffered when the stage stopped
    pub lost_on_shutdown: u64,
}

/// Result of one flush attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was buffered
    Empty,
    /// This many measurements were delivered and the buffer cleared
    Flushed(usize),
    /// Delivery failed; the buffer is unchanged
    Failed,
    /// The collector refused the batch; this many measurements were discarded
    Discarded(usize),
}

/// Result of one send attempt for the current measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Delivered
    Published,
    /// Retryable failure; parked in the retry buffer
    Buffered,
    /// Refused by the collector; dropped
    Rejected,
}

/// Publishing stage
pub struct Publisher<C> {
    connector: C,
    config: PublisherConfig,
    retry: RetryBuffer,
    stats: PublisherStats,
}

impl<C: AsyncConnector> Publisher<C> {
    /// Publisher sending through `connector`
    pub fn new(connector: C, config: PublisherConfig) -> Self {
        Self {
            connector,
            config,
            retry: RetryBuffer::new(),
            stats: PublisherStats::default(),
        }
    }

    /// Measurements awaiting redelivery, oldest first
    pub fn retry_buffer(&self) -> &RetryBuffer {
        &self.retry
    }

    /// Counters so far
    pub fn stats(&self) -> &PublisherStats {
        &self.stats
    }

    /// The underlying connector
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Run until the measurement channel closes
    pub async fn run(mut self, mut measurements: mpsc::Receiver<Measurement>) -> PublisherStats {
        log::info!(
            "Publisher started ({} / {})",
            self.config.measurement_path,
            self.config.missing_path
        );

        while let Some(measurement) = measurements.recv().await {
            self.publish(measurement).await;
        }

        if !self.retry.is_empty() {
            log::info!(
                "Input closed; final flush of {} buffered measurements",
                self.retry.len()
            );
            self.flush_retry_buffer().await;
        }

        self.stats.lost_on_shutdown = self.retry.len() as u64;
        if self.stats.lost_on_shutdown > 0 {
            log::warn!(
                "Publisher stopped with {} undelivered measurements",
                self.stats.lost_on_shutdown
            );
        }

        let connection = self.connector.stats();
        log::info!(
            "Publisher stopped: {} published, {} flushed, {} requests failed",
            self.stats.published,
            self.stats.flushed_measurements,
            connection.messages_failed
        );
        self.stats
    }

    /// One publish cycle: flush the retry buffer, then send `measurement`
    pub async fn publish(&mut self, measurement: Measurement) -> SendOutcome {
        self.flush_retry_buffer().await;
        self.send_measurement(measurement).await
    }

    /// Send the whole retry buffer as one batch
    pub async fn flush_retry_buffer(&mut self) -> FlushOutcome {
        if self.retry.is_empty() {
            return FlushOutcome::Empty;
        }

        let batch = self.retry.to_vec();
        let body = match serde_json::to_vec(&batch) {
            Ok(body) => body,
            Err(e) => {
                log::error!("Failed to serialize retry batch: {}", e);
                self.stats.flushes_failed += 1;
                return FlushOutcome::Failed;
            }
        };

        log::debug!("Publishing {} missing measurements", batch.len());
        match self.connector.send(&self.config.missing_path, &body).await {
            Ok(()) => {
                log::info!("Published {} missing measurements", batch.len());
                self.retry.clear();
                self.stats.flushes_ok += 1;
                self.stats.flushed_measurements += batch.len() as u64;
                FlushOutcome::Flushed(batch.len())
            }
            Err(e) if e.is_retryable() => {
                log::warn!(
                    "Failed to publish {} missing measurements: {}",
                    batch.len(),
                    e
                );
                self.stats.flushes_failed += 1;
                FlushOutcome::Failed
            }
            Err(e) => {
                log::error!(
                    "Collector rejected {} missing measurements, discarding: {}",
                    batch.len(),
                    e
                );
                self.retry.clear();
                self.stats.discarded += batch.len() as u64;
                FlushOutcome::Discarded(batch.len())
            }
        }
    }

    async fn send_measurement(&mut self, measurement: Measurement) -> SendOutcome {
        let body = match serde_json::to_vec(&measurement) {
            Ok(body) => body,
            Err(e) => {
                log::error!("Failed to serialize measurement, dropping: {}", e);
                self.stats.rejected += 1;
                return SendOutcome::Rejected;
            }
        };

        match self
            .connector
            .send(&self.config.measurement_path, &body)
            .await
        {
            Ok(()) => {
                self.stats.published += 1;
                SendOutcome::Published
            }
            Err(e) if e.is_retryable() => {
                log::warn!(
                    "Failed to publish to {}, buffering: {}",
                    self.config.measurement_path,
                    e
                );
                self.stats.failed += 1;
                self.buffer_failed(measurement);
                SendOutcome::Buffered
            }
            Err(e) => {
                log::error!("Collector rejected measurement, dropping: {}", e);
                self.stats.rejected += 1;
                SendOutcome::Rejected
            }
        }
    }

    fn buffer_failed(&mut self, measurement: Measurement) {
        if let Some(evicted) = self.retry.push(measurement) {
            self.stats.evicted += 1;
            log::warn!(
                "Retry buffer full; evicted measurement for window starting {}",
                evicted.window_start()
            );
        }
    }
}
