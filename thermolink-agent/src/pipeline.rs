//! Three-stage sampling pipeline
//!
//! ## Architecture
//!
//! ```text
//! RawSource ─▶ Sampler ─[Reading; 1]─▶ Aggregator ─[Measurement; 1]─▶ Publisher ─▶ Collector
//!                 ▲                                                       │
//!              Shutdown                                             retry buffer
//! ```
//!
//! Each stage is its own task. The channels between them hold a single item,
//! so a slow collector throttles aggregation and a slow aggregator throttles
//! sampling. Readings and measurements keep their order end to end.
//!
//! ## Shutdown
//!
//! Triggering [`Shutdown`] stops the sampler at its next suspension point.
//! Its reading sender is dropped, the aggregator drains the channel and
//! exits, dropping the measurement sender, and the publisher drains and
//! makes a final flush. Source exhaustion follows the same path.

use std::sync::Arc;

use thermolink_connectors::AsyncConnector;
use thermolink_core::time::Clock;
use tokio::sync::mpsc;
use tokio::task::JoinError;

use crate::aggregator::{Aggregator, AggregatorConfig, AggregatorStats};
use crate::errors::{AgentError, AgentResult};
use crate::publisher::{Publisher, PublisherConfig, PublisherStats};
use crate::sampler::{Sampler, SamplerConfig, SamplerExit, SamplerStats};
use crate::shutdown::Shutdown;
use crate::source::RawSource;

/// Items buffered between two stages
pub const STAGE_CHANNEL_CAPACITY: usize = 1;

/// Configuration of all three stages
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Sampler settings
    pub sampler: SamplerConfig,
    /// Aggregator settings
    pub aggregator: AggregatorConfig,
    /// Publisher settings
    pub publisher: PublisherConfig,
}

/// Final state of a pipeline run
#[derive(Debug)]
pub struct PipelineReport {
    /// Why sampling ended
    pub exit: SamplerExit,
    /// Sampler counters
    pub sampler: SamplerStats,
    /// Aggregator counters
    pub aggregator: AggregatorStats,
    /// Publisher counters
    pub publisher: PublisherStats,
}

impl PipelineReport {
    /// Log a one-line summary per stage
    pub fn log_summary(&self) {
        log::info!("Pipeline finished: {:?}", self.exit);
        log::info!(
            "  sampler: {} readings, {} malformed, {} ticks",
            self.sampler.readings,
            self.sampler.malformed,
            self.sampler.ticks
        );
        log::info!(
            "  aggregator: {} windows, {} readings dropped with partial window",
            self.aggregator.windows_emitted,
            self.aggregator.partial_dropped_readings
        );
        log::info!(
            "  publisher: {} published, {} buffered, {} flushed, {} evicted, {} lost",
            self.publisher.published,
            self.publisher.failed,
            self.publisher.flushed_measurements,
            self.publisher.evicted,
            self.publisher.lost_on_shutdown
        );
    }
}

/// Wired sampler, aggregator and publisher
pub struct Pipeline<S, C> {
    sampler: Sampler<S>,
    aggregator: Aggregator,
    publisher: Publisher<C>,
    shutdown: Shutdown,
}

impl<S, C> Pipeline<S, C>
where
    S: RawSource + 'static,
    C: AsyncConnector + 'static,
{
    /// Build all stages, validating their configuration
    pub fn new(source: S, connector: C, config: PipelineConfig) -> AgentResult<Self> {
        Ok(Self {
            sampler: Sampler::new(source, config.sampler)?,
            aggregator: Aggregator::new(config.aggregator)?,
            publisher: Publisher::new(connector, config.publisher),
            shutdown: Shutdown::new(),
        })
    }

    /// Replace the clock used to stamp readings
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.sampler = self.sampler.with_clock(clock);
        self
    }

    /// Handle that stops the pipeline when triggered
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Run every stage to completion
    ///
    /// Returns once the publisher has drained. A sampler failure is reported
    /// in [`PipelineReport::exit`], not as an error.
    pub async fn run(self) -> AgentResult<PipelineReport> {
        let (reading_tx, reading_rx) = mpsc::channel(STAGE_CHANNEL_CAPACITY);
        let (measurement_tx, measurement_rx) = mpsc::channel(STAGE_CHANNEL_CAPACITY);

        let sampler = tokio::spawn(self.sampler.run(reading_tx, self.shutdown.subscribe()));
        let aggregator = tokio::spawn(self.aggregator.run(reading_rx, measurement_tx));
        let publisher = tokio::spawn(self.publisher.run(measurement_rx));

        // Await in pipeline order; each stage ends after its upstream
        let sampler = sampler.await.map_err(stage_error("sampler"))?;
        let aggregator = aggregator.await.map_err(stage_error("aggregator"))?;
        let publisher = publisher.await.map_err(stage_error("publisher"))?;

        Ok(PipelineReport {
            exit: sampler.exit,
            sampler: sampler.stats,
            aggregator,
            publisher,
        })
    }
}

fn stage_error(stage: &'static str) -> impl FnOnce(JoinError) -> AgentError {
    move |e| AgentError::Stage {
        stage,
        reason: e.to_string(),
    }
}
