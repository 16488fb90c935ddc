//! Periodic sampling stage
//!
//! On every tick the sampler pulls one raw value from its source, converts
//! it to °C and stamps it with the wall clock read after both the tick and
//! the source read completed:
//!
//! ```text
//! tick ──▶ source.next_sample() ──▶ calibrate ──▶ clock.now() ──▶ send
//!  ▲                                                               │
//!  └──────────────── blocks while the reading channel is full ◀────┘
//! ```
//!
//! The stage ends when the source is exhausted, when shutdown is requested,
//! when the aggregator has gone away, or (under [`MalformedPolicy::Abort`])
//! on the first bad sample. Ending drops the reading sender, which is how
//! the downstream stages learn to drain and stop.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use thermolink_core::{
    constants::DEFAULT_TICK_INTERVAL,
    time::{Clock, SystemClock},
    Reading,
};
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::errors::{AgentError, SourceError};
use crate::shutdown::ShutdownSignal;
use crate::source::RawSource;

/// What to do with a sample that fails to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Log it, count it and wait for the next tick
    #[default]
    Skip,
    /// Stop sampling; the pipeline drains and exits
    Abort,
}

impl FromStr for MalformedPolicy {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            other => Err(AgentError::Config(format!(
                "unknown malformed policy {other:?} (expected \"skip\" or \"abort\")"
            ))),
        }
    }
}

impl fmt::Display for MalformedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => f.write_str("skip"),
            Self::Abort => f.write_str("abort"),
        }
    }
}

/// Sampler configuration
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Interval between two samples
    pub tick_interval: Duration,
    /// Handling of unparsable samples
    pub malformed_policy: MalformedPolicy,
}

impl SamplerConfig {
    /// Configuration with the given tick interval
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            tick_interval,
            malformed_policy: MalformedPolicy::default(),
        }
    }

    /// Set malformed sample handling
    pub fn malformed_policy(mut self, policy: MalformedPolicy) -> Self {
        self.malformed_policy = policy;
        self
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

/// Counters kept by the sampler
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SamplerStats {
    /// Ticks elapsed
    pub ticks: u64,
    /// Readings handed to the aggregator
    pub readings: u64,
    /// Samples skipped because they failed to parse
    pub malformed: u64,
}

/// Why the sampler stopped
#[derive(Debug)]
pub enum SamplerExit {
    /// Source reported end of stream
    Exhausted,
    /// Shutdown was requested
    Shutdown,
    /// The reading channel closed
    DownstreamClosed,
    /// The source failed, or a malformed sample hit the abort policy
    Failed(SourceError),
}

impl SamplerExit {
    /// Whether the sampler stopped because of an error
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Stats and exit reason of a finished sampler
#[derive(Debug)]
pub struct SamplerReport {
    /// Counters at exit
    pub stats: SamplerStats,
    /// Why the stage ended
    pub exit: SamplerExit,
}

/// Sampling stage
pub struct Sampler<S> {
    source: S,
    config: SamplerConfig,
    clock: Arc<dyn Clock>,
}

impl<S: RawSource> Sampler<S> {
    /// Sampler over `source`, stamping readings with the system clock
    pub fn new(source: S, config: SamplerConfig) -> Result<Self, AgentError> {
        if config.tick_interval.is_zero() {
            return Err(AgentError::Config(
                "tick interval must be greater than zero".into(),
            ));
        }

        Ok(Self {
            source,
            config,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock used to stamp readings
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run until the source ends, shutdown is requested or the channel closes
    pub async fn run(
        mut self,
        readings: mpsc::Sender<Reading>,
        mut shutdown: ShutdownSignal,
    ) -> SamplerReport {
        let period = self.config.tick_interval;
        // First sample is taken one full period after start
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut stats = SamplerStats::default();
        log::info!("Sampler started (tick {:?})", period);

        let exit = loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break SamplerExit::Shutdown,
                _ = ticker.tick() => {}
            }
            stats.ticks += 1;

            let next = tokio::select! {
                biased;
                _ = shutdown.recv() => break SamplerExit::Shutdown,
                next = self.source.next_sample() => next,
            };

            let raw = match next {
                None => break SamplerExit::Exhausted,
                Some(Ok(raw)) => raw,
                Some(Err(e)) if e.is_malformed_sample() => match self.config.malformed_policy {
                    MalformedPolicy::Skip => {
                        stats.malformed += 1;
                        log::warn!("Skipping malformed sample: {}", e);
                        continue;
                    }
                    MalformedPolicy::Abort => {
                        log::error!("Aborting on malformed sample: {}", e);
                        break SamplerExit::Failed(e);
                    }
                },
                Some(Err(e)) => {
                    log::error!("Raw source failed: {}", e);
                    break SamplerExit::Failed(e);
                }
            };

            let reading = Reading::from_raw(raw, self.clock.now());
            log::trace!(
                "reading: {:.2} °C at {} (raw {})",
                reading.temperature,
                reading.timestamp,
                raw.value()
            );

            if readings.send(reading).await.is_err() {
                log::warn!("Reading channel closed; sampler stopping");
                break SamplerExit::DownstreamClosed;
            }
            stats.readings += 1;
        };

        log::info!(
            "Sampler stopped ({:?}): {} readings over {} ticks, {} malformed",
            exit,
            stats.readings,
            stats.ticks,
            stats.malformed
        );
        SamplerReport { stats, exit }
    }
}
