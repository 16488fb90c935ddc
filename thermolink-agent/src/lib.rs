//! Async runtime for the thermolink agent
//!
//! Wires a raw sample source, the window aggregator and a collector
//! connector into three tokio tasks joined by single-slot channels:
//!
//! ```text
//! Sampler ──▶ Aggregator ──▶ Publisher ──▶ HTTP collector
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use thermolink_agent::{FileSource, Pipeline, PipelineConfig};
//! use thermolink_connectors::{HttpConfig, HttpConnector};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let source = FileSource::open("temperature.txt").await?;
//! let connector = HttpConnector::new(HttpConfig::new("http://localhost:5000"))?;
//!
//! let pipeline = Pipeline::new(source, connector, PipelineConfig::default())?;
//! let shutdown = pipeline.shutdown_handle();
//! tokio::spawn(async move {
//!     let _ = tokio::signal::ctrl_c().await;
//!     shutdown.trigger();
//! });
//!
//! let report = pipeline.run().await?;
//! report.log_summary();
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod aggregator;
pub mod config;
pub mod errors;
pub mod pipeline;
pub mod publisher;
pub mod sampler;
pub mod shutdown;
pub mod source;

pub use aggregator::{Aggregator, AggregatorConfig, AggregatorStats, PartialWindow};
pub use config::AgentConfig;
pub use errors::{AgentError, AgentResult, SourceError};
pub use pipeline::{Pipeline, PipelineConfig, PipelineReport};
pub use publisher::{FlushOutcome, Publisher, PublisherConfig, PublisherStats, SendOutcome};
pub use sampler::{MalformedPolicy, Sampler, SamplerConfig, SamplerExit, SamplerStats};
pub use shutdown::{Shutdown, ShutdownSignal};
pub use source::{FileSource, RawSource, VecSource};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
