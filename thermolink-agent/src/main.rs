//! thermolink agent binary
//!
//! Samples the configured raw feed, publishes windowed summaries to the
//! collector and stops on end of input or Ctrl-C.

use anyhow::{bail, Context, Result};
use clap::Parser;
use thermolink_agent::{AgentConfig, FileSource, Pipeline, SamplerExit};

// =============================================================================
// Logging Setup
// =============================================================================

/// Initialize logging; `RUST_LOG` overrides the default `info` level
fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = AgentConfig::parse();
    let pipeline_config = config.pipeline_config()?;
    log::info!(
        "thermolink {} starting: source {}, collector {}",
        thermolink_agent::VERSION,
        config.source.display(),
        config.collector_url
    );

    let source = FileSource::open(&config.source)
        .await
        .context("cannot start without a raw sample source")?;
    let connector = config
        .connector()
        .context("invalid collector configuration")?;

    let pipeline = Pipeline::new(source, connector, pipeline_config)?;

    let shutdown = pipeline.shutdown_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Ctrl-C received, shutting down");
                shutdown.trigger();
            }
            Err(e) => log::error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    let report = pipeline.run().await?;
    report.log_summary();

    if let SamplerExit::Failed(e) = report.exit {
        bail!("sampling failed: {e}");
    }
    Ok(())
}
