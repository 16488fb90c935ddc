//! End-to-end pipeline runs on paused tokio time with a recording collector

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use thermolink_agent::{
    AggregatorConfig, MalformedPolicy, PartialWindow, Pipeline, PipelineConfig, RawSource,
    SamplerConfig, SamplerExit, SourceError, VecSource,
};
use thermolink_connectors::{AsyncConnector, ConnectionStats, DeliveryFailure};
use thermolink_core::{time::ManualClock, Measurement, RawSample};

#[derive(Debug, thiserror::Error)]
#[error("unreachable")]
struct Unreachable;

impl DeliveryFailure for Unreachable {
    fn is_retryable(&self) -> bool {
        true
    }
}

/// Collector accepting everything and keeping the published measurements
#[derive(Clone, Default)]
struct RecordingCollector {
    published: Arc<Mutex<Vec<Measurement>>>,
    stats: ConnectionStats,
}

impl RecordingCollector {
    fn published(&self) -> Vec<Measurement> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl AsyncConnector for RecordingCollector {
    type Error = Unreachable;

    async fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error> {
        assert_eq!(topic, "/api/temperature");
        let measurement: Measurement = serde_json::from_slice(data).unwrap();
        self.published.lock().unwrap().push(measurement);
        self.stats.record_success(data.len());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn stats(&self) -> ConnectionStats {
        self.stats.clone()
    }
}

/// Source that never runs out
struct Endless(u16);

#[async_trait]
impl RawSource for Endless {
    async fn next_sample(&mut self) -> Option<Result<RawSample, SourceError>> {
        Some(Ok(RawSample::new(self.0).unwrap()))
    }
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::with_step(
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        Duration::from_millis(100),
    ))
}

fn config(window: Duration, partial: PartialWindow) -> PipelineConfig {
    PipelineConfig {
        aggregator: AggregatorConfig::new(window).partial_window(partial),
        ..PipelineConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn publishes_full_windows_and_drops_tail() {
    let collector = RecordingCollector::default();
    let source = VecSource::from_raw(std::iter::repeat(2048).take(25));

    let report = Pipeline::new(source, collector.clone(), PipelineConfig::default())
        .unwrap()
        .with_clock(clock())
        .run()
        .await
        .unwrap();

    assert!(matches!(report.exit, SamplerExit::Exhausted));
    assert_eq!(report.sampler.readings, 25);
    assert_eq!(report.aggregator.windows_emitted, 1);
    assert_eq!(report.aggregator.partial_dropped_readings, 4);
    assert_eq!(report.publisher.published, 1);

    let published = collector.published();
    assert_eq!(published.len(), 1);
    let window = &published[0];
    assert_eq!(
        (window.window_end() - window.window_start()).to_std().unwrap(),
        Duration::from_secs(2)
    );
    assert_eq!(window.min, window.max);
    assert_eq!(window.average, 0.01);
}

#[tokio::test(start_paused = true)]
async fn emits_tail_window_when_configured() {
    let collector = RecordingCollector::default();
    let source = VecSource::from_raw(std::iter::repeat(0).take(25));

    let report = Pipeline::new(
        source,
        collector.clone(),
        config(Duration::from_secs(2), PartialWindow::Emit),
    )
    .unwrap()
    .with_clock(clock())
    .run()
    .await
    .unwrap();

    assert!(report.aggregator.partial_emitted);
    let published = collector.published();
    assert_eq!(published.len(), 2);
    assert_eq!(published[1].min, -50.0);
    assert_eq!(
        (published[1].window_end() - published[1].window_start())
            .to_std()
            .unwrap(),
        Duration::from_millis(300)
    );
}

#[tokio::test(start_paused = true)]
async fn extremes_and_midpoint_in_one_window() {
    let collector = RecordingCollector::default();
    let source = VecSource::from_raw([0, 4095, 2048]);

    Pipeline::new(
        source,
        collector.clone(),
        config(Duration::from_millis(200), PartialWindow::Drop),
    )
    .unwrap()
    .with_clock(clock())
    .run()
    .await
    .unwrap();

    let published = collector.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].min, -50.0);
    assert_eq!(published[0].max, 50.0);
    assert_eq!(published[0].average, 0.0);

    let json = serde_json::to_value(published[0]).unwrap();
    assert_eq!(json["time"]["start"], "2024-01-01T12:00:00Z");
    assert_eq!(json["time"]["end"], "2024-01-01T12:00:00.200Z");
}

#[tokio::test(start_paused = true)]
async fn shutdown_drains_every_stage() {
    let collector = RecordingCollector::default();
    let pipeline = Pipeline::new(
        Endless(4095),
        collector.clone(),
        config(Duration::from_secs(1), PartialWindow::Drop),
    )
    .unwrap()
    .with_clock(clock());

    let shutdown = pipeline.shutdown_handle();
    let handle = tokio::spawn(pipeline.run());

    tokio::time::sleep(Duration::from_millis(5_050)).await;
    shutdown.trigger();

    let report = handle.await.unwrap().unwrap();
    assert!(matches!(report.exit, SamplerExit::Shutdown));
    assert!(report.sampler.readings >= 40);
    assert!(report.publisher.published >= 4);
    assert_eq!(report.publisher.lost_on_shutdown, 0);
    assert!(collector.published().iter().all(|m| m.max == 50.0));
}

#[tokio::test(start_paused = true)]
async fn malformed_samples_are_skipped_by_default() {
    let collector = RecordingCollector::default();
    let source = VecSource::from_tokens(["0", "bogus", "4095", "", "2048"]);

    let report = Pipeline::new(
        source,
        collector.clone(),
        config(Duration::from_millis(200), PartialWindow::Emit),
    )
    .unwrap()
    .with_clock(clock())
    .run()
    .await
    .unwrap();

    assert!(!report.exit.is_failure());
    assert_eq!(report.sampler.malformed, 2);
    assert_eq!(report.sampler.readings, 3);
    assert_eq!(collector.published().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn malformed_sample_aborts_when_configured() {
    let collector = RecordingCollector::default();
    let source = VecSource::from_tokens(["0", "4095", "bogus", "2048"]);
    let config = PipelineConfig {
        sampler: SamplerConfig::default().malformed_policy(MalformedPolicy::Abort),
        aggregator: AggregatorConfig::new(Duration::from_millis(100))
            .partial_window(PartialWindow::Drop),
        ..PipelineConfig::default()
    };

    let report = Pipeline::new(source, collector.clone(), config)
        .unwrap()
        .with_clock(clock())
        .run()
        .await
        .unwrap();

    match report.exit {
        SamplerExit::Failed(SourceError::Sample { line: 3, .. }) => {}
        other => panic!("expected abort on line 3, got {:?}", other),
    }
    // The reading that completed the first window was published before the abort
    assert_eq!(collector.published().len(), 1);
    assert_eq!(report.aggregator.partial_dropped_readings, 0);
}
