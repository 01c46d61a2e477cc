//! Spectre Engine - Cycle Owner
//!
//! Một engine instance sở hữu toàn bộ state: windows, baselines, fusion và
//! detection log. Every detection cycle is `record -> fuse -> log`; callers
//! that share an engine between threads go through `SharedEngine`.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::baseline::{BaselineTracker, MetricDeviation};
use super::config::Config;
use super::detectors::{DetectionContext, SignalDetector};
use super::errors::SnapshotError;
use super::history::DetectionLog;
use super::sample::{CounterSnapshot, MetricKind};
use super::threat::{DetectionResult, FusionEngine};
use super::window::MetricWindowStore;

// ============================================================================
// TYPES
// ============================================================================

/// Counter above its static configured threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBreach {
    pub metric: String,
    pub kind: MetricKind,
    pub value: f64,
    pub threshold: f64,
    pub unit: String,
}

// ============================================================================
// ENGINE
// ============================================================================

#[derive(Debug)]
pub struct SpectreEngine {
    id: Uuid,
    config: Config,
    windows: MetricWindowStore,
    /// Samples from cycles the sampler marked known-normal
    normal_windows: MetricWindowStore,
    baseline: BaselineTracker,
    fusion: FusionEngine,
    log: DetectionLog,
}

impl SpectreEngine {
    pub fn new(config: Config) -> Self {
        Self::with_fusion(config, FusionEngine::default())
    }

    /// Engine with a custom detector set, run in the given order
    pub fn with_detectors(config: Config, detectors: Vec<Box<dyn SignalDetector>>) -> Self {
        Self::with_fusion(config, FusionEngine::new(detectors))
    }

    fn with_fusion(config: Config, fusion: FusionEngine) -> Self {
        let id = Uuid::new_v4();
        log::info!(
            "Spectre engine {} initialized: window_size={}, min_samples={}, metrics={}",
            id,
            config.window_size,
            config.min_samples,
            config.spectre_metrics.len()
        );

        Self {
            id,
            windows: MetricWindowStore::with_metrics(config.window_size, config.spectre_metrics.keys()),
            normal_windows: MetricWindowStore::new(config.window_size),
            baseline: BaselineTracker::new(config.min_samples),
            fusion,
            log: DetectionLog::default(),
            config,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn windows(&self) -> &MetricWindowStore {
        &self.windows
    }

    pub fn normal_windows(&self) -> &MetricWindowStore {
        &self.normal_windows
    }

    pub fn baseline(&self) -> &BaselineTracker {
        &self.baseline
    }

    pub fn detection_log(&self) -> &DetectionLog {
        &self.log
    }

    // ------------------------------------------------------------------------
    // Recording
    // ------------------------------------------------------------------------

    pub fn record(&mut self, name: &str, value: f64, timestamp: DateTime<Utc>) {
        self.windows.record(name, value, timestamp);
    }

    /// Record every counter of a cycle without running detection
    pub fn record_all(&mut self, counters: &BTreeMap<String, f64>, timestamp: DateTime<Utc>) {
        for (name, &value) in counters {
            self.windows.record(name, value, timestamp);
        }
    }

    /// Known-normal cycle: record it, keep it as calibration material and
    /// refresh the reference baseline. Returns how many references changed.
    pub fn observe_normal(&mut self, counters: &BTreeMap<String, f64>, timestamp: DateTime<Utc>) -> usize {
        self.record_all(counters, timestamp);
        for (name, &value) in counters {
            self.normal_windows.record(name, value, timestamp);
        }
        self.refresh_reference(counters)
    }

    // ------------------------------------------------------------------------
    // Detection
    // ------------------------------------------------------------------------

    /// Run one cycle on a parsed snapshot, stamped now if it carries no time
    pub fn detect(&mut self, snapshot: &CounterSnapshot) -> DetectionResult {
        let timestamp = snapshot.timestamp.unwrap_or_else(Utc::now);
        self.detect_at(&snapshot.counters, timestamp)
    }

    /// Record `counters` at `timestamp`, fuse the detectors and log the
    /// result if it is risky
    pub fn detect_at(&mut self, counters: &BTreeMap<String, f64>, timestamp: DateTime<Utc>) -> DetectionResult {
        self.record_all(counters, timestamp);

        let ctx = DetectionContext::new(&self.windows, &self.baseline, &self.config);
        let result = self.fusion.fuse(&ctx, counters, timestamp);

        if result.overall_spectre_risk {
            self.log.push(result.clone());
        }
        result
    }

    // ------------------------------------------------------------------------
    // Baselines
    // ------------------------------------------------------------------------

    /// Capture reference mean/variance for the metrics named in `counters`
    pub fn refresh_reference(&mut self, counters: &BTreeMap<String, f64>) -> usize {
        self.baseline.refresh_reference(counters.keys(), &self.windows)
    }

    /// Calibration baseline from a known-normal batch
    pub fn calibrate(&mut self, metric: &str, values: &[f64]) -> bool {
        self.baseline.update(metric, values)
    }

    /// Calibration baseline for every window that holds enough samples.
    /// Includes detection cycles; see `calibrate_from_normal`.
    pub fn calibrate_from_windows(&mut self) -> usize {
        let batches = full_batches(&self.windows, self.config.min_samples);
        self.baseline.update_all(&batches)
    }

    /// Calibration baseline from known-normal cycles only
    pub fn calibrate_from_normal(&mut self) -> usize {
        let batches = full_batches(&self.normal_windows, self.config.min_samples);
        self.baseline.update_all(&batches)
    }

    pub fn is_anomaly(&self, metric: &str, value: f64) -> bool {
        self.baseline.is_anomaly(metric, value)
    }

    /// Counters deviating from their calibration baseline by more than
    /// `2 * sensitivity` standard deviations
    pub fn deviations(&self, counters: &BTreeMap<String, f64>) -> Vec<MetricDeviation> {
        self.baseline.deviations(counters, self.config.deviation_z_threshold())
    }

    /// Counters above their static configured threshold
    pub fn threshold_breaches(&self, counters: &BTreeMap<String, f64>) -> Vec<ThresholdBreach> {
        counters
            .iter()
            .filter_map(|(metric, &value)| {
                let limit = self.config.spectre_metrics.get(metric)?;
                (value > limit.threshold).then(|| ThresholdBreach {
                    metric: metric.clone(),
                    kind: MetricKind::of(metric),
                    value,
                    threshold: limit.threshold,
                    unit: limit.unit.clone(),
                })
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // History & persistence
    // ------------------------------------------------------------------------

    /// Risky detections from the last `window`
    pub fn history(&self, window: Duration) -> Vec<DetectionResult> {
        self.log.history(window)
    }

    pub fn save_baseline(&self, path: &Path) -> Result<(), SnapshotError> {
        self.baseline.save(path)
    }

    pub fn load_baseline(&mut self, path: &Path) -> Result<bool, SnapshotError> {
        self.baseline.load(path)
    }
}

fn full_batches(windows: &MetricWindowStore, min_samples: usize) -> BTreeMap<String, Vec<f64>> {
    windows
        .metric_names()
        .into_iter()
        .map(|name| (name.to_string(), windows.values(name)))
        .filter(|(_, values)| values.len() >= min_samples)
        .collect()
}

impl Default for SpectreEngine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
