//! Baseline Module - Normal Behavior Reference
//!
//! Giữ hai loại baseline độc lập cho mỗi metric:
//! - Calibration baseline: full descriptive stats from a known-normal batch,
//!   used for `is_anomaly`, deviation reports và snapshot persistence.
//! - Reference stats: mean/variance captured from a full window, used only by
//!   the cache-timing detector.
//!
//! # Architecture
//! - `types.rs`: `Baseline`, `ReferenceStats`, `MetricDeviation`
//! - `stats.rs`: mean / variance / percentile helpers
//! - `storage.rs`: Snapshot save/load
//!
//! # Failure Strategy
//! Calibration batches smaller than `min_samples` are skipped (logged) and
//! leave the previous baseline untouched.

pub mod types;
pub mod stats;
pub mod storage;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::logic::errors::SnapshotError;
use crate::logic::sample::MetricKind;
use crate::logic::window::MetricWindowStore;

pub use types::{
    Baseline, BaselineSummary, DeviationSeverity, MetricDeviation, ReferenceStats,
};

/// Fallback factor applied to the current window variance when no
/// reference variance has been captured yet
pub const BOOTSTRAP_VARIANCE_FACTOR: f64 = 0.5;

// ============================================================================
// TRACKER
// ============================================================================

#[derive(Debug, Clone)]
pub struct BaselineTracker {
    min_samples: usize,
    baselines: BTreeMap<String, Baseline>,
    reference: HashMap<String, ReferenceStats>,
}

impl BaselineTracker {
    pub fn new(min_samples: usize) -> Self {
        Self {
            min_samples,
            baselines: BTreeMap::new(),
            reference: HashMap::new(),
        }
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    // ------------------------------------------------------------------------
    // Calibration baseline
    // ------------------------------------------------------------------------

    /// Recompute the baseline for `metric` from `values`.
    ///
    /// Returns `false` (and logs the skip) when the batch is too small.
    pub fn update(&mut self, metric: &str, values: &[f64]) -> bool {
        self.update_at(metric, values, Utc::now())
    }

    pub fn update_at(&mut self, metric: &str, values: &[f64], now: DateTime<Utc>) -> bool {
        if values.len() < self.min_samples {
            log::warn!(
                "Insufficient samples for {}: {} (need {}), baseline unchanged",
                metric,
                values.len(),
                self.min_samples
            );
            return false;
        }

        let Some(baseline) = Baseline::from_values(metric, values, now) else {
            return false;
        };

        // JSON has no inf/NaN; such a record would poison the whole snapshot
        if !baseline.is_finite() {
            log::warn!("Non-finite statistics for {}, baseline unchanged", metric);
            return false;
        }

        log::info!(
            "Updated baseline for {}: mean={:.2}, std_dev={:.2}, samples={}",
            metric,
            baseline.mean,
            baseline.std_dev,
            baseline.sample_count
        );
        self.baselines.insert(metric.to_string(), baseline);
        true
    }

    /// Batch update; empty batches are ignored. Returns how many baselines changed.
    pub fn update_all(&mut self, batches: &BTreeMap<String, Vec<f64>>) -> usize {
        let mut updated = 0;
        for (metric, values) in batches {
            if !values.is_empty() && self.update(metric, values) {
                updated += 1;
            }
        }
        updated
    }

    pub fn get(&self, metric: &str) -> Option<&Baseline> {
        self.baselines.get(metric)
    }

    pub fn baselines(&self) -> &BTreeMap<String, Baseline> {
        &self.baselines
    }

    /// `value` above the metric's dynamic threshold (or `mean * 1.5`).
    /// Metrics without a baseline are never anomalous.
    pub fn is_anomaly(&self, metric: &str, value: f64) -> bool {
        self.baselines
            .get(metric)
            .is_some_and(|b| value > b.effective_threshold())
    }

    /// Counters whose |z-score| against their baseline exceeds `z_threshold`
    pub fn deviations(&self, counters: &BTreeMap<String, f64>, z_threshold: f64) -> Vec<MetricDeviation> {
        counters
            .iter()
            .filter_map(|(metric, &value)| {
                let baseline = self.baselines.get(metric)?;
                if baseline.std_dev <= 0.0 {
                    return None;
                }
                let z_score = ((value - baseline.mean) / baseline.std_dev).abs();
                (z_score > z_threshold).then(|| MetricDeviation {
                    metric: metric.clone(),
                    kind: MetricKind::of(metric),
                    current_value: value,
                    baseline_mean: baseline.mean,
                    z_score,
                    severity: DeviationSeverity::from_z(z_score),
                })
            })
            .collect()
    }

    pub fn summary(&self) -> BaselineSummary {
        BaselineSummary {
            baselines: self.baselines.clone(),
            total_metrics: self.baselines.len(),
            last_updated: Utc::now(),
        }
    }

    // ------------------------------------------------------------------------
    // Self-referential baseline
    // ------------------------------------------------------------------------

    pub fn reference(&self, metric: &str) -> Option<&ReferenceStats> {
        self.reference.get(metric)
    }

    pub fn set_reference(&mut self, metric: &str, stats: ReferenceStats) {
        self.reference.insert(metric.to_string(), stats);
    }

    /// Stored reference variance, or half of `current_variance` when none
    /// has been captured. The fallback makes the first evaluation report a
    /// variance ratio of 2.0 rather than dividing by zero.
    pub fn baseline_variance(&self, metric: &str, current_variance: f64) -> f64 {
        self.reference
            .get(metric)
            .map(|r| r.variance)
            .unwrap_or(current_variance * BOOTSTRAP_VARIANCE_FACTOR)
    }

    /// Capture window mean/variance for every named metric whose window
    /// holds at least `min_samples`. Returns how many references changed.
    pub fn refresh_reference<'a>(
        &mut self,
        metrics: impl IntoIterator<Item = &'a String>,
        windows: &MetricWindowStore,
    ) -> usize {
        let mut refreshed = 0;
        for metric in metrics {
            let values = windows.values(metric);
            if values.len() < self.min_samples {
                continue;
            }
            self.reference.insert(
                metric.clone(),
                ReferenceStats {
                    mean: stats::mean(&values),
                    variance: stats::sample_variance(&values),
                },
            );
            refreshed += 1;
        }

        log::info!("Reference baseline updated ({} metrics)", refreshed);
        refreshed
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        storage::save_snapshot(&self.baselines, path)?;
        log::info!("Baselines saved to {}", path.display());
        Ok(())
    }

    /// Replace baselines with the snapshot at `path`.
    ///
    /// Returns `Ok(false)` when no snapshot exists (baselines unchanged).
    pub fn load(&mut self, path: &Path) -> Result<bool, SnapshotError> {
        match storage::load_snapshot(path)? {
            Some(baselines) => {
                log::info!("Baselines loaded from {} ({} metrics)", path.display(), baselines.len());
                self.baselines = baselines;
                Ok(true)
            }
            None => {
                log::info!("No existing baselines file found at {}", path.display());
                Ok(false)
            }
        }
    }
}
