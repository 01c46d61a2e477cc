use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stats;
use crate::logic::sample::MetricKind;

/// Multiplier used when a baseline carries no dynamic threshold
pub const FALLBACK_THRESHOLD_FACTOR: f64 = 1.5;

/// Z-score above which a deviation is reported as high severity
pub const HIGH_SEVERITY_Z: f64 = 5.0;

// ============================================================================
// CALIBRATION BASELINE
// ============================================================================

/// Statistical summary of one metric's normal behavior.
///
/// Recomputed wholesale from a batch on every update. In snapshots the
/// metric name is the document key, so it is not repeated in the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    #[serde(skip)]
    pub metric: String,
    pub mean: f64,
    pub median: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub p95: f64,
    pub p99: f64,
    pub sample_count: usize,
    #[serde(default)]
    pub dynamic_threshold: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl Baseline {
    /// Compute from a batch. `None` for an empty batch.
    pub fn from_values(metric: &str, values: &[f64], updated_at: DateTime<Utc>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let sorted = stats::sorted(values);
        let mean = stats::mean(values);
        let variance = stats::sample_variance(values);
        let std_dev = variance.sqrt();

        Some(Self {
            metric: metric.to_string(),
            mean,
            median: stats::median(&sorted),
            variance,
            std_dev,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            p95: stats::percentile(&sorted, 95.0),
            p99: stats::percentile(&sorted, 99.0),
            sample_count: values.len(),
            dynamic_threshold: Some(mean + 2.0 * std_dev),
            updated_at,
        })
    }

    /// Every statistic is finite (serializable as a JSON number)
    pub fn is_finite(&self) -> bool {
        [
            self.mean,
            self.median,
            self.variance,
            self.std_dev,
            self.min,
            self.max,
            self.p95,
            self.p99,
        ]
        .iter()
        .chain(self.dynamic_threshold.iter())
        .all(|v| v.is_finite())
    }

    /// Threshold used by `is_anomaly`
    pub fn effective_threshold(&self) -> f64 {
        self.dynamic_threshold
            .unwrap_or(self.mean * FALLBACK_THRESHOLD_FACTOR)
    }
}

// ============================================================================
// SELF-REFERENTIAL BASELINE
// ============================================================================

/// Mean/variance captured from a full window of known-normal samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceStats {
    pub mean: f64,
    pub variance: f64,
}

// ============================================================================
// DEVIATION REPORT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviationSeverity {
    Medium,
    High,
}

impl DeviationSeverity {
    pub fn from_z(z_score: f64) -> Self {
        if z_score > HIGH_SEVERITY_Z {
            DeviationSeverity::High
        } else {
            DeviationSeverity::Medium
        }
    }
}

/// A counter value far from its calibration baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDeviation {
    pub metric: String,
    pub kind: MetricKind,
    pub current_value: f64,
    pub baseline_mean: f64,
    pub z_score: f64,
    pub severity: DeviationSeverity,
}

// ============================================================================
// SUMMARY
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct BaselineSummary {
    pub baselines: BTreeMap<String, Baseline>,
    pub total_metrics: usize,
    pub last_updated: DateTime<Utc>,
}
