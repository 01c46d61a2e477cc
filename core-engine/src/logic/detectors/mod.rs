//! Signal Detectors
//!
//! Ba detector độc lập, mỗi cái đọc window + baseline và trả về một `Signal`.
//! Detectors never mutate state. Insufficient data is a neutral
//! `(false, 0.0)` signal, not an error; `DetectorError` is reserved for
//! faults that the fusion step isolates.
//!
//! ## Structure
//! - `cache_timing`: variance of cache misses vs. reference variance
//! - `branch`: recent branch misprediction rate
//! - `memory`: load/store ratio combined with LLC miss rate

pub mod cache_timing;
pub mod branch;
pub mod memory;

use serde::{Deserialize, Serialize};

use crate::logic::baseline::BaselineTracker;
use crate::logic::config::Config;
use crate::logic::errors::DetectorError;
use crate::logic::window::MetricWindowStore;

pub use branch::BranchMispredictionDetector;
pub use cache_timing::CacheTimingVarianceDetector;
pub use memory::MemoryAccessPatternDetector;

// ============================================================================
// TYPES
// ============================================================================

/// Which indicator a detector feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    CacheTiming,
    BranchPrediction,
    MemoryAccess,
}

impl IndicatorKind {
    /// Stable name used in detection output
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorKind::CacheTiming => "cache_timing",
            IndicatorKind::BranchPrediction => "branch_prediction",
            IndicatorKind::MemoryAccess => "memory_access",
        }
    }
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Detector verdict
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub anomaly: bool,
    pub score: f64,
}

impl Signal {
    pub fn new(anomaly: bool, score: f64) -> Self {
        Self { anomaly, score }
    }

    /// Not enough data to judge
    pub fn neutral() -> Self {
        Self::new(false, 0.0)
    }
}

/// Read-only state a detector may look at
#[derive(Clone, Copy)]
pub struct DetectionContext<'a> {
    pub windows: &'a MetricWindowStore,
    pub baseline: &'a BaselineTracker,
    pub config: &'a Config,
}

impl<'a> DetectionContext<'a> {
    pub fn new(windows: &'a MetricWindowStore, baseline: &'a BaselineTracker, config: &'a Config) -> Self {
        Self {
            windows,
            baseline,
            config,
        }
    }

    /// Window for `metric` holds at least `min_samples`
    pub fn has_min_samples(&self, metric: &str) -> bool {
        self.windows.len(metric) >= self.config.min_samples
    }
}

// ============================================================================
// DETECTOR TRAIT
// ============================================================================

pub trait SignalDetector: Send + Sync {
    fn kind(&self) -> IndicatorKind;

    fn evaluate(&self, ctx: &DetectionContext<'_>) -> Result<Signal, DetectorError>;

    /// Amount an anomalous signal adds to the fused risk total
    fn contribution(&self, signal: &Signal) -> f64 {
        signal.score
    }
}

/// Standard detectors in fusion order
pub fn standard_detectors() -> Vec<Box<dyn SignalDetector>> {
    vec![
        Box::new(CacheTimingVarianceDetector::default()),
        Box::new(BranchMispredictionDetector),
        Box::new(MemoryAccessPatternDetector),
    ]
}

// ============================================================================
// HELPERS
// ============================================================================

pub(crate) fn finite(metric: &str, quantity: &'static str, value: f64) -> Result<f64, DetectorError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DetectorError::NonFinite {
            metric: metric.to_string(),
            quantity,
        })
    }
}

/// `numerator / denominator`, or 0 when the denominator is 0
pub(crate) fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
