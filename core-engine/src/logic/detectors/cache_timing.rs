//! Cache Timing Variance Detector
//!
//! Irregular cache access shows up as a burst of variance in the miss
//! counter relative to its reference variance.

use super::{finite, DetectionContext, IndicatorKind, Signal, SignalDetector};
use crate::logic::baseline::stats;
use crate::logic::errors::DetectorError;
use crate::logic::threat::rules::{
    CACHE_TIMING_METRIC, STD_DEV_MEAN_FACTOR, VARIANCE_RATIO_THRESHOLD,
};

#[derive(Debug, Clone)]
pub struct CacheTimingVarianceDetector {
    metric: String,
}

impl CacheTimingVarianceDetector {
    pub fn new(metric: &str) -> Self {
        Self {
            metric: metric.to_string(),
        }
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }
}

impl Default for CacheTimingVarianceDetector {
    fn default() -> Self {
        Self::new(CACHE_TIMING_METRIC)
    }
}

impl SignalDetector for CacheTimingVarianceDetector {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::CacheTiming
    }

    /// Score is the variance ratio (unbounded)
    fn evaluate(&self, ctx: &DetectionContext<'_>) -> Result<Signal, DetectorError> {
        let values = ctx.windows.values(&self.metric);
        if values.len() < ctx.config.min_samples || values.len() < 2 {
            return Ok(Signal::neutral());
        }

        let mean = finite(&self.metric, "mean", stats::mean(&values))?;
        let variance = finite(&self.metric, "variance", stats::sample_variance(&values))?;
        let std_dev = variance.sqrt();

        let baseline_variance = ctx.baseline.baseline_variance(&self.metric, variance);
        let variance_ratio = if baseline_variance > 0.0 {
            finite(&self.metric, "variance_ratio", variance / baseline_variance)?
        } else {
            1.0
        };

        let anomaly = variance_ratio > VARIANCE_RATIO_THRESHOLD && std_dev > STD_DEV_MEAN_FACTOR * mean;
        Ok(Signal::new(anomaly, variance_ratio))
    }
}
