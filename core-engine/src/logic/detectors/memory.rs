//! Memory Access Pattern Detector
//!
//! Speculative gadgets read far more than they write and push the LLC miss
//! rate up; both conditions must hold.

use super::{finite, ratio_or_zero, DetectionContext, IndicatorKind, Signal, SignalDetector};
use crate::logic::baseline::stats;
use crate::logic::errors::DetectorError;
use crate::logic::threat::rules::{
    LLC_CONFIDENCE_SCALE, LLC_MISSES_METRIC, LLC_MISS_RATE_THRESHOLD, LOAD_STORE_CONFIDENCE_DIVISOR,
    LOAD_STORE_RATIO_THRESHOLD, MEMORY_MIN_RECENT, MEMORY_RECENT_SAMPLES, MEM_LOADS_METRIC,
    MEM_STORES_METRIC,
};

const REQUIRED: [&str; 3] = [MEM_LOADS_METRIC, MEM_STORES_METRIC, LLC_MISSES_METRIC];

#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryAccessPatternDetector;

impl SignalDetector for MemoryAccessPatternDetector {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::MemoryAccess
    }

    /// Score is a confidence clipped to [0, 1]
    fn evaluate(&self, ctx: &DetectionContext<'_>) -> Result<Signal, DetectorError> {
        if !REQUIRED.iter().all(|m| ctx.has_min_samples(m)) {
            return Ok(Signal::neutral());
        }

        let loads = ctx.windows.recent(MEM_LOADS_METRIC, MEMORY_RECENT_SAMPLES);
        let stores = ctx.windows.recent(MEM_STORES_METRIC, MEMORY_RECENT_SAMPLES);
        let llc_misses = ctx.windows.recent(LLC_MISSES_METRIC, MEMORY_RECENT_SAMPLES);

        if [&loads, &stores, &llc_misses].iter().any(|tail| tail.len() < MEMORY_MIN_RECENT) {
            return Ok(Signal::neutral());
        }

        let avg_loads = finite(MEM_LOADS_METRIC, "mean", stats::mean(&loads))?;
        let avg_stores = finite(MEM_STORES_METRIC, "mean", stats::mean(&stores))?;
        let avg_llc_misses = finite(LLC_MISSES_METRIC, "mean", stats::mean(&llc_misses))?;

        let load_store_ratio = ratio_or_zero(avg_loads, avg_stores);
        let llc_miss_rate = ratio_or_zero(avg_llc_misses, avg_loads);

        let anomaly = load_store_ratio > LOAD_STORE_RATIO_THRESHOLD && llc_miss_rate > LLC_MISS_RATE_THRESHOLD;
        let confidence = (load_store_ratio / LOAD_STORE_CONFIDENCE_DIVISOR + llc_miss_rate * LLC_CONFIDENCE_SCALE)
            .min(1.0);

        Ok(Signal::new(anomaly, confidence))
    }
}
