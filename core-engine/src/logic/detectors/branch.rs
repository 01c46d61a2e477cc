//! Branch Misprediction Detector

use super::{finite, ratio_or_zero, DetectionContext, IndicatorKind, Signal, SignalDetector};
use crate::logic::baseline::stats;
use crate::logic::errors::DetectorError;
use crate::logic::threat::rules::{
    BRANCH_CONTRIBUTION_SCALE, BRANCH_INSTRUCTIONS_METRIC, BRANCH_MISSES_METRIC,
    BRANCH_RECENT_SAMPLES,
};

/// Average misprediction rate over the most recent samples
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchMispredictionDetector;

impl SignalDetector for BranchMispredictionDetector {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::BranchPrediction
    }

    /// Score is the raw misprediction rate
    fn evaluate(&self, ctx: &DetectionContext<'_>) -> Result<Signal, DetectorError> {
        if !ctx.has_min_samples(BRANCH_MISSES_METRIC) || !ctx.has_min_samples(BRANCH_INSTRUCTIONS_METRIC) {
            return Ok(Signal::neutral());
        }

        let misses = ctx.windows.recent(BRANCH_MISSES_METRIC, BRANCH_RECENT_SAMPLES);
        let instructions = ctx.windows.recent(BRANCH_INSTRUCTIONS_METRIC, BRANCH_RECENT_SAMPLES);

        let avg_misses = finite(BRANCH_MISSES_METRIC, "mean", stats::mean(&misses))?;
        let avg_instructions = finite(BRANCH_INSTRUCTIONS_METRIC, "mean", stats::mean(&instructions))?;

        let rate = ratio_or_zero(avg_misses, avg_instructions);
        Ok(Signal::new(rate > ctx.config.branch_mispredict_threshold, rate))
    }

    fn contribution(&self, signal: &Signal) -> f64 {
        (signal.score * BRANCH_CONTRIBUTION_SCALE).min(1.0)
    }
}
