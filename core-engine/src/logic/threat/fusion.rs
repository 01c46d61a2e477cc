//! Fusion Engine
//!
//! Runs detectors in a fixed order, isolates failures, and turns the
//! surviving signals into one `DetectionResult`.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

use chrono::{DateTime, Utc};

use super::classifier::assess;
use super::types::{DetectionResult, IndicatorOutcome, ScoredIndicator};
use crate::logic::detectors::{standard_detectors, DetectionContext, IndicatorKind, SignalDetector};
use crate::logic::errors::DetectorError;

pub struct FusionEngine {
    detectors: Vec<Box<dyn SignalDetector>>,
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self::new(standard_detectors())
    }
}

impl std::fmt::Debug for FusionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FusionEngine")
            .field("detectors", &self.kinds())
            .finish()
    }
}

impl FusionEngine {
    /// Detectors run in the given order
    pub fn new(detectors: Vec<Box<dyn SignalDetector>>) -> Self {
        Self { detectors }
    }

    pub fn kinds(&self) -> Vec<IndicatorKind> {
        self.detectors.iter().map(|d| d.kind()).collect()
    }

    /// Run every detector, turning errors and panics into `Failed`
    pub fn evaluate_all(&self, ctx: &DetectionContext<'_>) -> Vec<(IndicatorKind, IndicatorOutcome)> {
        self.detectors
            .iter()
            .map(|detector| (detector.kind(), run_isolated(detector.as_ref(), ctx)))
            .collect()
    }

    /// Full fusion step for one cycle
    pub fn fuse(
        &self,
        ctx: &DetectionContext<'_>,
        counters: &BTreeMap<String, f64>,
        timestamp: DateTime<Utc>,
    ) -> DetectionResult {
        let mut scored = Vec::with_capacity(self.detectors.len());
        let mut indicators = BTreeMap::new();

        for (detector, (kind, outcome)) in self.detectors.iter().zip(self.evaluate_all(ctx)) {
            match outcome {
                IndicatorOutcome::Evaluated(signal) => {
                    let contribution = if signal.anomaly {
                        detector.contribution(&signal)
                    } else {
                        0.0
                    };
                    scored.push(ScoredIndicator {
                        kind,
                        signal,
                        contribution,
                    });
                    indicators.insert(kind, signal);
                }
                IndicatorOutcome::Failed(e) => {
                    log::error!("Error in {} analysis: {}", kind, e);
                }
            }
        }

        let assessment = assess(&scored);
        log::debug!(
            "Fused {}/{} indicators: risk_score={:.3}, anomalies={}",
            assessment.evaluated,
            self.detectors.len(),
            assessment.risk_score,
            assessment.anomaly_count
        );

        DetectionResult {
            timestamp,
            performance_counters: counters.clone(),
            spectre_indicators: indicators,
            overall_spectre_risk: assessment.overall_risk,
            risk_score: assessment.risk_score,
            attack_type: assessment.attack_type,
        }
    }
}

fn run_isolated(detector: &dyn SignalDetector, ctx: &DetectionContext<'_>) -> IndicatorOutcome {
    match panic::catch_unwind(AssertUnwindSafe(|| detector.evaluate(ctx))) {
        Ok(Ok(signal)) => IndicatorOutcome::Evaluated(signal),
        Ok(Err(e)) => IndicatorOutcome::Failed(e),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            IndicatorOutcome::Failed(DetectorError::Panicked(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::baseline::ReferenceStats;
    use crate::logic::baseline::stats;
    use crate::logic::detectors::test_support::Fixture;
    use crate::logic::detectors::{
        BranchMispredictionDetector, CacheTimingVarianceDetector, MemoryAccessPatternDetector, Signal,
    };
    use crate::logic::threat::AttackType;

    struct Broken(IndicatorKind);

    impl SignalDetector for Broken {
        fn kind(&self) -> IndicatorKind {
            self.0
        }

        fn evaluate(&self, _ctx: &DetectionContext<'_>) -> Result<Signal, DetectorError> {
            Err(DetectorError::NonFinite {
                metric: "test".to_string(),
                quantity: "mean",
            })
        }
    }

    struct Panicking(IndicatorKind);

    impl SignalDetector for Panicking {
        fn kind(&self) -> IndicatorKind {
            self.0
        }

        fn evaluate(&self, _ctx: &DetectionContext<'_>) -> Result<Signal, DetectorError> {
            panic!("counter table corrupted");
        }
    }

    /// Cache window with variance ratio 10 against its reference
    fn cache_burst() -> Fixture {
        let mut fx = Fixture::new();
        let values: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 1000.0 } else { 3000.0 }).collect();
        let variance = stats::sample_variance(&values);
        fx.fill("cache_misses", values);
        fx.baseline.set_reference("cache_misses", ReferenceStats { mean: 2000.0, variance: variance / 10.0 });
        fx
    }

    #[test]
    fn test_empty_state_is_quiet() {
        let fx = Fixture::new();
        let result = FusionEngine::default().fuse(&fx.ctx(), &BTreeMap::new(), Utc::now());

        assert_eq!(result.spectre_indicators.len(), 3);
        assert_eq!(result.risk_score, 0.0);
        assert!(!result.overall_spectre_risk);
        assert_eq!(result.attack_type, None);
    }

    #[test]
    fn test_single_surviving_cache_indicator_scores_raw_ratio() {
        let fx = cache_burst();
        let engine = FusionEngine::new(vec![
            Box::new(CacheTimingVarianceDetector::default()),
            Box::new(Broken(IndicatorKind::BranchPrediction)),
            Box::new(Panicking(IndicatorKind::MemoryAccess)),
        ]);

        let result = engine.fuse(&fx.ctx(), &BTreeMap::new(), Utc::now());
        assert_eq!(result.spectre_indicators.len(), 1);
        assert!((result.risk_score - 10.0).abs() < 1e-9);
        assert!(result.overall_spectre_risk);
        assert_eq!(result.attack_type, Some(AttackType::UnknownVariant));
    }

    #[test]
    fn test_cache_ratio_averaged_over_three_indicators() {
        let fx = cache_burst();
        let result = FusionEngine::default().fuse(&fx.ctx(), &BTreeMap::new(), Utc::now());

        assert_eq!(result.spectre_indicators.len(), 3);
        assert!((result.risk_score - 10.0 / 3.0).abs() < 1e-9);
        assert!(result.overall_spectre_risk);
    }

    #[test]
    fn test_failed_indicator_is_absent_not_negative() {
        let mut fx = Fixture::new();
        fx.fill_const("branch_misses", 8000.0, 25);
        fx.fill_const("branch_instructions", 45000.0, 25);

        let engine = FusionEngine::new(vec![
            Box::new(Broken(IndicatorKind::CacheTiming)),
            Box::new(BranchMispredictionDetector),
            Box::new(MemoryAccessPatternDetector),
        ]);
        let result = engine.fuse(&fx.ctx(), &BTreeMap::new(), Utc::now());

        assert!(result.indicator(IndicatorKind::CacheTiming).is_none());
        // Branch contributes 1.0 over two evaluated indicators
        assert!((result.risk_score - 0.5).abs() < 1e-12);
        assert!(!result.overall_spectre_risk);
    }

    #[test]
    fn test_all_failed_yields_zero() {
        let fx = Fixture::new();
        let engine = FusionEngine::new(vec![
            Box::new(Broken(IndicatorKind::CacheTiming)),
            Box::new(Panicking(IndicatorKind::BranchPrediction)),
        ]);

        let result = engine.fuse(&fx.ctx(), &BTreeMap::new(), Utc::now());
        assert!(result.spectre_indicators.is_empty());
        assert_eq!(result.risk_score, 0.0);
        assert!(!result.overall_spectre_risk);
    }

    #[test]
    fn test_evaluate_all_tags_failures() {
        let fx = Fixture::new();
        let engine = FusionEngine::new(vec![
            Box::new(MemoryAccessPatternDetector),
            Box::new(Panicking(IndicatorKind::BranchPrediction)),
        ]);

        let outcomes = engine.evaluate_all(&fx.ctx());
        assert_eq!(outcomes[0], (IndicatorKind::MemoryAccess, IndicatorOutcome::Evaluated(Signal::neutral())));
        match &outcomes[1].1 {
            IndicatorOutcome::Failed(DetectorError::Panicked(msg)) => assert!(msg.contains("corrupted")),
            other => panic!("Expected panic isolation, got {:?}", other),
        }
    }

    #[test]
    fn test_fuse_reports_exactly_the_evaluated_outcomes() {
        let fx = cache_burst();
        let engine = FusionEngine::new(vec![
            Box::new(CacheTimingVarianceDetector::default()),
            Box::new(Panicking(IndicatorKind::BranchPrediction)),
            Box::new(MemoryAccessPatternDetector),
        ]);

        let evaluated: BTreeMap<IndicatorKind, Signal> = engine
            .evaluate_all(&fx.ctx())
            .into_iter()
            .filter_map(|(kind, outcome)| match outcome {
                IndicatorOutcome::Evaluated(signal) => Some((kind, signal)),
                IndicatorOutcome::Failed(_) => None,
            })
            .collect();

        let result = engine.fuse(&fx.ctx(), &BTreeMap::new(), Utc::now());
        assert_eq!(result.spectre_indicators, evaluated);
        assert_eq!(evaluated.len(), 2);
    }

    #[test]
    fn test_overflowing_window_excluded() {
        let mut fx = Fixture::new();
        fx.fill_const("cache_misses", f64::MAX, 20);
        fx.fill_const("branch_misses", 8000.0, 25);
        fx.fill_const("branch_instructions", 45000.0, 25);

        let result = FusionEngine::default().fuse(&fx.ctx(), &BTreeMap::new(), Utc::now());
        assert!(result.indicator(IndicatorKind::CacheTiming).is_none());
        assert!(result.is_anomalous(IndicatorKind::BranchPrediction));
        assert!((result.risk_score - 0.5).abs() < 1e-12);
    }
}
