//! Risk Classifier
//!
//! CHỈ chứa logic aggregate + classify - không có types, không có detectors.
//! Input: scored indicators (failed detectors already removed)
//! Output: RiskAssessment

use super::rules::{MIN_ANOMALY_COUNT, RISK_SCORE_THRESHOLD};
use super::types::{AttackType, RiskAssessment, ScoredIndicator};
use crate::logic::detectors::IndicatorKind;

// ============================================================================
// MAIN ASSESSMENT FUNCTION
// ============================================================================

/// Average the contributions over evaluated indicators and classify.
///
/// The score is not clamped; a raw cache-timing variance ratio can push it
/// far above 1.0.
pub fn assess(indicators: &[ScoredIndicator]) -> RiskAssessment {
    let evaluated = indicators.len();
    let total: f64 = indicators.iter().map(|i| i.contribution).sum();
    let risk_score = if evaluated > 0 { total / evaluated as f64 } else { 0.0 };

    let anomaly_count = indicators.iter().filter(|i| i.signal.anomaly).count();
    let overall_risk = anomaly_count >= MIN_ANOMALY_COUNT || risk_score > RISK_SCORE_THRESHOLD;

    let attack_type = if overall_risk {
        let flagged = |kind: IndicatorKind| indicators.iter().any(|i| i.kind == kind && i.signal.anomaly);
        Some(classify(
            flagged(IndicatorKind::CacheTiming),
            flagged(IndicatorKind::BranchPrediction),
        ))
    } else {
        None
    };

    RiskAssessment {
        risk_score,
        anomaly_count,
        evaluated,
        overall_risk,
        attack_type,
    }
}

/// Precedence: cache + branch, then branch alone, then anything else
pub fn classify(cache_anomaly: bool, branch_anomaly: bool) -> AttackType {
    match (cache_anomaly, branch_anomaly) {
        (true, true) => AttackType::SpectreV1,
        (false, true) => AttackType::SpectreV2,
        _ => AttackType::UnknownVariant,
    }
}

// ============================================================================
// TESTS
// ============================================================================
