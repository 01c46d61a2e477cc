//! Threat Types
//!
//! Core types cho detection output.
//! KHÔNG chứa logic - chỉ data structures.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::detectors::{IndicatorKind, Signal};
use crate::logic::errors::DetectorError;

// ============================================================================
// ATTACK TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackType {
    #[serde(rename = "Spectre-v1 (Bounds Check Bypass)")]
    SpectreV1,
    #[serde(rename = "Spectre-v2 (Branch Target Injection)")]
    SpectreV2,
    #[serde(rename = "Spectre-variant (Unknown)")]
    UnknownVariant,
}

impl AttackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttackType::SpectreV1 => "Spectre-v1 (Bounds Check Bypass)",
            AttackType::SpectreV2 => "Spectre-v2 (Branch Target Injection)",
            AttackType::UnknownVariant => "Spectre-variant (Unknown)",
        }
    }
}

impl std::fmt::Display for AttackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// INDICATOR OUTCOME
// ============================================================================

/// Result of running one detector.
///
/// `Failed` is not a negative verdict: the indicator is left out of the
/// output and out of the risk average.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorOutcome {
    Evaluated(Signal),
    Failed(DetectorError),
}

/// A successfully evaluated indicator with its risk contribution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredIndicator {
    pub kind: IndicatorKind,
    pub signal: Signal,
    /// 0 unless the signal is anomalous
    pub contribution: f64,
}

/// Aggregate verdict over the scored indicators
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskAssessment {
    pub risk_score: f64,
    pub anomaly_count: usize,
    pub evaluated: usize,
    pub overall_risk: bool,
    pub attack_type: Option<AttackType>,
}

// ============================================================================
// DETECTION RESULT
// ============================================================================

/// One detection cycle's output. Field names are part of the wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub timestamp: DateTime<Utc>,
    pub performance_counters: BTreeMap<String, f64>,
    pub spectre_indicators: BTreeMap<IndicatorKind, Signal>,
    pub overall_spectre_risk: bool,
    pub risk_score: f64,
    pub attack_type: Option<AttackType>,
}

impl DetectionResult {
    pub fn indicator(&self, kind: IndicatorKind) -> Option<&Signal> {
        self.spectre_indicators.get(&kind)
    }

    pub fn is_anomalous(&self, kind: IndicatorKind) -> bool {
        self.indicator(kind).is_some_and(|s| s.anomaly)
    }

    pub fn anomalous_indicators(&self) -> impl Iterator<Item = (&IndicatorKind, &Signal)> {
        self.spectre_indicators.iter().filter(|(_, s)| s.anomaly)
    }
}
