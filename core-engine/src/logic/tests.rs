//! End-to-end detection cycles through `SpectreEngine`

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use super::config::Config;
use super::detectors::{
    BranchMispredictionDetector, DetectionContext, IndicatorKind, Signal, SignalDetector,
};
use super::engine::SpectreEngine;
use super::errors::DetectorError;
use super::sample::{CounterSnapshot, MetricKind};
use super::threat::AttackType;

fn counters(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// Branch + memory counters; `llc_misses` decides whether memory fires
fn attack_cycle(cache_misses: f64, llc_misses: f64) -> BTreeMap<String, f64> {
    counters(&[
        ("cache_misses", cache_misses),
        ("branch_misses", 8000.0),
        ("branch_instructions", 45000.0),
        ("mem_loads", 25000.0),
        ("mem_stores", 4000.0),
        ("llc_misses", llc_misses),
    ])
}

fn normal_cycle(i: usize) -> BTreeMap<String, f64> {
    let jitter = if i % 2 == 0 { -100.0 } else { 100.0 };
    counters(&[
        ("cache_misses", 5000.0 + jitter),
        ("branch_misses", 2000.0),
        ("branch_instructions", 50000.0),
        ("mem_loads", 10000.0),
        ("mem_stores", 8000.0),
        ("llc_misses", 200.0),
    ])
}

fn run(engine: &mut SpectreEngine, cycles: usize, f: impl Fn(usize) -> BTreeMap<String, f64>) {
    let now = Utc::now();
    for i in 0..cycles {
        engine.detect_at(&f(i), now);
    }
}

struct AlwaysFails(IndicatorKind);

impl SignalDetector for AlwaysFails {
    fn kind(&self) -> IndicatorKind {
        self.0
    }

    fn evaluate(&self, _ctx: &DetectionContext<'_>) -> Result<Signal, DetectorError> {
        Err(DetectorError::Panicked("sensor offline".to_string()))
    }
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_warmup_cycles_are_neutral() {
    let mut engine = SpectreEngine::default();
    let now = Utc::now();

    for _ in 0..19 {
        let result = engine.detect_at(&attack_cycle(5000.0, 3000.0), now);
        assert!(result.spectre_indicators.values().all(|s| *s == Signal::neutral()));
        assert_eq!(result.risk_score, 0.0);
        assert!(!result.overall_spectre_risk);
    }
    assert!(engine.detection_log().is_empty());
}

#[test]
fn test_branch_only_scenario_stays_below_risk_threshold() {
    let mut engine = SpectreEngine::default();
    run(&mut engine, 24, |_| attack_cycle(5000.0, 1500.0));
    let result = engine.detect_at(&attack_cycle(5000.0, 1500.0), Utc::now());

    let branch = result.indicator(IndicatorKind::BranchPrediction).unwrap();
    assert!(branch.anomaly);
    assert!((branch.score - 8000.0 / 45000.0).abs() < 1e-12);

    // ratio 6.25 but llc rate 0.06
    assert!(!result.is_anomalous(IndicatorKind::MemoryAccess));
    // constant cache window: ratio 1.0
    assert_eq!(result.indicator(IndicatorKind::CacheTiming), Some(&Signal::new(false, 1.0)));

    assert!((result.risk_score - 1.0 / 3.0).abs() < 1e-12);
    assert!(!result.overall_spectre_risk);
    assert_eq!(result.attack_type, None);
}

#[test]
fn test_branch_and_memory_is_spectre_v2() {
    let mut engine = SpectreEngine::default();
    run(&mut engine, 24, |_| attack_cycle(5000.0, 3000.0));
    let result = engine.detect_at(&attack_cycle(5000.0, 3000.0), Utc::now());

    assert!(result.is_anomalous(IndicatorKind::BranchPrediction));
    assert!(result.is_anomalous(IndicatorKind::MemoryAccess));
    assert!((result.risk_score - 2.0 / 3.0).abs() < 1e-12);
    assert!(result.overall_spectre_risk);
    assert_eq!(result.attack_type, Some(AttackType::SpectreV2));
    assert_eq!(engine.detection_log().len(), 6);
}

#[test]
fn test_lone_branch_indicator_is_spectre_v2() {
    let mut engine = SpectreEngine::with_detectors(
        Config::default(),
        vec![
            Box::new(AlwaysFails(IndicatorKind::CacheTiming)),
            Box::new(BranchMispredictionDetector),
            Box::new(AlwaysFails(IndicatorKind::MemoryAccess)),
        ],
    );
    run(&mut engine, 24, |_| attack_cycle(5000.0, 1500.0));
    let result = engine.detect_at(&attack_cycle(5000.0, 1500.0), Utc::now());

    assert_eq!(result.spectre_indicators.len(), 1);
    assert_eq!(result.risk_score, 1.0);
    assert!(result.overall_spectre_risk);
    assert_eq!(result.attack_type, Some(AttackType::SpectreV2));
}

#[test]
fn test_cache_burst_after_normal_reference_is_spectre_v1() {
    let mut engine = SpectreEngine::default();
    let now = Utc::now();

    for i in 0..20 {
        let normal = normal_cycle(i);
        engine.record_all(&normal, now);
        engine.refresh_reference(&normal);
    }
    let reference = engine.baseline().reference("cache_misses").copied().unwrap();
    assert!((reference.mean - 5000.0).abs() < 1e-9);

    let mut last = None;
    for i in 0..20 {
        let cache = if i % 2 == 0 { 1000.0 } else { 9000.0 };
        last = Some(engine.detect_at(&attack_cycle(cache, 1500.0), now));
    }
    let result = last.unwrap();

    let cache = result.indicator(IndicatorKind::CacheTiming).unwrap();
    assert!(cache.anomaly);
    assert!(cache.score > 3.0);
    assert!(result.is_anomalous(IndicatorKind::BranchPrediction));
    assert!(!result.is_anomalous(IndicatorKind::MemoryAccess));
    assert!(result.overall_spectre_risk);
    assert_eq!(result.attack_type, Some(AttackType::SpectreV1));
    assert!(result.risk_score > 1.0);
}

#[test]
fn test_history_excludes_old_detections() {
    let mut engine = SpectreEngine::default();
    let now = Utc::now();
    let stamps: [DateTime<Utc>; 3] = [now - Duration::hours(30), now - Duration::hours(25), now];

    run(&mut engine, 19, |_| attack_cycle(5000.0, 3000.0));
    for ts in stamps {
        let result = engine.detect_at(&attack_cycle(5000.0, 3000.0), ts);
        assert!(result.overall_spectre_risk);
    }

    assert_eq!(engine.detection_log().len(), 3);
    let recent = engine.history(Duration::hours(24));
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].timestamp, now);
}

#[test]
fn test_detection_log_is_bounded() {
    let mut config = Config::default();
    config.min_samples = 2;
    config.window_size = 20;
    let mut engine = SpectreEngine::new(config);

    run(&mut engine, 520, |_| attack_cycle(5000.0, 3000.0));
    assert_eq!(engine.detection_log().len(), 500);
}

// ============================================================================
// WIRE FORMAT
// ============================================================================

#[test]
fn test_result_json_shape() {
    let mut engine = SpectreEngine::default();
    run(&mut engine, 24, |_| attack_cycle(5000.0, 3000.0));
    let snapshot = CounterSnapshot::new(attack_cycle(5000.0, 3000.0));
    let result = engine.detect(&snapshot);

    let json = serde_json::to_value(&result).unwrap();
    assert!(json["timestamp"].is_string());
    assert_eq!(json["performance_counters"]["mem_loads"], 25000.0);
    assert_eq!(json["spectre_indicators"]["branch_prediction"]["anomaly"], true);
    assert!(json["spectre_indicators"]["cache_timing"]["score"].is_number());
    assert!(json["spectre_indicators"]["memory_access"].is_object());
    assert_eq!(json["overall_spectre_risk"], true);
    assert_eq!(json["attack_type"], "Spectre-v2 (Branch Target Injection)");
}

#[test]
fn test_quiet_result_has_null_attack_type() {
    let mut engine = SpectreEngine::default();
    let result = engine.detect(&CounterSnapshot::new(normal_cycle(0)));

    let json = serde_json::to_value(&result).unwrap();
    assert!(json["attack_type"].is_null());
    assert_eq!(json["risk_score"], 0.0);
}

#[test]
fn test_snapshot_timestamp_is_used() {
    let mut engine = SpectreEngine::default();
    let snapshot = CounterSnapshot::from_json_str(
        r#"{"counters": {"cycles": 1000}, "timestamp": "2024-03-01T12:00:00Z"}"#,
    )
    .unwrap();

    let result = engine.detect(&snapshot);
    assert_eq!(result.timestamp.to_rfc3339(), "2024-03-01T12:00:00+00:00");
    assert_eq!(engine.windows().len("cycles"), 1);
}

// ============================================================================
// CALIBRATION & REPORTS
// ============================================================================

#[test]
fn test_windows_created_for_configured_metrics() {
    let engine = SpectreEngine::default();
    assert_eq!(engine.windows().metric_names().len(), 10);
    assert!(engine.windows().get("tlb_misses").is_some_and(|w| w.is_empty()));
}

#[test]
fn test_calibrate_from_windows_and_deviations() {
    let mut engine = SpectreEngine::default();
    run(&mut engine, 20, normal_cycle);

    // every metric with 20 samples, even those with zero spread
    assert_eq!(engine.calibrate_from_windows(), 6);
    assert!(engine.baseline().get("tlb_misses").is_none());

    let cache = engine.baseline().get("cache_misses").unwrap();
    assert!((cache.mean - 5000.0).abs() < 1e-9);

    let report = engine.deviations(&counters(&[("cache_misses", 6000.0), ("cycles", 1.0)]));
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].metric, "cache_misses");
    assert_eq!(report[0].kind, MetricKind::Cache);
    assert!(report[0].z_score > 3.0);

    assert!(engine.is_anomaly("cache_misses", 6000.0));
    assert!(!engine.is_anomaly("cache_misses", 5000.0));
    assert!(!engine.is_anomaly("cycles", 1e12));
}

#[test]
fn test_calibrate_small_batch_is_skipped() {
    let mut engine = SpectreEngine::default();
    assert!(!engine.calibrate("cache_misses", &[1.0, 2.0, 3.0]));
    assert!(engine.baseline().get("cache_misses").is_none());
}

#[test]
fn test_threshold_breaches() {
    let engine = SpectreEngine::default();
    let breaches = engine.threshold_breaches(&counters(&[
        ("llc_misses", 1500.0),
        ("mem_loads", 1000.0),
        ("unconfigured", 1e9),
    ]));

    assert_eq!(breaches.len(), 1);
    assert_eq!(breaches[0].metric, "llc_misses");
    assert_eq!(breaches[0].threshold, 1000.0);
    assert_eq!(breaches[0].unit, "per_second");
    assert_eq!(breaches[0].kind, MetricKind::Cache);
}

#[test]
fn test_baseline_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("baselines.json");

    let mut engine = SpectreEngine::default();
    run(&mut engine, 20, normal_cycle);
    engine.calibrate_from_windows();
    engine.save_baseline(&path).unwrap();

    let mut restarted = SpectreEngine::default();
    assert_ne!(restarted.id(), engine.id());
    assert!(restarted.load_baseline(&path).unwrap());
    assert_eq!(restarted.baseline().baselines(), engine.baseline().baselines());
}

#[test]
fn test_missing_baseline_file_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = SpectreEngine::default();
    assert!(!engine.load_baseline(&dir.path().join("absent.json")).unwrap());
}

#[test]
fn test_calibration_ignores_detection_cycles() {
    let mut engine = SpectreEngine::default();
    let now = Utc::now();

    for i in 0..20 {
        engine.observe_normal(&normal_cycle(i), now);
    }
    run(&mut engine, 40, |_| attack_cycle(5000.0, 3000.0));

    assert_eq!(engine.calibrate_from_normal(), 6);
    let branch = engine.baseline().get("branch_misses").unwrap();
    assert_eq!(branch.mean, 2000.0);
    assert_eq!(branch.max, 2000.0);
    assert_eq!(engine.normal_windows().len("branch_misses"), 20);
    assert_eq!(engine.windows().len("branch_misses"), 60);
}

#[test]
fn test_no_normal_cycles_leaves_baseline_alone() {
    let mut engine = SpectreEngine::default();
    assert!(engine.calibrate("branch_misses", &[2000.0; 20]));
    run(&mut engine, 40, |_| attack_cycle(5000.0, 3000.0));

    assert_eq!(engine.calibrate_from_normal(), 0);
    assert_eq!(engine.baseline().get("branch_misses").unwrap().mean, 2000.0);
}
