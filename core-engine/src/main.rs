//! Spectre Sentinel - Main Entry Point
//!
//! Đọc counter snapshots (JSON lines) từ stdin, in DetectionResult ra stdout.

use std::io::{self, BufRead, Write};

use spectre_sentinel::constants::{self, APP_NAME, APP_VERSION};
use spectre_sentinel::logic::{Config, CounterSnapshot, SpectreEngine};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting {} v{}...", APP_NAME, APP_VERSION);

    let config = Config::load_or_default(&constants::get_config_path());
    let baseline_path = constants::get_baseline_path();

    let mut engine = SpectreEngine::new(config);
    if let Err(e) = engine.load_baseline(&baseline_path) {
        log::warn!("Baseline load failed: {} - starting without calibration", e);
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for (line_no, line) in stdin.lock().lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::error!("Failed to read input: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let snapshot = match CounterSnapshot::from_json_str(&line) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("Skipping line {}: {}", line_no + 1, e);
                continue;
            }
        };

        if snapshot.normal {
            let timestamp = snapshot.timestamp.unwrap_or_else(chrono::Utc::now);
            engine.observe_normal(&snapshot.counters, timestamp);
            continue;
        }

        let result = engine.detect(&snapshot);
        match serde_json::to_string(&result) {
            Ok(json) => {
                if let Err(e) = writeln!(out, "{}", json) {
                    log::error!("Failed to write result: {}", e);
                    break;
                }
            }
            Err(e) => log::error!("Failed to serialize result: {}", e),
        }
    }

    // Only lines marked normal feed the persisted baseline
    let calibrated = engine.calibrate_from_normal();
    log::info!(
        "Input closed: {} metrics calibrated, {} detections in log",
        calibrated,
        engine.detection_log().len()
    );

    if calibrated == 0 {
        log::info!("No normal cycles to calibrate from, keeping {}", baseline_path.display());
        return;
    }

    if let Err(e) = engine.save_baseline(&baseline_path) {
        log::error!("Failed to save baselines: {}", e);
    }
}
