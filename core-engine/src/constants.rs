//! Central Configuration Constants
//!
//! Single source of truth for engine defaults.
//! Detector rule constants live in `logic::threat::rules`.

use std::path::PathBuf;

/// Default per-metric window capacity
pub const DEFAULT_WINDOW_SIZE: usize = 100;

/// Default sensitivity multiplier (z-score threshold = 2 * sensitivity)
pub const DEFAULT_SENSITIVITY: f64 = 1.5;

/// Minimum samples before any detector or calibration runs
pub const DEFAULT_MIN_SAMPLES: usize = 20;

/// Default branch misprediction rate threshold (15%)
pub const DEFAULT_BRANCH_MISPREDICT_THRESHOLD: f64 = 0.15;

/// Detection log capacity (positive detections kept in memory)
pub const DETECTION_LOG_CAPACITY: usize = 500;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "Spectre Sentinel";

/// Env var holding the config document path
pub const CONFIG_PATH_ENV: &str = "SPECTRE_CONFIG_PATH";

/// Env var holding the baseline snapshot path
pub const BASELINE_PATH_ENV: &str = "SPECTRE_BASELINE_PATH";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get config path from environment or use `metrics_config.json`
pub fn get_config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("metrics_config.json"))
}

/// Get baseline snapshot path from environment or use the local data dir
pub fn get_baseline_path() -> PathBuf {
    std::env::var(BASELINE_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_baseline_path())
}

/// Default baseline path
pub fn default_baseline_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("spectre-sentinel")
        .join("baselines.json")
}
