//! Engine Configuration
//!
//! Window size, sample gates, sensitivity và static per-metric thresholds.
//! Loading from disk is a convenience for the binary; the engine itself only
//! ever receives an already-built `Config`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BRANCH_MISPREDICT_THRESHOLD, DEFAULT_MIN_SAMPLES, DEFAULT_SENSITIVITY,
    DEFAULT_WINDOW_SIZE,
};

/// Static threshold for one counter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricThreshold {
    pub threshold: f64,
    #[serde(default = "default_unit")]
    pub unit: String,
}

fn default_unit() -> String {
    "per_second".to_string()
}

impl MetricThreshold {
    pub fn per_second(threshold: f64) -> Self {
        Self {
            threshold,
            unit: default_unit(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Capacity of every metric window
    pub window_size: usize,

    /// Sensitivity multiplier for baseline deviation reports
    pub sensitivity: f64,

    /// Samples required before a detector or calibration runs
    pub min_samples: usize,

    /// Misprediction rate above which the branch detector fires
    pub branch_mispredict_threshold: f64,

    /// Per-metric static thresholds; windows are pre-created for each key
    pub spectre_metrics: BTreeMap<String, MetricThreshold>,
}

impl Default for Config {
    fn default() -> Self {
        let spectre_metrics = [
            ("cache_misses", 10_000.0),
            ("cache_references", 50_000.0),
            ("branch_misses", 5_000.0),
            ("branch_instructions", 100_000.0),
            ("instructions", 1_000_000.0),
            ("cycles", 2_000_000.0),
            ("mem_loads", 20_000.0),
            ("mem_stores", 15_000.0),
            ("llc_misses", 1_000.0),
            ("tlb_misses", 500.0),
        ]
        .into_iter()
        .map(|(name, threshold)| (name.to_string(), MetricThreshold::per_second(threshold)))
        .collect();

        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            sensitivity: DEFAULT_SENSITIVITY,
            min_samples: DEFAULT_MIN_SAMPLES,
            branch_mispredict_threshold: DEFAULT_BRANCH_MISPREDICT_THRESHOLD,
            spectre_metrics,
        }
    }
}

impl Config {
    /// Parse a config document. Missing fields take their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Load config from disk, falling back to defaults when the file is
    /// absent or malformed.
    pub fn load_or_default(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Config file {} not found, using defaults", path.display());
                return Self::default();
            }
            Err(e) => {
                log::error!("Error reading config file {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match Self::from_json_str(&raw) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Error parsing config file: {}", e);
                Self::default()
            }
        }
    }

    /// Static threshold configured for a metric, if any
    pub fn threshold_for(&self, metric: &str) -> Option<f64> {
        self.spectre_metrics.get(metric).map(|t| t.threshold)
    }

    /// Z-score above which a counter deviates from its calibration baseline
    pub fn deviation_z_threshold(&self) -> f64 {
        2.0 * self.sensitivity
    }
}
