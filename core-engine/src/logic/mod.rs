//! Logic Module - Detection Engine
//!
//! Chứa các thành phần xử lý: Windows, Baseline, Detectors, Fusion, Log.
//!
//! ## Architecture
//! - `sample` / `window` - Input boundary và per-metric ring buffers
//! - `baseline/` - Calibration baseline + reference stats
//! - `detectors/` - Cache timing, branch, memory access signals
//! - `threat/` - Fusion và attack classification
//! - `engine` / `shared` - Cycle owner và thread-safe handle

// Core modules
pub mod config;
pub mod errors;
pub mod sample;
pub mod window;
pub mod baseline;
pub mod detectors;
pub mod threat;
pub mod history;

// Engine
pub mod engine;
pub mod shared;

#[cfg(test)]
mod tests;

pub use config::{Config, MetricThreshold};
pub use engine::{SpectreEngine, ThresholdBreach};
pub use errors::{DetectorError, InputError, SnapshotError};
pub use sample::{CounterSnapshot, MetricKind, MetricSample};
pub use shared::SharedEngine;
pub use threat::{AttackType, DetectionResult};
