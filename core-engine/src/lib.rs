//! Spectre Sentinel - Performance Counter Anomaly Engine
//!
//! Nhận performance counter snapshots từ một sampler bên ngoài và đánh giá
//! Spectre-style side-channel risk.

pub mod constants;
pub mod logic;

pub use logic::{
    AttackType, Config, CounterSnapshot, DetectionResult, SharedEngine, SpectreEngine,
};
