//! Threat Module
//!
//! Gộp các detector signals thành một verdict cho mỗi cycle.
//! Đây là CORE STEP - nơi quyết định có Spectre risk hay không.
//!
//! ## Structure
//! - `types`: Core types (AttackType, IndicatorOutcome, DetectionResult)
//! - `rules`: Thresholds and constants
//! - `classifier`: Risk aggregation and attack-type mapping
//! - `fusion`: Runs detectors with failure isolation
//!
//! ## Usage
//! ```ignore
//! use crate::logic::threat::FusionEngine;
//!
//! let result = FusionEngine::default().fuse(&ctx, &counters, Utc::now());
//! if result.overall_spectre_risk {
//!     println!("{:?}", result.attack_type);
//! }
//! ```

pub mod types;
pub mod rules;
pub mod classifier;
pub mod fusion;

pub use types::{AttackType, DetectionResult, IndicatorOutcome, RiskAssessment, ScoredIndicator};

pub use rules::{MIN_ANOMALY_COUNT, RISK_SCORE_THRESHOLD};

pub use classifier::{assess, classify};

pub use fusion::FusionEngine;
