//! Error types
//!
//! The core has no fatal conditions. Errors exist only at the input boundary,
//! inside a single detector (isolated by fusion), and around snapshot I/O.

use thiserror::Error;

/// Malformed input at the sampler boundary
#[derive(Debug, Error)]
pub enum InputError {
    #[error("counter document must be a JSON object")]
    NotAnObject,

    #[error("counter '{metric}' is not numeric: {found}")]
    NonNumeric { metric: String, found: String },

    #[error("counter '{metric}' is not finite")]
    NonFinite { metric: String },

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("invalid input line: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure inside one detector. Never escapes the fusion step.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectorError {
    #[error("non-finite {quantity} for metric '{metric}'")]
    NonFinite {
        metric: String,
        quantity: &'static str,
    },

    #[error("detector panicked: {0}")]
    Panicked(String),
}

/// Baseline snapshot persistence errors
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization Error: {0}")]
    Serialization(#[from] serde_json::Error),
}
