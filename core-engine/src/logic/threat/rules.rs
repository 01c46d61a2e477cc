//! Detection Rules & Thresholds
//!
//! Định nghĩa các threshold cho detectors và fusion.
//! KHÔNG chứa logic - chỉ constants.

// ============================================================================
// CACHE TIMING
// ============================================================================

/// Default metric watched by the cache-timing detector
pub const CACHE_TIMING_METRIC: &str = "cache_misses";

/// Variance must grow beyond this multiple of the reference variance
pub const VARIANCE_RATIO_THRESHOLD: f64 = 3.0;

/// Std dev must also exceed this fraction of the window mean
pub const STD_DEV_MEAN_FACTOR: f64 = 0.3;

// ============================================================================
// BRANCH PREDICTION
// ============================================================================

pub const BRANCH_MISSES_METRIC: &str = "branch_misses";
pub const BRANCH_INSTRUCTIONS_METRIC: &str = "branch_instructions";

/// Number of most recent samples averaged for the misprediction rate
pub const BRANCH_RECENT_SAMPLES: usize = 10;

/// Misprediction rate is scaled by this before being capped at 1.0
pub const BRANCH_CONTRIBUTION_SCALE: f64 = 10.0;

// ============================================================================
// MEMORY ACCESS
// ============================================================================

pub const MEM_LOADS_METRIC: &str = "mem_loads";
pub const MEM_STORES_METRIC: &str = "mem_stores";
pub const LLC_MISSES_METRIC: &str = "llc_misses";

/// Tail of each memory window that is averaged
pub const MEMORY_RECENT_SAMPLES: usize = 20;

/// Minimum samples present in each tail
pub const MEMORY_MIN_RECENT: usize = 10;

/// Loads per store above which the access mix is suspicious
pub const LOAD_STORE_RATIO_THRESHOLD: f64 = 5.0;

/// LLC misses per load above which the miss rate is suspicious (10%)
pub const LLC_MISS_RATE_THRESHOLD: f64 = 0.1;

pub const LOAD_STORE_CONFIDENCE_DIVISOR: f64 = 10.0;
pub const LLC_CONFIDENCE_SCALE: f64 = 10.0;

// ============================================================================
// FUSION
// ============================================================================

/// Anomalous indicators needed for an overall risk verdict
pub const MIN_ANOMALY_COUNT: usize = 2;

/// Risk score above which a single indicator is enough
pub const RISK_SCORE_THRESHOLD: f64 = 0.7;
