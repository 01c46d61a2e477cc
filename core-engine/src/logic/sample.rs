//! Samples & Input Boundary
//!
//! `MetricSample` là đơn vị dữ liệu nhỏ nhất. `CounterSnapshot` is the
//! validated per-cycle input handed over by an external sampler.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::InputError;

// ============================================================================
// METRIC SAMPLE
// ============================================================================

/// One recorded counter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub name: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl MetricSample {
    pub fn new(name: &str, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            value,
            timestamp,
        }
    }
}

// ============================================================================
// METRIC KIND
// ============================================================================

/// Counter family, derived from the counter name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Cache,
    Branch,
    Memory,
    Speculative,
    Execution,
}

impl MetricKind {
    /// Categorize a counter by name (case-insensitive substring match)
    pub fn of(metric: &str) -> Self {
        let name = metric.to_lowercase();
        let has_any = |needles: &[&str]| needles.iter().any(|n| name.contains(n));

        if has_any(&["cache", "llc", "l1", "l2", "l3", "tlb"]) {
            MetricKind::Cache
        } else if has_any(&["branch"]) {
            MetricKind::Branch
        } else if has_any(&["mem_", "memory"]) {
            MetricKind::Memory
        } else if has_any(&["uops", "machine_clear", "recovery"]) {
            MetricKind::Speculative
        } else {
            MetricKind::Execution
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Cache => "cache",
            MetricKind::Branch => "branch",
            MetricKind::Memory => "memory",
            MetricKind::Speculative => "speculative",
            MetricKind::Execution => "execution",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// COUNTER SNAPSHOT (input boundary)
// ============================================================================

/// One collection cycle: metric name -> value, plus an optional timestamp
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CounterSnapshot {
    pub counters: BTreeMap<String, f64>,
    pub timestamp: Option<DateTime<Utc>>,
    /// Sampler marks the cycle as known-normal (baseline material)
    pub normal: bool,
}

impl CounterSnapshot {
    pub fn new(counters: BTreeMap<String, f64>) -> Self {
        Self {
            counters,
            ..Default::default()
        }
    }

    /// Parse one input document.
    ///
    /// Accepts either a bare `{"metric": value, ...}` map or an envelope
    /// `{"counters": {...}, "timestamp": "<rfc3339>", "normal": bool}`.
    pub fn from_json(value: &Value) -> Result<Self, InputError> {
        let object = value.as_object().ok_or(InputError::NotAnObject)?;

        let Some(inner) = object.get("counters") else {
            return Ok(Self::new(parse_counters(object)?));
        };

        let counters = parse_counters(inner.as_object().ok_or(InputError::NotAnObject)?)?;

        let timestamp = match object.get("timestamp") {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) => Some(
                DateTime::parse_from_rfc3339(raw)
                    .map_err(|_| InputError::InvalidTimestamp(raw.clone()))?
                    .with_timezone(&Utc),
            ),
            Some(other) => return Err(InputError::InvalidTimestamp(other.to_string())),
        };

        let normal = object.get("normal").and_then(Value::as_bool).unwrap_or(false);

        Ok(Self {
            counters,
            timestamp,
            normal,
        })
    }

    /// Parse one line of JSON text
    pub fn from_json_str(raw: &str) -> Result<Self, InputError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_json(&value)
    }
}

fn parse_counters(object: &serde_json::Map<String, Value>) -> Result<BTreeMap<String, f64>, InputError> {
    let mut counters = BTreeMap::new();
    for (metric, raw) in object {
        let value = raw.as_f64().ok_or_else(|| InputError::NonNumeric {
            metric: metric.clone(),
            found: raw.to_string(),
        })?;
        if !value.is_finite() {
            return Err(InputError::NonFinite {
                metric: metric.clone(),
            });
        }
        counters.insert(metric.clone(), value);
    }
    Ok(counters)
}
