//! Detection Log
//!
//! Giữ các detection có `overall_spectre_risk` trong bộ nhớ, bounded.
//! Oldest entries are evicted first; queries filter by result timestamp.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

use crate::constants::DETECTION_LOG_CAPACITY;
use crate::logic::threat::DetectionResult;

#[derive(Debug, Clone)]
pub struct DetectionLog {
    entries: VecDeque<DetectionResult>,
    capacity: usize,
}

impl Default for DetectionLog {
    fn default() -> Self {
        Self::with_capacity(DETECTION_LOG_CAPACITY)
    }
}

impl DetectionLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DETECTION_LOG_CAPACITY)),
            capacity,
        }
    }

    /// Append a risky result and raise the alert
    pub fn push(&mut self, result: DetectionResult) {
        log::error!(
            "POTENTIAL SPECTRE ATTACK DETECTED - Risk Score: {:.2}, Type: {}",
            result.risk_score,
            result.attack_type.map_or("none", |t| t.as_str())
        );
        for (kind, signal) in result.anomalous_indicators() {
            log::warn!("  {}: score={:.3}", kind, signal.score);
        }

        self.entries.push_back(result);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Entries from the last `window`, oldest first. A window reaching
    /// past the earliest representable time returns everything.
    pub fn history(&self, window: Duration) -> Vec<DetectionResult> {
        let cutoff = Utc::now()
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.history_since(cutoff)
    }

    /// Entries with `timestamp >= cutoff`, oldest first
    pub fn history_since(&self, cutoff: DateTime<Utc>) -> Vec<DetectionResult> {
        self.entries
            .iter()
            .filter(|r| r.timestamp >= cutoff)
            .cloned()
            .collect()
    }

    pub fn latest(&self) -> Option<&DetectionResult> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DetectionResult> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
