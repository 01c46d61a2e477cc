//! Shared Engine Handle
//!
//! Cloneable handle cho nhiều thread dùng chung một engine. Each call takes
//! the lock once, so a full detection cycle is never interleaved with another.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use super::engine::SpectreEngine;
use super::sample::CounterSnapshot;
use super::threat::DetectionResult;

#[derive(Debug, Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<SpectreEngine>>,
}

impl SharedEngine {
    pub fn new(engine: SpectreEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// One atomic detection cycle
    pub fn run_cycle(&self, snapshot: &CounterSnapshot) -> DetectionResult {
        self.inner.lock().detect(snapshot)
    }

    /// Normal cycle: record the counters and refresh the reference baseline
    pub fn observe_normal(&self, snapshot: &CounterSnapshot) -> usize {
        let timestamp: DateTime<Utc> = snapshot.timestamp.unwrap_or_else(Utc::now);
        self.inner.lock().observe_normal(&snapshot.counters, timestamp)
    }

    pub fn history(&self, window: Duration) -> Vec<DetectionResult> {
        self.inner.lock().history(window)
    }

    /// Run `f` with exclusive access to the engine
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut SpectreEngine) -> R) -> R {
        let mut engine = self.inner.lock();
        f(&mut *engine)
    }
}

impl From<SpectreEngine> for SharedEngine {
    fn from(engine: SpectreEngine) -> Self {
        Self::new(engine)
    }
}
