//! Metric Window Store
//!
//! Quản lý cửa sổ sample cho từng metric.
//! Each metric name maps to a fixed-capacity ring buffer, created on first
//! write; the oldest sample is evicted once the window is full.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};

use super::sample::MetricSample;

// ============================================================================
// METRIC WINDOW
// ============================================================================

/// Bounded, insertion-ordered history for one metric
#[derive(Debug, Clone)]
pub struct MetricWindow {
    samples: VecDeque<MetricSample>,
    capacity: usize,
}

impl MetricWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append and evict the oldest sample while over capacity
    pub fn push(&mut self, sample: MetricSample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples, oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &MetricSample> + ExactSizeIterator {
        self.samples.iter()
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    /// Values of the last `n` samples, oldest first (fewer if shorter)
    pub fn recent(&self, n: usize) -> Vec<f64> {
        let start = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(start).map(|s| s.value).collect()
    }

    pub fn latest(&self) -> Option<&MetricSample> {
        self.samples.back()
    }
}

// ============================================================================
// STORE
// ============================================================================

/// Per-metric windows owned by one engine
#[derive(Debug, Clone)]
pub struct MetricWindowStore {
    windows: HashMap<String, MetricWindow>,
    capacity: usize,
}

impl MetricWindowStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            windows: HashMap::new(),
            capacity,
        }
    }

    /// Store with empty windows already created for `names`
    pub fn with_metrics<'a>(capacity: usize, names: impl IntoIterator<Item = &'a String>) -> Self {
        let mut store = Self::new(capacity);
        for name in names {
            store
                .windows
                .entry(name.clone())
                .or_insert_with(|| MetricWindow::new(capacity));
        }
        store
    }

    /// Record one sample. Never fails.
    pub fn record(&mut self, name: &str, value: f64, timestamp: DateTime<Utc>) {
        let capacity = self.capacity;
        self.windows
            .entry(name.to_string())
            .or_insert_with(|| MetricWindow::new(capacity))
            .push(MetricSample::new(name, value, timestamp));
    }

    pub fn get(&self, name: &str) -> Option<&MetricWindow> {
        self.windows.get(name)
    }

    /// Ordered view of a window; empty if the metric is unknown
    pub fn window(&self, name: &str) -> impl Iterator<Item = &MetricSample> {
        self.windows.get(name).into_iter().flat_map(|w| w.iter())
    }

    pub fn values(&self, name: &str) -> Vec<f64> {
        self.windows.get(name).map(|w| w.values()).unwrap_or_default()
    }

    pub fn recent(&self, name: &str, n: usize) -> Vec<f64> {
        self.windows.get(name).map(|w| w.recent(n)).unwrap_or_default()
    }

    pub fn len(&self, name: &str) -> usize {
        self.windows.get(name).map_or(0, MetricWindow::len)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Known metric names, sorted
    pub fn metric_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.windows.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
