//! Bounded rolling window of outcome samples.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// One aggregated outcome sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSample {
    /// When the sample was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Successful loads represented by this sample.
    pub success_count: u64,
    /// Failed loads represented by this sample.
    pub failure_count: u64,
    /// Average load time across the sample's successes, in milliseconds.
    pub avg_load_time_ms: u64,
}

impl MetricsSample {
    /// Creates a sample stamped with the current time.
    pub fn new(success_count: u64, failure_count: u64, avg_load_time: Duration) -> Self {
        Self {
            recorded_at: Utc::now(),
            success_count,
            failure_count,
            avg_load_time_ms: avg_load_time.as_millis() as u64,
        }
    }

    /// Creates a sample for a single successful load.
    pub fn success(load_time: Duration) -> Self {
        Self::new(1, 0, load_time)
    }

    /// Creates a sample for a single failed load.
    pub fn failure() -> Self {
        Self::new(0, 1, Duration::ZERO)
    }

    /// Total outcomes in this sample.
    pub fn total(&self) -> u64 {
        self.success_count + self.failure_count
    }
}

/// A bounded rolling window of samples; oldest evicted on overflow.
#[derive(Debug, Clone)]
pub struct MetricsStore {
    window: VecDeque<MetricsSample>,
    capacity: usize,
}

impl MetricsStore {
    /// Creates a store holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records a sample, evicting the oldest if the window is full.
    pub fn record(&mut self, sample: MetricsSample) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(sample);
    }

    /// Number of samples currently held.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Returns `true` if no samples have been recorded.
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Returns up to the last `n` samples, oldest first.
    pub fn recent(&self, n: usize) -> Vec<&MetricsSample> {
        let skip = self.window.len().saturating_sub(n);
        self.window.iter().skip(skip).collect()
    }

    /// Success rate over the last `n` samples, `[0, 1]`.
    ///
    /// Returns 1.0 for an empty window: the engine starts optimistic and
    /// only tightens behavior once real failures are observed.
    pub fn success_rate(&self, last_n: usize) -> f64 {
        let recent = self.recent(last_n);
        let total: u64 = recent.iter().map(|s| s.total()).sum();
        if total == 0 {
            return 1.0;
        }
        let successes: u64 = recent.iter().map(|s| s.success_count).sum();
        successes as f64 / total as f64
    }

    /// Average load time over the successes in the last `n` samples.
    pub fn avg_load_time(&self, last_n: usize) -> Duration {
        let recent = self.recent(last_n);
        let successes: u64 = recent.iter().map(|s| s.success_count).sum();
        if successes == 0 {
            return Duration::ZERO;
        }
        let weighted: u64 = recent
            .iter()
            .map(|s| s.avg_load_time_ms * s.success_count)
            .sum();
        Duration::from_millis(weighted / successes)
    }

    /// Returns a serializable summary for the status surface.
    pub fn summary(&self, last_n: usize) -> MetricsSummary {
        MetricsSummary {
            sample_count: self.len(),
            success_rate: self.success_rate(last_n),
            avg_load_time_ms: self.avg_load_time(last_n).as_millis() as u64,
        }
    }
}

impl Default for MetricsStore {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Aggregated view of the rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    /// Samples currently in the window.
    pub sample_count: usize,
    /// Success rate over the summarized span.
    pub success_rate: f64,
    /// Average load time over the summarized span, in milliseconds.
    pub avg_load_time_ms: u64,
}
