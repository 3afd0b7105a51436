//! Circuit breaker state machine.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// The current state of the circuit breaker.
#[derive(Debug, Clone)]
pub enum BreakerState {
    /// Circuit is closed; requests pass through normally.
    Closed {
        /// Number of consecutive failures.
        failure_count: u32,
    },

    /// Circuit is open; requests are rejected.
    Open {
        /// When the circuit was opened (refreshed on half-open failure).
        last_failure_at: Instant,
        /// When the circuit may transition to half-open.
        until: Instant,
    },

    /// Circuit is half-open; a bounded number of trial requests allowed.
    HalfOpen {
        /// Trial requests currently allowed through.
        probe_count: u32,
    },
}

impl BreakerState {
    /// Creates a new closed state.
    pub fn closed() -> Self {
        Self::Closed { failure_count: 0 }
    }

    /// Returns `true` if the circuit is closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }

    /// Returns `true` if the circuit is open.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    /// Returns `true` if the circuit is half-open.
    pub fn is_half_open(&self) -> bool {
        matches!(self, Self::HalfOpen { .. })
    }

    /// Returns the consecutive failure count if closed.
    pub fn failure_count(&self) -> Option<u32> {
        match self {
            Self::Closed { failure_count } => Some(*failure_count),
            _ => None,
        }
    }

    /// Returns the name of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Closed { .. } => "closed",
            Self::Open { .. } => "open",
            Self::HalfOpen { .. } => "half_open",
        }
    }
}

impl Default for BreakerState {
    fn default() -> Self {
        Self::closed()
    }
}

/// Counters describing circuit breaker behavior over the session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BreakerMetrics {
    /// Total requests that consulted the breaker.
    pub total_requests: u64,
    /// Requests recorded as successful.
    pub successful_requests: u64,
    /// Requests recorded as failed.
    pub failed_requests: u64,
    /// Requests rejected because the circuit was open.
    pub rejected_requests: u64,
    /// Times the circuit has opened.
    pub times_opened: u64,
    /// Times the circuit has closed from half-open.
    pub times_closed: u64,
}

impl BreakerMetrics {
    /// Creates new empty metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful request.
    pub fn record_success(&mut self) {
        self.total_requests += 1;
        self.successful_requests += 1;
    }

    /// Records a failed request.
    pub fn record_failure(&mut self) {
        self.total_requests += 1;
        self.failed_requests += 1;
    }

    /// Records a rejected request.
    pub fn record_rejected(&mut self) {
        self.total_requests += 1;
        self.rejected_requests += 1;
    }

    /// Records that the circuit opened.
    pub fn record_opened(&mut self) {
        self.times_opened += 1;
    }

    /// Records that the circuit closed.
    pub fn record_closed(&mut self) {
        self.times_closed += 1;
    }

    /// Returns the success rate (0.0 to 1.0).
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 1.0;
        }
        self.successful_requests as f64 / self.total_requests as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breaker_state_default() {
        let state = BreakerState::default();
        assert!(state.is_closed());
        assert_eq!(state.failure_count(), Some(0));
    }

    #[test]
    fn test_breaker_state_names() {
        assert_eq!(BreakerState::closed().name(), "closed");
        assert_eq!(
            BreakerState::Open {
                last_failure_at: Instant::now(),
                until: Instant::now(),
            }
            .name(),
            "open"
        );
        assert_eq!(BreakerState::HalfOpen { probe_count: 0 }.name(), "half_open");
    }

    #[test]
    fn test_metrics() {
        let mut metrics = BreakerMetrics::new();
        assert_eq!(metrics.success_rate(), 1.0);

        metrics.record_success();
        metrics.record_success();
        metrics.record_failure();

        assert_eq!(metrics.total_requests, 3);
        assert_eq!(metrics.successful_requests, 2);
        assert_eq!(metrics.failed_requests, 1);
        assert!((metrics.success_rate() - 0.666).abs() < 0.01);
    }
}
