//! Circuit breaker implementation.

use crate::circuit_breaker::config::BreakerConfig;
use crate::circuit_breaker::state::{BreakerMetrics, BreakerState};

use std::sync::RwLock;
use std::time::Instant;

/// A shared circuit breaker: one instance guards one external endpoint.
///
/// All state transitions happen synchronously inside `allow_request`,
/// `record_success`, and `record_failure`; callers hold no locks across
/// suspension points.
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Current state of the circuit.
    state: RwLock<BreakerState>,
    /// Configuration.
    config: BreakerConfig,
    /// Metrics.
    metrics: RwLock<BreakerMetrics>,
}

impl CircuitBreaker {
    /// Creates a new circuit breaker with the given configuration.
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            state: RwLock::new(BreakerState::closed()),
            config,
            metrics: RwLock::new(BreakerMetrics::new()),
        }
    }

    /// Creates a new circuit breaker with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(BreakerConfig::default())
    }

    /// Returns the current state of the circuit breaker.
    pub fn state(&self) -> BreakerState {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Returns a copy of the current metrics.
    pub fn metrics(&self) -> BreakerMetrics {
        self.metrics
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Decides whether a request may proceed.
    ///
    /// In the open state this transitions to half-open once the cooldown
    /// has elapsed and admits a single trial request; further callers are
    /// rejected until the trial resolves.
    pub fn allow_request(&self) -> bool {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();

        let allowed = match &*state {
            BreakerState::Closed { .. } => true,

            BreakerState::Open { until, .. } => {
                if now >= *until {
                    *state = BreakerState::HalfOpen { probe_count: 1 };
                    true
                } else {
                    false
                }
            }

            BreakerState::HalfOpen { probe_count } => {
                if *probe_count < self.config.half_open_max_probes {
                    *state = BreakerState::HalfOpen {
                        probe_count: probe_count + 1,
                    };
                    true
                } else {
                    false
                }
            }
        };

        if !allowed {
            self.metrics
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .record_rejected();
        }
        allowed
    }

    /// Records a successful request.
    ///
    /// In half-open this closes the circuit and resets the failure count.
    pub fn record_success(&self) {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.metrics
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .record_success();

        match &*state {
            BreakerState::Closed { .. } => {
                // Any success resets the consecutive failure count.
                *state = BreakerState::closed();
            }

            BreakerState::HalfOpen { .. } => {
                *state = BreakerState::closed();
                self.metrics
                    .write()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .record_closed();
                tracing::info!(target: "embedbridge::events", "Circuit breaker closed after successful trial");
            }

            BreakerState::Open { .. } => {
                // A late completion from before the circuit opened; ignored.
            }
        }
    }

    /// Records a failed request.
    ///
    /// In closed state this counts toward the failure threshold; in
    /// half-open any failure reopens the circuit with a refreshed
    /// failure timestamp.
    pub fn record_failure(&self) {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.metrics
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .record_failure();

        match &*state {
            BreakerState::Closed { failure_count } => {
                let new_count = failure_count + 1;
                if new_count >= self.config.failure_threshold {
                    *state = self.opened_state();
                    self.metrics
                        .write()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .record_opened();
                    tracing::warn!(
                        target: "embedbridge::events",
                        failures = new_count,
                        cooldown_ms = self.config.cooldown.as_millis() as u64,
                        "Circuit breaker opened"
                    );
                } else {
                    *state = BreakerState::Closed {
                        failure_count: new_count,
                    };
                }
            }

            BreakerState::HalfOpen { .. } => {
                *state = self.opened_state();
                self.metrics
                    .write()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .record_opened();
                tracing::warn!(target: "embedbridge::events", "Circuit breaker reopened after failed trial");
            }

            BreakerState::Open { .. } => {
                // Already open; nothing to do.
            }
        }
    }

    /// Forces the circuit into the open state.
    pub fn force_open(&self) {
        *self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = self.opened_state();
        self.metrics
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .record_opened();
    }

    /// Resets the circuit to closed with zeroed failure count.
    ///
    /// Used by the explicit network-recovery event.
    pub fn reset(&self) {
        *self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = BreakerState::closed();
    }

    fn opened_state(&self) -> BreakerState {
        let now = Instant::now();
        BreakerState::Open {
            last_failure_at: now,
            until: now + self.config.cooldown,
        }
    }
}
