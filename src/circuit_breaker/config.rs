//! Circuit breaker configuration.

use std::time::Duration;

/// Configuration for the circuit breaker.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures before opening the circuit.
    pub failure_threshold: u32,

    /// How long to keep the circuit open before allowing a trial request.
    pub cooldown: Duration,

    /// Maximum concurrent trial requests in the half-open state.
    pub half_open_max_probes: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
            half_open_max_probes: 1,
        }
    }
}

impl BreakerConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the failure threshold.
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// Sets the cooldown.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Sets the maximum number of half-open probes.
    pub fn with_half_open_max_probes(mut self, max: u32) -> Self {
        self.half_open_max_probes = max.max(1);
        self
    }

    /// A configuration that trips quickly and recovers slowly.
    ///
    /// Suited to endpoints where repeated failed fetches are costly
    /// (e.g. metered mobile connections).
    pub fn strict() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(60),
            half_open_max_probes: 1,
        }
    }

    /// A configuration that tolerates more failures and probes eagerly.
    pub fn high_availability() -> Self {
        Self {
            failure_threshold: 10,
            cooldown: Duration::from_secs(10),
            half_open_max_probes: 3,
        }
    }
}
