//! Retry decision logic and per-resource retry state.

use crate::core::{LoadError, ResourceId};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Golden-ratio conjugate; successive multiples mod 1 are maximally
/// spread over [0, 1).
const GOLDEN: f64 = 0.618_033_988_749_895;

/// Geometric decay applied to the gate per prior attempt.
const ATTEMPT_PENALTY_DECAY: f64 = 0.8;

/// Per-resource retry bookkeeping, inspectable by the health monitor.
#[derive(Debug, Clone)]
pub struct RetryState {
    /// Attempts recorded so far.
    pub attempts: u32,
    /// Kind of the most recent error.
    pub last_error_kind: &'static str,
    /// When the most recent attempt failed.
    pub last_failure_at: Instant,
}

/// Engine-wide inputs to one retry decision.
#[derive(Debug, Clone, Copy)]
pub struct RetryContext {
    /// Current maximum attempts from the adaptive configuration.
    pub max_retries: u32,
    /// Rolling success rate from the metrics window, `[0, 1]`.
    pub success_rate: f64,
    /// Engagement score, `[0, 100]`.
    pub engagement_score: u8,
}

/// Decides, per failed resource, whether and when to retry.
#[derive(Debug, Default)]
pub struct RetryPolicy {
    states: RwLock<HashMap<ResourceId, RetryState>>,
    draws: AtomicU64,
}

impl RetryPolicy {
    /// Creates a new retry policy with empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failed attempt for the given resource.
    pub fn record_failure(&self, id: &ResourceId, error: &LoadError) {
        let mut states = self
            .states
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = states.entry(id.clone()).or_insert(RetryState {
            attempts: 0,
            last_error_kind: error.kind(),
            last_failure_at: Instant::now(),
        });
        entry.attempts += 1;
        entry.last_error_kind = error.kind();
        entry.last_failure_at = Instant::now();
    }

    /// Returns the recorded state for a resource, if any.
    pub fn state_of(&self, id: &ResourceId) -> Option<RetryState> {
        self.states
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(id)
            .cloned()
    }

    /// Clears retry state after a successful load or a watchdog reset.
    pub fn clear(&self, id: &ResourceId) {
        self.states
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(id);
    }

    /// Decides whether the given resource should be retried after `error`.
    ///
    /// Eligibility requires `attempts < max_retries` AND passing the
    /// probability gate `p = severity × attempt_penalty + success_bonus +
    /// engagement_bonus` against the next deterministic draw. Errors with
    /// zero severity (cancellation, configuration) are never retried.
    pub fn should_retry(&self, id: &ResourceId, error: &LoadError, ctx: &RetryContext) -> bool {
        let attempts = self.state_of(id).map(|s| s.attempts).unwrap_or(0);
        if attempts >= ctx.max_retries {
            return false;
        }

        let severity = error.severity();
        if severity == 0.0 {
            return false;
        }

        let attempt_penalty = ATTEMPT_PENALTY_DECAY.powi(attempts as i32);
        let success_bonus = ctx.success_rate.clamp(0.0, 1.0) * 0.15;
        let engagement_bonus = f64::from(ctx.engagement_score.min(100)) / 100.0 * 0.1;

        let p = (severity * attempt_penalty + success_bonus + engagement_bonus).min(1.0);
        self.next_draw() < p
    }

    /// Computes the delay before the next attempt.
    ///
    /// `base × backoff_factor^attempt × jitter × adjustment`, capped at
    /// `max`. Jitter is a multiplier in `[0.75, 1.25)`.
    pub fn next_delay(
        &self,
        attempt: u32,
        base: Duration,
        backoff_factor: f64,
        adjustment: f64,
        max: Duration,
    ) -> Duration {
        let backoff = backoff_factor.max(1.0).powi(attempt.min(16) as i32);
        let jitter = 0.75 + self.next_draw() * 0.5;
        let millis = base.as_millis() as f64 * backoff * jitter * adjustment.max(0.0);
        let capped = millis.min(max.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Next value of the deterministic low-discrepancy sequence, in [0, 1).
    fn next_draw(&self) -> f64 {
        let n = self.draws.fetch_add(1, Ordering::Relaxed) + 1;
        (n as f64 * GOLDEN).fract()
    }
}
