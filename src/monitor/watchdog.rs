//! Stuck-state detection and terminal-failure requeue.

use crate::core::{FailureRecord, LoadStatus, ResourceId};
use crate::metrics::{MetricsSample, MetricsStore};
use crate::registry::ResourceRegistry;
use crate::retry::RetryPolicy;

use std::time::Duration;

/// Failure kind recorded when the watchdog resets a stuck resource.
pub const STUCK_RESET_KIND: &str = "stuck-reset";

/// Watchdog thresholds.
#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    /// How often the monitor loop ticks.
    pub tick_interval: Duration,
    /// How long a resource may sit in `Loading` before it is considered
    /// stuck.
    pub stuck_threshold: Duration,
    /// Minimum time since the last attempt before a terminal failure may
    /// be requeued.
    pub requeue_cooldown: Duration,
    /// Upper bound on requeues per tick; keeps a broken page from
    /// thrashing the pipeline.
    pub max_requeues_per_tick: usize,
    /// Total attempts after which a resource is left in its terminal
    /// state permanently.
    pub max_total_attempts: u32,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(5),
            stuck_threshold: Duration::from_secs(30),
            requeue_cooldown: Duration::from_secs(10),
            max_requeues_per_tick: 2,
            max_total_attempts: 6,
        }
    }
}

impl WatchdogConfig {
    /// Creates a configuration with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Sets the stuck threshold.
    pub fn with_stuck_threshold(mut self, threshold: Duration) -> Self {
        self.stuck_threshold = threshold;
        self
    }

    /// Sets the requeue cooldown.
    pub fn with_requeue_cooldown(mut self, cooldown: Duration) -> Self {
        self.requeue_cooldown = cooldown;
        self
    }

    /// Sets the per-tick requeue bound.
    pub fn with_max_requeues_per_tick(mut self, max: usize) -> Self {
        self.max_requeues_per_tick = max;
        self
    }

    /// Sets the lifetime attempt bound.
    pub fn with_max_total_attempts(mut self, max: u32) -> Self {
        self.max_total_attempts = max.max(1);
        self
    }
}

/// What one watchdog tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Resources reset out of a stuck `Loading` state.
    pub reset: Vec<ResourceId>,
    /// Terminal failures returned to `Discovered` for another attempt.
    pub requeued: Vec<ResourceId>,
}

impl TickOutcome {
    /// Returns `true` if the tick changed nothing.
    pub fn is_empty(&self) -> bool {
        self.reset.is_empty() && self.requeued.is_empty()
    }
}

/// Periodic health check over the registry.
///
/// Each tick resets resources stuck in `Loading` without a live pipeline
/// execution, requeues a bounded number of cooled-down terminal failures
/// (highest priority first), and records an aggregate sample of the
/// resolved outcomes into the metrics store so the adaptive controller
/// keeps a signal even between load waves.
#[derive(Debug, Default)]
pub struct HealthMonitor {
    config: WatchdogConfig,
}

impl HealthMonitor {
    /// Creates a monitor with the given thresholds.
    pub fn new(config: WatchdogConfig) -> Self {
        Self { config }
    }

    /// Creates a monitor with default thresholds.
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// The monitor's thresholds.
    pub fn config(&self) -> &WatchdogConfig {
        &self.config
    }

    /// Runs one health check pass.
    pub fn tick(
        &self,
        registry: &mut ResourceRegistry,
        retry: &RetryPolicy,
        metrics: &mut MetricsStore,
    ) -> TickOutcome {
        let mut outcome = TickOutcome {
            reset: self.reset_stuck(registry, retry),
            requeued: Vec::new(),
        };
        outcome.requeued = self.requeue_failures(registry, retry);

        if !outcome.is_empty() {
            tracing::info!(
                target: "embedbridge::events",
                reset = outcome.reset.len(),
                requeued = outcome.requeued.len(),
                "Watchdog tick intervened"
            );
        }
        self.record_health_sample(registry, metrics);

        outcome
    }

    /// Feeds the resolved success counts to the metrics store as one
    /// aggregate sample. The sample carries the window's current average
    /// load time so it leaves that figure undisturbed.
    fn record_health_sample(&self, registry: &ResourceRegistry, metrics: &mut MetricsStore) {
        let counts = registry.counts();
        let avg_load_time = metrics.avg_load_time(metrics.len());
        metrics.record(MetricsSample::new(
            counts.loaded as u64,
            (counts.failed + counts.blocked) as u64,
            avg_load_time,
        ));
        tracing::debug!(
            target: "embedbridge::events",
            resolved_success_rate = registry.resolved_success_rate(),
            in_flight = registry.in_flight(),
            "Watchdog health check"
        );
    }

    /// Resets resources stuck in `Loading` with no live execution.
    ///
    /// A claimed resource is left alone: its pipeline is still polling and
    /// the verification timeout bounds it. An unclaimed `Loading` record
    /// means an execution died without resolving; the stuck reset is the
    /// only path back.
    fn reset_stuck(&self, registry: &mut ResourceRegistry, retry: &RetryPolicy) -> Vec<ResourceId> {
        let stuck: Vec<ResourceId> = registry
            .iter()
            .filter(|r| {
                r.status == LoadStatus::Loading
                    && !registry.is_processing(&r.id)
                    && r.loading_elapsed()
                        .is_some_and(|elapsed| elapsed >= self.config.stuck_threshold)
            })
            .map(|r| r.id.clone())
            .collect();

        for id in &stuck {
            if let Some(resource) = registry.get_mut(id) {
                let elapsed_ms = resource
                    .loading_elapsed()
                    .map(|e| e.as_millis() as u64)
                    .unwrap_or(0);
                resource.record_failure(
                    FailureRecord::new(
                        STUCK_RESET_KIND,
                        format!("loading for {elapsed_ms}ms with no live execution"),
                    ),
                    LoadStatus::Failed,
                );
                retry.clear(id);
                tracing::warn!(
                    target: "embedbridge::events",
                    resource_id = %id,
                    elapsed_ms,
                    "Stuck resource reset"
                );
            }
        }
        stuck
    }

    /// Requeues cooled-down terminal failures, highest priority first.
    fn requeue_failures(
        &self,
        registry: &mut ResourceRegistry,
        retry: &RetryPolicy,
    ) -> Vec<ResourceId> {
        let mut eligible: Vec<(f64, ResourceId)> = registry
            .iter()
            .filter(|r| {
                r.status.is_terminal_failure()
                    && r.attempts < self.config.max_total_attempts
                    && r.last_attempt_at
                        .map(|at| at.elapsed() >= self.config.requeue_cooldown)
                        .unwrap_or(true)
            })
            .map(|r| (r.priority, r.id.clone()))
            .collect();

        eligible.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        eligible.truncate(self.config.max_requeues_per_tick);

        let requeued: Vec<ResourceId> = eligible.into_iter().map(|(_, id)| id).collect();
        for id in &requeued {
            if let Some(resource) = registry.get_mut(id) {
                resource.status = LoadStatus::Discovered;
                retry.clear(id);
                tracing::debug!(
                    target: "embedbridge::events",
                    resource_id = %id,
                    attempts = resource.attempts,
                    "Terminal failure requeued for another attempt"
                );
            }
        }
        requeued
    }
}
