//! Feedback control over the adaptive configuration.

use crate::config::{AdaptiveConfig, ConfigSnapshot};
use crate::metrics::MetricsStore;

use std::time::Duration;

/// Controller thresholds and nudge sizes.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// How often the controller loop ticks.
    pub tick_interval: Duration,
    /// Samples consulted per decision.
    pub window: usize,
    /// Minimum samples before the controller reacts at all.
    pub min_samples: usize,
    /// Success rate below which the configuration shifts defensive.
    pub target_success_rate: f64,
    /// Average load time above which the batch size is reduced.
    pub critical_load_time: Duration,
    /// Added to the retry interval (milliseconds) per defensive nudge.
    pub interval_step_ms: f64,
    /// Added to the backoff adjustment factor per defensive nudge.
    pub adjustment_step: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(10),
            window: 20,
            min_samples: 5,
            target_success_rate: 0.85,
            critical_load_time: Duration::from_secs(5),
            interval_step_ms: 250.0,
            adjustment_step: 0.25,
        }
    }
}

impl ControllerConfig {
    /// Creates a configuration with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Sets the minimum sample count.
    pub fn with_min_samples(mut self, min: usize) -> Self {
        self.min_samples = min;
        self
    }

    /// Sets the target success rate, clamped to `[0, 1]`.
    pub fn with_target_success_rate(mut self, target: f64) -> Self {
        self.target_success_rate = target.clamp(0.0, 1.0);
        self
    }

    /// Sets the critical average load time.
    pub fn with_critical_load_time(mut self, critical: Duration) -> Self {
        self.critical_load_time = critical;
        self
    }
}

/// One parameter change made by the controller, for telemetry.
#[derive(Debug, Clone, PartialEq)]
pub struct Adjustment {
    /// Parameter name as accepted by [`AdaptiveConfig::set`].
    pub parameter: &'static str,
    /// Value before the change.
    pub from: f64,
    /// Value after the change.
    pub to: f64,
}

/// Tunes the adaptive configuration from rolling load outcomes.
///
/// Under sustained failure the controller shifts defensive: more retries,
/// longer intervals, stretched backoff. Once outcomes recover it relaxes
/// each parameter back toward its baseline, never past it, so transient
/// bad patches do not permanently degrade responsiveness.
#[derive(Debug)]
pub struct AdaptiveController {
    config: ControllerConfig,
    baseline: ConfigSnapshot,
}

impl AdaptiveController {
    /// Creates a controller that relaxes toward the given baseline.
    pub fn new(config: ControllerConfig, baseline: ConfigSnapshot) -> Self {
        Self { config, baseline }
    }

    /// Creates a controller with default thresholds and the default
    /// configuration as baseline.
    pub fn with_defaults() -> Self {
        Self::new(ControllerConfig::default(), AdaptiveConfig::default().snapshot())
    }

    /// The controller's thresholds.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Runs one control pass, mutating `config` in place.
    ///
    /// Returns the adjustments made, empty when the window is too small
    /// or the configuration is already where the controller wants it.
    pub fn tick(&self, metrics: &MetricsStore, config: &mut AdaptiveConfig) -> Vec<Adjustment> {
        if metrics.len() < self.config.min_samples {
            return Vec::new();
        }

        let success_rate = metrics.success_rate(self.config.window);
        let avg_load_time = metrics.avg_load_time(self.config.window);
        let mut adjustments = Vec::new();

        if success_rate < self.config.target_success_rate {
            self.nudge_toward(
                &mut adjustments,
                config,
                "max_retries",
                config.max_retries.current() + 1.0,
            );
            self.nudge_toward(
                &mut adjustments,
                config,
                "retry_interval_ms",
                config.retry_interval_ms.current() + self.config.interval_step_ms,
            );
            self.nudge_toward(
                &mut adjustments,
                config,
                "adjustment_factor",
                config.adjustment_factor.current() + self.config.adjustment_step,
            );
        } else {
            // Healthy: relax toward baseline, never past it.
            self.relax(&mut adjustments, config, "max_retries", -1.0);
            self.relax(
                &mut adjustments,
                config,
                "retry_interval_ms",
                -self.config.interval_step_ms,
            );
            self.relax(
                &mut adjustments,
                config,
                "adjustment_factor",
                -self.config.adjustment_step,
            );
        }

        if avg_load_time > self.config.critical_load_time {
            self.nudge_toward(
                &mut adjustments,
                config,
                "batch_size",
                config.batch_size.current() - 1.0,
            );
        } else if success_rate >= self.config.target_success_rate {
            self.relax(&mut adjustments, config, "batch_size", 1.0);
        }

        if !adjustments.is_empty() {
            tracing::info!(
                target: "embedbridge::events",
                success_rate,
                avg_load_time_ms = avg_load_time.as_millis() as u64,
                changed = adjustments.len(),
                "Adaptive configuration adjusted"
            );
        }
        adjustments
    }

    /// Sets a parameter to `target` (clamped by its bounds), recording the
    /// change if the value actually moved.
    fn nudge_toward(
        &self,
        adjustments: &mut Vec<Adjustment>,
        config: &mut AdaptiveConfig,
        parameter: &'static str,
        target: f64,
    ) {
        let param = match parameter {
            "max_retries" => &mut config.max_retries,
            "retry_interval_ms" => &mut config.retry_interval_ms,
            "batch_size" => &mut config.batch_size,
            "adjustment_factor" => &mut config.adjustment_factor,
            _ => return,
        };
        let from = param.current();
        param.set(target);
        let to = param.current();
        if (to - from).abs() > f64::EPSILON {
            adjustments.push(Adjustment {
                parameter,
                from,
                to,
            });
        }
    }

    /// Moves a parameter one step back toward its baseline value.
    fn relax(
        &self,
        adjustments: &mut Vec<Adjustment>,
        config: &mut AdaptiveConfig,
        parameter: &'static str,
        step: f64,
    ) {
        let baseline = match parameter {
            "max_retries" => self.baseline.max_retries as f64,
            "retry_interval_ms" => self.baseline.retry_interval_ms as f64,
            "batch_size" => self.baseline.batch_size as f64,
            "adjustment_factor" => self.baseline.adjustment_factor,
            _ => return,
        };
        let current = match parameter {
            "max_retries" => config.max_retries.current(),
            "retry_interval_ms" => config.retry_interval_ms.current(),
            "batch_size" => config.batch_size.current(),
            "adjustment_factor" => config.adjustment_factor.current(),
            _ => return,
        };

        let target = if step < 0.0 {
            (current + step).max(baseline)
        } else {
            (current + step).min(baseline)
        };
        if (target - current).abs() > f64::EPSILON {
            self.nudge_toward(adjustments, config, parameter, target);
        }
    }
}

impl Default for AdaptiveController {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsSample;

    fn metrics_with(successes: usize, failures: usize) -> MetricsStore {
        let mut metrics = MetricsStore::default();
        for _ in 0..successes {
            metrics.record(MetricsSample::success(Duration::from_millis(200)));
        }
        for _ in 0..failures {
            metrics.record(MetricsSample::failure());
        }
        metrics
    }

    #[test]
    fn test_too_few_samples_is_noop() {
        let controller = AdaptiveController::with_defaults();
        let mut config = AdaptiveConfig::default();
        let metrics = metrics_with(1, 1);

        assert!(controller.tick(&metrics, &mut config).is_empty());
        assert_eq!(config, AdaptiveConfig::default());
    }

    #[test]
    fn test_sustained_failure_shifts_defensive() {
        let controller = AdaptiveController::with_defaults();
        let mut config = AdaptiveConfig::default();
        let metrics = metrics_with(2, 10);

        let adjustments = controller.tick(&metrics, &mut config);
        assert!(!adjustments.is_empty());
        assert_eq!(config.max_retries(), 4);
        assert_eq!(config.retry_interval(), Duration::from_millis(1_250));
        assert!(config.adjustment_factor() > 1.0);
    }

    #[test]
    fn test_defensive_shift_respects_bounds() {
        let controller = AdaptiveController::with_defaults();
        let mut config = AdaptiveConfig::default();
        let metrics = metrics_with(0, 10);

        for _ in 0..50 {
            controller.tick(&metrics, &mut config);
        }
        assert_eq!(config.max_retries(), 8);
        assert!(config.adjustment_factor() <= 3.0);
        assert!(config.retry_interval() <= Duration::from_millis(30_000));
    }

    #[test]
    fn test_recovery_relaxes_toward_baseline() {
        let controller = AdaptiveController::with_defaults();
        let mut config = AdaptiveConfig::default();

        let bad = metrics_with(0, 10);
        for _ in 0..4 {
            controller.tick(&bad, &mut config);
        }
        assert!(config.max_retries() > 3);

        let good = metrics_with(20, 0);
        for _ in 0..20 {
            controller.tick(&good, &mut config);
        }
        assert_eq!(config.max_retries(), 3);
        assert_eq!(config.retry_interval(), Duration::from_millis(1_000));
        assert!((config.adjustment_factor() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_relax_never_passes_baseline() {
        let controller = AdaptiveController::with_defaults();
        let mut config = AdaptiveConfig::default();
        let good = metrics_with(20, 0);

        for _ in 0..10 {
            controller.tick(&good, &mut config);
        }
        assert_eq!(config, AdaptiveConfig::default());
    }

    #[test]
    fn test_slow_loads_shrink_batch() {
        let controller = AdaptiveController::with_defaults();
        let mut config = AdaptiveConfig::default();

        let mut metrics = MetricsStore::default();
        for _ in 0..10 {
            metrics.record(MetricsSample::success(Duration::from_secs(8)));
        }

        let adjustments = controller.tick(&metrics, &mut config);
        assert_eq!(config.batch_size(), 2);
        assert!(adjustments.iter().any(|a| a.parameter == "batch_size"));
    }

    #[test]
    fn test_batch_recovers_after_fast_loads() {
        let controller = AdaptiveController::with_defaults();
        let mut config = AdaptiveConfig::default();

        let mut slow = MetricsStore::default();
        for _ in 0..10 {
            slow.record(MetricsSample::success(Duration::from_secs(8)));
        }
        controller.tick(&slow, &mut config);
        assert_eq!(config.batch_size(), 2);

        let fast = metrics_with(10, 0);
        controller.tick(&fast, &mut config);
        assert_eq!(config.batch_size(), 3);
    }

    #[test]
    fn test_adjustments_report_the_change() {
        let controller = AdaptiveController::with_defaults();
        let mut config = AdaptiveConfig::default();
        let metrics = metrics_with(0, 10);

        let adjustments = controller.tick(&metrics, &mut config);
        let retries = adjustments
            .iter()
            .find(|a| a.parameter == "max_retries")
            .unwrap();
        assert_eq!(retries.from, 3.0);
        assert_eq!(retries.to, 4.0);
    }
}
