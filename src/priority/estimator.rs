//! The default weighted priority estimator.

use crate::core::{BehaviorSignals, GeometrySnapshot, NetworkQuality};

use std::fmt::Debug;
use std::time::Duration;

/// Lower bound of the priority range.
pub const MIN_PRIORITY: f64 = 0.0;

/// Upper bound of the priority range.
pub const MAX_PRIORITY: f64 = 200.0;

/// The complete input set for one priority estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityInputs {
    /// Vertical distance from the current scroll position to the element,
    /// in pixels.
    pub viewport_distance: f64,
    /// Element area in square pixels.
    pub area: f64,
    /// Fraction of the element inside the viewport, `[0, 1]`.
    pub visibility_ratio: f64,
    /// Current vertical scroll position in pixels.
    pub scroll_position: f64,
    /// Time since the page session started.
    pub time_on_page: Duration,
    /// Current network quality.
    pub network_quality: NetworkQuality,
    /// Logical processor count.
    pub device_concurrency: u32,
    /// Failures previously recorded for this resource.
    pub prior_failures: u32,
    /// Resources currently mid-load engine-wide.
    pub in_flight: usize,
    /// Engagement score, `[0, 100]`.
    pub engagement_score: u8,
}

impl PriorityInputs {
    /// Assembles inputs from a geometry snapshot, the behavior signal
    /// source, and per-resource counters.
    pub fn gather(
        geometry: &GeometrySnapshot,
        signals: &dyn BehaviorSignals,
        prior_failures: u32,
        in_flight: usize,
    ) -> Self {
        let scroll = signals.scroll_position();
        Self {
            viewport_distance: geometry.rect.distance_from_scroll(scroll),
            area: geometry.rect.area(),
            visibility_ratio: geometry.visibility_ratio,
            scroll_position: scroll,
            time_on_page: signals.time_on_page(),
            network_quality: signals.network_quality(),
            device_concurrency: signals.device_concurrency(),
            prior_failures,
            in_flight,
            engagement_score: signals.engagement_score(),
        }
    }
}

/// A pluggable priority scoring strategy.
///
/// Implementations must be deterministic and side-effect-free: the engine
/// relies on re-estimating a resource producing the same score for the
/// same inputs.
pub trait PriorityEstimator: Send + Sync + Debug {
    /// Computes a priority in `[MIN_PRIORITY, MAX_PRIORITY]`.
    fn estimate(&self, inputs: &PriorityInputs) -> f64;
}

/// The default estimator: a weighted linear combination squashed through
/// `tanh` and mapped onto the priority range.
///
/// Weights are plain constants; there is nothing learned or random here.
#[derive(Debug, Clone)]
pub struct WeightedEstimator {
    /// Weight of viewport visibility.
    pub visibility_weight: f64,
    /// Penalty per 1000px of viewport distance.
    pub distance_weight: f64,
    /// Weight of element area (normalized against a full-width banner).
    pub area_weight: f64,
    /// Weight of the engagement score.
    pub engagement_weight: f64,
    /// Weight of network quality.
    pub network_weight: f64,
    /// Penalty per prior failure.
    pub failure_penalty: f64,
    /// Penalty per currently in-flight load.
    pub congestion_penalty: f64,
}

impl Default for WeightedEstimator {
    fn default() -> Self {
        Self {
            visibility_weight: 60.0,
            distance_weight: 25.0,
            area_weight: 20.0,
            engagement_weight: 15.0,
            network_weight: 20.0,
            failure_penalty: 12.0,
            congestion_penalty: 5.0,
        }
    }
}

impl WeightedEstimator {
    /// Creates the default estimator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference area used to normalize element size: a 970x250 billboard.
    const REFERENCE_AREA: f64 = 970.0 * 250.0;
}

impl PriorityEstimator for WeightedEstimator {
    fn estimate(&self, inputs: &PriorityInputs) -> f64 {
        let visibility = inputs.visibility_ratio * self.visibility_weight;

        let distance_penalty =
            (inputs.viewport_distance / 1000.0).min(3.0) * self.distance_weight;

        let area = (inputs.area / Self::REFERENCE_AREA).min(1.5) * self.area_weight;

        let engagement = f64::from(inputs.engagement_score) / 100.0 * self.engagement_weight;

        let network = inputs.network_quality.factor() * self.network_weight;

        // Long-dwelling sessions favor below-the-fold content slightly.
        let dwell = (inputs.time_on_page.as_secs_f64() / 60.0).min(1.0) * 5.0;

        let concurrency_headroom = f64::from(inputs.device_concurrency.min(16)) / 16.0 * 5.0;

        let failures = f64::from(inputs.prior_failures) * self.failure_penalty;
        let congestion = inputs.in_flight as f64 * self.congestion_penalty;

        let raw = visibility + area + engagement + network + dwell + concurrency_headroom
            - distance_penalty
            - failures
            - congestion;

        // Squash into (-1, 1), then map onto [MIN_PRIORITY, MAX_PRIORITY].
        let squashed = (raw / 60.0).tanh();
        let score = (MAX_PRIORITY - MIN_PRIORITY) / 2.0 * (squashed + 1.0) + MIN_PRIORITY;
        score.clamp(MIN_PRIORITY, MAX_PRIORITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Rect, StaticSignals};

    fn base_inputs() -> PriorityInputs {
        PriorityInputs {
            viewport_distance: 400.0,
            area: 300.0 * 250.0,
            visibility_ratio: 0.5,
            scroll_position: 100.0,
            time_on_page: Duration::from_secs(30),
            network_quality: NetworkQuality::Fast,
            device_concurrency: 8,
            prior_failures: 0,
            in_flight: 0,
            engagement_score: 60,
        }
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let estimator = WeightedEstimator::new();
        let inputs = base_inputs();
        let first = estimator.estimate(&inputs);
        let second = estimator.estimate(&inputs);
        assert_eq!(first, second);
    }

    #[test]
    fn test_estimate_stays_in_range() {
        let estimator = WeightedEstimator::new();

        let mut extreme_high = base_inputs();
        extreme_high.visibility_ratio = 1.0;
        extreme_high.viewport_distance = 0.0;
        extreme_high.area = 1e9;
        extreme_high.engagement_score = 100;
        let high = estimator.estimate(&extreme_high);
        assert!(high <= MAX_PRIORITY);

        let mut extreme_low = base_inputs();
        extreme_low.visibility_ratio = 0.0;
        extreme_low.viewport_distance = 1e6;
        extreme_low.prior_failures = 50;
        extreme_low.in_flight = 100;
        extreme_low.network_quality = NetworkQuality::Offline;
        let low = estimator.estimate(&extreme_low);
        assert!(low >= MIN_PRIORITY);
    }

    #[test]
    fn test_visible_outranks_distant() {
        let estimator = WeightedEstimator::new();

        let mut visible = base_inputs();
        visible.visibility_ratio = 1.0;
        visible.viewport_distance = 0.0;

        let mut distant = base_inputs();
        distant.visibility_ratio = 0.0;
        distant.viewport_distance = 3000.0;

        assert!(estimator.estimate(&visible) > estimator.estimate(&distant));
    }

    #[test]
    fn test_failures_lower_priority() {
        let estimator = WeightedEstimator::new();

        let clean = base_inputs();
        let mut failing = base_inputs();
        failing.prior_failures = 3;

        assert!(estimator.estimate(&clean) > estimator.estimate(&failing));
    }

    #[test]
    fn test_gather_from_signals() {
        let signals = StaticSignals::new().with_scroll(500.0).with_engagement(80);
        let geometry = GeometrySnapshot::new(Rect::new(900.0, 0.0, 300.0, 250.0), 0.3);

        let inputs = PriorityInputs::gather(&geometry, &signals, 1, 2);
        assert_eq!(inputs.viewport_distance, 400.0);
        assert_eq!(inputs.engagement_score, 80);
        assert_eq!(inputs.prior_failures, 1);
        assert_eq!(inputs.in_flight, 2);
    }
}
