//! Viewport-driven activation.

use crate::core::{BehaviorSignals, GeometrySnapshot, LoadStatus, ResourceId};
use crate::registry::ResourceRegistry;

use std::collections::HashSet;
use std::sync::RwLock;

/// Thresholds for lazy activation.
#[derive(Debug, Clone)]
pub struct TriggerConfig {
    /// Visibility ratio at which a watched resource activates.
    pub visibility_threshold: f64,
    /// Activation distance ahead of the viewport, in pixels; resources
    /// this close to the scroll position activate before becoming visible.
    pub proximity_margin: f64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: 0.25,
            proximity_margin: 800.0,
        }
    }
}

impl TriggerConfig {
    /// Creates a configuration with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the visibility threshold, clamped to `[0, 1]`.
    pub fn with_visibility_threshold(mut self, threshold: f64) -> Self {
        self.visibility_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Sets the proximity margin in pixels.
    pub fn with_proximity_margin(mut self, margin: f64) -> Self {
        self.proximity_margin = margin.max(0.0);
        self
    }
}

/// Watches idle resources and activates them when they approach the
/// viewport.
///
/// Activation is edge-triggered: once a resource crosses a threshold it is
/// removed from the watch set and reported exactly once. The health
/// monitor re-observes resources it requeues.
#[derive(Debug, Default)]
pub struct LazyTrigger {
    config: TriggerConfig,
    watched: RwLock<HashSet<ResourceId>>,
}

impl LazyTrigger {
    /// Creates a trigger with the given thresholds.
    pub fn new(config: TriggerConfig) -> Self {
        Self {
            config,
            watched: RwLock::new(HashSet::new()),
        }
    }

    /// Creates a trigger with default thresholds.
    pub fn with_defaults() -> Self {
        Self::new(TriggerConfig::default())
    }

    /// Starts watching a resource.
    pub fn observe(&self, id: ResourceId) {
        self.watched
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id);
    }

    /// Stops watching a resource without activating it.
    pub fn unobserve(&self, id: &ResourceId) {
        self.watched
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(id);
    }

    /// Returns `true` if the resource is being watched.
    pub fn is_watching(&self, id: &ResourceId) -> bool {
        self.watched
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(id)
    }

    /// Number of watched resources.
    pub fn watched_count(&self) -> usize {
        self.watched
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Evaluates all watched resources against current geometry.
    ///
    /// Refreshes each resource's geometry snapshot from its handle, moves
    /// crossers to `Triggered`, removes them from the watch set, and
    /// returns their ids for immediate pipeline submission. Detached or
    /// non-idle resources are silently dropped from the watch set.
    pub fn evaluate(
        &self,
        registry: &mut ResourceRegistry,
        signals: &dyn BehaviorSignals,
    ) -> Vec<ResourceId> {
        let scroll = signals.scroll_position();
        let mut activated = Vec::new();
        let mut dropped = Vec::new();

        let watched: Vec<ResourceId> = self
            .watched
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .cloned()
            .collect();

        for id in watched {
            let Some(resource) = registry.get_mut(&id) else {
                dropped.push(id);
                continue;
            };

            if !resource.status.is_idle() {
                dropped.push(id);
                continue;
            }
            if !resource.handle.is_attached() {
                dropped.push(id);
                continue;
            }

            let geometry =
                GeometrySnapshot::new(resource.handle.rect(), resource.handle.visibility_ratio());
            resource.geometry = geometry;

            let visible = geometry.visibility_ratio >= self.config.visibility_threshold;
            let near = geometry.rect.distance_from_scroll(scroll) <= self.config.proximity_margin;
            if visible || near {
                resource.status = LoadStatus::Triggered;
                activated.push(id);
            }
        }

        if !activated.is_empty() || !dropped.is_empty() {
            let mut watched = self
                .watched
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            for id in activated.iter().chain(dropped.iter()) {
                watched.remove(id);
            }
        }

        if !activated.is_empty() {
            tracing::debug!(
                target: "embedbridge::events",
                activated = activated.len(),
                scroll,
                "Lazy trigger activated resources"
            );
        }

        activated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GeometrySnapshot, Rect, Resource, StaticSignals};
    use crate::providers::mock::MockElement;
    use std::sync::Arc;

    fn insert(registry: &mut ResourceRegistry, id: &str, element: Arc<MockElement>) {
        registry.insert(Resource::new(
            ResourceId::from(id),
            element,
            GeometrySnapshot::default(),
            100.0,
        ));
    }

    #[test]
    fn test_visible_resource_activates_once() {
        let mut registry = ResourceRegistry::new();
        let element = Arc::new(
            MockElement::new("a")
                .with_rect(Rect::new(5_000.0, 0.0, 300.0, 250.0))
                .with_visibility(0.5),
        );
        insert(&mut registry, "a", element);

        let trigger = LazyTrigger::with_defaults();
        trigger.observe(ResourceId::from("a"));

        let signals = StaticSignals::new();
        let activated = trigger.evaluate(&mut registry, &signals);
        assert_eq!(activated, vec![ResourceId::from("a")]);
        assert_eq!(
            registry.get(&ResourceId::from("a")).unwrap().status,
            LoadStatus::Triggered
        );

        // Edge-triggered: a second pass reports nothing.
        assert!(trigger.evaluate(&mut registry, &signals).is_empty());
        assert_eq!(trigger.watched_count(), 0);
    }

    #[test]
    fn test_proximity_activates_before_visibility() {
        let mut registry = ResourceRegistry::new();
        let element = Arc::new(
            MockElement::new("a")
                .with_rect(Rect::new(1_500.0, 0.0, 300.0, 250.0))
                .with_visibility(0.0),
        );
        insert(&mut registry, "a", element);

        let trigger = LazyTrigger::with_defaults();
        trigger.observe(ResourceId::from("a"));

        // Scrolled to 900px: the element at 1500px is 600px ahead, inside
        // the 800px margin.
        let signals = StaticSignals::new().with_scroll(900.0);
        let activated = trigger.evaluate(&mut registry, &signals);
        assert_eq!(activated.len(), 1);
    }

    #[test]
    fn test_distant_resource_stays_watched() {
        let mut registry = ResourceRegistry::new();
        let element = Arc::new(
            MockElement::new("a")
                .with_rect(Rect::new(10_000.0, 0.0, 300.0, 250.0))
                .with_visibility(0.0),
        );
        insert(&mut registry, "a", element);

        let trigger = LazyTrigger::with_defaults();
        trigger.observe(ResourceId::from("a"));

        let signals = StaticSignals::new();
        assert!(trigger.evaluate(&mut registry, &signals).is_empty());
        assert!(trigger.is_watching(&ResourceId::from("a")));
        assert_eq!(
            registry.get(&ResourceId::from("a")).unwrap().status,
            LoadStatus::Discovered
        );
    }

    #[test]
    fn test_evaluate_refreshes_geometry() {
        let mut registry = ResourceRegistry::new();
        let element = Arc::new(
            MockElement::new("a")
                .with_rect(Rect::new(10_000.0, 0.0, 300.0, 250.0))
                .with_visibility(0.0),
        );
        insert(&mut registry, "a", element.clone());

        let trigger = LazyTrigger::with_defaults();
        trigger.observe(ResourceId::from("a"));
        let signals = StaticSignals::new();
        trigger.evaluate(&mut registry, &signals);

        element.set_visibility(0.9);
        trigger.evaluate(&mut registry, &signals);
        let resource = registry.get(&ResourceId::from("a")).unwrap();
        assert_eq!(resource.geometry.visibility_ratio, 0.9);
        assert_eq!(resource.status, LoadStatus::Triggered);
    }

    #[test]
    fn test_detached_resource_dropped_from_watch() {
        let mut registry = ResourceRegistry::new();
        let element = Arc::new(MockElement::new("a").with_visibility(1.0));
        insert(&mut registry, "a", element.clone());
        element.detach();

        let trigger = LazyTrigger::with_defaults();
        trigger.observe(ResourceId::from("a"));

        let signals = StaticSignals::new();
        assert!(trigger.evaluate(&mut registry, &signals).is_empty());
        assert_eq!(trigger.watched_count(), 0);
    }

    #[test]
    fn test_unobserve() {
        let trigger = LazyTrigger::with_defaults();
        trigger.observe(ResourceId::from("a"));
        assert!(trigger.is_watching(&ResourceId::from("a")));
        trigger.unobserve(&ResourceId::from("a"));
        assert!(!trigger.is_watching(&ResourceId::from("a")));
    }
}
