//! Placeholder discovery.
//!
//! Discovery scans the document tree for placeholder candidates, assigns
//! deterministic ids, snapshots geometry, computes initial priority, and
//! registers the results. Re-invocation on an unchanged tree is a no-op:
//! nodes already tagged with a registered id are skipped.

use crate::core::{BehaviorSignals, DocumentTree, GeometrySnapshot, Resource, ResourceId};
use crate::priority::{PriorityEstimator, PriorityInputs};
use crate::registry::ResourceRegistry;

use chrono::Utc;

/// Configuration for placeholder discovery.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Selectors identifying placeholder candidates, tried in order.
    pub selectors: Vec<String>,
    /// Attribute used to tag nodes with their assigned resource id.
    pub id_attribute: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            selectors: vec![
                ".embed-slot".to_string(),
                "[data-embed-slot]".to_string(),
            ],
            id_attribute: "data-embed-id".to_string(),
        }
    }
}

impl DiscoveryConfig {
    /// Creates a configuration with default selectors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the selector list.
    pub fn with_selectors(mut self, selectors: Vec<String>) -> Self {
        self.selectors = selectors;
        self
    }

    /// Sets the id attribute name.
    pub fn with_id_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.id_attribute = attribute.into();
        self
    }
}

/// Result of one discovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryOutcome {
    /// Ids registered by this pass.
    pub registered: Vec<ResourceId>,
    /// Candidates skipped because they were already registered.
    pub skipped: usize,
    /// Candidates skipped because the node was detached.
    pub detached: usize,
}

/// Scans the tree and registers new placeholders into `registry`.
///
/// Id assignment is deterministic: a node carrying the id attribute keeps
/// that id; otherwise one is generated from the session id, a running
/// index, and the current timestamp, and written back onto the node so a
/// later pass recognizes it.
pub fn discover_into(
    registry: &mut ResourceRegistry,
    tree: &dyn DocumentTree,
    config: &DiscoveryConfig,
    session_id: &str,
    next_index: &mut usize,
    estimator: &dyn PriorityEstimator,
    signals: &dyn BehaviorSignals,
) -> DiscoveryOutcome {
    let mut outcome = DiscoveryOutcome::default();

    for selector in &config.selectors {
        for handle in tree.query(selector) {
            if !handle.is_attached() {
                outcome.detached += 1;
                continue;
            }

            let tagged = handle.attribute(&config.id_attribute);
            if let Some(existing) = &tagged {
                if registry.contains(&ResourceId::from(existing.as_str())) {
                    outcome.skipped += 1;
                    continue;
                }
            }

            let id = match tagged {
                Some(existing) => ResourceId::from(existing.as_str()),
                None => {
                    let index = *next_index;
                    *next_index += 1;
                    ResourceId::new(format!(
                        "{session_id}-{index}-{}",
                        Utc::now().timestamp_millis()
                    ))
                }
            };

            let geometry = GeometrySnapshot::new(handle.rect(), handle.visibility_ratio());
            let inputs = PriorityInputs::gather(&geometry, signals, 0, registry.in_flight());
            let priority = estimator.estimate(&inputs);

            let mut resource = Resource::new(id.clone(), handle, geometry, priority);
            resource.set_attribute(config.id_attribute.clone(), id.as_str());

            if registry.insert(resource) {
                outcome.registered.push(id);
            } else {
                // Same node matched by two selectors in one pass.
                outcome.skipped += 1;
            }
        }
    }

    tracing::debug!(
        target: "embedbridge::events",
        registered = outcome.registered.len(),
        skipped = outcome.skipped,
        detached = outcome.detached,
        "Discovery pass completed"
    );

    outcome
}
