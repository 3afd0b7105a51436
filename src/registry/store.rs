//! The canonical resource map.

use crate::core::{LoadStatus, Resource, ResourceId, StatusCounts};

use std::collections::{HashMap, HashSet};

/// Canonical map from resource id to resource record.
///
/// The registry is the sole owner of [`Resource`] records. All reads and
/// mutations go through it, and the `processing` set enforces the
/// at-most-one-in-flight invariant per resource id.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    resources: HashMap<ResourceId, Resource>,
    processing: HashSet<ResourceId>,
}

impl ResourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a newly discovered resource.
    ///
    /// Returns `false` (and leaves the registry unchanged) if the id is
    /// already registered; id uniqueness is an invariant.
    pub fn insert(&mut self, resource: Resource) -> bool {
        if self.resources.contains_key(&resource.id) {
            return false;
        }
        self.resources.insert(resource.id.clone(), resource);
        true
    }

    /// Returns `true` if the id is registered.
    pub fn contains(&self, id: &ResourceId) -> bool {
        self.resources.contains_key(id)
    }

    /// Returns the resource for the given id.
    pub fn get(&self, id: &ResourceId) -> Option<&Resource> {
        self.resources.get(id)
    }

    /// Returns a mutable reference to the resource for the given id.
    pub fn get_mut(&mut self, id: &ResourceId) -> Option<&mut Resource> {
        self.resources.get_mut(id)
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns `true` if no resources are registered.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Iterates over all resources.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Returns the ids of resources currently in the given status.
    pub fn ids_with_status(&self, status: LoadStatus) -> Vec<ResourceId> {
        self.resources
            .values()
            .filter(|r| r.status == status)
            .map(|r| r.id.clone())
            .collect()
    }

    /// Claims the processing slot for a resource.
    ///
    /// Returns `false` if another pipeline execution is already in flight
    /// for this id; the caller must not proceed in that case.
    pub fn begin_processing(&mut self, id: &ResourceId) -> bool {
        if !self.resources.contains_key(id) {
            return false;
        }
        self.processing.insert(id.clone())
    }

    /// Releases the processing slot for a resource.
    pub fn finish_processing(&mut self, id: &ResourceId) {
        self.processing.remove(id);
    }

    /// Returns `true` if a pipeline execution is in flight for this id.
    pub fn is_processing(&self, id: &ResourceId) -> bool {
        self.processing.contains(id)
    }

    /// Number of resources with an in-flight pipeline execution.
    pub fn in_flight(&self) -> usize {
        self.processing.len()
    }

    /// Per-status counts for the status surface.
    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts {
            total: self.resources.len(),
            ..StatusCounts::default()
        };
        for resource in self.resources.values() {
            match resource.status {
                LoadStatus::Discovered => counts.discovered += 1,
                LoadStatus::Triggered => counts.triggered += 1,
                LoadStatus::Loading => counts.loading += 1,
                LoadStatus::Loaded => counts.loaded += 1,
                LoadStatus::Failed => counts.failed += 1,
                LoadStatus::Blocked => counts.blocked += 1,
            }
        }
        counts
    }

    /// Success rate over resources that reached a terminal state.
    ///
    /// Used by the watchdog's mandatory check. Returns 1.0 before any
    /// resource resolves.
    pub fn resolved_success_rate(&self) -> f64 {
        let counts = self.counts();
        let resolved = counts.loaded + counts.failed + counts.blocked;
        if resolved == 0 {
            return 1.0;
        }
        counts.loaded as f64 / resolved as f64
    }

    /// Removes all resources and processing claims (engine teardown).
    pub fn clear(&mut self) {
        self.resources.clear();
        self.processing.clear();
    }
}
