//! Core types used throughout the embedbridge library.
//!
//! This module defines the fundamental data structures for representing
//! managed resources, their lifecycle status, geometry snapshots, and the
//! read-only status surface exposed by the engine.

use crate::core::traits::ArcHandle;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

/// Unique, session-stable identifier for a managed resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(String);

impl ResourceId {
    /// Creates a resource id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Lifecycle status of a managed resource.
///
/// Transitions are driven by the load pipeline (`Loading`, `Loaded`,
/// `Failed`, `Blocked`), the lazy trigger (`Discovered` to `Triggered`),
/// and the health monitor (terminal states back to `Discovered`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    /// Registered but not yet activated.
    Discovered,
    /// Activated by the lazy trigger or a batch wave; awaiting pipeline.
    Triggered,
    /// A load pipeline execution is underway.
    Loading,
    /// A render-completion signal fired (or fail-open content was applied).
    Loaded,
    /// Terminal failure after retry exhaustion.
    Failed,
    /// Terminal failure attributed to suppression or network loss.
    Blocked,
}

impl LoadStatus {
    /// Returns `true` if the resource is waiting to be activated or loaded.
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Discovered | Self::Triggered)
    }

    /// Returns `true` if the resource reached a terminal failure state.
    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Blocked)
    }

    /// Returns a stable snake_case name for the status.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Triggered => "triggered",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Failed => "failed",
            Self::Blocked => "blocked",
        }
    }
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Axis-aligned rectangle describing an element's position and size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Distance from the top of the document, in pixels.
    pub top: f64,
    /// Distance from the left of the document, in pixels.
    pub left: f64,
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl Rect {
    /// Creates a new rectangle.
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    /// Returns the area in square pixels.
    pub fn area(&self) -> f64 {
        (self.width * self.height).max(0.0)
    }

    /// Returns the vertical distance from the given scroll position to
    /// the top edge of this rectangle. Zero when already scrolled past.
    pub fn distance_from_scroll(&self, scroll_position: f64) -> f64 {
        (self.top - scroll_position).max(0.0)
    }
}

/// A point-in-time snapshot of an element's geometry.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeometrySnapshot {
    /// Position and size of the element.
    pub rect: Rect,
    /// Fraction of the element currently inside the viewport (0.0 to 1.0).
    pub visibility_ratio: f64,
}

impl GeometrySnapshot {
    /// Creates a snapshot, clamping the visibility ratio to `[0, 1]`.
    pub fn new(rect: Rect, visibility_ratio: f64) -> Self {
        Self {
            rect,
            visibility_ratio: visibility_ratio.clamp(0.0, 1.0),
        }
    }
}

/// Network quality descriptor from the behavior signal source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkQuality {
    /// Good throughput and latency.
    Fast,
    /// Usable but degraded.
    Moderate,
    /// High latency or heavy loss.
    Slow,
    /// No connectivity.
    Offline,
}

impl NetworkQuality {
    /// Returns a multiplier in `[0, 1]` used by the priority estimator.
    pub fn factor(&self) -> f64 {
        match self {
            Self::Fast => 1.0,
            Self::Moderate => 0.7,
            Self::Slow => 0.4,
            Self::Offline => 0.0,
        }
    }

    /// Returns `true` if the network is offline.
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Offline)
    }
}

/// A recorded failure on a resource, newest last.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Stable error-kind name (e.g. `"render_timeout"`, `"stuck-reset"`).
    pub kind: String,
    /// Human-readable description of the failure.
    pub reason: String,
    /// When the failure was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl FailureRecord {
    /// Creates a new failure record stamped with the current time.
    pub fn new(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            reason: reason.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// One placeholder region under management.
///
/// The registry is the sole owner of resource records; all other components
/// read or mutate them through it.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Unique, session-stable identifier.
    pub id: ResourceId,
    /// Opaque capability handle to the document-tree node.
    pub handle: ArcHandle,
    /// Geometry snapshot taken at discovery (refreshed by the lazy trigger).
    pub geometry: GeometrySnapshot,
    /// Attributes mirrored onto the handle.
    pub attributes: HashMap<String, String>,
    /// Current lifecycle status.
    pub status: LoadStatus,
    /// Number of load attempts so far.
    pub attempts: u32,
    /// When the last attempt started, if any.
    pub last_attempt_at: Option<Instant>,
    /// When the resource entered `Loading`, if it is loading.
    pub loading_since: Option<Instant>,
    /// Priority score in `[0, 200]`.
    pub priority: f64,
    /// Ordered failure history, oldest first.
    pub failure_reasons: Vec<FailureRecord>,
    /// When the resource was discovered.
    pub discovered_at: Instant,
}

impl Resource {
    /// Creates a freshly discovered resource.
    pub fn new(id: ResourceId, handle: ArcHandle, geometry: GeometrySnapshot, priority: f64) -> Self {
        Self {
            id,
            handle,
            geometry,
            attributes: HashMap::new(),
            status: LoadStatus::Discovered,
            attempts: 0,
            last_attempt_at: None,
            loading_since: None,
            priority: priority.clamp(0.0, 200.0),
            failure_reasons: Vec::new(),
            discovered_at: Instant::now(),
        }
    }

    /// Marks the start of a load attempt.
    pub fn mark_loading(&mut self) {
        self.status = LoadStatus::Loading;
        self.attempts += 1;
        let now = Instant::now();
        self.last_attempt_at = Some(now);
        self.loading_since = Some(now);
    }

    /// Marks the resource as successfully loaded.
    pub fn mark_loaded(&mut self) {
        self.status = LoadStatus::Loaded;
        self.loading_since = None;
    }

    /// Records a failure and moves to the given terminal or retryable state.
    pub fn record_failure(&mut self, record: FailureRecord, status: LoadStatus) {
        self.failure_reasons.push(record);
        self.status = status;
        self.loading_since = None;
    }

    /// Returns how long the resource has been in `Loading`, if it is.
    pub fn loading_elapsed(&self) -> Option<std::time::Duration> {
        self.loading_since.map(|since| since.elapsed())
    }

    /// Sets an attribute on both the record and the underlying handle.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        self.handle.set_attribute(&name, &value);
        self.attributes.insert(name, value);
    }
}

/// Per-status resource counts for the status surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Total registered resources.
    pub total: usize,
    /// Resources awaiting activation.
    pub discovered: usize,
    /// Resources activated but not yet loading.
    pub triggered: usize,
    /// Resources mid-load.
    pub loading: usize,
    /// Successfully loaded resources.
    pub loaded: usize,
    /// Terminally failed resources.
    pub failed: usize,
    /// Blocked resources.
    pub blocked: usize,
}

/// Read-only snapshot of engine state: the only externally observable
/// surface besides telemetry.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    /// Session identifier.
    pub session_id: String,
    /// Per-status resource counts.
    pub counts: StatusCounts,
    /// Number of resources with an in-flight pipeline execution.
    pub in_flight: usize,
    /// Current circuit-breaker state name.
    pub breaker_state: String,
    /// Rolling success rate over the metrics window (0.0 to 1.0).
    pub success_rate: f64,
    /// Rolling average load time in milliseconds.
    pub avg_load_time_ms: u64,
    /// Number of samples in the metrics window.
    pub sample_count: usize,
    /// Snapshot of the adaptive configuration.
    pub config: crate::config::ConfigSnapshot,
    /// When the snapshot was taken.
    pub captured_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::ElementHandle;
    use crate::providers::mock::MockElement;
    use std::sync::Arc;

    fn handle() -> ArcHandle {
        Arc::new(MockElement::new("el-1"))
    }

    #[test]
    fn test_status_predicates() {
        assert!(LoadStatus::Discovered.is_idle());
        assert!(LoadStatus::Triggered.is_idle());
        assert!(!LoadStatus::Loading.is_idle());
        assert!(LoadStatus::Failed.is_terminal_failure());
        assert!(LoadStatus::Blocked.is_terminal_failure());
        assert!(!LoadStatus::Loaded.is_terminal_failure());
    }

    #[test]
    fn test_rect_geometry() {
        let rect = Rect::new(1200.0, 0.0, 300.0, 250.0);
        assert_eq!(rect.area(), 75_000.0);
        assert_eq!(rect.distance_from_scroll(200.0), 1000.0);
        assert_eq!(rect.distance_from_scroll(2000.0), 0.0);
    }

    #[test]
    fn test_visibility_ratio_clamped() {
        let snap = GeometrySnapshot::new(Rect::default(), 1.7);
        assert_eq!(snap.visibility_ratio, 1.0);
        let snap = GeometrySnapshot::new(Rect::default(), -0.2);
        assert_eq!(snap.visibility_ratio, 0.0);
    }

    #[test]
    fn test_resource_lifecycle() {
        let mut resource = Resource::new(
            ResourceId::from("res-1"),
            handle(),
            GeometrySnapshot::default(),
            120.0,
        );
        assert_eq!(resource.status, LoadStatus::Discovered);
        assert_eq!(resource.attempts, 0);

        resource.mark_loading();
        assert_eq!(resource.status, LoadStatus::Loading);
        assert_eq!(resource.attempts, 1);
        assert!(resource.loading_since.is_some());

        resource.record_failure(
            FailureRecord::new("render_timeout", "no signal"),
            LoadStatus::Failed,
        );
        assert_eq!(resource.status, LoadStatus::Failed);
        assert_eq!(resource.failure_reasons.len(), 1);
        assert!(resource.loading_since.is_none());
    }

    #[test]
    fn test_priority_clamped_on_creation() {
        let resource = Resource::new(
            ResourceId::from("res-1"),
            handle(),
            GeometrySnapshot::default(),
            900.0,
        );
        assert_eq!(resource.priority, 200.0);
    }

    #[test]
    fn test_set_attribute_mirrors_to_handle() {
        let element = Arc::new(MockElement::new("el-1"));
        let mut resource = Resource::new(
            ResourceId::from("res-1"),
            element.clone() as ArcHandle,
            GeometrySnapshot::default(),
            100.0,
        );
        resource.set_attribute("data-embed-slot", "sidebar");
        assert_eq!(
            resource.attributes.get("data-embed-slot").map(String::as_str),
            Some("sidebar")
        );
        assert_eq!(
            element.attribute("data-embed-slot").as_deref(),
            Some("sidebar")
        );
    }
}
