//! Telemetry event types and emission functions.

use crate::adaptive::Adjustment;
use crate::core::{EngineStatus, LoadStatus, ResourceId};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Base trait for telemetry events.
pub trait EngineEvent: Serialize {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the timestamp of the event.
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Telemetry event for a resource lifecycle transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Event type.
    pub event_type: String,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Resource id.
    pub resource_id: String,

    /// Status before the transition.
    pub from: String,

    /// Status after the transition.
    pub to: String,

    /// Attempts so far.
    pub attempts: u32,

    /// Error kind, for failure transitions.
    pub error_kind: Option<String>,
}

impl EngineEvent for LifecycleEvent {
    fn event_type(&self) -> &'static str {
        "lifecycle"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Telemetry event for an engine session boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    /// Event type.
    pub event_type: String,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Session identifier.
    pub session_id: String,

    /// Registered resources at the time of the event.
    pub resource_count: usize,
}

impl EngineEvent for SessionEvent {
    fn event_type(&self) -> &'static str {
        "session"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Emits a telemetry event for an engine session starting.
pub fn emit_session_started(session_id: &str, resource_count: usize) {
    tracing::info!(
        target: "embedbridge::events",
        event_type = "session_started",
        session_id = %session_id,
        resource_count,
        "Engine session started"
    );
}

/// Emits a telemetry event for an engine session stopping.
pub fn emit_session_stopped(session_id: &str, status: &EngineStatus) {
    tracing::info!(
        target: "embedbridge::events",
        event_type = "session_stopped",
        session_id = %session_id,
        loaded = status.counts.loaded,
        failed = status.counts.failed,
        blocked = status.counts.blocked,
        success_rate = status.success_rate,
        "Engine session stopped"
    );
}

/// Emits a telemetry event for a resource lifecycle transition.
pub fn emit_status_changed(
    resource_id: &ResourceId,
    from: LoadStatus,
    to: LoadStatus,
    attempts: u32,
) {
    tracing::info!(
        target: "embedbridge::events",
        event_type = "status_changed",
        resource_id = %resource_id,
        from = from.name(),
        to = to.name(),
        attempts,
        "Resource status changed"
    );
}

/// Emits a telemetry event for a completed load.
pub fn emit_load_completed(resource_id: &ResourceId, attempts: u32, elapsed: Duration) {
    tracing::info!(
        target: "embedbridge::events",
        event_type = "load_completed",
        resource_id = %resource_id,
        attempts,
        elapsed_ms = elapsed.as_millis() as u64,
        "Load completed"
    );
}

/// Emits a telemetry event for a terminal load failure.
pub fn emit_load_failed(
    resource_id: &ResourceId,
    status: LoadStatus,
    error_kind: &str,
    attempts: u32,
) {
    tracing::warn!(
        target: "embedbridge::events",
        event_type = "load_failed",
        resource_id = %resource_id,
        status = status.name(),
        error_kind,
        attempts,
        "Load resolved to terminal failure"
    );
}

/// Emits telemetry events for configuration adjustments.
pub fn emit_adjustments(adjustments: &[Adjustment]) {
    for adjustment in adjustments {
        tracing::info!(
            target: "embedbridge::events",
            event_type = "config_adjusted",
            parameter = adjustment.parameter,
            from = adjustment.from,
            to = adjustment.to,
            "Configuration parameter adjusted"
        );
    }
}

/// Emits a telemetry event for an explicit network recovery.
pub fn emit_network_recovered(session_id: &str, requeued: usize) {
    tracing::info!(
        target: "embedbridge::events",
        event_type = "network_recovered",
        session_id = %session_id,
        requeued,
        "Network recovery processed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_event_serializes() {
        let event = LifecycleEvent {
            event_type: "status_changed".to_string(),
            timestamp: Utc::now(),
            resource_id: "res-1".to_string(),
            from: "discovered".to_string(),
            to: "triggered".to_string(),
            attempts: 0,
            error_kind: None,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "status_changed");
        assert_eq!(json["resource_id"], "res-1");
        assert_eq!(event.event_type(), "lifecycle");
    }

    #[test]
    fn test_session_event_serializes() {
        let event = SessionEvent {
            event_type: "session_started".to_string(),
            timestamp: Utc::now(),
            session_id: "sess-1".to_string(),
            resource_count: 4,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"session_id\":\"sess-1\""));
    }

    #[test]
    fn test_emitters_do_not_panic_without_subscriber() {
        emit_session_started("sess-1", 3);
        emit_status_changed(
            &ResourceId::from("res-1"),
            LoadStatus::Discovered,
            LoadStatus::Triggered,
            0,
        );
        emit_load_completed(&ResourceId::from("res-1"), 1, Duration::from_millis(250));
        emit_load_failed(&ResourceId::from("res-1"), LoadStatus::Failed, "render_timeout", 3);
        emit_network_recovered("sess-1", 2);
        emit_adjustments(&[]);
    }
}
