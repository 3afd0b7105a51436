//! Structured telemetry emission.
//!
//! All observable engine activity is emitted as structured `tracing`
//! events under the `embedbridge::events` target. Any subscriber (console,
//! JSON file, OpenTelemetry) can capture them; the engine itself installs
//! none.

mod events;

pub use events::{
    emit_adjustments, emit_load_completed, emit_load_failed, emit_network_recovered,
    emit_session_started, emit_session_stopped, emit_status_changed, EngineEvent, LifecycleEvent,
    SessionEvent,
};
