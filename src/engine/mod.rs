//! The engine orchestrator.
//!
//! Wires discovery, lazy activation, the load pipeline, the watchdog, and
//! the adaptive controller into one per-session engine.

mod orchestrator;

pub use orchestrator::{EmbedEngine, EmbedEngineBuilder};
