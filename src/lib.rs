//! # Embedbridge
//!
//! A resilient loading engine for third-party embedded content, with lazy
//! viewport activation, adaptive retry, circuit breaking, and structured
//! telemetry.
//!
//! ## Overview
//!
//! Embedbridge manages placeholder regions on a page whose content is
//! rendered by an opaque third-party provider, allowing you to:
//!
//! - Discover placeholder regions and assign them stable ids
//! - Defer loading until a region approaches the viewport
//! - Schedule loads by a priority estimated from geometry and behavior
//! - Retry failures with jittered exponential backoff
//! - Shield a failing script endpoint behind a circuit breaker
//! - Detect renders suppressed by content blockers
//! - Recover stuck or failed resources through a background watchdog
//! - Tune retry and batching parameters from observed outcomes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use embedbridge::{EmbedEngine, ScriptEndpoints};
//! use embedbridge::providers::MockProvider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // A document tree and provider come from your host integration;
//!     // mocks stand in here.
//!     let provider = MockProvider::new();
//!     let tree = embedbridge::providers::MockDocument::new();
//!
//!     let engine = EmbedEngine::builder()
//!         .with_provider(provider)
//!         .with_tree(tree)
//!         .with_endpoints(
//!             ScriptEndpoints::new("https://cdn.example/embed.js")
//!                 .with_fallback("https://backup.example/embed.js"),
//!         )
//!         .build()?;
//!
//!     engine.start();
//!     // ... page session runs ...
//!     engine.shutdown();
//!
//!     println!("{}", serde_json::to_string_pretty(&engine.status())?);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several layers:
//!
//! - **Core**: Fundamental types, collaborator traits, and error handling
//! - **Registry**: The canonical resource map and placeholder discovery
//! - **Priority**: Pluggable priority estimation from geometry and behavior
//! - **Pipeline**: The per-resource load pipeline and render verification
//! - **Circuit Breaker**: Resilience for the shared script endpoint
//! - **Retry**: Probabilistic retry gating and backoff
//! - **Lazy**: Viewport-driven activation
//! - **Monitor**: The background watchdog
//! - **Adaptive**: Closed-loop configuration tuning
//! - **Engine**: The per-session orchestrator
//! - **Telemetry**: Structured `tracing` events

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adaptive;
pub mod circuit_breaker;
pub mod config;
pub mod core;
pub mod engine;
pub mod lazy;
pub mod metrics;
pub mod monitor;
pub mod pipeline;
pub mod priority;
pub mod providers;
pub mod registry;
pub mod retry;
pub mod telemetry;

// Re-export commonly used types at the crate root
pub use crate::core::{
    BehaviorSignals, DocumentTree, ElementHandle, EmbedProvider, EngineStatus, GeometrySnapshot,
    LoadError, LoadResult, LoadStatus, NetworkQuality, Rect, Resource, ResourceId, StaticSignals,
};

pub use crate::circuit_breaker::{BreakerConfig, BreakerState, CircuitBreaker};
pub use crate::config::AdaptiveConfig;
pub use crate::engine::{EmbedEngine, EmbedEngineBuilder};
pub use crate::providers::{ScriptEndpoints, ScriptLoader};

/// Prelude module for convenient imports.
///
/// ```rust
/// use embedbridge::prelude::*;
/// ```
pub mod prelude {
    pub use crate::circuit_breaker::{BreakerConfig, BreakerState, CircuitBreaker};
    pub use crate::config::AdaptiveConfig;
    pub use crate::core::{
        BehaviorSignals, DocumentTree, ElementHandle, EmbedProvider, EngineStatus,
        GeometrySnapshot, LoadError, LoadResult, LoadStatus, NetworkQuality, Rect, Resource,
        ResourceId, StaticSignals,
    };
    pub use crate::engine::{EmbedEngine, EmbedEngineBuilder};
    pub use crate::lazy::TriggerConfig;
    pub use crate::monitor::WatchdogConfig;
    pub use crate::pipeline::{PipelineConfig, VerifyConfig};
    pub use crate::providers::{ScriptEndpoints, ScriptLoader};
    pub use crate::registry::DiscoveryConfig;
}
