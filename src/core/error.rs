//! Error types for the embedbridge library.
//!
//! This module provides structured, typed errors for all failure scenarios.
//! The library never panics; all errors are returned as `Result` values and
//! resource-level failures are absorbed by the retry machinery rather than
//! surfaced to callers.

use std::time::Duration;
use thiserror::Error;

/// The main error type for embed load operations.
///
/// All error variants include context about what failed and why,
/// enabling proper error handling and debugging.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The provider script could not be fetched from any endpoint.
    #[error("provider script unavailable: {reason}")]
    ScriptUnavailable {
        /// Human-readable reason, typically the last endpoint error.
        reason: String,
        /// How many endpoints (primary + fallbacks) were attempted.
        endpoints_tried: usize,
    },

    /// Fetching the provider script timed out.
    #[error("script load timed out after {elapsed:?} for '{url}'")]
    ScriptTimeout {
        /// The endpoint URL that timed out.
        url: String,
        /// How long the load ran before timing out.
        elapsed: Duration,
    },

    /// The placeholder node is no longer part of the document tree.
    #[error("element detached from document tree: {resource_id}")]
    ElementDetached {
        /// Id of the affected resource.
        resource_id: String,
    },

    /// Required attributes were missing and could not be auto-repaired.
    #[error("validation failure for '{resource_id}': {reason}")]
    ValidationFailure {
        /// Id of the affected resource.
        resource_id: String,
        /// What was missing or malformed.
        reason: String,
    },

    /// No render-completion signal fired within the configured bound.
    #[error("render timed out after {elapsed:?} for '{resource_id}'")]
    RenderTimeout {
        /// Id of the affected resource.
        resource_id: String,
        /// How long the pipeline polled before giving up.
        elapsed: Duration,
    },

    /// Rendering appears to be suppressed by client-side blocking.
    #[error("render suppressed for '{resource_id}': {evidence}")]
    RenderSuppressed {
        /// Id of the affected resource.
        resource_id: String,
        /// The heuristic evidence that led to this conclusion.
        evidence: String,
    },

    /// The network is reported offline by the behavior signal source.
    #[error("network offline")]
    NetworkOffline,

    /// The circuit breaker is open for the script endpoint.
    #[error("circuit breaker open for endpoint '{endpoint}'")]
    CircuitOpen {
        /// The guarded endpoint.
        endpoint: String,
        /// When the circuit might close (if known).
        recovery_hint: Option<String>,
    },

    /// The operation was cancelled during engine teardown.
    #[error("operation was cancelled")]
    Cancelled,

    /// Configuration error.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An internal error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl LoadError {
    /// Returns `true` if this error is recoverable (can be retried).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ScriptUnavailable { .. }
                | Self::ScriptTimeout { .. }
                | Self::RenderTimeout { .. }
                | Self::RenderSuppressed { .. }
                | Self::NetworkOffline
                | Self::CircuitOpen { .. }
        )
    }

    /// Returns `true` if this error should count against the shared
    /// script endpoint on the circuit breaker.
    pub fn counts_against_endpoint(&self) -> bool {
        matches!(
            self,
            Self::ScriptUnavailable { .. } | Self::ScriptTimeout { .. } | Self::NetworkOffline
        )
    }

    /// Returns `true` if a terminal failure with this error should leave
    /// the resource `Blocked` rather than `Failed`.
    ///
    /// Blocked resources are only revived by the health monitor or an
    /// explicit network-recovery event.
    pub fn indicates_blocking(&self) -> bool {
        matches!(self, Self::RenderSuppressed { .. } | Self::NetworkOffline)
    }

    /// Returns the deterministic severity constant used by the retry
    /// probability gate.
    ///
    /// Ordering: network failures > timeouts > script/render errors >
    /// validation errors. Higher severity makes an early retry more likely
    /// because the failure is more plausibly transient.
    pub fn severity(&self) -> f64 {
        match self {
            Self::NetworkOffline | Self::ScriptUnavailable { .. } => 0.9,
            Self::ScriptTimeout { .. } | Self::RenderTimeout { .. } => 0.75,
            Self::RenderSuppressed { .. } | Self::CircuitOpen { .. } => 0.6,
            Self::ElementDetached { .. } => 0.4,
            Self::ValidationFailure { .. } => 0.3,
            Self::Cancelled | Self::Configuration { .. } | Self::Internal { .. } => 0.0,
        }
    }

    /// Returns a stable snake_case name for the error kind, used in
    /// failure records and telemetry.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ScriptUnavailable { .. } => "script_unavailable",
            Self::ScriptTimeout { .. } => "script_timeout",
            Self::ElementDetached { .. } => "element_detached",
            Self::ValidationFailure { .. } => "validation_failure",
            Self::RenderTimeout { .. } => "render_timeout",
            Self::RenderSuppressed { .. } => "render_suppressed",
            Self::NetworkOffline => "network_offline",
            Self::CircuitOpen { .. } => "circuit_open",
            Self::Cancelled => "cancelled",
            Self::Configuration { .. } => "configuration",
            Self::Internal { .. } => "internal",
        }
    }

    /// Creates a `ScriptUnavailable` error.
    pub fn script_unavailable(reason: impl Into<String>, endpoints_tried: usize) -> Self {
        Self::ScriptUnavailable {
            reason: reason.into(),
            endpoints_tried,
        }
    }

    /// Creates a `ScriptTimeout` error.
    pub fn script_timeout(url: impl Into<String>, elapsed: Duration) -> Self {
        Self::ScriptTimeout {
            url: url.into(),
            elapsed,
        }
    }

    /// Creates an `ElementDetached` error.
    pub fn element_detached(resource_id: impl Into<String>) -> Self {
        Self::ElementDetached {
            resource_id: resource_id.into(),
        }
    }

    /// Creates a `ValidationFailure` error.
    pub fn validation_failure(resource_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ValidationFailure {
            resource_id: resource_id.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `RenderTimeout` error.
    pub fn render_timeout(resource_id: impl Into<String>, elapsed: Duration) -> Self {
        Self::RenderTimeout {
            resource_id: resource_id.into(),
            elapsed,
        }
    }

    /// Creates a `RenderSuppressed` error.
    pub fn render_suppressed(resource_id: impl Into<String>, evidence: impl Into<String>) -> Self {
        Self::RenderSuppressed {
            resource_id: resource_id.into(),
            evidence: evidence.into(),
        }
    }

    /// Creates a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// A specialized `Result` type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        let timeout = LoadError::render_timeout("res-1", Duration::from_secs(10));
        assert!(timeout.is_recoverable());

        let validation = LoadError::validation_failure("res-1", "missing slot attribute");
        assert!(!validation.is_recoverable());
    }

    #[test]
    fn test_severity_ordering() {
        let network = LoadError::NetworkOffline;
        let timeout = LoadError::render_timeout("r", Duration::from_secs(1));
        let script = LoadError::render_suppressed("r", "empty container");
        let validation = LoadError::validation_failure("r", "bad");

        assert!(network.severity() > timeout.severity());
        assert!(timeout.severity() > script.severity());
        assert!(script.severity() > validation.severity());
    }

    #[test]
    fn test_endpoint_accounting() {
        assert!(LoadError::script_unavailable("all endpoints failed", 3).counts_against_endpoint());
        assert!(!LoadError::render_timeout("r", Duration::from_secs(1)).counts_against_endpoint());
    }

    #[test]
    fn test_blocking_classification() {
        assert!(LoadError::NetworkOffline.indicates_blocking());
        assert!(LoadError::render_suppressed("r", "probe").indicates_blocking());
        assert!(!LoadError::render_timeout("r", Duration::from_secs(1)).indicates_blocking());
    }

    #[test]
    fn test_error_display() {
        let err = LoadError::script_timeout("https://cdn.example/embed.js", Duration::from_secs(8));
        assert!(err.to_string().contains("cdn.example"));
        assert_eq!(err.kind(), "script_timeout");
    }
}
