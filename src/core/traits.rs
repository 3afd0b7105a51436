//! Core traits for the embedbridge library.
//!
//! This module defines the narrow interfaces behind which the external
//! collaborators live: the document-tree node capability, the document
//! query surface, the third-party embed provider, and the passive behavior
//! signal source. The engine is portable and testable against fakes that
//! implement these traits; no real document tree is required.

use crate::core::error::LoadError;
use crate::core::types::{NetworkQuality, Rect};

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// Opaque capability interface over a document-tree node.
///
/// The engine never holds raw node references; everything it needs from
/// the UI tree goes through this narrow surface, which keeps the core
/// portable and lets tests substitute an in-memory fake.
///
/// # Implementation Notes
///
/// - Implementations must be `Send + Sync`; the engine shares handles
///   across its cooperative tasks.
/// - All methods are synchronous reads or synchronous mutations; none may
///   block.
/// - Implementations should never panic; a detached node must simply
///   report `is_attached() == false` and return empty/default values.
pub trait ElementHandle: Send + Sync + Debug {
    /// Returns a stable identifier for the underlying node (not the
    /// resource id; discovery assigns that separately).
    fn node_key(&self) -> &str;

    /// Returns the node's current bounding rectangle.
    fn rect(&self) -> Rect;

    /// Returns the fraction of the node inside the viewport, `[0, 1]`.
    fn visibility_ratio(&self) -> f64;

    /// Returns `true` while the node is part of the document tree.
    fn is_attached(&self) -> bool;

    /// Reads an attribute value, if present.
    fn attribute(&self, name: &str) -> Option<String>;

    /// Writes an attribute onto the node.
    fn set_attribute(&self, name: &str, value: &str);

    /// Appends rendered or synthetic content into the node.
    fn append_content(&self, content: &str);

    /// Returns the total length of content currently inside the node.
    fn content_length(&self) -> usize;

    /// Returns the number of injected child nodes.
    fn child_count(&self) -> usize;
}

/// Shared, thread-safe element handle.
pub type ArcHandle = Arc<dyn ElementHandle>;

/// Read-only query surface over the document tree.
///
/// Discovery uses this to find placeholder candidates; nothing else in the
/// engine touches the tree directly.
pub trait DocumentTree: Send + Sync + Debug {
    /// Returns all nodes matching the given selector.
    fn query(&self, selector: &str) -> Vec<ArcHandle>;
}

/// Shared, thread-safe document tree.
pub type ArcDocumentTree = Arc<dyn DocumentTree>;

/// The third-party embed provider: an opaque script plus a render-queue
/// push call.
///
/// The engine cannot see inside the provider. Completion of a render must
/// be inferred from side effects (the render flag probe here, plus content
/// probes on the handle); `request_render` has no return value beyond
/// delivery errors.
#[async_trait]
pub trait EmbedProvider: Send + Sync + Debug {
    /// Returns the name of this provider (stable, human-readable).
    fn name(&self) -> &str;

    /// Loads the provider script from the given endpoint.
    ///
    /// # Errors
    ///
    /// - [`LoadError::ScriptTimeout`] if the endpoint did not answer within
    ///   `timeout`.
    /// - [`LoadError::ScriptUnavailable`] for delivery failures.
    async fn load_script(&self, url: &str, timeout: Duration) -> Result<(), LoadError>;

    /// Pushes a render request for the given node onto the provider's
    /// queue. Fire-and-forget: success here only means the request was
    /// queued, not that anything rendered.
    async fn request_render(&self, handle: &ArcHandle) -> Result<(), LoadError>;

    /// Probes the provider-set completion flag for the given node.
    ///
    /// One of several independent signals the verification step accepts;
    /// providers that never set a flag simply return `false` and let the
    /// content probes decide.
    fn render_flag(&self, handle: &ArcHandle) -> bool;
}

/// Shared, thread-safe provider.
pub type ArcProvider = Arc<dyn EmbedProvider>;

/// Passive behavior observation: engagement and environment signals.
///
/// Produced elsewhere by observation the engine does not control; modeled
/// as a read-only collaborator.
pub trait BehaviorSignals: Send + Sync + Debug {
    /// Engagement score in `[0, 100]`.
    fn engagement_score(&self) -> u8;

    /// Current network quality descriptor.
    fn network_quality(&self) -> NetworkQuality;

    /// Logical processor count reported by the host.
    fn device_concurrency(&self) -> u32;

    /// Current vertical scroll position in pixels.
    fn scroll_position(&self) -> f64;

    /// Time since the page session started.
    fn time_on_page(&self) -> Duration;
}

/// Shared, thread-safe behavior signal source.
pub type ArcSignals = Arc<dyn BehaviorSignals>;

/// A fixed behavior signal source for tests and demos.
#[derive(Debug, Clone)]
pub struct StaticSignals {
    /// Engagement score to report.
    pub engagement: u8,
    /// Network quality to report.
    pub network: NetworkQuality,
    /// Device concurrency to report.
    pub concurrency: u32,
    /// Scroll position to report.
    pub scroll: f64,
    /// Time on page to report.
    pub on_page: Duration,
}

impl Default for StaticSignals {
    fn default() -> Self {
        Self {
            engagement: 50,
            network: NetworkQuality::Fast,
            concurrency: 4,
            scroll: 0.0,
            on_page: Duration::from_secs(10),
        }
    }
}

impl StaticSignals {
    /// Creates a static source with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the engagement score.
    pub fn with_engagement(mut self, score: u8) -> Self {
        self.engagement = score.min(100);
        self
    }

    /// Sets the network quality.
    pub fn with_network(mut self, network: NetworkQuality) -> Self {
        self.network = network;
        self
    }

    /// Sets the scroll position.
    pub fn with_scroll(mut self, scroll: f64) -> Self {
        self.scroll = scroll;
        self
    }
}

impl BehaviorSignals for StaticSignals {
    fn engagement_score(&self) -> u8 {
        self.engagement
    }

    fn network_quality(&self) -> NetworkQuality {
        self.network
    }

    fn device_concurrency(&self) -> u32 {
        self.concurrency
    }

    fn scroll_position(&self) -> f64 {
        self.scroll
    }

    fn time_on_page(&self) -> Duration {
        self.on_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_signals_defaults() {
        let signals = StaticSignals::new();
        assert_eq!(signals.engagement_score(), 50);
        assert_eq!(signals.network_quality(), NetworkQuality::Fast);
        assert_eq!(signals.device_concurrency(), 4);
    }

    #[test]
    fn test_static_signals_builder_clamps_engagement() {
        let signals = StaticSignals::new().with_engagement(250);
        assert_eq!(signals.engagement_score(), 100);
    }
}
