//! Mock collaborators for testing.
//!
//! This module provides configurable fakes for the three external
//! collaborators the engine depends on: document-tree nodes, the document
//! query surface, and the embed provider. Tests simulate render success,
//! silence, flag-only completion, and endpoint failures without a real
//! document tree or network.

use crate::core::{ArcHandle, DocumentTree, ElementHandle, EmbedProvider, LoadError, Rect};

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// An in-memory document-tree node.
///
/// # Examples
///
/// ```rust
/// use embedbridge::providers::MockElement;
/// use embedbridge::core::{ElementHandle, Rect};
///
/// let element = MockElement::new("slot-1").with_rect(Rect::new(100.0, 0.0, 300.0, 250.0));
/// assert!(element.is_attached());
/// assert_eq!(element.content_length(), 0);
/// ```
#[derive(Debug)]
pub struct MockElement {
    key: String,
    attributes: RwLock<HashMap<String, String>>,
    content: RwLock<String>,
    children: AtomicU32,
    attached: AtomicBool,
    rect: RwLock<Rect>,
    visibility: RwLock<f64>,
}

impl MockElement {
    /// Creates an attached element with a 300x250 rectangle.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            attributes: RwLock::new(HashMap::new()),
            content: RwLock::new(String::new()),
            children: AtomicU32::new(0),
            attached: AtomicBool::new(true),
            rect: RwLock::new(Rect::new(0.0, 0.0, 300.0, 250.0)),
            visibility: RwLock::new(0.0),
        }
    }

    /// Sets the element's rectangle.
    pub fn with_rect(self, rect: Rect) -> Self {
        *self.rect.write().unwrap() = rect;
        self
    }

    /// Sets the element's visibility ratio.
    pub fn with_visibility(self, ratio: f64) -> Self {
        *self.visibility.write().unwrap() = ratio.clamp(0.0, 1.0);
        self
    }

    /// Detaches the element from the (simulated) document.
    pub fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }

    /// Updates the visibility ratio, simulating a scroll.
    pub fn set_visibility(&self, ratio: f64) {
        *self.visibility.write().unwrap() = ratio.clamp(0.0, 1.0);
    }

    /// Updates the rectangle, simulating layout changes (or a content
    /// blocker collapsing the container).
    pub fn set_rect(&self, rect: Rect) {
        *self.rect.write().unwrap() = rect;
    }

    /// Removes all injected content, simulating a blocker stripping it.
    pub fn strip_content(&self) {
        self.content.write().unwrap().clear();
        self.children.store(0, Ordering::SeqCst);
    }
}

impl ElementHandle for MockElement {
    fn node_key(&self) -> &str {
        &self.key
    }

    fn rect(&self) -> Rect {
        *self.rect.read().unwrap()
    }

    fn visibility_ratio(&self) -> f64 {
        *self.visibility.read().unwrap()
    }

    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.read().unwrap().get(name).cloned()
    }

    fn set_attribute(&self, name: &str, value: &str) {
        self.attributes
            .write()
            .unwrap()
            .insert(name.to_string(), value.to_string());
    }

    fn append_content(&self, content: &str) {
        self.content.write().unwrap().push_str(content);
        self.children.fetch_add(1, Ordering::SeqCst);
    }

    fn content_length(&self) -> usize {
        self.content.read().unwrap().len()
    }

    fn child_count(&self) -> usize {
        self.children.load(Ordering::SeqCst) as usize
    }
}

/// An in-memory document query surface.
#[derive(Debug, Default)]
pub struct MockDocument {
    nodes: RwLock<Vec<(String, ArcHandle)>>,
}

impl MockDocument {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node reachable through the given selector.
    pub fn add(&self, selector: impl Into<String>, handle: ArcHandle) {
        self.nodes.write().unwrap().push((selector.into(), handle));
    }
}

impl DocumentTree for MockDocument {
    fn query(&self, selector: &str) -> Vec<ArcHandle> {
        self.nodes
            .read()
            .unwrap()
            .iter()
            .filter(|(s, _)| s == selector)
            .map(|(_, h)| h.clone())
            .collect()
    }
}

/// How the mock provider behaves after a render request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Set the completion flag and inject content after the latency.
    Inject,
    /// Set the completion flag only; inject nothing.
    FlagOnly,
    /// Never signal completion in any way.
    Silent,
}

/// A configurable mock embed provider.
///
/// # Examples
///
/// ```rust
/// use embedbridge::providers::{MockProvider, RenderMode};
/// use std::time::Duration;
///
/// // A provider that renders after 20ms.
/// let provider = MockProvider::new().with_render_latency(Duration::from_millis(20));
///
/// // A provider whose primary endpoint is down.
/// let provider = MockProvider::new().with_failing_url("https://cdn.example/embed.js");
///
/// // A provider that never completes a render.
/// let provider = MockProvider::new().with_render_mode(RenderMode::Silent);
/// ```
#[derive(Debug)]
pub struct MockProvider {
    name: String,
    render_mode: RenderMode,
    render_latency: Duration,
    script_delay: Duration,
    failing_urls: RwLock<HashSet<String>>,
    fail_next_scripts: AtomicU32,
    flags: Arc<RwLock<HashSet<String>>>,
    script_loads: AtomicU64,
    render_requests: AtomicU64,
}

impl MockProvider {
    /// Creates a provider that injects content immediately.
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            render_mode: RenderMode::Inject,
            render_latency: Duration::ZERO,
            script_delay: Duration::ZERO,
            failing_urls: RwLock::new(HashSet::new()),
            fail_next_scripts: AtomicU32::new(0),
            flags: Arc::new(RwLock::new(HashSet::new())),
            script_loads: AtomicU64::new(0),
            render_requests: AtomicU64::new(0),
        }
    }

    /// Sets the provider name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the render behavior.
    pub fn with_render_mode(mut self, mode: RenderMode) -> Self {
        self.render_mode = mode;
        self
    }

    /// Sets the simulated render latency.
    pub fn with_render_latency(mut self, latency: Duration) -> Self {
        self.render_latency = latency;
        self
    }

    /// Sets the simulated script fetch delay.
    pub fn with_script_delay(mut self, delay: Duration) -> Self {
        self.script_delay = delay;
        self
    }

    /// Marks an endpoint URL as permanently failing.
    pub fn with_failing_url(self, url: impl Into<String>) -> Self {
        self.failing_urls.write().unwrap().insert(url.into());
        self
    }

    /// Fails the next `n` script loads regardless of URL.
    pub fn fail_next_scripts(&self, n: u32) {
        self.fail_next_scripts.store(n, Ordering::SeqCst);
    }

    /// Number of script loads attempted.
    pub fn script_load_count(&self) -> u64 {
        self.script_loads.load(Ordering::Relaxed)
    }

    /// Number of render requests received.
    pub fn render_request_count(&self) -> u64 {
        self.render_requests.load(Ordering::Relaxed)
    }

    fn complete_render(flags: &RwLock<HashSet<String>>, mode: RenderMode, handle: &ArcHandle) {
        match mode {
            RenderMode::Inject => {
                flags.write().unwrap().insert(handle.node_key().to_string());
                handle.append_content("<iframe class=\"embed-frame\"></iframe>");
            }
            RenderMode::FlagOnly => {
                flags.write().unwrap().insert(handle.node_key().to_string());
            }
            RenderMode::Silent => {}
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbedProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load_script(&self, url: &str, _timeout: Duration) -> Result<(), LoadError> {
        self.script_loads.fetch_add(1, Ordering::Relaxed);

        if !self.script_delay.is_zero() {
            tokio::time::sleep(self.script_delay).await;
        }

        let forced_failures = self.fail_next_scripts.load(Ordering::SeqCst);
        if forced_failures > 0 {
            self.fail_next_scripts.store(forced_failures - 1, Ordering::SeqCst);
            return Err(LoadError::script_unavailable(
                format!("simulated failure for '{url}'"),
                1,
            ));
        }

        if self.failing_urls.read().unwrap().contains(url) {
            return Err(LoadError::script_unavailable(
                format!("endpoint '{url}' unreachable"),
                1,
            ));
        }

        Ok(())
    }

    async fn request_render(&self, handle: &ArcHandle) -> Result<(), LoadError> {
        self.render_requests.fetch_add(1, Ordering::Relaxed);

        if self.render_latency.is_zero() {
            Self::complete_render(&self.flags, self.render_mode, handle);
            return Ok(());
        }

        let flags = Arc::clone(&self.flags);
        let mode = self.render_mode;
        let handle = handle.clone();
        let latency = self.render_latency;
        tokio::spawn(async move {
            tokio::time::sleep(latency).await;
            Self::complete_render(&flags, mode, &handle);
        });
        Ok(())
    }

    fn render_flag(&self, handle: &ArcHandle) -> bool {
        self.flags.read().unwrap().contains(handle.node_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_element_content() {
        let element = MockElement::new("el-1");
        assert_eq!(element.content_length(), 0);
        assert_eq!(element.child_count(), 0);

        element.append_content("<iframe></iframe>");
        assert!(element.content_length() > 0);
        assert_eq!(element.child_count(), 1);

        element.strip_content();
        assert_eq!(element.content_length(), 0);
        assert_eq!(element.child_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_document_query() {
        let document = MockDocument::new();
        document.add(".embed-slot", Arc::new(MockElement::new("a")));
        document.add(".other", Arc::new(MockElement::new("b")));

        assert_eq!(document.query(".embed-slot").len(), 1);
        assert_eq!(document.query(".missing").len(), 0);
    }

    #[tokio::test]
    async fn test_provider_inject_mode() {
        let provider = Arc::new(MockProvider::new());
        let handle: ArcHandle = Arc::new(MockElement::new("el-1"));

        provider.request_render(&handle).await.unwrap();
        assert!(provider.render_flag(&handle));
        assert!(handle.child_count() > 0);
        assert_eq!(provider.render_request_count(), 1);
    }

    #[tokio::test]
    async fn test_provider_silent_mode() {
        let provider = Arc::new(MockProvider::new().with_render_mode(RenderMode::Silent));
        let handle: ArcHandle = Arc::new(MockElement::new("el-1"));

        provider.request_render(&handle).await.unwrap();
        assert!(!provider.render_flag(&handle));
        assert_eq!(handle.child_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_deferred_render() {
        let provider = Arc::new(MockProvider::new().with_render_latency(Duration::from_millis(20)));
        let handle: ArcHandle = Arc::new(MockElement::new("el-1"));

        provider.request_render(&handle).await.unwrap();
        assert!(!provider.render_flag(&handle));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(provider.render_flag(&handle));
    }

    #[tokio::test]
    async fn test_provider_failing_url() {
        let provider =
            Arc::new(MockProvider::new().with_failing_url("https://cdn.example/embed.js"));

        let result = provider
            .load_script("https://cdn.example/embed.js", Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(LoadError::ScriptUnavailable { .. })));

        provider
            .load_script("https://backup.example/embed.js", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(provider.script_load_count(), 2);
    }

    #[tokio::test]
    async fn test_provider_fail_next_scripts() {
        let provider = Arc::new(MockProvider::new());
        provider.fail_next_scripts(2);

        assert!(provider
            .load_script("https://cdn.example/a.js", Duration::from_secs(1))
            .await
            .is_err());
        assert!(provider
            .load_script("https://cdn.example/a.js", Duration::from_secs(1))
            .await
            .is_err());
        assert!(provider
            .load_script("https://cdn.example/a.js", Duration::from_secs(1))
            .await
            .is_ok());
    }
}
