//! Custom provider example demonstrating how to integrate a new embed
//! provider.
//!
//! This example shows how to:
//! - Implement the EmbedProvider trait for a custom provider
//! - Signal render completion through the completion flag
//! - Exercise the circuit breaker with a flaky endpoint
//!
//! Run with: cargo run --example custom_provider

use async_trait::async_trait;
use embedbridge::prelude::*;
use embedbridge::core::ArcHandle;
use embedbridge::providers::{MockDocument, MockElement};

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// A provider whose script endpoint fails a few times before recovering.
///
/// This demonstrates how to implement a custom provider integration and
/// how the engine's fallback and breaker machinery reacts to a flaky CDN.
#[derive(Debug)]
struct FlakyCdnProvider {
    failures_remaining: AtomicU32,
    rendered: RwLock<HashSet<String>>,
}

impl FlakyCdnProvider {
    fn new(initial_failures: u32) -> Self {
        Self {
            failures_remaining: AtomicU32::new(initial_failures),
            rendered: RwLock::new(HashSet::new()),
        }
    }
}

#[async_trait]
impl EmbedProvider for FlakyCdnProvider {
    fn name(&self) -> &str {
        "flaky-cdn"
    }

    async fn load_script(&self, url: &str, _timeout: Duration) -> Result<(), LoadError> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            println!("  [provider] script fetch from {url} failed ({remaining} failures left)");
            return Err(LoadError::script_unavailable(
                format!("simulated CDN outage at '{url}'"),
                1,
            ));
        }
        println!("  [provider] script fetched from {url}");
        Ok(())
    }

    async fn request_render(&self, handle: &ArcHandle) -> Result<(), LoadError> {
        // A real provider pushes onto an opaque queue; this one renders
        // synchronously and sets its completion flag.
        handle.append_content("<iframe src=\"https://embed.example/frame\"></iframe>");
        self.rendered
            .write()
            .unwrap()
            .insert(handle.node_key().to_string());
        Ok(())
    }

    fn render_flag(&self, handle: &ArcHandle) -> bool {
        self.rendered.read().unwrap().contains(handle.node_key())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Embedbridge Custom Provider Example ===\n");

    let slot = Arc::new(
        MockElement::new("article-inline")
            .with_rect(Rect::new(300.0, 0.0, 728.0, 90.0))
            .with_visibility(1.0),
    );
    let tree = MockDocument::new();
    tree.add(".embed-slot", slot);

    // The primary endpoint fails twice; retries and the fallback carry the
    // load through.
    let engine = EmbedEngine::builder()
        .with_provider(FlakyCdnProvider::new(2))
        .with_tree(tree)
        .with_endpoints(
            ScriptEndpoints::new("https://cdn.flaky.example/embed.js")
                .with_fallback("https://backup.flaky.example/embed.js"),
        )
        .with_evaluation_interval(Duration::from_millis(50))
        .build()?;

    engine.start();
    tokio::time::sleep(Duration::from_millis(500)).await;
    engine.shutdown();

    let status = engine.status();
    println!("\nBreaker state: {}", status.breaker_state);
    println!("Loaded: {}/{}", status.counts.loaded, status.counts.total);
    println!("Success rate: {:.0}%", status.success_rate * 100.0);

    Ok(())
}
