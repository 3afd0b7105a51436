//! Basic engine example demonstrating a full page session.
//!
//! This example shows how to:
//! - Build an EmbedEngine over a document tree and provider
//! - Start a session with lazy activation
//! - Simulate a scroll and watch below-fold resources load
//! - Read the status surface
//!
//! Run with: cargo run --example basic_engine

use embedbridge::prelude::*;
use embedbridge::providers::{MockDocument, MockElement, MockProvider};

use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Embedbridge Basic Engine Example ===\n");

    // Build a simulated page: one placeholder above the fold, one far below.
    let hero = Arc::new(
        MockElement::new("hero-banner")
            .with_rect(Rect::new(120.0, 0.0, 970.0, 250.0))
            .with_visibility(1.0),
    );
    let footer = Arc::new(
        MockElement::new("footer-slot")
            .with_rect(Rect::new(18_000.0, 0.0, 300.0, 250.0))
            .with_visibility(0.0),
    );

    let tree = MockDocument::new();
    tree.add(".embed-slot", hero.clone());
    tree.add(".embed-slot", footer.clone());

    // A provider that renders after a short simulated queue delay.
    let provider = MockProvider::new().with_render_latency(Duration::from_millis(50));

    let engine = EmbedEngine::builder()
        .with_provider(provider)
        .with_tree(tree)
        .with_endpoints(
            ScriptEndpoints::new("https://cdn.example/embed.js")
                .with_fallback("https://backup.example/embed.js"),
        )
        .with_evaluation_interval(Duration::from_millis(50))
        .build()?;

    println!("Session: {}\n", engine.session_id());
    engine.start();

    // The hero placeholder is visible and loads immediately; the footer
    // placeholder stays dormant.
    tokio::time::sleep(Duration::from_millis(400)).await;
    let status = engine.status();
    println!("After initial load:");
    println!("  loaded:     {}", status.counts.loaded);
    println!("  discovered: {}", status.counts.discovered);

    // Simulate the user scrolling the footer into view.
    println!("\nScrolling footer slot into view...");
    footer.set_visibility(0.6);

    tokio::time::sleep(Duration::from_millis(400)).await;
    let status = engine.status();
    println!("After scroll:");
    println!("  loaded:     {}", status.counts.loaded);
    println!("  discovered: {}", status.counts.discovered);

    engine.shutdown();

    println!("\n=== Final Status ===");
    println!("{}", serde_json::to_string_pretty(&engine.status())?);

    Ok(())
}
