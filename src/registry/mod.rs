//! Resource registry and placeholder discovery.
//!
//! The registry is the single source of truth for discovered placeholder
//! regions and their lifecycle state. Its processing set grants at most
//! one in-flight pipeline execution per resource id.

mod discovery;
mod store;

pub use discovery::{discover_into, DiscoveryConfig, DiscoveryOutcome};
pub use store::ResourceRegistry;
