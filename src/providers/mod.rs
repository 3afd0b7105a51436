//! Provider-side plumbing: script endpoint loading and test doubles.
//!
//! The embed provider itself is an external collaborator behind the
//! [`EmbedProvider`](crate::core::EmbedProvider) trait. This module holds
//! the breaker-guarded script loader that talks to it and the mock
//! implementations used by tests and demos.

pub mod mock;
mod script;

pub use mock::{MockDocument, MockElement, MockProvider, RenderMode};
pub use script::{ScriptEndpoints, ScriptLoader};
