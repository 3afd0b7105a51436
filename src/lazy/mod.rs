//! Viewport-driven lazy activation.
//!
//! Resources are not loaded at discovery. The lazy trigger watches idle
//! resources and activates each one exactly once when it becomes
//! sufficiently visible or scrolls close enough to the viewport.

mod trigger;

pub use trigger::{LazyTrigger, TriggerConfig};
