//! Rolling outcome metrics.
//!
//! A bounded window of [`MetricsSample`] records feeds the adaptive
//! controller and the status surface. Pure aggregation; this module
//! depends on nothing else in the crate.

mod store;

pub use store::{MetricsSample, MetricsStore, MetricsSummary};
