//! Priority estimation for load scheduling.
//!
//! Priority is a pure function of geometry, behavior signals, and per-resource
//! state. Estimators are pluggable strategy objects; the default weighs the
//! inputs linearly and squashes through `tanh` into `[MIN_PRIORITY,
//! MAX_PRIORITY]`. Estimation is deterministic and side-effect-free:
//! identical inputs always produce identical scores.

mod estimator;

pub use estimator::{PriorityEstimator, PriorityInputs, WeightedEstimator, MAX_PRIORITY, MIN_PRIORITY};
