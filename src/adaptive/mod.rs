//! The adaptive controller: closed-loop tuning of engine parameters.

mod controller;

pub use controller::{AdaptiveController, Adjustment, ControllerConfig};
