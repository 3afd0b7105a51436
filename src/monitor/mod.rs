//! Health monitoring: the watchdog over the resource registry.

mod watchdog;

pub use watchdog::{HealthMonitor, TickOutcome, WatchdogConfig, STUCK_RESET_KIND};
