//! Circuit breaker guarding the shared script endpoint.
//!
//! The circuit breaker prevents the engine from hammering a failing
//! provider endpoint: repeated failures open the circuit, requests are
//! rejected while it is open, and after a cooldown a single trial request
//! probes for recovery.
//!
//! ## States
//!
//! - **Closed**: requests allowed; consecutive failures are counted.
//! - **Open**: requests rejected until the cooldown elapses.
//! - **Half-Open**: one trial request allowed; success closes the circuit,
//!   failure reopens it with a refreshed timestamp.
//!
//! ## Usage
//!
//! ```rust
//! use embedbridge::circuit_breaker::{BreakerConfig, CircuitBreaker};
//! use std::time::Duration;
//!
//! let breaker = CircuitBreaker::new(
//!     BreakerConfig::new()
//!         .with_failure_threshold(3)
//!         .with_cooldown(Duration::from_secs(30)),
//! );
//!
//! if breaker.allow_request() {
//!     // ... attempt the endpoint, then:
//!     breaker.record_failure();
//! }
//! ```

mod breaker;
mod config;
mod state;

pub use breaker::CircuitBreaker;
pub use config::BreakerConfig;
pub use state::{BreakerMetrics, BreakerState};
