//! Adaptive engine configuration.
//!
//! Every tunable engine parameter is a [`BoundedParam`] clamped to a
//! `[min, max]` range. Parameters are mutated only by the adaptive
//! controller and the engine's runtime configuration surface, and clamping
//! is enforced by construction so no mutation path can escape the range.

mod param;

pub use param::BoundedParam;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The named parameter table driving retry, batching, and timeout behavior.
///
/// Durations are stored as millisecond-valued parameters so the controller
/// can nudge them with plain arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveConfig {
    /// Maximum retry attempts per resource.
    pub max_retries: BoundedParam,
    /// Base delay between retries, in milliseconds.
    pub retry_interval_ms: BoundedParam,
    /// Number of resources loaded concurrently in one batch wave.
    pub batch_size: BoundedParam,
    /// Render-verification timeout, in milliseconds.
    pub timeout_ms: BoundedParam,
    /// Exponential backoff base factor.
    pub backoff_factor: BoundedParam,
    /// Multiplier applied to computed backoff delays; tuned by the
    /// adaptive controller under sustained failure.
    pub adjustment_factor: BoundedParam,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            max_retries: BoundedParam::new(1.0, 8.0, 3.0),
            retry_interval_ms: BoundedParam::new(250.0, 30_000.0, 1_000.0),
            batch_size: BoundedParam::new(1.0, 8.0, 3.0),
            timeout_ms: BoundedParam::new(1_000.0, 60_000.0, 8_000.0),
            backoff_factor: BoundedParam::new(1.1, 4.0, 2.0),
            adjustment_factor: BoundedParam::new(0.5, 3.0, 1.0),
        }
    }
}

impl AdaptiveConfig {
    /// Creates a configuration with default bounds and values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current maximum retry attempts.
    pub fn max_retries(&self) -> u32 {
        self.max_retries.current() as u32
    }

    /// Current base retry interval.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms.current() as u64)
    }

    /// Maximum retry interval permitted by the parameter bounds.
    pub fn retry_interval_max(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms.max() as u64)
    }

    /// Current batch size.
    pub fn batch_size(&self) -> usize {
        (self.batch_size.current() as usize).max(1)
    }

    /// Current render-verification timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.current() as u64)
    }

    /// Current backoff base factor.
    pub fn backoff_factor(&self) -> f64 {
        self.backoff_factor.current()
    }

    /// Current backoff adjustment factor.
    pub fn adjustment_factor(&self) -> f64 {
        self.adjustment_factor.current()
    }

    /// Sets a parameter by name, clamping into its bounds.
    ///
    /// Names: `max_retries`, `retry_interval_ms`, `batch_size`,
    /// `timeout_ms`, `backoff_factor`, `adjustment_factor`.
    pub fn set(&mut self, name: &str, value: f64) -> Result<(), crate::core::LoadError> {
        let param = match name {
            "max_retries" => &mut self.max_retries,
            "retry_interval_ms" => &mut self.retry_interval_ms,
            "batch_size" => &mut self.batch_size,
            "timeout_ms" => &mut self.timeout_ms,
            "backoff_factor" => &mut self.backoff_factor,
            "adjustment_factor" => &mut self.adjustment_factor,
            other => {
                return Err(crate::core::LoadError::configuration(format!(
                    "unknown parameter '{other}'"
                )))
            }
        };
        param.set(value);
        Ok(())
    }

    /// Returns a serializable snapshot of all current values.
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            max_retries: self.max_retries(),
            retry_interval_ms: self.retry_interval_ms.current() as u64,
            batch_size: self.batch_size(),
            timeout_ms: self.timeout_ms.current() as u64,
            backoff_factor: self.backoff_factor(),
            adjustment_factor: self.adjustment_factor(),
        }
    }
}

/// Point-in-time view of the configuration for the status surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Current maximum retry attempts.
    pub max_retries: u32,
    /// Current base retry interval in milliseconds.
    pub retry_interval_ms: u64,
    /// Current batch size.
    pub batch_size: usize,
    /// Current verification timeout in milliseconds.
    pub timeout_ms: u64,
    /// Current backoff base factor.
    pub backoff_factor: f64,
    /// Current backoff adjustment factor.
    pub adjustment_factor: f64,
}
