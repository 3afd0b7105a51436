//! Range-clamped numeric parameter.

use serde::{Deserialize, Serialize};

/// A named numeric parameter constrained to `[min, max]`.
///
/// The invariant `min <= current <= max` holds for every value produced by
/// this type: the constructor orders the bounds and clamps the initial
/// value, and every mutation clamps again.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundedParam {
    min: f64,
    max: f64,
    current: f64,
}

impl BoundedParam {
    /// Creates a parameter, ordering the bounds and clamping the initial
    /// value into them.
    pub fn new(min: f64, max: f64, initial: f64) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            min,
            max,
            current: initial.clamp(min, max),
        }
    }

    /// Returns the lower bound.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Returns the upper bound.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Returns the current value.
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Sets the current value, clamped into the bounds.
    pub fn set(&mut self, value: f64) {
        self.current = value.clamp(self.min, self.max);
    }

    /// Adds `delta` to the current value, clamped into the bounds.
    /// Returns the new value.
    pub fn nudge(&mut self, delta: f64) -> f64 {
        self.set(self.current + delta);
        self.current
    }

    /// Returns `true` if the current value sits at the upper bound.
    pub fn at_max(&self) -> bool {
        self.current >= self.max
    }

    /// Returns `true` if the current value sits at the lower bound.
    pub fn at_min(&self) -> bool {
        self.current <= self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_initial_value() {
        let param = BoundedParam::new(1.0, 10.0, 50.0);
        assert_eq!(param.current(), 10.0);

        let param = BoundedParam::new(1.0, 10.0, -3.0);
        assert_eq!(param.current(), 1.0);
    }

    #[test]
    fn test_new_orders_swapped_bounds() {
        let param = BoundedParam::new(10.0, 1.0, 5.0);
        assert_eq!(param.min(), 1.0);
        assert_eq!(param.max(), 10.0);
        assert_eq!(param.current(), 5.0);
    }

    #[test]
    fn test_nudge_clamps() {
        let mut param = BoundedParam::new(0.0, 5.0, 4.0);
        assert_eq!(param.nudge(3.0), 5.0);
        assert!(param.at_max());
        assert_eq!(param.nudge(-20.0), 0.0);
        assert!(param.at_min());
    }

    #[test]
    fn test_set_stays_in_range() {
        let mut param = BoundedParam::new(2.0, 8.0, 4.0);
        for value in [-100.0, 0.0, 5.5, 7.99, 8.01, 1e9] {
            param.set(value);
            assert!(param.current() >= param.min());
            assert!(param.current() <= param.max());
        }
    }
}
