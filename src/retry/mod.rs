//! Retry policy: backoff delays and the retry eligibility gate.
//!
//! Delays grow exponentially with attempt count, multiplied by a bounded
//! jitter and the adaptive adjustment factor, and are capped at the
//! configured maximum. Eligibility combines a hard attempt bound with a
//! probability gate so retries are likely early and increasingly unlikely
//! after repeated failures, without a hard cliff.
//!
//! Jitter and the gate draw from a deterministic low-discrepancy sequence
//! rather than an RNG, keeping the backoff envelope reproducible in tests
//! while still de-synchronizing retry storms.

mod policy;

pub use policy::{RetryContext, RetryPolicy, RetryState};
