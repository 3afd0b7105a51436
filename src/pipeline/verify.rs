//! Render-completion verification.
//!
//! The provider gives no callback when a render finishes, so completion is
//! inferred from independent side-effect probes: the provider's completion
//! flag, injected child nodes, and accumulated content length. Any single
//! signal is accepted. The same probes double as suppression detection: a
//! container that had size at discovery and collapses to zero area without
//! any success signal is evidence of a content blocker.

use crate::core::{ArcHandle, ArcProvider};

use std::time::Duration;

/// Tunables for the verification probes.
#[derive(Debug, Clone)]
pub struct VerifyConfig {
    /// Minimum injected content length accepted as a success signal.
    pub min_content_length: usize,
    /// How often the pipeline re-probes while waiting for completion.
    pub poll_interval: Duration,
    /// Consecutive zero-area observations required before suppression is
    /// reported; guards against transient layout passes.
    pub suppression_grace_polls: u32,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            min_content_length: 32,
            poll_interval: Duration::from_millis(250),
            suppression_grace_polls: 3,
        }
    }
}

impl VerifyConfig {
    /// Creates a configuration with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum content length accepted as success.
    pub fn with_min_content_length(mut self, length: usize) -> Self {
        self.min_content_length = length;
        self
    }

    /// Sets the probe interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the suppression confirmation threshold.
    pub fn with_suppression_grace_polls(mut self, polls: u32) -> Self {
        self.suppression_grace_polls = polls.max(1);
        self
    }
}

/// Result of one verification probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    /// A success signal fired.
    Complete,
    /// No signal yet; keep polling.
    Pending,
    /// Suppression confirmed, with a description of the evidence.
    Suppressed(String),
}

/// Stateful probe for one render attempt.
///
/// Created fresh per attempt; carries the discovery-time area and the
/// consecutive zero-area streak between polls.
#[derive(Debug)]
pub struct RenderProbe {
    config: VerifyConfig,
    initial_area: f64,
    zero_area_streak: u32,
}

impl RenderProbe {
    /// Creates a probe for a container that had `initial_area` square
    /// pixels at discovery.
    pub fn new(config: VerifyConfig, initial_area: f64) -> Self {
        Self {
            config,
            initial_area,
            zero_area_streak: 0,
        }
    }

    /// Probes the handle once.
    ///
    /// Success signals are checked first so a rendered embed inside a
    /// collapsed container is never misread as suppressed.
    pub fn probe(&mut self, provider: &ArcProvider, handle: &ArcHandle) -> ProbeResult {
        if provider.render_flag(handle)
            || handle.child_count() > 0
            || handle.content_length() >= self.config.min_content_length
        {
            return ProbeResult::Complete;
        }

        if self.initial_area > 0.0 && handle.rect().area() == 0.0 {
            self.zero_area_streak += 1;
            if self.zero_area_streak >= self.config.suppression_grace_polls {
                return ProbeResult::Suppressed(format!(
                    "container collapsed from {:.0}px\u{b2} to zero area for {} consecutive polls",
                    self.initial_area, self.zero_area_streak
                ));
            }
        } else {
            self.zero_area_streak = 0;
        }

        ProbeResult::Pending
    }
}
