//! The per-resource load pipeline.
//!
//! One pipeline execution takes a resource from activation to a terminal
//! outcome: attribute repair, priority-derived scheduling, script
//! availability, render request, completion verification, and the retry
//! loop around all of it. The registry's processing set guarantees at most
//! one execution per resource at a time.

use crate::config::AdaptiveConfig;
use crate::core::{
    ArcProvider, ArcSignals, FailureRecord, LoadError, LoadResult, LoadStatus, ResourceId,
};
use crate::metrics::{MetricsSample, MetricsStore};
use crate::pipeline::verify::{ProbeResult, RenderProbe, VerifyConfig};
use crate::providers::ScriptLoader;
use crate::registry::ResourceRegistry;
use crate::retry::{RetryContext, RetryPolicy};

use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::Instant;

/// Samples consulted for the rolling success rate in retry decisions.
const RETRY_CONTEXT_WINDOW: usize = 20;

/// Static (non-adaptive) pipeline tunables.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Attributes every managed node must carry. `Some` is a repair
    /// default written onto the node when the attribute is missing; `None`
    /// means a missing attribute is irreparable and fails validation.
    pub required_attributes: Vec<(String, Option<String>)>,
    /// Upper bound on the priority-derived scheduling delay; the
    /// highest-priority resource starts immediately, the lowest waits
    /// this long.
    pub max_schedule_delay: Duration,
    /// Content injected when loading fails open.
    pub fail_open_content: String,
    /// Verification probe tunables.
    pub verify: VerifyConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            required_attributes: vec![("data-embed-format".to_string(), Some("auto".to_string()))],
            max_schedule_delay: Duration::from_millis(250),
            fail_open_content: "<div class=\"embed-unavailable\"></div>".to_string(),
            verify: VerifyConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the required-attribute list.
    pub fn with_required_attributes(mut self, attributes: Vec<(String, Option<String>)>) -> Self {
        self.required_attributes = attributes;
        self
    }

    /// Sets the maximum scheduling delay.
    pub fn with_max_schedule_delay(mut self, delay: Duration) -> Self {
        self.max_schedule_delay = delay;
        self
    }

    /// Sets the fail-open placeholder content.
    pub fn with_fail_open_content(mut self, content: impl Into<String>) -> Self {
        self.fail_open_content = content.into();
        self
    }

    /// Sets the verification tunables.
    pub fn with_verify(mut self, verify: VerifyConfig) -> Self {
        self.verify = verify;
        self
    }
}

/// Executes load attempts for individual resources.
#[derive(Debug)]
pub struct LoadPipeline {
    registry: Arc<RwLock<ResourceRegistry>>,
    config: Arc<RwLock<AdaptiveConfig>>,
    metrics: Arc<RwLock<MetricsStore>>,
    retry: Arc<RetryPolicy>,
    script: Arc<ScriptLoader>,
    provider: ArcProvider,
    signals: ArcSignals,
    pipeline_config: PipelineConfig,
}

/// Internal outcome of one attempt, before retry evaluation.
enum AttemptOutcome {
    Loaded { elapsed: Duration },
    Failed(LoadError),
}

impl LoadPipeline {
    /// Creates a pipeline over the shared engine state.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<RwLock<ResourceRegistry>>,
        config: Arc<RwLock<AdaptiveConfig>>,
        metrics: Arc<RwLock<MetricsStore>>,
        retry: Arc<RetryPolicy>,
        script: Arc<ScriptLoader>,
        provider: ArcProvider,
        signals: ArcSignals,
        pipeline_config: PipelineConfig,
    ) -> Self {
        Self {
            registry,
            config,
            metrics,
            retry,
            script,
            provider,
            signals,
            pipeline_config,
        }
    }

    /// Runs the load pipeline for one resource to a terminal outcome.
    ///
    /// Re-entrant calls are no-ops: if the resource is already loaded or
    /// another execution holds its processing slot, the current status is
    /// returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Internal`] if the id is not registered. Load
    /// failures are not errors here; they resolve to `Failed` or `Blocked`.
    pub async fn run(&self, id: &ResourceId) -> LoadResult<LoadStatus> {
        {
            let mut registry = self.lock_registry();
            let status = registry
                .get(id)
                .map(|r| r.status)
                .ok_or_else(|| LoadError::internal(format!("unknown resource '{id}'")))?;
            if status == LoadStatus::Loaded || !registry.begin_processing(id) {
                return Ok(status);
            }
        }

        let outcome = self.run_claimed(id).await;
        self.lock_registry().finish_processing(id);
        outcome
    }

    async fn run_claimed(&self, id: &ResourceId) -> LoadResult<LoadStatus> {
        let mut first_attempt = true;

        loop {
            if first_attempt {
                let delay = self.schedule_delay(id);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            first_attempt = false;

            let outcome = self.attempt(id).await?;
            let error = match outcome {
                AttemptOutcome::Loaded { elapsed } => {
                    self.resolve_loaded(id, elapsed);
                    return Ok(LoadStatus::Loaded);
                }
                AttemptOutcome::Failed(error) => error,
            };

            self.retry.record_failure(id, &error);
            self.lock_metrics().record(MetricsSample::failure());

            let (ctx, delay_inputs) = self.retry_inputs();
            if self.retry.should_retry(id, &error, &ctx) {
                let attempts = self.retry.state_of(id).map(|s| s.attempts).unwrap_or(1);
                let delay = self.retry.next_delay(
                    attempts,
                    delay_inputs.base,
                    delay_inputs.backoff_factor,
                    delay_inputs.adjustment_factor,
                    delay_inputs.max,
                );
                if let Some(resource) = self.lock_registry().get_mut(id) {
                    resource.record_failure(
                        FailureRecord::new(error.kind(), error.to_string()),
                        LoadStatus::Triggered,
                    );
                }
                tracing::debug!(
                    target: "embedbridge::events",
                    resource_id = %id,
                    error = %error,
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying load after backoff"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            return Ok(self.resolve_terminal(id, error));
        }
    }

    /// One load attempt: attribute repair, script, render, verification.
    async fn attempt(&self, id: &ResourceId) -> LoadResult<AttemptOutcome> {
        let started = Instant::now();

        if self.signals.network_quality().is_offline() {
            return Ok(AttemptOutcome::Failed(LoadError::NetworkOffline));
        }

        let (handle, initial_area) = {
            let mut registry = self.lock_registry();
            let resource = registry
                .get_mut(id)
                .ok_or_else(|| LoadError::internal(format!("resource '{id}' disappeared")))?;

            if !resource.handle.is_attached() {
                return Ok(AttemptOutcome::Failed(LoadError::element_detached(
                    id.as_str(),
                )));
            }

            for (name, default) in &self.pipeline_config.required_attributes {
                if resource.handle.attribute(name).is_none() {
                    match default {
                        Some(value) => resource.set_attribute(name.clone(), value.clone()),
                        None => {
                            return Ok(AttemptOutcome::Failed(LoadError::validation_failure(
                                id.as_str(),
                                format!("missing required attribute '{name}'"),
                            )));
                        }
                    }
                }
            }

            resource.mark_loading();
            (resource.handle.clone(), resource.geometry.rect.area())
        };

        if let Err(error) = self.script.ensure_loaded().await {
            return Ok(AttemptOutcome::Failed(error));
        }

        if let Err(error) = self.provider.request_render(&handle).await {
            return Ok(AttemptOutcome::Failed(error));
        }

        let timeout = self.lock_config().timeout();
        let deadline = started + timeout;
        let mut probe = RenderProbe::new(self.pipeline_config.verify.clone(), initial_area);

        loop {
            match probe.probe(&self.provider, &handle) {
                ProbeResult::Complete => {
                    return Ok(AttemptOutcome::Loaded {
                        elapsed: started.elapsed(),
                    });
                }
                ProbeResult::Suppressed(evidence) => {
                    return Ok(AttemptOutcome::Failed(LoadError::render_suppressed(
                        id.as_str(),
                        evidence,
                    )));
                }
                ProbeResult::Pending => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(AttemptOutcome::Failed(LoadError::render_timeout(
                            id.as_str(),
                            started.elapsed(),
                        )));
                    }
                    let wait = self
                        .pipeline_config
                        .verify
                        .poll_interval
                        .min(deadline - now);
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    fn resolve_loaded(&self, id: &ResourceId, elapsed: Duration) {
        if let Some(resource) = self.lock_registry().get_mut(id) {
            resource.mark_loaded();
        }
        self.retry.clear(id);
        self.lock_metrics().record(MetricsSample::success(elapsed));
        tracing::info!(
            target: "embedbridge::events",
            resource_id = %id,
            elapsed_ms = elapsed.as_millis() as u64,
            "Resource loaded"
        );
    }

    /// Resolves an unretryable failure to `Failed`, `Blocked`, or a
    /// fail-open `Loaded`.
    fn resolve_terminal(&self, id: &ResourceId, error: LoadError) -> LoadStatus {
        let fail_open = matches!(
            error,
            LoadError::CircuitOpen { .. } | LoadError::ScriptUnavailable { .. }
        );

        let mut registry = self.lock_registry();
        let Some(resource) = registry.get_mut(id) else {
            return LoadStatus::Failed;
        };

        if fail_open {
            // Endpoint delivery is down; keep the page layout stable with
            // placeholder content rather than leaving an empty container.
            resource.handle.append_content(&self.pipeline_config.fail_open_content);
            resource
                .failure_reasons
                .push(FailureRecord::new(error.kind(), error.to_string()));
            resource.mark_loaded();
            drop(registry);
            self.retry.clear(id);
            tracing::warn!(
                target: "embedbridge::events",
                resource_id = %id,
                error = %error,
                "Script delivery down; resource failed open with placeholder content"
            );
            return LoadStatus::Loaded;
        }

        let status = if error.indicates_blocking() {
            LoadStatus::Blocked
        } else {
            LoadStatus::Failed
        };
        resource.record_failure(FailureRecord::new(error.kind(), error.to_string()), status);
        tracing::warn!(
            target: "embedbridge::events",
            resource_id = %id,
            error = %error,
            status = status.name(),
            "Resource resolved to terminal failure"
        );
        status
    }

    /// Priority-derived delay: priority 200 starts immediately, priority 0
    /// waits the full `max_schedule_delay`.
    fn schedule_delay(&self, id: &ResourceId) -> Duration {
        let priority = self
            .lock_registry()
            .get(id)
            .map(|r| r.priority)
            .unwrap_or(0.0);
        self.pipeline_config
            .max_schedule_delay
            .mul_f64(((200.0 - priority) / 200.0).clamp(0.0, 1.0))
    }

    fn retry_inputs(&self) -> (RetryContext, DelayInputs) {
        // Copy config values out before touching the metrics lock; the
        // controller loop acquires these locks in the opposite order.
        let (max_retries, delay) = {
            let config = self.lock_config();
            (
                config.max_retries(),
                DelayInputs {
                    base: config.retry_interval(),
                    backoff_factor: config.backoff_factor(),
                    adjustment_factor: config.adjustment_factor(),
                    max: config.retry_interval_max(),
                },
            )
        };
        let ctx = RetryContext {
            max_retries,
            success_rate: self.lock_metrics().success_rate(RETRY_CONTEXT_WINDOW),
            engagement_score: self.signals.engagement_score(),
        };
        (ctx, delay)
    }

    fn lock_registry(&self) -> std::sync::RwLockWriteGuard<'_, ResourceRegistry> {
        self.registry
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_config(&self) -> std::sync::RwLockReadGuard<'_, AdaptiveConfig> {
        self.config
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_metrics(&self) -> std::sync::RwLockWriteGuard<'_, MetricsStore> {
        self.metrics
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct DelayInputs {
    base: Duration,
    backoff_factor: f64,
    adjustment_factor: f64,
    max: Duration,
}
