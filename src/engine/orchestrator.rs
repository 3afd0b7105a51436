//! The main engine implementation.

use crate::adaptive::{AdaptiveController, ControllerConfig};
use crate::circuit_breaker::{BreakerConfig, CircuitBreaker};
use crate::config::AdaptiveConfig;
use crate::core::{
    ArcDocumentTree, ArcProvider, ArcSignals, EngineStatus, LoadError, LoadResult, LoadStatus,
    ResourceId, StaticSignals,
};
use crate::lazy::{LazyTrigger, TriggerConfig};
use crate::metrics::MetricsStore;
use crate::monitor::{HealthMonitor, WatchdogConfig};
use crate::pipeline::{LoadPipeline, PipelineConfig};
use crate::priority::{PriorityEstimator, PriorityInputs, WeightedEstimator};
use crate::providers::{ScriptEndpoints, ScriptLoader};
use crate::registry::{discover_into, DiscoveryConfig, ResourceRegistry};
use crate::retry::RetryPolicy;
use crate::telemetry;

use chrono::Utc;
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

/// Samples consulted for the status surface's rolling figures.
const STATUS_WINDOW: usize = 50;

/// Builder for creating an [`EmbedEngine`].
pub struct EmbedEngineBuilder {
    provider: Option<ArcProvider>,
    tree: Option<ArcDocumentTree>,
    signals: Option<ArcSignals>,
    estimator: Option<Arc<dyn PriorityEstimator>>,
    endpoints: Option<ScriptEndpoints>,
    adaptive: AdaptiveConfig,
    discovery: DiscoveryConfig,
    pipeline: PipelineConfig,
    trigger: TriggerConfig,
    watchdog: WatchdogConfig,
    controller: ControllerConfig,
    breaker: BreakerConfig,
    script_timeout: Duration,
    evaluation_interval: Duration,
}

impl EmbedEngineBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            provider: None,
            tree: None,
            signals: None,
            estimator: None,
            endpoints: None,
            adaptive: AdaptiveConfig::default(),
            discovery: DiscoveryConfig::default(),
            pipeline: PipelineConfig::default(),
            trigger: TriggerConfig::default(),
            watchdog: WatchdogConfig::default(),
            controller: ControllerConfig::default(),
            breaker: BreakerConfig::default(),
            script_timeout: Duration::from_secs(3),
            evaluation_interval: Duration::from_millis(200),
        }
    }

    /// Sets the embed provider.
    pub fn with_provider<P: crate::core::EmbedProvider + 'static>(mut self, provider: P) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// Sets the embed provider from an existing Arc.
    pub fn with_arc_provider(mut self, provider: ArcProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Sets the document tree.
    pub fn with_tree<T: crate::core::DocumentTree + 'static>(mut self, tree: T) -> Self {
        self.tree = Some(Arc::new(tree));
        self
    }

    /// Sets the document tree from an existing Arc.
    pub fn with_arc_tree(mut self, tree: ArcDocumentTree) -> Self {
        self.tree = Some(tree);
        self
    }

    /// Sets the behavior signal source.
    pub fn with_signals<S: crate::core::BehaviorSignals + 'static>(mut self, signals: S) -> Self {
        self.signals = Some(Arc::new(signals));
        self
    }

    /// Sets the priority estimator.
    pub fn with_estimator<E: PriorityEstimator + 'static>(mut self, estimator: E) -> Self {
        self.estimator = Some(Arc::new(estimator));
        self
    }

    /// Sets the provider script endpoints.
    pub fn with_endpoints(mut self, endpoints: ScriptEndpoints) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Sets the adaptive parameter table.
    pub fn with_adaptive_config(mut self, config: AdaptiveConfig) -> Self {
        self.adaptive = config;
        self
    }

    /// Sets the discovery configuration.
    pub fn with_discovery(mut self, discovery: DiscoveryConfig) -> Self {
        self.discovery = discovery;
        self
    }

    /// Sets the pipeline configuration.
    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Sets the lazy-trigger thresholds.
    pub fn with_trigger(mut self, trigger: TriggerConfig) -> Self {
        self.trigger = trigger;
        self
    }

    /// Sets the watchdog thresholds.
    pub fn with_watchdog(mut self, watchdog: WatchdogConfig) -> Self {
        self.watchdog = watchdog;
        self
    }

    /// Sets the adaptive-controller thresholds.
    pub fn with_controller(mut self, controller: ControllerConfig) -> Self {
        self.controller = controller;
        self
    }

    /// Sets the circuit-breaker configuration.
    pub fn with_breaker(mut self, breaker: BreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }

    /// Sets the per-endpoint script fetch timeout.
    pub fn with_script_timeout(mut self, timeout: Duration) -> Self {
        self.script_timeout = timeout;
        self
    }

    /// Sets how often the engine evaluates the lazy trigger and dispatches
    /// batch waves.
    pub fn with_evaluation_interval(mut self, interval: Duration) -> Self {
        self.evaluation_interval = interval;
        self
    }

    /// Builds the engine.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Configuration`] if the provider, document
    /// tree, or script endpoints are missing.
    pub fn build(self) -> LoadResult<Arc<EmbedEngine>> {
        let provider = self
            .provider
            .ok_or_else(|| LoadError::configuration("an embed provider is required"))?;
        let tree = self
            .tree
            .ok_or_else(|| LoadError::configuration("a document tree is required"))?;
        let endpoints = self
            .endpoints
            .ok_or_else(|| LoadError::configuration("script endpoints are required"))?;

        let signals = self
            .signals
            .unwrap_or_else(|| Arc::new(StaticSignals::new()));
        let estimator = self
            .estimator
            .unwrap_or_else(|| Arc::new(WeightedEstimator::new()));

        let registry = Arc::new(RwLock::new(ResourceRegistry::new()));
        let baseline = self.adaptive.snapshot();
        let config = Arc::new(RwLock::new(self.adaptive));
        let metrics = Arc::new(RwLock::new(MetricsStore::default()));
        let retry = Arc::new(RetryPolicy::new());
        let breaker = Arc::new(CircuitBreaker::new(self.breaker));
        let script = Arc::new(ScriptLoader::new(
            provider.clone(),
            endpoints,
            breaker.clone(),
            self.script_timeout,
        ));

        let pipeline = Arc::new(LoadPipeline::new(
            registry.clone(),
            config.clone(),
            metrics.clone(),
            retry.clone(),
            script.clone(),
            provider.clone(),
            signals.clone(),
            self.pipeline,
        ));

        let watchdog_interval = self.watchdog.tick_interval;
        let controller_interval = self.controller.tick_interval;

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Arc::new(EmbedEngine {
            session_id: format!("embed-{}", Uuid::new_v4().simple()),
            provider,
            tree,
            signals,
            estimator,
            registry,
            config,
            metrics,
            retry,
            breaker,
            script,
            pipeline,
            trigger: LazyTrigger::new(self.trigger),
            monitor: HealthMonitor::new(self.watchdog),
            controller: AdaptiveController::new(self.controller, baseline),
            discovery: self.discovery,
            next_index: Mutex::new(0),
            evaluation_interval: self.evaluation_interval,
            watchdog_interval,
            controller_interval,
            shutdown: shutdown_tx,
            started: AtomicBool::new(false),
        }))
    }
}

impl Default for EmbedEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Orchestrates discovery, lazy activation, loading, and recovery for one
/// page session.
///
/// Built once per page via [`EmbedEngine::builder`]; [`start`] runs the
/// first discovery pass and spawns the background loops, and [`shutdown`]
/// stops them. All state is interior so the engine is shared behind an
/// `Arc`.
///
/// [`start`]: EmbedEngine::start
/// [`shutdown`]: EmbedEngine::shutdown
pub struct EmbedEngine {
    session_id: String,
    provider: ArcProvider,
    tree: ArcDocumentTree,
    signals: ArcSignals,
    estimator: Arc<dyn PriorityEstimator>,
    registry: Arc<RwLock<ResourceRegistry>>,
    config: Arc<RwLock<AdaptiveConfig>>,
    metrics: Arc<RwLock<MetricsStore>>,
    retry: Arc<RetryPolicy>,
    breaker: Arc<CircuitBreaker>,
    script: Arc<ScriptLoader>,
    pipeline: Arc<LoadPipeline>,
    trigger: LazyTrigger,
    monitor: HealthMonitor,
    controller: AdaptiveController,
    discovery: DiscoveryConfig,
    next_index: Mutex<usize>,
    evaluation_interval: Duration,
    watchdog_interval: Duration,
    controller_interval: Duration,
    shutdown: watch::Sender<bool>,
    started: AtomicBool,
}

impl EmbedEngine {
    /// Creates a new builder.
    pub fn builder() -> EmbedEngineBuilder {
        EmbedEngineBuilder::new()
    }

    /// This engine's session identifier.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The shared circuit breaker.
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Returns `true` once the provider script has loaded.
    pub fn script_loaded(&self) -> bool {
        self.script.is_loaded()
    }

    /// Starts the engine: runs the initial discovery pass, puts every
    /// discovered resource under lazy watch, and spawns the evaluation,
    /// watchdog, and controller loops.
    ///
    /// Idempotent; a second call does nothing.
    pub fn start(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let registered = self.discover();
        telemetry::emit_session_started(&self.session_id, registered.len());

        self.spawn_evaluation_loop();
        self.spawn_watchdog_loop();
        self.spawn_controller_loop();
    }

    /// Stops the background loops and emits the session summary.
    ///
    /// In-flight pipeline executions run to completion; no new work is
    /// dispatched afterward.
    pub fn shutdown(&self) {
        if !self.started.load(Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown.send(true);
        telemetry::emit_session_stopped(&self.session_id, &self.status());
    }

    /// Re-scans the document tree for placeholders added after start.
    ///
    /// Newly registered resources go under lazy watch like the initial
    /// batch; nodes already tagged from an earlier pass are skipped.
    pub fn rediscover(&self) -> Vec<ResourceId> {
        self.discover()
    }

    /// Loads one resource immediately, bypassing the lazy trigger.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Internal`] if the id is not registered.
    pub async fn load_now(&self, id: &ResourceId) -> LoadResult<LoadStatus> {
        self.trigger.unobserve(id);
        {
            let mut registry = self.lock_registry();
            if let Some(resource) = registry.get_mut(id) {
                if resource.status == LoadStatus::Discovered {
                    resource.status = LoadStatus::Triggered;
                }
            }
        }
        self.pipeline.run(id).await
    }

    /// Handles an explicit network-recovery notification.
    ///
    /// Resets the circuit breaker and requeues every `Blocked` resource
    /// for another attempt; failures caused by the outage get a fresh
    /// start instead of waiting out backoff and cooldown.
    pub fn on_network_recovered(&self) -> Vec<ResourceId> {
        self.breaker.reset();

        let requeued: Vec<ResourceId> = {
            let mut registry = self.lock_registry();
            let blocked = registry.ids_with_status(LoadStatus::Blocked);
            for id in &blocked {
                if let Some(resource) = registry.get_mut(id) {
                    resource.status = LoadStatus::Discovered;
                }
                self.retry.clear(id);
            }
            blocked
        };

        for id in &requeued {
            self.trigger.observe(id.clone());
        }
        telemetry::emit_network_recovered(&self.session_id, requeued.len());
        requeued
    }

    /// Sets an adaptive parameter by name, clamped to its bounds.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Configuration`] for unknown parameter names.
    pub fn set_param(&self, name: &str, value: f64) -> LoadResult<()> {
        self.config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .set(name, value)
    }

    /// Captures the read-only status surface.
    pub fn status(&self) -> EngineStatus {
        let registry = self
            .registry
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let metrics = self
            .metrics
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let summary = metrics.summary(STATUS_WINDOW);

        EngineStatus {
            session_id: self.session_id.clone(),
            counts: registry.counts(),
            in_flight: registry.in_flight(),
            breaker_state: self.breaker.state().name().to_string(),
            success_rate: summary.success_rate,
            avg_load_time_ms: summary.avg_load_time_ms,
            sample_count: summary.sample_count,
            config: self
                .config
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .snapshot(),
            captured_at: Utc::now(),
        }
    }

    /// One discovery pass; new resources go under lazy watch.
    fn discover(&self) -> Vec<ResourceId> {
        let outcome = {
            let mut registry = self.lock_registry();
            let mut next_index = self
                .next_index
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            discover_into(
                &mut registry,
                self.tree.as_ref(),
                &self.discovery,
                &self.session_id,
                &mut next_index,
                self.estimator.as_ref(),
                self.signals.as_ref(),
            )
        };

        for id in &outcome.registered {
            self.trigger.observe(id.clone());
        }
        outcome.registered
    }

    /// One evaluation pass: activate crossers, refresh their priority, and
    /// dispatch the highest-priority wave.
    async fn evaluation_pass(&self) {
        let activated = {
            let mut registry = self.lock_registry();
            let activated = self.trigger.evaluate(&mut registry, self.signals.as_ref());

            // Activation-time priority refresh: viewport and behavior have
            // usually changed since discovery.
            let in_flight = registry.in_flight();
            for id in &activated {
                if let Some(resource) = registry.get_mut(id) {
                    let inputs = PriorityInputs::gather(
                        &resource.geometry,
                        self.signals.as_ref(),
                        resource.failure_reasons.len() as u32,
                        in_flight,
                    );
                    resource.priority = self.estimator.estimate(&inputs);
                }
            }
            activated
        };
        for id in &activated {
            telemetry::emit_status_changed(id, LoadStatus::Discovered, LoadStatus::Triggered, 0);
        }

        let wave = {
            let registry = self
                .registry
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let batch_size = self
                .config
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .batch_size();

            let mut pending: Vec<(f64, ResourceId)> = registry
                .iter()
                .filter(|r| r.status == LoadStatus::Triggered && !registry.is_processing(&r.id))
                .map(|r| (r.priority, r.id.clone()))
                .collect();
            pending
                .sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
            pending.truncate(batch_size);
            pending
        };

        if wave.is_empty() {
            return;
        }

        let outcomes = join_all(wave.iter().map(|(_, id)| self.pipeline.run(id))).await;
        for ((_, id), outcome) in wave.iter().zip(outcomes) {
            match outcome {
                Ok(LoadStatus::Loaded) => {
                    let (attempts, elapsed) = {
                        let registry = self
                            .registry
                            .read()
                            .unwrap_or_else(|poisoned| poisoned.into_inner());
                        registry
                            .get(id)
                            .map(|r| (r.attempts, r.discovered_at.elapsed()))
                            .unwrap_or((0, Duration::ZERO))
                    };
                    telemetry::emit_load_completed(id, attempts, elapsed);
                }
                Ok(status) if status.is_terminal_failure() => {
                    let (attempts, kind) = {
                        let registry = self
                            .registry
                            .read()
                            .unwrap_or_else(|poisoned| poisoned.into_inner());
                        registry
                            .get(id)
                            .map(|r| {
                                (
                                    r.attempts,
                                    r.failure_reasons
                                        .last()
                                        .map(|f| f.kind.clone())
                                        .unwrap_or_default(),
                                )
                            })
                            .unwrap_or((0, String::new()))
                    };
                    telemetry::emit_load_failed(id, status, &kind, attempts);
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(
                        target: "embedbridge::events",
                        resource_id = %id,
                        error = %error,
                        "Pipeline execution error"
                    );
                }
            }
        }
    }

    fn spawn_evaluation_loop(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = tokio::time::sleep(engine.evaluation_interval) => {}
                }
                engine.evaluation_pass().await;
            }
        });
    }

    fn spawn_watchdog_loop(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = tokio::time::sleep(engine.watchdog_interval) => {}
                }
                let outcome = {
                    let mut registry = engine.lock_registry();
                    let mut metrics = engine
                        .metrics
                        .write()
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    engine.monitor.tick(&mut registry, &engine.retry, &mut metrics)
                };
                for id in &outcome.requeued {
                    engine.trigger.observe(id.clone());
                }
            }
        });
    }

    fn spawn_controller_loop(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = tokio::time::sleep(engine.controller_interval) => {}
                }
                let adjustments = {
                    let metrics = engine
                        .metrics
                        .read()
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    let mut config = engine
                        .config
                        .write()
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    engine.controller.tick(&metrics, &mut config)
                };
                telemetry::emit_adjustments(&adjustments);
            }
        });
    }

    fn lock_registry(&self) -> std::sync::RwLockWriteGuard<'_, ResourceRegistry> {
        self.registry
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for EmbedEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbedEngine")
            .field("session_id", &self.session_id)
            .field("provider", &self.provider.name())
            .field("started", &self.started.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoundedParam;
    use crate::core::{ElementHandle, NetworkQuality, Rect};
    use crate::providers::mock::{MockDocument, MockElement, MockProvider, RenderMode};

    fn fast_adaptive() -> AdaptiveConfig {
        let mut config = AdaptiveConfig::default();
        config.timeout_ms = BoundedParam::new(50.0, 60_000.0, 150.0);
        config.retry_interval_ms = BoundedParam::new(5.0, 30_000.0, 10.0);
        config
    }

    fn fast_builder(provider: MockProvider, tree: MockDocument) -> EmbedEngineBuilder {
        EmbedEngine::builder()
            .with_provider(provider)
            .with_tree(tree)
            .with_endpoints(ScriptEndpoints::new("https://cdn.example/embed.js"))
            .with_adaptive_config(fast_adaptive())
            .with_pipeline(
                PipelineConfig::default()
                    .with_max_schedule_delay(Duration::ZERO)
                    .with_verify(
                        crate::pipeline::VerifyConfig::default()
                            .with_poll_interval(Duration::from_millis(10)),
                    ),
            )
            .with_evaluation_interval(Duration::from_millis(20))
    }

    fn visible_element(key: &str) -> Arc<MockElement> {
        Arc::new(
            MockElement::new(key)
                .with_rect(Rect::new(100.0, 0.0, 300.0, 250.0))
                .with_visibility(1.0),
        )
    }

    fn below_fold_element(key: &str) -> Arc<MockElement> {
        Arc::new(
            MockElement::new(key)
                .with_rect(Rect::new(20_000.0, 0.0, 300.0, 250.0))
                .with_visibility(0.0),
        )
    }

    #[test]
    fn test_builder_requires_collaborators() {
        assert!(EmbedEngine::builder().build().is_err());
        assert!(EmbedEngine::builder()
            .with_provider(MockProvider::new())
            .with_tree(MockDocument::new())
            .build()
            .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_discovers_and_loads_visible_resources() {
        let tree = MockDocument::new();
        tree.add(".embed-slot", visible_element("a"));
        tree.add(".embed-slot", visible_element("b"));

        let engine = fast_builder(MockProvider::new(), tree).build().unwrap();
        engine.start();

        tokio::time::sleep(Duration::from_millis(200)).await;
        engine.shutdown();

        let status = engine.status();
        assert_eq!(status.counts.total, 2);
        assert_eq!(status.counts.loaded, 2);
        assert_eq!(status.in_flight, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_below_fold_resource_waits_for_scroll() {
        let element = below_fold_element("a");
        let tree = MockDocument::new();
        tree.add(".embed-slot", element.clone());

        let engine = fast_builder(MockProvider::new(), tree).build().unwrap();
        engine.start();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(engine.status().counts.discovered, 1);
        assert_eq!(engine.status().counts.loaded, 0);

        // The element scrolls into view.
        element.set_visibility(0.8);
        tokio::time::sleep(Duration::from_millis(200)).await;
        engine.shutdown();

        assert_eq!(engine.status().counts.loaded, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_dispatch() {
        let element = below_fold_element("a");
        let tree = MockDocument::new();
        tree.add(".embed-slot", element.clone());

        let engine = fast_builder(MockProvider::new(), tree).build().unwrap();
        engine.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        engine.shutdown();

        element.set_visibility(1.0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(engine.status().counts.loaded, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_now_bypasses_trigger() {
        let element = below_fold_element("a");
        let tree = MockDocument::new();
        tree.add(".embed-slot", element);

        let engine = fast_builder(MockProvider::new(), tree).build().unwrap();
        engine.start();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let id = {
            let registry = engine.registry.read().unwrap();
            let id = registry.iter().next().unwrap().id.clone();
            id
        };
        let status = engine.load_now(&id).await.unwrap();
        engine.shutdown();
        assert_eq!(status, LoadStatus::Loaded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rediscover_picks_up_new_placeholders() {
        let tree = Arc::new(MockDocument::new());
        tree.add(".embed-slot", visible_element("a"));

        let engine = fast_builder(MockProvider::new(), MockDocument::new())
            .with_arc_tree(tree.clone() as ArcDocumentTree)
            .build()
            .unwrap();
        engine.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(engine.status().counts.total, 1);

        tree.add(".embed-slot", visible_element("b"));
        let registered = engine.rediscover();
        assert_eq!(registered.len(), 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        engine.shutdown();
        assert_eq!(engine.status().counts.loaded, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_provider_resources_end_failed() {
        let tree = MockDocument::new();
        tree.add(".embed-slot", visible_element("a"));

        let mut adaptive = fast_adaptive();
        adaptive.max_retries = BoundedParam::new(1.0, 8.0, 1.0);

        let engine = fast_builder(
            MockProvider::new().with_render_mode(RenderMode::Silent),
            tree,
        )
        .with_adaptive_config(adaptive)
        .build()
        .unwrap();
        engine.start();

        tokio::time::sleep(Duration::from_millis(400)).await;
        engine.shutdown();

        assert_eq!(engine.status().counts.failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_recovery_requeues_blocked() {
        let tree = MockDocument::new();
        tree.add(".embed-slot", visible_element("a"));

        let mut adaptive = fast_adaptive();
        adaptive.max_retries = BoundedParam::new(1.0, 8.0, 1.0);

        let engine = fast_builder(MockProvider::new(), tree)
            .with_adaptive_config(adaptive)
            .with_signals(StaticSignals::new().with_network(NetworkQuality::Offline))
            .build()
            .unwrap();
        engine.start();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(engine.status().counts.blocked, 1);

        let requeued = engine.on_network_recovered();
        engine.shutdown();
        assert_eq!(requeued.len(), 1);
        assert_eq!(engine.status().counts.discovered, 1);
        assert!(engine.breaker().state().is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_param_clamps_and_rejects_unknown() {
        let tree = MockDocument::new();
        let engine = fast_builder(MockProvider::new(), tree).build().unwrap();

        engine.set_param("batch_size", 100.0).unwrap();
        assert_eq!(engine.status().config.batch_size, 8);
        assert!(engine.set_param("warp_drive", 1.0).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_surface_fields() {
        let tree = MockDocument::new();
        tree.add(".embed-slot", visible_element("a"));

        let engine = fast_builder(MockProvider::new(), tree).build().unwrap();
        engine.start();
        tokio::time::sleep(Duration::from_millis(150)).await;
        engine.shutdown();

        let status = engine.status();
        assert!(status.session_id.starts_with("embed-"));
        assert_eq!(status.breaker_state, "closed");
        assert!(status.success_rate > 0.99);
        assert_eq!(status.sample_count, 1);

        // The surface serializes for external consumers.
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["counts"]["loaded"], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_discovery_tags_nodes_with_session_ids() {
        let element = visible_element("a");
        let tree = MockDocument::new();
        tree.add(".embed-slot", element.clone());

        let engine = fast_builder(MockProvider::new(), tree).build().unwrap();
        engine.start();
        engine.shutdown();

        let tag = element.attribute("data-embed-id").unwrap();
        assert!(tag.starts_with(engine.session_id()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_feeds_health_samples_without_load_activity() {
        let engine = fast_builder(MockProvider::new(), MockDocument::new())
            .with_watchdog(WatchdogConfig::new().with_tick_interval(Duration::from_millis(25)))
            .build()
            .unwrap();
        engine.start();

        tokio::time::sleep(Duration::from_millis(300)).await;
        engine.shutdown();

        // No loads ran, but every watchdog pass left a health sample.
        let status = engine.status();
        assert!(status.sample_count >= 10);
        assert!(status.success_rate > 0.99);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wave_concurrency_bounded_by_batch_size() {
        let tree = MockDocument::new();
        for key in ["a", "b", "c", "d", "e"] {
            tree.add(".embed-slot", visible_element(key));
        }

        let mut adaptive = fast_adaptive();
        adaptive.batch_size = BoundedParam::new(1.0, 8.0, 2.0);

        let engine = fast_builder(
            MockProvider::new().with_render_latency(Duration::from_millis(40)),
            tree,
        )
        .with_adaptive_config(adaptive)
        .build()
        .unwrap();
        engine.start();

        let mut peak = 0;
        for _ in 0..400 {
            let status = engine.status();
            peak = peak.max(status.in_flight);
            if status.counts.loaded == 5 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        engine.shutdown();

        assert_eq!(engine.status().counts.loaded, 5);
        assert!(peak >= 1);
        assert!(peak <= 2, "peak in-flight {peak} exceeded the batch size");
    }
}
