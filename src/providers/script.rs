//! Breaker-guarded provider script loading.
//!
//! The provider script is loaded once per session. Each endpoint attempt
//! passes through the shared circuit breaker; on primary failure the
//! fallback endpoints are tried in order. Endpoint-level failures are the
//! only errors that count against the breaker.

use crate::circuit_breaker::CircuitBreaker;
use crate::core::{ArcProvider, LoadError, LoadResult};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The ordered endpoint list for the provider script.
#[derive(Debug, Clone)]
pub struct ScriptEndpoints {
    /// Primary endpoint, always tried first.
    pub primary: String,
    /// Fallback endpoints, tried in order after the primary fails.
    pub fallbacks: Vec<String>,
}

impl ScriptEndpoints {
    /// Creates an endpoint list with no fallbacks.
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            fallbacks: Vec::new(),
        }
    }

    /// Appends a fallback endpoint.
    pub fn with_fallback(mut self, url: impl Into<String>) -> Self {
        self.fallbacks.push(url.into());
        self
    }

    /// Iterates over all endpoints in attempt order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str()).chain(self.fallbacks.iter().map(String::as_str))
    }

    /// Total number of endpoints.
    pub fn len(&self) -> usize {
        1 + self.fallbacks.len()
    }

    /// Always `false`; the primary endpoint is mandatory.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Loads the provider script at most once, guarded by the circuit breaker.
#[derive(Debug)]
pub struct ScriptLoader {
    provider: ArcProvider,
    endpoints: ScriptEndpoints,
    breaker: Arc<CircuitBreaker>,
    script_timeout: Duration,
    loaded: AtomicBool,
}

impl ScriptLoader {
    /// Creates a loader over the given provider and endpoints.
    pub fn new(
        provider: ArcProvider,
        endpoints: ScriptEndpoints,
        breaker: Arc<CircuitBreaker>,
        script_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            endpoints,
            breaker,
            script_timeout,
            loaded: AtomicBool::new(false),
        }
    }

    /// Returns `true` once the script has loaded successfully.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// The shared breaker guarding the endpoints.
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Ensures the provider script is loaded, trying fallbacks as needed.
    ///
    /// Idempotent: returns immediately once a load has succeeded. Each
    /// endpoint attempt asks the breaker for admission first; a rejected
    /// attempt is skipped without touching the network.
    ///
    /// # Errors
    ///
    /// - [`LoadError::CircuitOpen`] if the breaker rejected every endpoint.
    /// - [`LoadError::ScriptUnavailable`] if every admitted endpoint failed.
    pub async fn ensure_loaded(&self) -> LoadResult<()> {
        if self.loaded.load(Ordering::SeqCst) {
            return Ok(());
        }

        let mut tried = 0usize;
        let mut last_reason = String::new();

        for url in self.endpoints.iter() {
            if !self.breaker.allow_request() {
                tracing::debug!(
                    target: "embedbridge::events",
                    endpoint = url,
                    "Endpoint attempt rejected by open circuit"
                );
                continue;
            }
            tried += 1;

            let started = Instant::now();
            let attempt =
                tokio::time::timeout(self.script_timeout, self.provider.load_script(url, self.script_timeout))
                    .await;

            match attempt {
                Ok(Ok(())) => {
                    self.breaker.record_success();
                    self.loaded.store(true, Ordering::SeqCst);
                    tracing::info!(
                        target: "embedbridge::events",
                        endpoint = url,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Provider script loaded"
                    );
                    return Ok(());
                }
                Ok(Err(error)) => {
                    self.breaker.record_failure();
                    last_reason = error.to_string();
                    tracing::warn!(
                        target: "embedbridge::events",
                        endpoint = url,
                        error = %error,
                        "Script endpoint failed"
                    );
                }
                Err(_) => {
                    self.breaker.record_failure();
                    let error = LoadError::script_timeout(url, started.elapsed());
                    last_reason = error.to_string();
                    tracing::warn!(
                        target: "embedbridge::events",
                        endpoint = url,
                        timeout_ms = self.script_timeout.as_millis() as u64,
                        "Script endpoint timed out"
                    );
                }
            }
        }

        if tried == 0 {
            return Err(LoadError::CircuitOpen {
                endpoint: self.endpoints.primary.clone(),
                recovery_hint: Some(format!(
                    "retry after {}ms",
                    self.breaker.config().cooldown.as_millis()
                )),
            });
        }

        Err(LoadError::script_unavailable(
            format!("all endpoints failed, last: {last_reason}"),
            tried,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::BreakerConfig;
    use crate::providers::mock::MockProvider;

    fn loader(provider: MockProvider, endpoints: ScriptEndpoints) -> ScriptLoader {
        ScriptLoader::new(
            Arc::new(provider),
            endpoints,
            Arc::new(CircuitBreaker::new(BreakerConfig::default())),
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn test_primary_endpoint_succeeds() {
        let loader = loader(
            MockProvider::new(),
            ScriptEndpoints::new("https://cdn.example/embed.js"),
        );

        loader.ensure_loaded().await.unwrap();
        assert!(loader.is_loaded());
    }

    #[tokio::test]
    async fn test_ensure_loaded_is_idempotent() {
        let provider = Arc::new(MockProvider::new());
        let loader = ScriptLoader::new(
            provider.clone(),
            ScriptEndpoints::new("https://cdn.example/embed.js"),
            Arc::new(CircuitBreaker::new(BreakerConfig::default())),
            Duration::from_millis(200),
        );

        loader.ensure_loaded().await.unwrap();
        loader.ensure_loaded().await.unwrap();
        assert_eq!(provider.script_load_count(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_after_primary_failure() {
        let provider = MockProvider::new().with_failing_url("https://cdn.example/embed.js");
        let loader = loader(
            provider,
            ScriptEndpoints::new("https://cdn.example/embed.js")
                .with_fallback("https://backup.example/embed.js"),
        );

        loader.ensure_loaded().await.unwrap();
        assert!(loader.is_loaded());
        // The primary failure was recorded against the breaker.
        assert_eq!(loader.breaker().metrics().failed_requests, 1);
    }

    #[tokio::test]
    async fn test_all_endpoints_failing() {
        let provider = MockProvider::new()
            .with_failing_url("https://cdn.example/embed.js")
            .with_failing_url("https://backup.example/embed.js");
        let loader = loader(
            provider,
            ScriptEndpoints::new("https://cdn.example/embed.js")
                .with_fallback("https://backup.example/embed.js"),
        );

        let error = loader.ensure_loaded().await.unwrap_err();
        match error {
            LoadError::ScriptUnavailable { endpoints_tried, .. } => {
                assert_eq!(endpoints_tried, 2)
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!loader.is_loaded());
    }

    #[tokio::test]
    async fn test_open_breaker_skips_network() {
        let provider = Arc::new(MockProvider::new());
        let breaker = Arc::new(CircuitBreaker::new(BreakerConfig::default()));
        breaker.force_open();

        let loader = ScriptLoader::new(
            provider.clone(),
            ScriptEndpoints::new("https://cdn.example/embed.js"),
            breaker,
            Duration::from_millis(200),
        );

        let error = loader.ensure_loaded().await.unwrap_err();
        assert!(matches!(error, LoadError::CircuitOpen { .. }));
        assert_eq!(provider.script_load_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_endpoint_times_out() {
        let provider = MockProvider::new().with_script_delay(Duration::from_millis(500));
        let loader = loader(provider, ScriptEndpoints::new("https://cdn.example/embed.js"));

        let error = loader.ensure_loaded().await.unwrap_err();
        assert!(matches!(error, LoadError::ScriptUnavailable { .. }));
    }
}
