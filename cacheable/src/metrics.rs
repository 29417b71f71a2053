//! Metrics hooks.
//!
//! The coordinator reports one request per `get` call and one hit per cache
//! hit, both labelled by namespace. What happens with those events is up to
//! the [`CacheMetrics`] implementation.

use cacheable_core::{CacheConfig, CacheError, CacheResult, ConfigError};
use prometheus::{CounterVec, Encoder, Opts, Registry, TextEncoder};

/// Sink for coordinator events.
pub trait CacheMetrics: Send + Sync {
    /// Called once per `get` call.
    fn record_request(&self, namespace: &str);

    /// Called once per cache hit.
    fn record_hit(&self, namespace: &str);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl CacheMetrics for NoopMetrics {
    fn record_request(&self, _namespace: &str) {}

    fn record_hit(&self, _namespace: &str) {}
}

/// Prometheus counters for requests and hits.
///
/// Exposes `{prefix}_cache_requests_total` and `{prefix}_cache_hit_total`,
/// both with a `namespace` label.
#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,
    /// Request counter - labels: namespace
    pub requests_total: CounterVec,
    /// Hit counter - labels: namespace
    pub hits_total: CounterVec,
}

impl PrometheusMetrics {
    /// Create counters in a private registry.
    pub fn new(config: &CacheConfig) -> CacheResult<Self> {
        Self::with_registry(config, Registry::new())
    }

    /// Create counters and register them with `registry`.
    pub fn with_registry(config: &CacheConfig, registry: Registry) -> CacheResult<Self> {
        let prefix = config.metrics_prefix.as_str();

        let requests_total = CounterVec::new(
            Opts::new("cache_requests_total", "Total number of cache get requests")
                .namespace(prefix),
            &["namespace"],
        )
        .map_err(|e| metrics_error(prefix, "cache_requests_total", e))?;

        let hits_total = CounterVec::new(
            Opts::new("cache_hit_total", "Total number of cache hits").namespace(prefix),
            &["namespace"],
        )
        .map_err(|e| metrics_error(prefix, "cache_hit_total", e))?;

        registry
            .register(Box::new(requests_total.clone()))
            .map_err(|e| metrics_error(prefix, "cache_requests_total", e))?;
        registry
            .register(Box::new(hits_total.clone()))
            .map_err(|e| metrics_error(prefix, "cache_hit_total", e))?;

        Ok(Self {
            registry,
            requests_total,
            hits_total,
        })
    }

    /// The registry holding the counters.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Current request count for a namespace.
    pub fn requests(&self, namespace: &str) -> u64 {
        self.requests_total.with_label_values(&[namespace]).get() as u64
    }

    /// Current hit count for a namespace.
    pub fn hits(&self, namespace: &str) -> u64 {
        self.hits_total.with_label_values(&[namespace]).get() as u64
    }

    /// Render the registry in the Prometheus text format.
    pub fn gather_text(&self) -> CacheResult<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| CacheError::Serialization {
                reason: format!("Failed to encode metrics: {}", e),
                cached: false,
            })?;
        String::from_utf8(buffer).map_err(|e| CacheError::Serialization {
            reason: format!("Metrics output is not UTF-8: {}", e),
            cached: false,
        })
    }
}

impl CacheMetrics for PrometheusMetrics {
    fn record_request(&self, namespace: &str) {
        self.requests_total.with_label_values(&[namespace]).inc();
    }

    fn record_hit(&self, namespace: &str) {
        self.hits_total.with_label_values(&[namespace]).inc();
    }
}

fn metrics_error(prefix: &str, name: &str, e: prometheus::Error) -> CacheError {
    CacheError::Config(ConfigError::InvalidValue {
        field: "metrics_prefix".to_string(),
        value: prefix.to_string(),
        reason: format!("Failed to register {}: {}", name, e),
    })
}
