//! Cache-aside coordinator.
//!
//! `CacheManager` decides, per call, whether to serve from the store or
//! compute, makes sure concurrent misses for one key compute only once, and
//! writes fresh values back with their expiration and tags.

use std::error::Error as StdError;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use cacheable_core::{
    validate_default_expiration, validate_key_prefix, CacheConfig, CacheError, CacheKey,
    CacheResult,
};
use cacheable_storage::CacheStore;
use tracing::{debug, warn};

use crate::coalescer::Coalescer;
use crate::metrics::{CacheMetrics, NoopMetrics};
use crate::options::CacheOptions;

/// A value together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cached<T> {
    pub value: T,
    /// `true` when the value was served from the store.
    pub cached: bool,
}

impl<T> Cached<T> {
    pub fn hit(value: T) -> Self {
        Self {
            value,
            cached: true,
        }
    }

    pub fn miss(value: T) -> Self {
        Self {
            value,
            cached: false,
        }
    }

    /// Transform the value, keeping the origin flag.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Cached<U> {
        Cached {
            value: f(self.value),
            cached: self.cached,
        }
    }
}

/// Stampede-safe cache-aside coordinator.
///
/// # Example
///
/// ```ignore
/// let manager = CacheManager::new(Arc::new(MemoryStore::new()), CacheConfig::default())?;
///
/// let user = manager
///     .get("users", "42", || async { fetch_user(42).await }, CacheOptions::new())
///     .await?;
/// if !user.cached {
///     debug!("user 42 loaded from the database");
/// }
/// ```
pub struct CacheManager<S: CacheStore + ?Sized> {
    store: Arc<S>,
    config: RwLock<CacheConfig>,
    coalescer: Coalescer,
    metrics: Arc<dyn CacheMetrics>,
}

impl<S: CacheStore + ?Sized> CacheManager<S> {
    /// Create a coordinator over `store` without metrics.
    pub fn new(store: Arc<S>, config: CacheConfig) -> CacheResult<Self> {
        Self::with_metrics(store, config, Arc::new(NoopMetrics))
    }

    /// Create a coordinator reporting to `metrics`.
    pub fn with_metrics(
        store: Arc<S>,
        config: CacheConfig,
        metrics: Arc<dyn CacheMetrics>,
    ) -> CacheResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config: RwLock::new(config),
            coalescer: Coalescer::new(),
            metrics,
        })
    }

    /// Get a reference to the underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> CacheConfig {
        self.config
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Change the key prefix used by subsequent calls.
    pub fn set_key_prefix(&self, prefix: impl Into<String>) -> CacheResult<()> {
        let prefix = prefix.into();
        validate_key_prefix(&prefix)?;
        self.config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .key_prefix = prefix;
        Ok(())
    }

    /// Change the expiration applied when a call sets none.
    pub fn set_default_expiration(&self, expiration: Duration) -> CacheResult<()> {
        validate_default_expiration(expiration)?;
        self.config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .default_expiration = expiration;
        Ok(())
    }

    /// Number of loads currently being coalesced.
    pub fn in_flight(&self) -> usize {
        self.coalescer.in_flight()
    }

    /// Compose the store key for `(namespace, key)` under the current prefix.
    pub fn compose_key(&self, namespace: &str, key: &str) -> CacheKey {
        let config = self
            .config
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        CacheKey::compose(&config.key_prefix, namespace, key)
    }

    fn default_expiration(&self) -> Duration {
        self.config
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .default_expiration
    }

    /// Return the cached payload for `(namespace, key)`, or run `loader`
    /// and cache its result.
    ///
    /// Concurrent misses for the same key run the loader once and share its
    /// outcome. Each missing caller then writes the value with its own
    /// `options`. Store read failures are returned without running the
    /// loader; loader failures are never cached.
    ///
    /// # Errors
    ///
    /// - `CacheError::Store` / `CacheError::UnsupportedPayload` when the lookup fails
    /// - `CacheError::Loader` when the loader fails
    /// - `CacheError::WriteFailed` when the value was computed but not stored;
    ///   the error carries the computed payload
    pub async fn get<F, Fut, E>(
        &self,
        namespace: &str,
        key: &str,
        loader: F,
        options: CacheOptions,
    ) -> CacheResult<Cached<Vec<u8>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        self.get_or_load(namespace, key, options, move || {
            let load = loader();
            async move { load.await.map_err(CacheError::loader) }
        })
        .await
    }

    /// Shared body of the byte-level and typed `get`; the loader's errors are
    /// already `CacheError`s and are passed through unchanged.
    pub(crate) async fn get_or_load<F, Fut>(
        &self,
        namespace: &str,
        key: &str,
        options: CacheOptions,
        loader: F,
    ) -> CacheResult<Cached<Vec<u8>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CacheResult<Vec<u8>>>,
    {
        let cache_key = self.compose_key(namespace, key);
        self.metrics.record_request(namespace);

        match self.store.get(&cache_key).await {
            Ok(Some(payload)) => {
                self.metrics.record_hit(namespace);
                debug!(key = %cache_key, bytes = payload.len(), "Cache hit");
                return Ok(Cached::hit(payload));
            }
            Ok(None) => {
                debug!(key = %cache_key, "Cache miss");
            }
            Err(e) => {
                warn!(key = %cache_key, error = %e, "Cache lookup failed");
                return Err(e.into());
            }
        }

        let flight = self.coalescer.run(cache_key.as_str(), loader).await;

        if flight.shared {
            debug!(key = %cache_key, "Joined in-flight load");
        }

        let payload = flight.result?;
        let entry = options.resolve(self.default_expiration());

        if let Err(e) = self.store.set(&cache_key, &payload, &entry).await {
            warn!(key = %cache_key, error = %e, "Failed to write loaded value");
            return Err(CacheError::WriteFailed { source: e, payload });
        }

        debug!(
            key = %cache_key,
            expiration = ?entry.expiration,
            tags = entry.tags.len(),
            "Cached loaded value"
        );
        Ok(Cached::miss(payload))
    }

    /// Remove the entry for `(namespace, key)`. Removing an absent entry succeeds.
    pub async fn delete(&self, namespace: &str, key: &str) -> CacheResult<()> {
        let cache_key = self.compose_key(namespace, key);
        self.store.delete(&cache_key).await?;
        debug!(key = %cache_key, "Deleted entry");
        Ok(())
    }

    /// Remove every entry carrying any of `tags`.
    ///
    /// Returns the number of removed entries.
    pub async fn delete_by_tags<I, T>(&self, tags: I) -> CacheResult<u64>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        if tags.is_empty() {
            return Ok(0);
        }

        let removed = self.store.invalidate_tags(&tags).await?;
        debug!(?tags, removed, "Invalidated tags");
        Ok(removed)
    }
}

impl<S: CacheStore + ?Sized> std::fmt::Debug for CacheManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("config", &self.config())
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}
