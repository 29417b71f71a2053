//! Cacheable Test Utilities
//!
//! Shared test infrastructure for the cacheable workspace:
//! - A fault-injecting store wrapper
//! - Counting loaders for stampede tests
//! - Proptest generators for namespaces, keys and tags
//! - Fixtures (tracing, temp LMDB stores, unique namespaces)

pub use cacheable_core::{
    CacheConfig, CacheError, CacheKey, CacheResult, EntryOptions, StoreError, StoreResult,
};
pub use cacheable_storage::{CacheStore, LmdbStore, MemoryStore, StoreStats};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

// ============================================================================
// MOCKS
// ============================================================================

/// Memory store whose operations can be switched to fail.
///
/// Injected failures are `StoreError::Unavailable`. Call counters include
/// failed calls.
#[derive(Debug, Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
    fail_delete: AtomicBool,
    fail_invalidate: AtomicBool,
    unsupported_get: AtomicBool,
    get_calls: AtomicUsize,
    set_calls: AtomicUsize,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sets(&self, fail: bool) {
        self.fail_set.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn fail_invalidations(&self, fail: bool) {
        self.fail_invalidate.store(fail, Ordering::SeqCst);
    }

    /// Make `get` report records it cannot turn back into bytes.
    pub fn report_unsupported(&self, unsupported: bool) {
        self.unsupported_get.store(unsupported, Ordering::SeqCst);
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    /// The wrapped store, bypassing fault injection.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn fault(operation: &str) -> StoreError {
        StoreError::Unavailable {
            reason: format!("injected {} fault", operation),
        }
    }
}

#[async_trait]
impl CacheStore for FaultyStore {
    async fn get(&self, key: &CacheKey) -> StoreResult<Option<Vec<u8>>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(Self::fault("get"));
        }
        if self.unsupported_get.load(Ordering::SeqCst) {
            return Err(StoreError::UnsupportedPayload {
                key: key.to_string(),
                reason: "injected foreign record".to_string(),
            });
        }
        self.inner.get(key).await
    }

    async fn set(
        &self,
        key: &CacheKey,
        payload: &[u8],
        options: &EntryOptions,
    ) -> StoreResult<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(Self::fault("set"));
        }
        self.inner.set(key, payload, options).await
    }

    async fn delete(&self, key: &CacheKey) -> StoreResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Self::fault("delete"));
        }
        self.inner.delete(key).await
    }

    async fn invalidate_tags(&self, tags: &[String]) -> StoreResult<u64> {
        if self.fail_invalidate.load(Ordering::SeqCst) {
            return Err(Self::fault("invalidate"));
        }
        self.inner.invalidate_tags(tags).await
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        self.inner.stats().await
    }
}

/// Error returned by [`CountingLoader::fail`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("loader failed: {0}")]
pub struct LoaderFailure(pub String);

/// Loader stand-in that counts how often it actually runs.
///
/// Clones share the counter, so one instance can be handed to many tasks.
#[derive(Debug, Clone, Default)]
pub struct CountingLoader {
    calls: Arc<AtomicUsize>,
    delay: Duration,
}

impl CountingLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` inside every load, widening the window for
    /// concurrent callers to pile up.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            delay,
        }
    }

    /// Number of loads that have started.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Run a load producing `value`.
    pub async fn load<T>(&self, value: T) -> Result<T, LoaderFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(value)
    }

    /// Run a load that fails with `message`.
    pub async fn fail<T>(&self, message: &str) -> Result<T, LoaderFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Err(LoaderFailure(message.to_string()))
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for cache inputs.

    use proptest::prelude::*;

    /// Namespaces, including ones containing the separator and escape characters.
    pub fn arb_namespace() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z]{1,12}",
            "[a-z:\\\\]{1,12}",
            any::<String>(),
        ]
    }

    /// Caller-supplied keys.
    pub fn arb_key() -> impl Strategy<Value = String> {
        prop_oneof!["[a-zA-Z0-9_-]{0,16}", "[a-z0-9:]{0,16}", any::<String>()]
    }

    /// Tags in the `name` or `name:id` style.
    pub fn arb_tag() -> impl Strategy<Value = String> {
        prop_oneof!["[a-z]{1,8}", "[a-z]{1,8}:[0-9]{1,4}"]
    }

    pub fn arb_tags() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(arb_tag(), 0..6)
    }

    /// Payloads, including empty ones.
    pub fn arb_payload() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(any::<u8>(), 0..256)
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Common setup for cache tests.

    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;
    use tracing_subscriber::EnvFilter;
    use uuid::Uuid;

    /// Install a test-friendly tracing subscriber once per process.
    ///
    /// Honors `RUST_LOG`; defaults to debug output for the cacheable crates.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("cacheable=debug,cacheable_storage=debug,warn"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    }

    /// A namespace no other test uses.
    pub fn unique_namespace() -> String {
        format!("test-{}", Uuid::now_v7().simple())
    }

    /// Fresh LMDB store in a temporary directory.
    ///
    /// Keep the `TempDir` alive for as long as the store is used.
    pub fn temp_lmdb_store() -> (LmdbStore, TempDir) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = LmdbStore::new(dir.path(), 10).expect("Failed to create LMDB store");
        (store, dir)
    }

    /// Sample domain value for typed tests.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SampleUser {
        pub id: u64,
        pub name: String,
        pub team_ids: Vec<u64>,
    }

    impl SampleUser {
        pub fn new(id: u64, name: impl Into<String>) -> Self {
            Self {
                id,
                name: name.into(),
                team_ids: Vec::new(),
            }
        }

        pub fn with_teams(mut self, team_ids: Vec<u64>) -> Self {
            self.team_ids = team_ids;
            self
        }

        /// `teamId:N` tags for every team the user belongs to.
        pub fn team_tags(&self) -> Vec<String> {
            self.team_ids
                .iter()
                .map(|id| format!("teamId:{}", id))
                .collect()
        }
    }
}

pub use fixtures::{init_tracing, temp_lmdb_store, unique_namespace, SampleUser};

// ============================================================================
// TESTS
// ============================================================================
