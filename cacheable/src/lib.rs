//! Cacheable - Stampede-Safe Cache-Aside Coordinator
//!
//! Given a namespace, a key and a loader, [`CacheManager::get`] returns the
//! cached value when the store has one, and otherwise runs the loader exactly
//! once across all concurrent callers, stores the result with its expiration
//! and tags, and returns it.
//!
//! # Modules
//!
//! - `options`: per-call expiration and tags, including deferred tags
//! - `coalescer`: single-flight execution keyed by composed cache key
//! - `manager`: the coordinator
//! - `typed`: serde-based typed access
//! - `metrics`: request/hit hooks and the Prometheus implementation
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use cacheable::{typed, CacheConfig, CacheManager, CacheOptions, MemoryStore};
//!
//! let manager = CacheManager::new(Arc::new(MemoryStore::new()), CacheConfig::from_env())?;
//!
//! let name: String = typed::get(
//!     &manager,
//!     "users",
//!     "42",
//!     || async { load_name(42).await },
//!     CacheOptions::new().with_tags(["user", "teamId:7"]),
//! )
//! .await?
//! .value;
//!
//! manager.delete_by_tags(["teamId:7"]).await?;
//! ```

pub mod coalescer;
pub mod manager;
pub mod metrics;
pub mod options;
pub mod typed;

pub use coalescer::{Coalescer, Flight};
pub use manager::{CacheManager, Cached};
pub use metrics::{CacheMetrics, NoopMetrics, PrometheusMetrics};
pub use options::{CacheOptions, TagFn, TagSource};

pub use cacheable_core::{
    CacheConfig, CacheError, CacheKey, CacheResult, ConfigError, EntryOptions, LoaderError,
    StoreError, StoreResult,
};
pub use cacheable_storage::{CacheStore, LmdbStore, MemoryStore, StoreStats};
