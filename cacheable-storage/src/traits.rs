//! Store trait and statistics.
//!
//! This module defines the capability set every store must provide for the
//! coordinator to sit in front of it.

use async_trait::async_trait;
use cacheable_core::{CacheKey, EntryOptions, StoreResult};

/// Store trait for pluggable key/value backends.
///
/// This trait abstracts over different stores (in-memory, LMDB, a remote
/// cache). Implementations must be thread-safe and support concurrent
/// access.
///
/// # Payloads
///
/// Payloads are always raw bytes at this boundary. A store that keeps its
/// records in another representation is responsible for turning them back
/// into bytes, and reports `StoreError::UnsupportedPayload` when it cannot.
///
/// # Expiration
///
/// `EntryOptions::expiration` is relative to the write. An entry whose
/// deadline has passed must be reported as absent by `get`.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a payload from the store.
    ///
    /// Returns `Ok(None)` when the key is absent or expired.
    async fn get(&self, key: &CacheKey) -> StoreResult<Option<Vec<u8>>>;

    /// Put a payload into the store, replacing any previous entry together
    /// with its deadline and tags.
    async fn set(&self, key: &CacheKey, payload: &[u8], options: &EntryOptions)
        -> StoreResult<()>;

    /// Delete a single entry. Deleting an absent key succeeds.
    async fn delete(&self, key: &CacheKey) -> StoreResult<()>;

    /// Remove every entry carrying at least one of `tags`.
    ///
    /// Returns the number of entries removed; tags that match nothing are
    /// not an error.
    async fn invalidate_tags(&self, tags: &[String]) -> StoreResult<u64>;

    /// Get store statistics.
    async fn stats(&self) -> StoreResult<StoreStats>;
}

/// Statistics about store usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of reads that found a live entry.
    pub hits: u64,
    /// Number of reads that found nothing (including expired entries).
    pub misses: u64,
    /// Number of entries currently stored.
    pub entry_count: u64,
    /// Approximate payload size in bytes.
    pub memory_bytes: u64,
    /// Number of entries dropped because their deadline passed.
    pub expirations: u64,
}

impl StoreStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
