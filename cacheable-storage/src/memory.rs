//! In-process memory store with tag indexing.
//!
//! Entries live in a `HashMap` guarded by an `RwLock`, with a secondary
//! tag -> keys index for bulk invalidation. Expired entries are dropped
//! lazily when read, or eagerly through [`MemoryStore::purge_expired`].

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use cacheable_core::{CacheKey, EntryOptions, StoreError, StoreResult};
use chrono::{DateTime, TimeDelta, Utc};

use crate::traits::{CacheStore, StoreStats};

/// A single stored entry.
#[derive(Debug, Clone)]
struct MemoryEntry {
    payload: Vec<u8>,
    /// `None` when the expiration is too large to represent.
    expires_at: Option<DateTime<Utc>>,
    tags: Vec<String>,
}

impl MemoryEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: HashMap<String, MemoryEntry>,
    tag_index: HashMap<String, HashSet<String>>,
}

impl MemoryInner {
    /// Remove an entry and unlink it from the tag index.
    fn remove(&mut self, key: &str) -> Option<MemoryEntry> {
        let entry = self.entries.remove(key)?;
        for tag in &entry.tags {
            if let Some(keys) = self.tag_index.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tag_index.remove(tag);
                }
            }
        }
        Some(entry)
    }

    fn insert(&mut self, key: String, entry: MemoryEntry) {
        self.remove(&key);
        for tag in &entry.tags {
            self.tag_index
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }
        self.entries.insert(key, entry);
    }

    fn memory_bytes(&self) -> u64 {
        self.entries
            .iter()
            .map(|(k, e)| (k.len() + e.payload.len()) as u64)
            .sum()
    }
}

/// Compute the absolute deadline for an entry written now.
pub(crate) fn deadline_from(
    now: DateTime<Utc>,
    expiration: std::time::Duration,
) -> Option<DateTime<Utc>> {
    TimeDelta::from_std(expiration)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
}

/// In-memory store.
///
/// # Example
///
/// ```ignore
/// let store = MemoryStore::new();
/// let key = CacheKey::compose("cacheable", "users", "42");
/// store.set(&key, b"\"Alice\"", &EntryOptions::new(Duration::from_secs(60))).await?;
/// assert!(store.get(&key).await?.is_some());
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
}

impl MemoryStore {
    /// Create an empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> StoreResult<u64> {
        let now = Utc::now();
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;

        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            inner.remove(key);
        }

        let removed = expired.len() as u64;
        self.expirations.fetch_add(removed, Ordering::Relaxed);
        if removed > 0 {
            tracing::trace!(removed, "Purged expired memory store entries");
        }
        Ok(removed)
    }

    /// Number of stored entries, including expired ones not yet purged.
    ///
    /// Inspection reads through a poisoned lock: a panic mid-write leaves
    /// the map consistent, and the operations that serve callers still
    /// report [`StoreError::LockPoisoned`].
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove everything.
    pub fn clear(&self) -> StoreResult<()> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        inner.entries.clear();
        inner.tag_index.clear();
        Ok(())
    }

    /// Tags currently recorded for a key, if the key is stored. Reads through
    /// a poisoned lock like [`MemoryStore::len`].
    pub fn tags_of(&self, key: &CacheKey) -> Option<Vec<String>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.entries.get(key.as_str()).map(|e| e.tags.clone())
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &CacheKey) -> StoreResult<Option<Vec<u8>>> {
        let now = Utc::now();
        {
            let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
            match inner.entries.get(key.as_str()) {
                Some(entry) if !entry.is_expired(now) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(Some(entry.payload.clone()));
                }
                Some(_) => {}
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return Ok(None);
                }
            }
        }

        // Expired: re-check under the write lock, a concurrent set may have
        // replaced it.
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        match inner.entries.get(key.as_str()) {
            Some(entry) if !entry.is_expired(now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry.payload.clone()))
            }
            Some(_) => {
                inner.remove(key.as_str());
                self.expirations.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(key = %key, "Dropped expired entry on read");
                Ok(None)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set(
        &self,
        key: &CacheKey,
        payload: &[u8],
        options: &EntryOptions,
    ) -> StoreResult<()> {
        let entry = MemoryEntry {
            payload: payload.to_vec(),
            expires_at: deadline_from(Utc::now(), options.expiration),
            tags: options.tags.clone(),
        };

        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        inner.insert(key.as_str().to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> StoreResult<()> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        inner.remove(key.as_str());
        Ok(())
    }

    async fn invalidate_tags(&self, tags: &[String]) -> StoreResult<u64> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;

        let mut keys: HashSet<String> = HashSet::new();
        for tag in tags {
            if let Some(tagged) = inner.tag_index.get(tag) {
                keys.extend(tagged.iter().cloned());
            }
        }

        // Expired entries are unlinked too, but only live ones are counted.
        let now = Utc::now();
        let mut deleted = 0u64;
        let mut expired = 0u64;
        for key in &keys {
            match inner.remove(key) {
                Some(entry) if entry.is_expired(now) => expired += 1,
                Some(_) => deleted += 1,
                None => {}
            }
        }

        self.expirations.fetch_add(expired, Ordering::Relaxed);
        Ok(deleted)
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(StoreStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: inner.entries.len() as u64,
            memory_bytes: inner.memory_bytes(),
            expirations: self.expirations.load(Ordering::Relaxed),
        })
    }
}
