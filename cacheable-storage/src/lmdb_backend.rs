//! LMDB-backed store with tag indexing.
//!
//! Uses the heed crate (Rust bindings for LMDB) to provide a persistent,
//! memory-mapped store that several processes on one host can share.
//!
//! # Layout
//!
//! Three named databases live in one environment:
//! - `entries`: composed key -> `[format: 1 byte][expires_at_ms: 8 bytes LE][payload]`
//! - `entry_tags`: composed key -> JSON array of tags
//! - `tag_index`: `tag 0xFF composed key` -> composed key
//!
//! `0xFF` never occurs in UTF-8, so a tag prefix scan can never bleed into
//! a longer tag.
//!
//! # Long keys
//!
//! LMDB caps key length (`Env::max_key_size`, 511 bytes by default). A
//! composed key over the cap is stored under `0xFE ++ sha256(key)`; tags over
//! 128 bytes, and index suffixes that would push a `tag_index` key over the
//! cap, get the same treatment. `0xFE` never occurs in UTF-8 either, so digest
//! forms cannot collide with verbatim keys or tags.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The store uses:
//! - Read transactions for `get` on live entries
//! - Write transactions for `set`, `delete`, `invalidate_tags` and for
//!   dropping expired entries
//! - Statistics are tracked behind a lock

use std::borrow::Cow;
use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use cacheable_core::{CacheKey, EntryOptions, StoreError, StoreResult};
use chrono::Utc;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};
use sha2::{Digest, Sha256};

use crate::memory::deadline_from;
use crate::traits::{CacheStore, StoreStats};

/// Separator byte between a tag and the key it points at.
const TAG_SEPARATOR: u8 = 0xFF;

/// Current record format byte.
const FORMAT_V1: u8 = 1;

/// Size of the record header: format byte plus deadline.
const HEADER_LEN: usize = 9;

/// Deadline stored for entries that never expire.
const NO_DEADLINE: i64 = i64::MAX;

/// Leading byte of a key or tag replaced by its digest.
const DIGEST_MARKER: u8 = 0xFE;

/// Longest tag kept verbatim in `tag_index` keys.
const TAG_INLINE_MAX: usize = 128;

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open a database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Tag list could not be encoded or decoded.
    #[error("Tag codec error: {0}")]
    TagCodec(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStoreError> for StoreError {
    fn from(e: LmdbStoreError) -> Self {
        match e {
            LmdbStoreError::EnvOpen(reason) | LmdbStoreError::DbOpen(reason) => {
                StoreError::Unavailable { reason }
            }
            LmdbStoreError::Transaction(reason) => StoreError::Transaction { reason },
            LmdbStoreError::TagCodec(reason) => StoreError::Codec { reason },
            LmdbStoreError::Io(e) => StoreError::from(e),
        }
    }
}

fn txn_err(e: heed::Error) -> LmdbStoreError {
    LmdbStoreError::Transaction(e.to_string())
}

/// A decoded `entries` record.
#[derive(Debug, PartialEq, Eq)]
struct Record<'a> {
    expires_at_ms: i64,
    payload: &'a [u8],
}

impl Record<'_> {
    fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at_ms <= now_ms
    }
}

fn encode_record(expires_at_ms: i64, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.push(FORMAT_V1);
    bytes.extend_from_slice(&expires_at_ms.to_le_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

fn decode_record<'a>(key: &CacheKey, bytes: &'a [u8]) -> StoreResult<Record<'a>> {
    if bytes.len() < HEADER_LEN {
        return Err(StoreError::UnsupportedPayload {
            key: key.to_string(),
            reason: format!("record is {} bytes, header needs {}", bytes.len(), HEADER_LEN),
        });
    }
    if bytes[0] != FORMAT_V1 {
        return Err(StoreError::UnsupportedPayload {
            key: key.to_string(),
            reason: format!("unknown record format {}", bytes[0]),
        });
    }

    let mut deadline = [0u8; 8];
    deadline.copy_from_slice(&bytes[1..HEADER_LEN]);

    Ok(Record {
        expires_at_ms: i64::from_le_bytes(deadline),
        payload: &bytes[HEADER_LEN..],
    })
}

/// Whether a versioned record's deadline has passed. Foreign records never expire.
fn record_expired(bytes: &[u8], now_ms: i64) -> bool {
    bytes.len() >= HEADER_LEN && bytes[0] == FORMAT_V1 && {
        let mut deadline = [0u8; 8];
        deadline.copy_from_slice(&bytes[1..HEADER_LEN]);
        i64::from_le_bytes(deadline) <= now_ms
    }
}

fn digest_form(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(33);
    out.push(DIGEST_MARKER);
    out.extend_from_slice(&Sha256::digest(bytes));
    out
}

/// `bytes` itself when it fits in `limit`, its digest form otherwise.
fn fit(bytes: &[u8], limit: usize) -> Cow<'_, [u8]> {
    if bytes.len() <= limit {
        Cow::Borrowed(bytes)
    } else {
        Cow::Owned(digest_form(bytes))
    }
}

fn tag_prefix(tag: &str) -> Vec<u8> {
    let mut bytes = fit(tag.as_bytes(), TAG_INLINE_MAX).into_owned();
    bytes.push(TAG_SEPARATOR);
    bytes
}

/// LMDB-backed store.
///
/// # Example
///
/// ```ignore
/// use cacheable_storage::LmdbStore;
///
/// let store = LmdbStore::new("/var/cache/myapp", 100)?;
/// let manager = CacheManager::new(Arc::new(store), CacheConfig::default())?;
/// ```
pub struct LmdbStore {
    /// The LMDB environment.
    env: Env,
    /// Payload records.
    entries: Database<Bytes, Bytes>,
    /// Tags recorded per key, used to unlink the tag index.
    entry_tags: Database<Bytes, Bytes>,
    /// Tag -> key index.
    tag_index: Database<Bytes, Bytes>,
    /// Longest key the environment accepts.
    max_key_size: usize,
    /// Read statistics.
    stats: RwLock<StoreStats>,
}

impl LmdbStore {
    /// Create a new LMDB store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the environment in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Databases cannot be created
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(3)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env.write_txn().map_err(txn_err)?;

        let entries: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, Some("entries"))
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;
        let entry_tags: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, Some("entry_tags"))
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;
        let tag_index: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, Some("tag_index"))
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;

        wtxn.commit().map_err(txn_err)?;

        let max_key_size = env.max_key_size();
        tracing::debug!(
            path = %path.as_ref().display(),
            max_size_mb,
            max_key_size,
            "Opened LMDB store"
        );

        Ok(Self {
            env,
            max_key_size,
            entries,
            entry_tags,
            tag_index,
            stats: RwLock::new(StoreStats::default()),
        })
    }

    fn record_hit(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.hits += 1;
        }
    }

    fn record_miss(&self, expired: bool) {
        if let Ok(mut stats) = self.stats.write() {
            stats.misses += 1;
            if expired {
                stats.expirations += 1;
            }
        }
    }

    /// The LMDB key an entry is stored under.
    fn entry_key<'k>(&self, key: &'k CacheKey) -> Cow<'k, [u8]> {
        fit(key.as_bytes(), self.max_key_size)
    }

    /// The `tag_index` key linking `tag` to a stored entry key.
    fn tag_index_key(&self, tag: &str, entry_key: &[u8]) -> Vec<u8> {
        let mut bytes = tag_prefix(tag);
        let budget = self.max_key_size.saturating_sub(bytes.len());
        bytes.extend_from_slice(&fit(entry_key, budget));
        bytes
    }

    /// Whether the entry under `key` is stored and past its deadline.
    fn is_expired(
        &self,
        txn: &RoTxn<'_>,
        key: &[u8],
        now_ms: i64,
    ) -> Result<bool, LmdbStoreError> {
        Ok(self
            .entries
            .get(txn, key)
            .map_err(txn_err)?
            .is_some_and(|bytes| record_expired(bytes, now_ms)))
    }

    /// Remove an entry, its tag list and its tag index rows.
    fn remove_in(&self, wtxn: &mut RwTxn<'_>, key: &[u8]) -> Result<bool, LmdbStoreError> {
        let tags: Vec<String> = match self.entry_tags.get(wtxn, key).map_err(txn_err)? {
            Some(raw) => serde_json::from_slice(raw)
                .map_err(|e| LmdbStoreError::TagCodec(e.to_string()))?,
            None => Vec::new(),
        };

        for tag in &tags {
            self.tag_index
                .delete(wtxn, &self.tag_index_key(tag, key))
                .map_err(txn_err)?;
        }
        self.entry_tags.delete(wtxn, key).map_err(txn_err)?;
        self.entries.delete(wtxn, key).map_err(txn_err)
    }

    /// Collect the stored entry keys indexed under a tag.
    fn keys_for_tag(&self, wtxn: &RwTxn<'_>, tag: &str) -> Result<Vec<Vec<u8>>, LmdbStoreError> {
        let prefix = tag_prefix(tag);
        let iter = self.tag_index.prefix_iter(wtxn, &prefix).map_err(txn_err)?;

        let mut keys = Vec::new();
        for result in iter {
            let (_, entry_key) = result.map_err(txn_err)?;
            keys.push(entry_key.to_vec());
        }
        Ok(keys)
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> StoreResult<u64> {
        let now_ms = Utc::now().timestamp_millis();
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;

        let mut expired = Vec::new();
        {
            let iter = self.entries.iter(&wtxn).map_err(txn_err)?;
            for result in iter {
                let (key, bytes) = result.map_err(txn_err)?;
                if record_expired(bytes, now_ms) {
                    expired.push(key.to_vec());
                }
            }
        }

        let mut removed = 0u64;
        for key in &expired {
            if self.remove_in(&mut wtxn, key)? {
                removed += 1;
            }
        }
        wtxn.commit().map_err(txn_err)?;

        if let Ok(mut stats) = self.stats.write() {
            stats.expirations += removed;
        }
        Ok(removed)
    }
}

#[async_trait]
impl CacheStore for LmdbStore {
    async fn get(&self, key: &CacheKey) -> StoreResult<Option<Vec<u8>>> {
        let now_ms = Utc::now().timestamp_millis();
        let entry_key = self.entry_key(key);
        {
            let rtxn = self.env.read_txn().map_err(txn_err)?;
            match self.entries.get(&rtxn, &entry_key).map_err(txn_err)? {
                Some(bytes) => {
                    let record = decode_record(key, bytes)?;
                    if !record.is_expired(now_ms) {
                        self.record_hit();
                        return Ok(Some(record.payload.to_vec()));
                    }
                }
                None => {
                    self.record_miss(false);
                    return Ok(None);
                }
            }
        }

        // Expired: drop it unless a concurrent writer already replaced it.
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let live = match self.entries.get(&wtxn, &entry_key).map_err(txn_err)? {
            Some(bytes) => {
                let record = decode_record(key, bytes)?;
                (!record.is_expired(now_ms)).then(|| record.payload.to_vec())
            }
            None => None,
        };

        if let Some(payload) = live {
            wtxn.abort();
            self.record_hit();
            return Ok(Some(payload));
        }

        let removed = self.remove_in(&mut wtxn, &entry_key)?;
        wtxn.commit().map_err(txn_err)?;
        self.record_miss(removed);
        tracing::trace!(key = %key, "Dropped expired LMDB entry on read");
        Ok(None)
    }

    async fn set(
        &self,
        key: &CacheKey,
        payload: &[u8],
        options: &EntryOptions,
    ) -> StoreResult<()> {
        let expires_at_ms = deadline_from(Utc::now(), options.expiration)
            .map(|deadline| deadline.timestamp_millis())
            .unwrap_or(NO_DEADLINE);
        let record = encode_record(expires_at_ms, payload);
        let tags = serde_json::to_vec(&options.tags)
            .map_err(|e| LmdbStoreError::TagCodec(e.to_string()))?;

        let entry_key = self.entry_key(key);
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;

        // Unlink the previous tags before writing the new ones.
        self.remove_in(&mut wtxn, &entry_key)?;

        self.entries
            .put(&mut wtxn, &entry_key, &record)
            .map_err(txn_err)?;
        self.entry_tags
            .put(&mut wtxn, &entry_key, &tags)
            .map_err(txn_err)?;
        for tag in &options.tags {
            self.tag_index
                .put(&mut wtxn, &self.tag_index_key(tag, &entry_key), &entry_key)
                .map_err(txn_err)?;
        }

        wtxn.commit().map_err(txn_err)?;
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> StoreResult<()> {
        let entry_key = self.entry_key(key);
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        self.remove_in(&mut wtxn, &entry_key)?;
        wtxn.commit().map_err(txn_err)?;
        Ok(())
    }

    async fn invalidate_tags(&self, tags: &[String]) -> StoreResult<u64> {
        if tags.is_empty() {
            return Ok(0);
        }

        let now_ms = Utc::now().timestamp_millis();
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;

        // Expired entries are unlinked too, but only live ones are counted.
        let mut deleted = 0u64;
        let mut expired = 0u64;
        for tag in tags {
            let keys = self.keys_for_tag(&wtxn, tag)?;
            for key in &keys {
                let was_expired = self.is_expired(&wtxn, key, now_ms)?;
                if self.remove_in(&mut wtxn, key)? {
                    if was_expired {
                        expired += 1;
                    } else {
                        deleted += 1;
                    }
                }
            }
        }

        wtxn.commit().map_err(txn_err)?;

        if expired > 0 {
            if let Ok(mut stats) = self.stats.write() {
                stats.expirations += expired;
            }
        }
        Ok(deleted)
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        let entry_count = self.entries.len(&rtxn).map_err(txn_err)?;

        let mut memory_bytes = 0u64;
        let iter = self.entries.iter(&rtxn).map_err(txn_err)?;
        for result in iter {
            let (key, bytes) = result.map_err(txn_err)?;
            memory_bytes += (key.len() + bytes.len().saturating_sub(HEADER_LEN)) as u64;
        }

        let mut stats = self.stats.read().map(|s| s.clone()).unwrap_or_default();
        stats.entry_count = entry_count;
        stats.memory_bytes = memory_bytes;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_test_store() -> (LmdbStore, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let store = LmdbStore::new(temp_dir.path(), 10).expect("store creation should succeed");
        (store, temp_dir)
    }

    fn key(k: &str) -> CacheKey {
        CacheKey::compose("test", "lmdb", k)
    }

    fn ttl(secs: u64) -> EntryOptions {
        EntryOptions::new(Duration::from_secs(secs))
    }

    #[test]
    fn test_record_roundtrip() {
        let bytes = encode_record(1_700_000_000_000, b"payload");
        let record = decode_record(&key("r"), &bytes).expect("decode should succeed");
        assert_eq!(record.expires_at_ms, 1_700_000_000_000);
        assert_eq!(record.payload, b"payload");
    }

    #[test]
    fn test_decode_rejects_unknown_format() {
        let mut bytes = encode_record(0, b"x");
        bytes[0] = 9;
        let err = decode_record(&key("r"), &bytes).expect_err("decode should fail");
        assert!(matches!(err, StoreError::UnsupportedPayload { .. }));
    }

    #[test]
    fn test_decode_rejects_truncated_record() {
        let err = decode_record(&key("r"), &[FORMAT_V1, 0, 0]).expect_err("decode should fail");
        assert!(matches!(err, StoreError::UnsupportedPayload { .. }));
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (store, _temp_dir) = create_test_store();

        store
            .set(&key("a"), b"alpha", &ttl(60))
            .await
            .expect("set should succeed");

        let value = store.get(&key("a")).await.expect("get should succeed");
        assert_eq!(value.as_deref(), Some(&b"alpha"[..]));
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let (store, _temp_dir) = create_test_store();
        let value = store.get(&key("missing")).await.expect("get should succeed");
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let (store, _temp_dir) = create_test_store();
        store
            .set(&key("short"), b"v", &EntryOptions::new(Duration::from_millis(30)))
            .await
            .unwrap();
        assert!(store.get(&key("short")).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(store.get(&key("short")).await.unwrap().is_none());
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.entry_count, 0);
        assert_eq!(stats.expirations, 1);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (store, _temp_dir) = create_test_store();
        store
            .set(
                &key("short"),
                b"v",
                &EntryOptions::new(Duration::from_millis(10)).with_tags(["t"]),
            )
            .await
            .unwrap();
        store.set(&key("long"), b"v", &ttl(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(store.purge_expired().unwrap(), 1);
        assert_eq!(store.stats().await.unwrap().entry_count, 1);
        assert_eq!(store.invalidate_tags(&["t".to_string()]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (store, _temp_dir) = create_test_store();
        store.set(&key("a"), b"v", &ttl(60)).await.unwrap();

        store.delete(&key("a")).await.expect("delete should succeed");
        store.delete(&key("a")).await.expect("delete should succeed");
        assert!(store.get(&key("a")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalidate_tags() {
        let (store, _temp_dir) = create_test_store();
        store
            .set(&key("a"), b"1", &ttl(60).with_tags(["team:1", "user"]))
            .await
            .unwrap();
        store
            .set(&key("b"), b"2", &ttl(60).with_tags(["team:1"]))
            .await
            .unwrap();
        store
            .set(&key("c"), b"3", &ttl(60).with_tags(["team:10"]))
            .await
            .unwrap();

        let deleted = store
            .invalidate_tags(&["team:1".to_string()])
            .await
            .expect("invalidate should succeed");
        assert_eq!(deleted, 2);

        assert!(store.get(&key("a")).await.unwrap().is_none());
        assert!(store.get(&key("b")).await.unwrap().is_none());
        assert!(
            store.get(&key("c")).await.unwrap().is_some(),
            "a longer tag sharing a prefix must not be invalidated"
        );
    }

    #[tokio::test]
    async fn test_invalidate_with_overlapping_tags_counts_once() {
        let (store, _temp_dir) = create_test_store();
        store
            .set(&key("a"), b"1", &ttl(60).with_tags(["x", "y"]))
            .await
            .unwrap();

        let deleted = store
            .invalidate_tags(&["x".to_string(), "y".to_string()])
            .await
            .unwrap();
        assert_eq!(deleted, 1);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_tags() {
        let (store, _temp_dir) = create_test_store();
        store
            .set(&key("a"), b"old", &ttl(60).with_tags(["old-tag"]))
            .await
            .unwrap();
        store
            .set(&key("a"), b"new", &ttl(60).with_tags(["new-tag"]))
            .await
            .unwrap();

        assert_eq!(
            store.invalidate_tags(&["old-tag".to_string()]).await.unwrap(),
            0
        );
        assert_eq!(
            store.get(&key("a")).await.unwrap().as_deref(),
            Some(&b"new"[..])
        );
        assert_eq!(
            store.invalidate_tags(&["new-tag".to_string()]).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_reopen_keeps_entries() {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        {
            let store = LmdbStore::new(temp_dir.path(), 10).unwrap();
            store
                .set(&key("persist"), b"kept", &ttl(60).with_tags(["p"]))
                .await
                .unwrap();
        }

        let store = LmdbStore::new(temp_dir.path(), 10).unwrap();
        assert_eq!(
            store.get(&key("persist")).await.unwrap().as_deref(),
            Some(&b"kept"[..])
        );
        assert_eq!(store.invalidate_tags(&["p".to_string()]).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let (store, _temp_dir) = create_test_store();
        let _ = store.get(&key("a")).await;
        store.set(&key("a"), b"abc", &ttl(60)).await.unwrap();
        let _ = store.get(&key("a")).await;
        let _ = store.get(&key("a")).await;

        let stats = store.stats().await.expect("stats should succeed");
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.memory_bytes, (key("a").as_str().len() + 3) as u64);
    }

    #[tokio::test]
    async fn test_invalidate_skips_expired_in_count() {
        let (store, _temp_dir) = create_test_store();
        store
            .set(
                &key("short"),
                b"v",
                &EntryOptions::new(Duration::from_millis(10)).with_tags(["t"]),
            )
            .await
            .unwrap();
        store
            .set(&key("live"), b"v", &ttl(60).with_tags(["t"]))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(store.invalidate_tags(&["t".to_string()]).await.unwrap(), 1);
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.entry_count, 0);
        assert_eq!(stats.expirations, 1);
    }

    #[tokio::test]
    async fn test_key_over_lmdb_limit() {
        let (store, _temp_dir) = create_test_store();
        let long = key(&"k".repeat(600));
        assert!(long.as_bytes().len() > store.max_key_size);

        store
            .set(&long, b"big", &ttl(60).with_tags(["t"]))
            .await
            .expect("long key set should succeed");
        assert_eq!(
            store.get(&long).await.unwrap().as_deref(),
            Some(&b"big"[..])
        );

        store.delete(&long).await.expect("delete should succeed");
        assert!(store.get(&long).await.unwrap().is_none());
        assert_eq!(store.invalidate_tags(&["t".to_string()]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_long_key_with_long_tag() {
        let (store, _temp_dir) = create_test_store();
        let long = key(&"k".repeat(300));
        let tag = "t".repeat(300);

        store
            .set(&long, b"v", &ttl(60).with_tags([tag.clone()]))
            .await
            .expect("set should succeed");
        assert!(store.get(&long).await.unwrap().is_some());

        // Another long tag sharing the inline prefix must not match.
        assert_eq!(
            store.invalidate_tags(&["t".repeat(301)]).await.unwrap(),
            0
        );
        assert_eq!(store.invalidate_tags(&[tag]).await.unwrap(), 1);
        assert!(store.get(&long).await.unwrap().is_none());
        assert_eq!(store.stats().await.unwrap().entry_count, 0);
    }

    #[tokio::test]
    async fn test_long_keys_sharing_a_prefix_stay_distinct() {
        let (store, _temp_dir) = create_test_store();
        let base = "k".repeat(560);
        let first = key(&format!("{base}-1"));
        let second = key(&format!("{base}-2"));

        store
            .set(&first, b"one", &ttl(60).with_tags(["shared"]))
            .await
            .unwrap();
        store
            .set(&second, b"two", &ttl(60).with_tags(["shared", "only-two"]))
            .await
            .unwrap();

        assert_eq!(store.get(&first).await.unwrap().as_deref(), Some(&b"one"[..]));
        assert_eq!(store.get(&second).await.unwrap().as_deref(), Some(&b"two"[..]));

        assert_eq!(
            store.invalidate_tags(&["only-two".to_string()]).await.unwrap(),
            1
        );
        assert!(store.get(&first).await.unwrap().is_some());
        assert_eq!(
            store.invalidate_tags(&["shared".to_string()]).await.unwrap(),
            1
        );
        assert_eq!(store.stats().await.unwrap().entry_count, 0);
    }

    #[test]
    fn test_fit_keeps_short_bytes() {
        assert_eq!(&*fit(b"abc", 3), b"abc");
        let long = fit(b"abcd", 3);
        assert_eq!(long.len(), 33);
        assert_eq!(long[0], DIGEST_MARKER);
    }
}
