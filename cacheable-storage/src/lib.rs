//! Cacheable Storage - Store Trait and Implementations
//!
//! Defines the capability set the coordinator consumes (`CacheStore`) and
//! ships two conforming stores: a process-local [`MemoryStore`] and a
//! persistent, host-shared [`LmdbStore`].

pub mod lmdb_backend;
pub mod memory;
pub mod traits;

pub use lmdb_backend::{LmdbStore, LmdbStoreError};
pub use memory::MemoryStore;
pub use traits::{CacheStore, StoreStats};

use std::sync::Arc;

use async_trait::async_trait;
use cacheable_core::{CacheKey, EntryOptions, StoreResult};

// Shared handles are stores too, so one store can back several managers.
#[async_trait]
impl<S: CacheStore + ?Sized> CacheStore for Arc<S> {
    async fn get(&self, key: &CacheKey) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn set(
        &self,
        key: &CacheKey,
        payload: &[u8],
        options: &EntryOptions,
    ) -> StoreResult<()> {
        (**self).set(key, payload, options).await
    }

    async fn delete(&self, key: &CacheKey) -> StoreResult<()> {
        (**self).delete(key).await
    }

    async fn invalidate_tags(&self, tags: &[String]) -> StoreResult<u64> {
        (**self).invalidate_tags(tags).await
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        (**self).stats().await
    }
}
