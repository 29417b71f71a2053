//! Typed access on top of the byte-level coordinator.
//!
//! Values are encoded with `serde_json`. Decode failures report whether the
//! bytes came from the store, so callers can tell a stale incompatible entry
//! from a loader that produced something unserializable.

use std::error::Error as StdError;
use std::future::Future;

use cacheable_core::{CacheError, CacheResult};
use cacheable_storage::CacheStore;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::manager::{CacheManager, Cached};
use crate::options::CacheOptions;

/// Typed variant of [`CacheManager::get`].
///
/// # Example
///
/// ```ignore
/// let user: Cached<User> = typed::get(&manager, "users", "42", || async {
///     repo.find_user(42).await
/// }, CacheOptions::new().with_tags(["user"])).await?;
/// ```
pub async fn get<T, S, F, Fut, E>(
    manager: &CacheManager<S>,
    namespace: &str,
    key: &str,
    loader: F,
    options: CacheOptions,
) -> CacheResult<Cached<T>>
where
    T: Serialize + DeserializeOwned,
    S: CacheStore + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<Box<dyn StdError + Send + Sync>>,
{
    let bytes_loader = move || {
        let load = loader();
        async move {
            let value = load.await.map_err(CacheError::loader)?;
            encode(&value)
        }
    };

    let cached = manager
        .get_or_load(namespace, key, options, bytes_loader)
        .await?;
    let value = decode(&cached.value, cached.cached)?;
    Ok(Cached {
        value,
        cached: cached.cached,
    })
}

/// Remove the entry for `(namespace, key)`.
pub async fn delete<S>(manager: &CacheManager<S>, namespace: &str, key: &str) -> CacheResult<()>
where
    S: CacheStore + ?Sized,
{
    manager.delete(namespace, key).await
}

/// Remove every entry carrying any of `tags`.
pub async fn delete_by_tags<S, I, T>(manager: &CacheManager<S>, tags: I) -> CacheResult<u64>
where
    S: CacheStore + ?Sized,
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    manager.delete_by_tags(tags).await
}

/// Decode the value a failed write still carries.
///
/// Returns `None` for any other error, or when the payload does not decode
/// as `T`.
pub fn recover<T: DeserializeOwned>(err: &CacheError) -> Option<T> {
    err.payload()
        .and_then(|payload| serde_json::from_slice(payload).ok())
}

fn encode<T: Serialize>(value: &T) -> CacheResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| CacheError::Serialization {
        reason: format!("Failed to encode value: {}", e),
        cached: false,
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8], cached: bool) -> CacheResult<T> {
    serde_json::from_slice(bytes).map_err(|e| CacheError::Serialization {
        reason: format!("Failed to decode value: {}", e),
        cached,
    })
}
