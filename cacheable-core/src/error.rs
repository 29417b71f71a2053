//! Error types for cacheable operations

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Store layer errors.
///
/// A missing key is NOT an error: stores report it as `Ok(None)`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Transaction failed: {reason}")]
    Transaction { reason: String },

    #[error("Codec error: {reason}")]
    Codec { reason: String },

    #[error("Unsupported payload for key {key}: {reason}")]
    UnsupportedPayload { key: String, reason: String },

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("I/O error: {reason}")]
    Io { reason: String },
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io {
            reason: e.to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Error produced by a loader, shared between every coalesced caller.
#[derive(Clone)]
pub struct LoaderError(Arc<dyn StdError + Send + Sync>);

impl LoaderError {
    pub fn new<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self(Arc::from(err.into()))
    }

    /// Borrow the error exactly as the loader returned it.
    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.0
    }

    /// Attempt to view the loader's error as a concrete type.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }
}

impl fmt::Debug for LoaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for LoaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

/// Master error type for all cacheable errors.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Unsupported payload type for key {key}: {reason}")]
    UnsupportedPayload { key: String, reason: String },

    #[error("Loader failed: {0}")]
    Loader(LoaderError),

    /// The loader succeeded but the value could not be written back.
    /// The computed payload is kept so callers can still use it.
    #[error("Write failed after loading: {source}")]
    WriteFailed { source: StoreError, payload: Vec<u8> },

    #[error("Serialization error: {reason}")]
    Serialization { reason: String, cached: bool },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl From<StoreError> for CacheError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UnsupportedPayload { key, reason } => {
                CacheError::UnsupportedPayload { key, reason }
            }
            other => CacheError::Store(other),
        }
    }
}

impl From<LoaderError> for CacheError {
    fn from(e: LoaderError) -> Self {
        CacheError::Loader(e)
    }
}

impl CacheError {
    /// Wrap an arbitrary loader error.
    pub fn loader<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        CacheError::Loader(LoaderError::new(err))
    }

    /// Whether the value involved in the failed call came from the cache.
    ///
    /// Only a decode failure on a cache hit reports `true`.
    pub fn was_cached(&self) -> bool {
        matches!(self, CacheError::Serialization { cached: true, .. })
    }

    /// The freshly computed payload carried by a write failure.
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            CacheError::WriteFailed { payload, .. } => Some(payload),
            _ => None,
        }
    }

    pub fn is_loader_error(&self) -> bool {
        matches!(self, CacheError::Loader(_))
    }

    /// The loader's own error, if this call failed inside the loader.
    pub fn loader_error(&self) -> Option<&LoaderError> {
        match self {
            CacheError::Loader(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// TESTS
// =============================================================================
