//! Cacheable Core - Shared Types
//!
//! Pure data structures shared by the coordinator and the stores: errors,
//! configuration, composed keys and resolved entry options. No I/O lives
//! here.

pub mod config;
pub mod entry;
pub mod error;
pub mod key;

pub use config::{
    validate_default_expiration, validate_key_prefix, CacheConfig, DEFAULT_EXPIRATION,
    DEFAULT_KEY_PREFIX, DEFAULT_METRICS_PREFIX,
};
pub use entry::EntryOptions;
pub use error::{
    CacheError, CacheResult, ConfigError, LoaderError, StoreError, StoreResult,
};
pub use key::{CacheKey, KEY_SEPARATOR};
