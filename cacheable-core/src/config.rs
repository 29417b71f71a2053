//! Configuration types

use crate::error::ConfigError;
use crate::key::KEY_SEPARATOR;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default prefix prepended to every composed key.
pub const DEFAULT_KEY_PREFIX: &str = "cacheable";

/// Default expiration applied when a call does not override it.
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(60 * 60);

/// Default namespace for exported metric names.
pub const DEFAULT_METRICS_PREFIX: &str = "cacheable";

/// Coordinator configuration.
///
/// Passed to the manager at construction time; the manager reads it on
/// every call, so updates made through the manager apply to the next call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Prefix for composed keys (`prefix:namespace:key`).
    pub key_prefix: String,
    /// Expiration used when the caller sets none.
    pub default_expiration: Duration,
    /// Prefix for metric names.
    pub metrics_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            default_expiration: DEFAULT_EXPIRATION,
            metrics_prefix: DEFAULT_METRICS_PREFIX.to_string(),
        }
    }
}

impl CacheConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create CacheConfig from environment variables.
    ///
    /// Environment variables:
    /// - `CACHEABLE_KEY_PREFIX`: Key prefix (default: "cacheable")
    /// - `CACHEABLE_DEFAULT_EXPIRATION_SECS`: Default expiration in seconds (default: 3600)
    /// - `CACHEABLE_METRICS_PREFIX`: Metric name prefix (default: "cacheable")
    pub fn from_env() -> Self {
        let key_prefix = std::env::var("CACHEABLE_KEY_PREFIX")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string());

        let default_expiration = std::env::var("CACHEABLE_DEFAULT_EXPIRATION_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_EXPIRATION);

        let metrics_prefix = std::env::var("CACHEABLE_METRICS_PREFIX")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_METRICS_PREFIX.to_string());

        Self {
            key_prefix,
            default_expiration,
            metrics_prefix,
        }
    }

    /// Set the key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the default expiration.
    pub fn with_default_expiration(mut self, expiration: Duration) -> Self {
        self.default_expiration = expiration;
        self
    }

    /// Set the metrics prefix.
    pub fn with_metrics_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.metrics_prefix = prefix.into();
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_key_prefix(&self.key_prefix)?;
        validate_default_expiration(self.default_expiration)?;

        if self.metrics_prefix.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "metrics_prefix".to_string(),
                value: self.metrics_prefix.clone(),
                reason: "must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// Check that a key prefix can be composed unambiguously.
pub fn validate_key_prefix(prefix: &str) -> Result<(), ConfigError> {
    if prefix.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "key_prefix".to_string(),
            value: prefix.to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if prefix.contains(KEY_SEPARATOR) {
        return Err(ConfigError::InvalidValue {
            field: "key_prefix".to_string(),
            value: prefix.to_string(),
            reason: format!("must not contain '{}'", KEY_SEPARATOR),
        });
    }
    Ok(())
}

/// Check that a default expiration is usable.
pub fn validate_default_expiration(expiration: Duration) -> Result<(), ConfigError> {
    if expiration.is_zero() {
        return Err(ConfigError::InvalidValue {
            field: "default_expiration".to_string(),
            value: format!("{:?}", expiration),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.key_prefix, "cacheable");
        assert_eq!(config.default_expiration, Duration::from_secs(3600));
        assert_eq!(config.metrics_prefix, "cacheable");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = CacheConfig::new()
            .with_key_prefix("myapp")
            .with_default_expiration(Duration::from_secs(300))
            .with_metrics_prefix("myapp_cache");

        assert_eq!(config.key_prefix, "myapp");
        assert_eq!(config.default_expiration, Duration::from_secs(300));
        assert_eq!(config.metrics_prefix, "myapp_cache");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_prefix() {
        let config = CacheConfig::new().with_key_prefix("");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "key_prefix"
        ));
    }

    #[test]
    fn test_validate_rejects_separator_in_prefix() {
        let config = CacheConfig::new().with_key_prefix("my:app");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_expiration() {
        let config = CacheConfig::new().with_default_expiration(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "default_expiration"
        ));
    }

    #[test]
    fn test_validate_rejects_blank_metrics_prefix() {
        let config = CacheConfig::new().with_metrics_prefix("  ");
        assert!(config.validate().is_err());
    }
}
