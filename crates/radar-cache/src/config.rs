//! Cache freshness and backoff configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Durations controlling when a [`RefreshableCache`](crate::RefreshableCache)
/// contacts its upstream.
///
/// # Example (TOML)
///
/// ```toml
/// [portal.cache]
/// invalidate_after = "1m"
/// retry_after = "1h"
/// ```
///
/// Durations use humantime syntax (`"90s"`, `"1h 30m"`). ISO-8601 values such
/// as `"PT1M"`, accepted by older RADAR deployments, are not recognised and
/// fail deserialization instead of falling back to the default. Convert them
/// when migrating, e.g. `PT1M` to `"1m"` and `PT1H` to `"1h"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum age of a snapshot before the next access attempts a refresh.
    #[serde(with = "humantime_serde")]
    pub invalidate_after: Duration,

    /// Minimum time between refresh attempts after a failed fetch.
    #[serde(with = "humantime_serde")]
    pub retry_after: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            invalidate_after: Duration::from_secs(60), // 1 minute
            retry_after: Duration::from_secs(3600),    // 1 hour
        }
    }
}

impl CacheConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the freshness TTL.
    #[must_use]
    pub fn with_invalidate_after(mut self, ttl: Duration) -> Self {
        self.invalidate_after = ttl;
        self
    }

    /// Sets the backoff applied after a failed refresh.
    #[must_use]
    pub fn with_retry_after(mut self, backoff: Duration) -> Self {
        self.retry_after = backoff;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `invalidate_after` is zero, which
    /// would turn every access into an upstream call.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.invalidate_after.is_zero() {
            return Err(ConfigError::InvalidValue(
                "invalidate_after must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}
