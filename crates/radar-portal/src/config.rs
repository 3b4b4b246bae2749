//! Directory client configuration.
//!
//! Configuration is read from an optional TOML file and overridden by
//! environment variables, e.g. `RADAR__PORTAL__URL=https://mp.example.com/`.

use radar_cache::{CacheConfig, ConfigError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Root configuration of the directory client binary.
///
/// # Example (TOML)
///
/// ```toml
/// [portal]
/// url = "https://radar.example.com/managementportal/"
/// request_timeout = "30s"
///
/// [portal.cache]
/// invalidate_after = "1m"
/// retry_after = "1h"
///
/// [logging]
/// level = "info"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub portal: PortalConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.portal.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Management Portal connection and cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Base URL of the Management Portal.
    pub url: Url,

    /// Endpoint listing all subjects, relative to `url`.
    pub subject_endpoint: String,

    /// Endpoint listing all projects, relative to `url`.
    pub project_endpoint: String,

    /// Endpoint listing all source types, relative to `url`.
    pub source_type_endpoint: String,

    /// Bearer token sent with every request.
    pub access_token: Option<String>,

    /// Timeout of a single portal request.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Freshness and backoff of the entity caches.
    pub cache: CacheConfig,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("http://localhost:8080/managementportal/")
                .expect("default portal URL is valid"),
            subject_endpoint: "api/subjects".to_string(),
            project_endpoint: "api/projects".to_string(),
            source_type_endpoint: "api/source-types".to_string(),
            access_token: None,
            request_timeout: Duration::from_secs(30),
            cache: CacheConfig::default(),
        }
    }
}

impl PortalConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The URL scheme is not HTTP or HTTPS
    /// - An endpoint is empty
    /// - The request timeout is zero
    /// - The cache durations are invalid
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue(format!(
                "portal.url must use http or https, got '{}'",
                self.url.scheme()
            )));
        }

        for (name, endpoint) in [
            ("subject_endpoint", &self.subject_endpoint),
            ("project_endpoint", &self.project_endpoint),
            ("source_type_endpoint", &self.source_type_endpoint),
        ] {
            if endpoint.trim().is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "portal.{name} cannot be empty"
                )));
            }
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "portal.request_timeout must be > 0".to_string(),
            ));
        }

        self.cache
            .validate()
            .map_err(|e| ConfigError::InvalidValue(format!("portal.cache: {e}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let lvl = self.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(ConfigError::InvalidValue(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }
        Ok(())
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use radar_cache::ConfigError;
    use std::path::PathBuf;

    /// Default configuration file, read when no path is given.
    pub const DEFAULT_CONFIG_PATH: &str = "radar.toml";

    /// Load configuration from a TOML file and `RADAR__*` environment variables.
    ///
    /// A missing file is not an error; defaults and the environment apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the sources cannot be parsed or the merged
    /// configuration is invalid.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., RADAR__PORTAL__CACHE__RETRY_AFTER=30m
        builder = builder.add_source(
            Environment::with_prefix("RADAR")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| ConfigError::InvalidValue(format!("config build error: {e}")))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| ConfigError::InvalidValue(format!("config deserialize error: {e}")))?;
        merged.validate()?;
        Ok(merged)
    }
}
