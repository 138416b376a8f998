//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use serde::Deserialize;

use crate::error::ConfigError;

/// Default Onshape API host.
pub const DEFAULT_BASE_URL: &str = "https://cad.onshape.com";

/// Environment variable overriding [`OnshapeConfig::access_key`].
pub const ENV_ACCESS_KEY: &str = "ONSHAPE_ACCESS_KEY";

/// Environment variable overriding [`OnshapeConfig::secret_key`].
pub const ENV_SECRET_KEY: &str = "ONSHAPE_SECRET_KEY";

/// Environment variable overriding [`OnshapeConfig::base_url`].
pub const ENV_BASE_URL: &str = "ONSHAPE_BASE_URL";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Onshape API settings.
    #[serde(default)]
    pub onshape: OnshapeConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Overrides settings from environment-style variables.
    ///
    /// `lookup` is normally `std::env::var(..).ok()`; empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(key) = get(ENV_ACCESS_KEY) {
            self.onshape.access_key = key;
        }
        if let Some(key) = get(ENV_SECRET_KEY) {
            self.onshape.secret_key = key;
        }
        if let Some(url) = get(ENV_BASE_URL) {
            self.onshape.base_url = url;
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = &self.onshape.base_url;
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid Onshape base_url '{url}'. Must start with http:// or https://"
                ),
            });
        }

        if self.onshape.timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "onshape.timeout_secs must be greater than 0".to_string(),
            });
        }

        let level = self.logging.level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        Ok(())
    }
}

/// Onshape API connection settings.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OnshapeConfig {
    /// API host, without a trailing path.
    /// Default: `https://cad.onshape.com`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API access key.
    #[serde(default)]
    pub access_key: String,

    /// API secret key.
    #[serde(default)]
    pub secret_key: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl OnshapeConfig {
    /// Returns `true` if both keys are set.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.access_key.is_empty() && !self.secret_key.is_empty()
    }
}

impl Default for OnshapeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            access_key: String::new(),
            secret_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// Keys stay out of logs.
impl std::fmt::Debug for OnshapeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnshapeConfig")
            .field("base_url", &self.base_url)
            .field("has_credentials", &self.has_credentials())
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
