//! Configuration module for rivet.
//!
//! Provides typed configuration structs that map to the YAML profile file,
//! with loading, saving, validation, defaults, and a builder for programmatic
//! use. The [`TransferConfig`] section is the value object handed to the sync
//! engine and the HTTP transport at construction time.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One mebibyte, in bytes.
pub const MIB: u64 = 1024 * 1024;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for rivet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transfer: TransferConfig,
    pub profile: ProfileConfig,
    pub logging: LoggingConfig,
}

/// Transfer tuning shared by the engine and the HTTP transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Size of each upload chunk, in bytes.
    pub chunk_size: u64,
    /// Number of worker tasks per pool.
    pub workers: usize,
    /// Total attempts per request, including the first one.
    pub max_attempts: u32,
    /// Backoff before the first retry, in milliseconds.
    pub retry_base_delay_ms: u64,
    /// Upper bound for a single backoff, in milliseconds.
    pub retry_max_delay_ms: u64,
    /// Page size used when listing remote folders and items.
    pub page_size: u32,
    /// Per-request timeout, in seconds.
    pub request_timeout_secs: u64,
}

/// Default remote and credential, written by `rivet configure`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Base URL of the remote API, as validated at configure time.
    pub url: Option<String>,
    /// Username:password, API key, or token.
    pub auth: Option<String>,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading and saving
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Write the configuration as YAML, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/rivet/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("rivet")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: 16 * MIB,
            workers: 10,
            max_attempts: 5,
            retry_base_delay_ms: 100,
            retry_max_delay_ms: 5_000,
            page_size: 50,
            request_timeout_secs: 300,
        }
    }
}

impl TransferConfig {
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"transfer.workers"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

fn positive(errors: &mut Vec<ValidationError>, field: &str, value: u64) {
    if value == 0 {
        errors.push(ValidationError {
            field: field.into(),
            message: "must be greater than 0".into(),
        });
    }
}

impl TransferConfig {
    /// Validate the transfer section alone.
    ///
    /// The engine refuses to start with any of these errors.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        positive(&mut errors, "transfer.chunk_size", self.chunk_size);
        positive(&mut errors, "transfer.workers", self.workers as u64);
        positive(&mut errors, "transfer.max_attempts", u64::from(self.max_attempts));
        positive(&mut errors, "transfer.page_size", u64::from(self.page_size));
        positive(&mut errors, "transfer.request_timeout_secs", self.request_timeout_secs);
        if self.retry_base_delay_ms > self.retry_max_delay_ms {
            errors.push(ValidationError {
                field: "transfer.retry_base_delay_ms".into(),
                message: format!(
                    "retry_base_delay_ms ({}) must not exceed retry_max_delay_ms ({})",
                    self.retry_base_delay_ms, self.retry_max_delay_ms
                ),
            });
        }
        errors
    }
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = self.transfer.validate();

        // --- profile ---
        if let Some(url) = &self.profile.url {
            if url.trim().is_empty() {
                errors.push(ValidationError {
                    field: "profile.url".into(),
                    message: "must not be empty when set".into(),
                });
            }
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use rivet_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .chunk_size(4 * 1024 * 1024)
///     .workers(4)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- transfer ---

    pub fn chunk_size(mut self, bytes: u64) -> Self {
        self.config.transfer.chunk_size = bytes;
        self
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.config.transfer.workers = n;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.transfer.max_attempts = n;
        self
    }

    pub fn retry_delays_ms(mut self, base: u64, max: u64) -> Self {
        self.config.transfer.retry_base_delay_ms = base;
        self.config.transfer.retry_max_delay_ms = max;
        self
    }

    pub fn page_size(mut self, n: u32) -> Self {
        self.config.transfer.page_size = n;
        self
    }

    pub fn request_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.transfer.request_timeout_secs = seconds;
        self
    }

    // --- profile ---

    pub fn profile_url(mut self, url: impl Into<String>) -> Self {
        self.config.profile.url = Some(url.into());
        self
    }

    pub fn profile_auth(mut self, auth: impl Into<String>) -> Self {
        self.config.profile.auth = Some(auth.into());
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
