//! Environment-driven proxy configuration.
//!
//! All settings come from environment variables with compiled defaults;
//! there is no configuration file. An optional `.env` file is sourced by the
//! binary before this module runs.
//!
//! | Variable | Default |
//! |---|---|
//! | `SENTINEL_BACKENDS` | *(required, comma-separated URLs)* |
//! | `PROXY_PORT` | `8080` |
//! | `LOG_LEVEL` | `info` |
//! | `REQUEST_TIMEOUT_MS` | `30000` |
//! | `HEALTH_CHECK_INTERVAL_MS` | `30000` |
//! | `INTEGRITY_CHECK_INTERVAL_MS` | `60000` |
//! | `INTEGRITY_CHECK_EPOCHS` | `10` |
//! | `INTEGRITY_SCORE_THRESHOLD` | `95` |
//! | `SLOTS_PER_EPOCH` | `32` |
//! | `EXPECTED_VALIDATORS` | `24` |
//! | `ARCHIVER_THRESHOLD_EPOCHS` | `100` |
//!
//! Configuration is validated at load time; an empty backend list or a zero
//! port/interval is a startup error, not a silent fallback.

use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::time::Duration;

/// Runtime configuration for the proxy, loaded from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Comma-separated list of sentinel node URLs to front.
    #[serde(default)]
    pub sentinel_backends: String,

    /// Port the HTTP listener binds on.
    pub proxy_port: u16,

    /// Log level used when `RUST_LOG` is not set.
    pub log_level: String,

    /// Timeout for outbound RPC and forwarded requests, in milliseconds.
    pub request_timeout_ms: u64,

    /// Readiness probe interval in milliseconds.
    pub health_check_interval_ms: u64,

    /// Integrity probe interval in milliseconds.
    pub integrity_check_interval_ms: u64,

    /// Number of trailing epochs the integrity probe analyzes.
    pub integrity_check_epochs: usize,

    /// Score at or below which a backend's integrity status is `bad`.
    pub integrity_score_threshold: i32,

    /// Slots per epoch on the fronted chain.
    pub slots_per_epoch: i64,

    /// Validator committee size expected per epoch.
    pub expected_validators: i64,

    /// Backends observing more than this many epochs are typed `archiver`.
    pub archiver_threshold_epochs: usize,
}

impl ProxyConfig {
    /// Loads configuration from the process environment over compiled
    /// defaults and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable cannot be parsed into its field
    /// type or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let cfg: Self = Config::builder()
            .set_default("sentinel_backends", "")?
            .set_default("proxy_port", 8080)?
            .set_default("log_level", "info")?
            .set_default("request_timeout_ms", 30_000)?
            .set_default("health_check_interval_ms", 30_000)?
            .set_default("integrity_check_interval_ms", 60_000)?
            .set_default("integrity_check_epochs", 10)?
            .set_default("integrity_score_threshold", 95)?
            .set_default("slots_per_epoch", 32)?
            .set_default("expected_validators", 24)?
            .set_default("archiver_threshold_epochs", 100)?
            .add_source(Environment::default())
            .build()?
            .try_deserialize()?;

        cfg.validate().map_err(ConfigError::Message)?;
        Ok(cfg)
    }

    /// Backend URLs parsed from `SENTINEL_BACKENDS`.
    ///
    /// Entries are trimmed; empty entries are dropped.
    #[must_use]
    pub fn backend_urls(&self) -> Vec<String> {
        self.sentinel_backends
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Outbound request timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Readiness probe interval as a [`Duration`].
    #[must_use]
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }

    /// Integrity probe interval as a [`Duration`].
    #[must_use]
    pub fn integrity_check_interval(&self) -> Duration {
        Duration::from_millis(self.integrity_check_interval_ms)
    }

    /// Validates the configuration for correctness.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.backend_urls().is_empty() {
            return Err("SENTINEL_BACKENDS must list at least one backend URL".to_string());
        }

        for url in self.backend_urls() {
            if !url.starts_with("http") {
                return Err(format!("Invalid backend URL: {url}"));
            }
        }

        if self.proxy_port == 0 {
            return Err("PROXY_PORT must be greater than 0".to_string());
        }

        if self.health_check_interval_ms == 0 || self.integrity_check_interval_ms == 0 {
            return Err("Probe intervals must be greater than 0".to_string());
        }

        if self.slots_per_epoch <= 0 {
            return Err("SLOTS_PER_EPOCH must be greater than 0".to_string());
        }

        Ok(())
    }
}
