//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: Hardcoded in struct `Default` implementations
//! 2. **Config file**: TOML file specified by `SPYGLASS_CONFIG` env var
//! 3. **Environment variables**: `SPYGLASS_*` env vars override specific fields
//!
//! # Configuration Sections
//!
//! - [`NodesConfig`]: node endpoint definitions, including the untrusted set
//! - [`SafetyConfig`]: safe-transaction delay and conflict polling cadence
//! - [`BroadcastConfig`]: shotgun fan-out and retry budget
//! - [`RefreshConfig`]: tip refresh interval and probe timeout
//! - [`LoggingConfig`]: log level and format
//!
//! # Validation
//!
//! Configuration is validated at load time. Invalid configurations (e.g.,
//! zero shotgun count, malformed URLs) return errors rather than failing
//! silently.
//!
//! # Example
//!
//! ```toml
//! network = "mainnet"
//!
//! [[nodes.endpoints]]
//! name = "primary"
//! url = "http://10.0.0.1:8332"
//! username = "rpc"
//! password = "secret"
//!
//! [[nodes.endpoints]]
//! name = "watcher-1"
//! url = "http://10.0.0.2:8332"
//! untrusted = true
//! ```

use crate::node::NodeEndpoint;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Which chain the tracker follows. Endpoint operators must agree with
/// this setting; the tracker cannot verify it over JSON-RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Regtest,
}

impl Default for Network {
    fn default() -> Self {
        Self::Mainnet
    }
}

/// Container for all node endpoint configurations.
///
/// Must contain at least one endpoint for the application to function.
/// Endpoints flagged `untrusted = true` form the conflict-watch set; the
/// rest are the trusted set used for tip aggregation and broadcast.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodesConfig {
    /// List of configured node endpoints. Cannot be empty.
    #[serde(default)]
    pub endpoints: Vec<NodeEndpoint>,

    /// How many untrusted endpoints to actually poll for conflicts.
    /// Capped at the number of endpoints flagged untrusted. Defaults to `4`.
    #[serde(default = "default_untrusted_count")]
    pub untrusted_count: usize,
}

fn default_untrusted_count() -> usize {
    4
}

/// Transaction-safety monitoring settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Milliseconds a tracked transaction must survive unchallenged before
    /// it is promoted to safe. Defaults to `2000`.
    #[serde(default = "default_safe_tx_delay_ms")]
    pub safe_tx_delay_ms: u64,

    /// Interval in milliseconds between conflict polls of the untrusted
    /// set while a transaction is pending. Defaults to `500`.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Seconds to retain resolved records before the periodic sweep drops
    /// them. Defaults to `3600`.
    #[serde(default = "default_retention_seconds")]
    pub retention_seconds: u64,
}

fn default_safe_tx_delay_ms() -> u64 {
    2000
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_retention_seconds() -> u64 {
    3600
}

/// Shotgun broadcast settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// Number of distinct endpoints each transaction is submitted to.
    /// Must be at least 1. Defaults to `3`.
    #[serde(default = "default_shotgun_count")]
    pub shotgun_count: usize,

    /// Maximum retries per endpoint after the initial attempt. Only
    /// transient failures are retried. Defaults to `25`.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay in milliseconds between retry attempts. Defaults to `5000`.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Hard deadline in seconds for each individual submission attempt.
    /// Defaults to `10`.
    #[serde(default = "default_submit_timeout_seconds")]
    pub submit_timeout_seconds: u64,
}

fn default_shotgun_count() -> usize {
    3
}

fn default_max_retries() -> u32 {
    25
}

fn default_retry_delay_ms() -> u64 {
    5000
}

fn default_submit_timeout_seconds() -> u64 {
    10
}

/// Tip refresh cadence and probe limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Interval between timer-driven aggregation rounds in seconds. Must
    /// be greater than 0. Defaults to `60`.
    #[serde(default = "default_refresh_interval_seconds")]
    pub interval_seconds: u64,

    /// Per-endpoint probe timeout in seconds. Defaults to `5`.
    #[serde(default = "default_probe_timeout_seconds")]
    pub probe_timeout_seconds: u64,
}

fn default_refresh_interval_seconds() -> u64 {
    60
}

fn default_probe_timeout_seconds() -> u64 {
    5
}

/// Application logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "trace", "debug", "info", "warn", "error"). Defaults to `"info"`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Root application configuration containing all subsystem settings.
///
/// Loaded from TOML files and environment variables. Environment overrides
/// use the `SPYGLASS` prefix with `__` as a separator.
///
/// # Example
///
/// ```toml
/// network = "testnet"
///
/// [broadcast]
/// shotgun_count = 2
///
/// [[nodes.endpoints]]
/// name = "primary"
/// url = "http://127.0.0.1:18332"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chain to follow. Defaults to `mainnet`.
    #[serde(default)]
    pub network: Network,

    /// Node endpoint configuration.
    #[serde(default)]
    pub nodes: NodesConfig,

    /// Transaction-safety monitoring configuration.
    #[serde(default)]
    pub safety: SafetyConfig,

    /// Shotgun broadcast configuration.
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// Tip refresh configuration.
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self { safe_tx_delay_ms: 2000, poll_interval_ms: 500, retention_seconds: 3600 }
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self { shotgun_count: 3, max_retries: 25, retry_delay_ms: 5000, submit_timeout_seconds: 10 }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { interval_seconds: 60, probe_timeout_seconds: 5 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            nodes: NodesConfig::default(),
            safety: SafetyConfig::default(),
            broadcast: BroadcastConfig::default(),
            refresh: RefreshConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// Environment variables with the `SPYGLASS__` prefix can override any
    /// configuration value. Use `__` as a separator for nested fields
    /// (e.g., `SPYGLASS__BROADCAST__SHOTGUN_COUNT=5`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let config_builder = Config::builder()
            .set_default("network", "mainnet")?
            .set_default("nodes.untrusted_count", 4)?
            .set_default("safety.safe_tx_delay_ms", 2000)?
            .set_default("safety.poll_interval_ms", 500)?
            .set_default("safety.retention_seconds", 3600)?
            .set_default("broadcast.shotgun_count", 3)?
            .set_default("broadcast.max_retries", 25)?
            .set_default("broadcast.retry_delay_ms", 5000)?
            .set_default("broadcast.submit_timeout_seconds", 10)?
            .set_default("refresh.interval_seconds", 60)?
            .set_default("refresh.probe_timeout_seconds", 5)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("SPYGLASS").separator("__"))
            .build()?;

        config_builder.try_deserialize()
    }

    /// Loads configuration from `config/config.toml` with fallback to defaults.
    ///
    /// The config file path can be overridden using the `SPYGLASS_CONFIG`
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("SPYGLASS_CONFIG").unwrap_or_else(|_| "config/config.toml".to_string());
        Self::from_file(&config_path)
    }

    /// Endpoints in the trusted set (tip aggregation, broadcast), in
    /// configured order.
    #[must_use]
    pub fn trusted_endpoints(&self) -> Vec<NodeEndpoint> {
        self.nodes.endpoints.iter().filter(|e| !e.untrusted).cloned().collect()
    }

    /// Endpoints in the untrusted conflict-watch set, in configured order,
    /// capped at `untrusted_count`.
    #[must_use]
    pub fn untrusted_endpoints(&self) -> Vec<NodeEndpoint> {
        self.nodes
            .endpoints
            .iter()
            .filter(|e| e.untrusted)
            .take(self.nodes.untrusted_count)
            .cloned()
            .collect()
    }

    /// Returns the safe-transaction delay as a [`Duration`].
    #[must_use]
    pub fn safe_tx_delay(&self) -> Duration {
        Duration::from_millis(self.safety.safe_tx_delay_ms)
    }

    /// Returns the conflict poll interval as a [`Duration`].
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.safety.poll_interval_ms)
    }

    /// Returns the resolved-record retention window as a [`Duration`].
    #[must_use]
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.safety.retention_seconds)
    }

    /// Returns the retry delay as a [`Duration`].
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.broadcast.retry_delay_ms)
    }

    /// Returns the per-attempt submission deadline as a [`Duration`].
    #[must_use]
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.broadcast.submit_timeout_seconds)
    }

    /// Returns the refresh interval as a [`Duration`].
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh.interval_seconds)
    }

    /// Returns the per-endpoint probe timeout as a [`Duration`].
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh.probe_timeout_seconds)
    }

    /// Validates the configuration for correctness and consistency.
    ///
    /// Checks include:
    /// - At least one trusted endpoint is configured
    /// - All URLs are properly formatted
    /// - Shotgun count, intervals, and delays are greater than zero where required
    /// - Logging format is either `"json"` or `"pretty"`
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.nodes.endpoints.is_empty() {
            return Err("No node endpoints configured".to_string());
        }
        if self.trusted_endpoints().is_empty() {
            return Err("At least one trusted (non-untrusted) endpoint is required".to_string());
        }

        for endpoint in &self.nodes.endpoints {
            if endpoint.name.is_empty() {
                return Err("Endpoint names cannot be empty".to_string());
            }
            if endpoint.url.is_empty() {
                return Err(format!("Empty URL for endpoint: {}", endpoint.name));
            }
            if !endpoint.url.starts_with("http") {
                return Err(format!(
                    "Invalid URL for endpoint {}: {}",
                    endpoint.name, endpoint.url
                ));
            }
        }

        if self.broadcast.shotgun_count == 0 {
            return Err("Shotgun count must be at least 1".to_string());
        }

        if self.broadcast.submit_timeout_seconds == 0 {
            return Err("Submission timeout must be greater than 0".to_string());
        }

        if self.safety.safe_tx_delay_ms == 0 {
            return Err("Safe transaction delay must be greater than 0".to_string());
        }

        if self.safety.poll_interval_ms == 0 {
            return Err("Conflict poll interval must be greater than 0".to_string());
        }

        if self.refresh.interval_seconds == 0 {
            return Err("Refresh interval must be greater than 0".to_string());
        }

        if self.refresh.probe_timeout_seconds == 0 {
            return Err("Probe timeout must be greater than 0".to_string());
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }

        Ok(())
    }
}
