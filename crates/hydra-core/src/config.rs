//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: hardcoded in struct `Default` implementations
//! 2. **Config file**: TOML file specified by `HYDRA_CONFIG` env var
//! 3. **Environment variables**: `HYDRA_*` env vars override specific fields
//!
//! # Example
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! bind_port = 6969
//!
//! [dispatch]
//! timeout_seconds = 5
//!
//! [[seed_nodes]]
//! host = "97.64.253.98"
//! port = 6969
//! ```

use crate::upstream::pool::PoolSettings;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// HTTP server configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// IP address to bind the server to. Defaults to `0.0.0.0`.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port number to listen on. Defaults to `6969`, the port the reference
    /// deployment exposed.
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Maximum number of concurrent gateway requests. Defaults to `100`.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_bind_port() -> u16 {
    6969
}

fn default_max_concurrent_requests() -> usize {
    100
}

/// Fan-out dispatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Deadline for a whole fan-out race in seconds. Defaults to `5`.
    #[serde(default = "default_dispatch_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_dispatch_timeout_seconds() -> u64 {
    5
}

/// Sync-health poll configuration for upstream daemons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    /// Interval between sync polls in seconds. Defaults to `10`.
    #[serde(default = "default_poll_interval_seconds")]
    pub interval_seconds: u64,

    /// Consecutive poll failures before an upstream is disconnected.
    /// Defaults to `10`.
    #[serde(default = "default_retry_threshold")]
    pub retry_threshold: u32,
}

fn default_poll_interval_seconds() -> u64 {
    10
}

fn default_retry_threshold() -> u32 {
    10
}

/// Connection pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Interval between reaper scans in milliseconds. Defaults to `250`.
    #[serde(default = "default_reap_interval_ms")]
    pub reap_interval_ms: u64,

    /// Timeout for a single upstream RPC call in seconds. Defaults to `10`.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_reap_interval_ms() -> u64 {
    250
}

fn default_request_timeout_seconds() -> u64 {
    10
}

/// A bootstrap daemon address admitted into the pool at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedNode {
    pub host: String,
    pub port: u16,
}

impl SeedNode {
    fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port }
    }
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
/// Loaded from a TOML file with `HYDRA`-prefixed environment overrides using
/// `__` as the nesting separator (e.g. `HYDRA_SERVER__BIND_PORT=8080`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub health_check: HealthCheckConfig,

    #[serde(default)]
    pub pool: PoolConfig,

    /// Bootstrap daemon list. Defaults to the network's known seed, public,
    /// and explorer nodes.
    #[serde(default = "default_seed_nodes")]
    pub seed_nodes: Vec<SeedNode>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_seed_nodes() -> Vec<SeedNode> {
    vec![
        // Seed nodes
        SeedNode::new("97.64.253.98", 6969),
        SeedNode::new("51.255.209.200", 6969),
        SeedNode::new("23.96.93.180", 6969),
        SeedNode::new("5.172.219.172", 6969),
        // Public nodes
        SeedNode::new("dego.stx.nl", 6969),
        SeedNode::new("dego-stroppy.ddns.net", 6969),
        SeedNode::new("node-eu.dego.gq", 6969),
        SeedNode::new("185.17.27.105", 6969),
        SeedNode::new("publicnode.ydns.eu", 6969),
        // Public blockchain explorer nodes
        SeedNode::new("explorer.dego.gq", 6969),
        SeedNode::new("pool.llama.horse", 42068),
        SeedNode::new("dego.pool.flowmine.xyz", 42065),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { timeout_seconds: default_dispatch_timeout_seconds() }
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_poll_interval_seconds(),
            retry_threshold: default_retry_threshold(),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            reap_interval_ms: default_reap_interval_ms(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            dispatch: DispatchConfig::default(),
            health_check: HealthCheckConfig::default(),
            pool: PoolConfig::default(),
            seed_nodes: default_seed_nodes(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("HYDRA").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Loads configuration from `config/hydra.toml` with fallback to defaults.
    ///
    /// The config file path can be overridden using the `HYDRA_CONFIG`
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("HYDRA_CONFIG").unwrap_or_else(|_| "config/hydra.toml".to_string());
        Self::from_file(&config_path)
    }

    /// Returns the parsed socket address for the HTTP server.
    ///
    /// # Errors
    ///
    /// Returns an error string if the address cannot be parsed.
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, String> {
        format!("{}:{}", self.server.bind_address, self.server.bind_port).parse().map_err(|_| {
            format!(
                "Invalid socket address: {}:{}",
                self.server.bind_address, self.server.bind_port
            )
        })
    }

    /// Returns the fan-out dispatch deadline as a [`Duration`].
    #[must_use]
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch.timeout_seconds)
    }

    /// Returns the pool settings derived from the health-check and pool sections.
    #[must_use]
    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            poll_interval: Duration::from_secs(self.health_check.interval_seconds),
            retry_threshold: self.health_check.retry_threshold,
            request_timeout: Duration::from_secs(self.pool.request_timeout_seconds),
            reap_interval: Duration::from_millis(self.pool.reap_interval_ms),
        }
    }

    /// Validates the configuration for correctness and consistency.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.seed_nodes.is_empty() {
            return Err("No seed nodes configured".to_string());
        }

        for seed in &self.seed_nodes {
            if seed.host.is_empty() {
                return Err("Seed node host must not be empty".to_string());
            }
            if seed.port == 0 {
                return Err(format!("Seed node {} has port 0", seed.host));
            }
        }

        if self.server.bind_port == 0 {
            return Err("Bind port must be greater than 0".to_string());
        }

        if self.server.max_concurrent_requests == 0 {
            return Err("Max concurrent requests must be greater than 0".to_string());
        }

        if self.dispatch.timeout_seconds == 0 {
            return Err("Dispatch timeout must be greater than 0".to_string());
        }

        if self.health_check.interval_seconds == 0 {
            return Err("Health check interval must be greater than 0".to_string());
        }

        if self.health_check.retry_threshold == 0 {
            return Err("Health check retry threshold must be greater than 0".to_string());
        }

        if self.pool.reap_interval_ms == 0 {
            return Err("Pool reap interval must be greater than 0".to_string());
        }

        if self.pool.request_timeout_seconds == 0 {
            return Err("Upstream request timeout must be greater than 0".to_string());
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }

        Ok(())
    }
}
