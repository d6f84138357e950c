//! Configuration loading and typed config structures for the veto service.
//!
//! The canonical configuration lives in `veto-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure and a loader that reads the file and applies environment
//! overrides.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "VETO_CONFIG";

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "veto-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An override or value is out of range.
    #[error("invalid config value for {key}: {value}")]
    Invalid {
        /// The offending key.
        key: &'static str,
        /// The rejected value.
        value: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level service configuration.
///
/// Mirrors the structure of `veto-config.yaml`. Every section is optional
/// and falls back to its defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VetoConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Storage backend selection.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Room hub and connection tuning.
    #[serde(default)]
    pub hub: HubConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl VetoConfig {
    /// Load configuration from a YAML file and apply process environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if an override cannot be parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No overrides are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Load from `VETO_CONFIG`, else `veto-config.yaml` if it exists, else
    /// defaults plus environment overrides.
    ///
    /// # Errors
    ///
    /// See [`VetoConfig::from_file`].
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Self::from_file(Path::new(&path));
        }
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            return Self::from_file(default_path);
        }
        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override values from environment-style variables.
    ///
    /// - `DATABASE_URL` sets `storage.postgres_url` and selects the
    ///   `postgres` backend
    /// - `PORT` sets `server.port`
    ///
    /// The lookup is injected so callers and tests control the source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `PORT` is not a valid port.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL").filter(|u| !u.is_empty()) {
            self.storage.postgres_url = Some(url);
            self.storage.backend = StorageBackend::Postgres;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port.parse().map_err(|_parse_err| ConfigError::Invalid {
                key: "PORT",
                value: port.clone(),
            })?;
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origin; `*` allows any.
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

/// Which storage implementation backs the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Process-local store; state is lost on restart.
    #[default]
    Memory,
    /// `PostgreSQL` via `sqlx`.
    Postgres,
}

/// Storage backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Selected backend.
    #[serde(default)]
    pub backend: StorageBackend,

    /// `PostgreSQL` connection string, required for the `postgres` backend.
    #[serde(default)]
    pub postgres_url: Option<String>,

    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Run pending migrations at startup.
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            postgres_url: None,
            max_connections: default_max_connections(),
            run_migrations: true,
        }
    }
}

/// Room hub and per-connection tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HubConfig {
    /// Messages buffered per observer before it is evicted as a slow consumer.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,

    /// Idle interval after which a ping is sent.
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    /// Read silence after which the peer is considered dead.
    #[serde(default = "default_pong_timeout_secs")]
    pub pong_timeout_secs: u64,

    /// Upper bound for a single socket write.
    #[serde(default = "default_write_timeout_secs")]
    pub write_timeout_secs: u64,

    /// Largest accepted inbound frame.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

impl HubConfig {
    /// Ping interval as a [`Duration`].
    pub const fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    /// Pong timeout as a [`Duration`].
    pub const fn pong_timeout(&self) -> Duration {
        Duration::from_secs(self.pong_timeout_secs)
    }

    /// Write timeout as a [`Duration`].
    pub const fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbound_buffer: default_outbound_buffer(),
            ping_interval_secs: default_ping_interval_secs(),
            pong_timeout_secs: default_pong_timeout_secs(),
            write_timeout_secs: default_write_timeout_secs(),
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "*".to_owned()
}

const fn default_max_connections() -> u32 {
    10
}

const fn default_outbound_buffer() -> usize {
    256
}

const fn default_ping_interval_secs() -> u64 {
    54
}

const fn default_pong_timeout_secs() -> u64 {
    60
}

const fn default_write_timeout_secs() -> u64 {
    10
}

const fn default_max_message_bytes() -> usize {
    524_288
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}
