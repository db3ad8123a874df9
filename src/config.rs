//! Configuration loading and validation.
//!
//! Configuration is TOML, deserialized with serde into [`Config`]. Every
//! section has workable defaults so a bare `[server]` block is enough to
//! boot a local instance.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML or does not match the schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value failed a semantic check.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Identity and listener settings.
    pub server: ServerConfig,
    /// Protocol size limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Session timeout settings.
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    /// Credential store settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Packet schema source.
    #[serde(default)]
    pub schema: SchemaConfig,
}

/// Identity and listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name announced in system messages.
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Address the gateway binds to.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

/// Protocol size limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum accepted chat message length in bytes.
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
    /// Maximum accepted frame length in bytes.
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,
}

/// Session timeout settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutsConfig {
    /// Seconds of silence before a session is evicted. Expiry behaves like
    /// a transport-error closure: disconnect broadcast, directory removal.
    #[serde(default = "default_idle_secs")]
    pub idle_secs: u64,
}

/// Credential store settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path.
    #[serde(default = "default_db_path")]
    pub path: String,
}

/// Packet schema source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaConfig {
    /// Path to a TOML schema document. The built-in schema is used when
    /// unset.
    pub path: Option<String>,
}

fn default_server_name() -> String {
    "palaver".to_string()
}

fn default_listen() -> SocketAddr {
    "0.0.0.0:7667".parse().expect("static default address")
}

fn default_max_message_len() -> usize {
    512
}

fn default_max_frame_len() -> usize {
    16 * 1024
}

fn default_idle_secs() -> u64 {
    300
}

fn default_db_path() -> String {
    "palaverd.db".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            listen: default_listen(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            limits: LimitsConfig::default(),
            timeouts: TimeoutsConfig::default(),
            database: DatabaseConfig::default(),
            schema: SchemaConfig::default(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_message_len: default_max_message_len(),
            max_frame_len: default_max_frame_len(),
        }
    }
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            idle_secs: default_idle_secs(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.name.is_empty() {
            return Err(ConfigError::Invalid("server.name must not be empty".into()));
        }
        if self.timeouts.idle_secs == 0 {
            return Err(ConfigError::Invalid(
                "timeouts.idle_secs must be greater than zero".into(),
            ));
        }
        if self.limits.max_message_len == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_message_len must be greater than zero".into(),
            ));
        }
        if self.limits.max_frame_len < self.limits.max_message_len {
            return Err(ConfigError::Invalid(
                "limits.max_frame_len must be at least limits.max_message_len".into(),
            ));
        }
        Ok(())
    }
}
