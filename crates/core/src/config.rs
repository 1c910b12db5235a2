//! Configuration management for mission control.
//!
//! Configuration is layered: built-in defaults, then an optional TOML file
//! named by `MISSION_CONTROL_CONFIG`, then individual environment overrides.

use serde::{Deserialize, Serialize};
use std::env;
#[cfg(feature = "toml")]
use std::path::Path;
use std::path::PathBuf;

use crate::error::{CoreError, Result};

/// Environment variable naming the TOML configuration file.
pub const CONFIG_PATH_ENV: &str = "MISSION_CONTROL_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    /// Socket address string suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file holding missions, telemetry and command logs
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./mission_control.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Per-subscriber queue depth for point cloud fan-out
    pub subscriber_queue_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            subscriber_queue_capacity: 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(CoreError::Config(format!("unknown log format '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl Config {
    #[cfg(feature = "toml")]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            stream: StreamConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Build the effective configuration for a process.
    pub fn load() -> Result<Self> {
        let mut config = match env::var(CONFIG_PATH_ENV) {
            #[cfg(feature = "toml")]
            Ok(path) => Self::from_file(path)?,
            #[cfg(not(feature = "toml"))]
            Ok(path) => {
                return Err(CoreError::Config(format!(
                    "{} set to '{}' but TOML support is disabled",
                    CONFIG_PATH_ENV, path
                )))
            }
            Err(_) => Self::default_config(),
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `HOST`, `PORT`, `DATABASE_PATH`, `SUBSCRIBER_QUEUE_CAPACITY`,
    /// `LOG_LEVEL` and `LOG_FORMAT` when present.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = parse_env("PORT", &port)?;
        }
        if let Some(path) = lookup("DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(capacity) = lookup("SUBSCRIBER_QUEUE_CAPACITY") {
            self.stream.subscriber_queue_capacity =
                parse_env("SUBSCRIBER_QUEUE_CAPACITY", &capacity)?;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(CoreError::Config("server.port must be non-zero".to_string()));
        }
        if self.stream.subscriber_queue_capacity == 0 {
            return Err(CoreError::Config(
                "stream.subscriber_queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CoreError::Config(format!("invalid value for {}: '{}'", key, value)))
}
