//! Configuration loading and typed config structures.
//!
//! Configuration lives in `missive-config.yaml` in the working directory.
//! Every field has a default, so the file is optional and may be partial.
//! A handful of environment variables override the file after parsing.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::channel::{DEFAULT_CHANNEL_CAPACITY, EVERYBODY};
use crate::store::IdStrategy;

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "missive-config.yaml";

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

    /// An environment override held a value of the wrong type.
    #[error("invalid value {value:?} for environment variable {name}")]
    Env {
        /// Variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MissiveConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: HttpConfig,

    /// Message resource settings.
    #[serde(default)]
    pub messages: MessagesConfig,

    /// Real-time fan-out settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl MissiveConfig {
    /// Load configuration from a YAML file at the given path, then apply
    /// environment overrides.
    ///
    /// Environment variables override YAML values:
    /// - `MISSIVE_HOST` overrides `server.host`
    /// - `MISSIVE_PORT` overrides `server.port`
    /// - `MISSIVE_STATIC_DIR` overrides `server.static_dir`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::Env`] if an override cannot be parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.server.apply_env_overrides()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise start from defaults.
    /// Environment overrides apply either way.
    ///
    /// # Errors
    ///
    /// See [`from_file`](Self::from_file).
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        let mut config = Self::default();
        config.server.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides
    /// are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpConfig {
    /// Address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served for paths that match no route.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl HttpConfig {
    /// Apply `MISSIVE_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if `MISSIVE_PORT` is not a valid port.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("MISSIVE_HOST") {
            self.host = val;
        }
        if let Ok(val) = std::env::var("MISSIVE_PORT") {
            let Ok(port) = val.parse() else {
                return Err(ConfigError::Env {
                    name: "MISSIVE_PORT",
                    value: val,
                });
            };
            self.port = port;
        }
        if let Ok(val) = std::env::var("MISSIVE_STATIC_DIR") {
            self.static_dir = PathBuf::from(val);
        }
        Ok(())
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

/// Message resource configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MessagesConfig {
    /// How ids are assigned (`counter` or `store_length`).
    #[serde(default)]
    pub id_strategy: IdStrategy,

    /// Messages created through the full hook pipeline at startup.
    #[serde(default)]
    pub seed: Vec<String>,
}

/// Real-time configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RealtimeConfig {
    /// Events buffered per connection before new ones are dropped.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Group new connections join and events are published to.
    #[serde(default = "default_channel")]
    pub default_channel: String,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            default_channel: default_channel(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset (e.g. `info`, `missive_core=debug`).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    3030
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}

const fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

fn default_channel() -> String {
    EVERYBODY.to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}
