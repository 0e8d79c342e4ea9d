#![deny(unsafe_code)]

//! Configuration loading and validation for dockhand.
//!
//! Loads TOML configuration files and validates them. [`AppConfig`] is the
//! single configuration value the CLI builds its engine client from.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default Unix socket path of the container engine.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/docker.sock";

/// `User-Agent` sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("dockhand/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Engine endpoint and request settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// External CLI settings.
    #[serde(default)]
    pub cli: CliConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How to reach the engine's HTTP control API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Transport kind: "unix" or "tcp".
    #[serde(default = "default_transport")]
    pub transport: String,

    /// Unix domain socket path (when transport = "unix").
    #[serde(default = "default_socket_path")]
    pub socket_path: String,

    /// Host to connect to (when transport = "tcp").
    #[serde(default = "default_tcp_host")]
    pub tcp_host: String,

    /// Port to connect to (when transport = "tcp").
    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,

    /// `User-Agent` sent with every request. Some engine versions slow
    /// down requests that lack one.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds (0 = no timeout).
    #[serde(default)]
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transport: default_transport(),
            socket_path: default_socket_path(),
            tcp_host: default_tcp_host(),
            tcp_port: default_tcp_port(),
            user_agent: default_user_agent(),
            timeout_secs: 0,
        }
    }
}

impl EngineConfig {
    /// Whether the TCP transport is selected.
    pub fn is_tcp(&self) -> bool {
        self.transport == "tcp"
    }
}

fn default_transport() -> String {
    "unix".to_string()
}

fn default_socket_path() -> String {
    DEFAULT_SOCKET_PATH.to_string()
}

fn default_tcp_host() -> String {
    "127.0.0.1".to_string()
}

fn default_tcp_port() -> u16 {
    2375
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Settings for the external engine CLI used by pull, inspect, copy and
/// directory listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Engine CLI binary (looked up on `PATH` unless absolute).
    #[serde(default = "default_docker_bin")]
    pub docker_bin: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            docker_bin: default_docker_bin(),
        }
    }
}

fn default_docker_bin() -> String {
    "docker".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
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
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_transports = ["unix", "tcp"];
        if !valid_transports.contains(&self.engine.transport.as_str()) {
            return Err(ConfigError::Validation(format!(
                "engine.transport must be one of {:?}, got {:?}",
                valid_transports, self.engine.transport
            )));
        }
        if self.engine.is_tcp() {
            if self.engine.tcp_host.is_empty() {
                return Err(ConfigError::Validation(
                    "engine.tcp_host must not be empty".to_string(),
                ));
            }
            if self.engine.tcp_port == 0 {
                return Err(ConfigError::Validation(
                    "engine.tcp_port must be non-zero".to_string(),
                ));
            }
        } else if self.engine.socket_path.is_empty() {
            return Err(ConfigError::Validation(
                "engine.socket_path must not be empty".to_string(),
            ));
        }
        if self.engine.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "engine.user_agent must not be empty".to_string(),
            ));
        }
        if self.cli.docker_bin.is_empty() {
            return Err(ConfigError::Validation(
                "cli.docker_bin must not be empty".to_string(),
            ));
        }
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                valid_levels, self.logging.level
            )));
        }
        Ok(())
    }
}
