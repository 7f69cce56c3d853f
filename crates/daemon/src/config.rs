//! Configuration management for the FileGate daemon.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/filegate/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::files::DEFAULT_MAX_UPLOAD_SIZE;

/// Secret shipped in the default configuration. Sessions signed with it can
/// be forged by anyone who has read this source, so startup warns about it.
pub const DEFAULT_SESSION_SECRET: &str = "filegate-default-secret-change-me";

const MIN_SESSION_TTL_SECS: u64 = 60;
const MAX_SESSION_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Bounds of the bcrypt work factor accepted by `bcrypt::hash`.
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("port must be greater than 0")]
    InvalidPort,

    #[error("session ttl_secs must be between 60 and 2592000 seconds, got {0}")]
    InvalidSessionTtl(u64),

    #[error("session secret must not be empty")]
    EmptySecret,

    #[error("cookie_name must be a non-empty token without ';', '=' or whitespace, got {0:?}")]
    InvalidCookieName(String),

    #[error("max_upload_size must be greater than 0, got {0}")]
    InvalidMaxUploadSize(u64),

    #[error("bcrypt_cost must be between 4 and 31, got {0}")]
    InvalidBcryptCost(u32),

    #[error("log level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for the FileGate daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Listener and root directory.
    pub server: ServerConfig,

    /// Session cookie settings.
    pub session: SessionConfig,

    /// File operation limits.
    pub files: FileConfig,

    /// Credential storage.
    pub auth: AuthConfig,

    /// Logging.
    pub log: LogConfig,
}

/// Listener and root directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind_address: String,

    /// TCP port.
    pub port: u16,

    /// Directory that every file operation is confined to. Empty means the
    /// working directory at startup.
    pub root_dir: PathBuf,

    /// Origins allowed to call the API from a browser. Empty disables CORS.
    pub cors_origins: Vec<String>,
}

/// Session cookie settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Key used to sign session cookies.
    pub secret: String,

    /// Session lifetime in seconds.
    pub ttl_secs: u64,

    /// Name of the session cookie.
    pub cookie_name: String,

    /// Mark the cookie `Secure` (only sent over HTTPS).
    pub secure_cookie: bool,
}

/// File operation limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    /// Largest accepted upload in bytes (default: 32MB).
    pub max_upload_size: u64,

    /// List entries whose name starts with '.'.
    pub include_hidden: bool,
}

/// Credential storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    /// JSON file holding the account.
    pub credentials_file: PathBuf,

    /// Account used while the credentials file does not exist.
    pub default_username: String,
    pub default_password: String,

    /// bcrypt work factor for new hashes.
    pub bcrypt_cost: u32,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub level: String,

    /// Also write logs to this file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            root_dir: PathBuf::new(),
            cors_origins: Vec::new(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_SESSION_SECRET.to_string(),
            ttl_secs: 24 * 60 * 60,
            cookie_name: "filegate_session".to_string(),
            secure_cookie: false,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            include_hidden: true,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credentials_file: default_data_dir().join("credentials.json"),
            default_username: "admin".to_string(),
            default_password: "admin123".to_string(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("filegate")
        .join("config.toml")
}

/// Returns the default data directory path.
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("filegate")
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret == DEFAULT_SESSION_SECRET
    }
}

impl ServerConfig {
    /// `address:port` to bind.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// The configured root, or the working directory when unset.
    pub fn root_dir_or_cwd(&self) -> Result<PathBuf> {
        if self.root_dir.as_os_str().is_empty() {
            std::env::current_dir().context("Failed to determine the working directory")
        } else {
            Ok(self.root_dir.clone())
        }
    }
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - FILEGATE_ROOT_DIR: Override the root directory
    /// - FILEGATE_PORT: Override the listen port
    /// - FILEGATE_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(root) = std::env::var("FILEGATE_ROOT_DIR") {
            if !root.is_empty() {
                tracing::info!("Overriding root_dir from environment: {}", root);
                self.server.root_dir = PathBuf::from(root);
            }
        }

        if let Ok(port) = std::env::var("FILEGATE_PORT") {
            if !port.is_empty() {
                match port.parse::<u16>() {
                    Ok(port) => {
                        tracing::info!("Overriding port from environment: {}", port);
                        self.server.port = port;
                    }
                    Err(_) => tracing::warn!("Ignoring invalid FILEGATE_PORT: {}", port),
                }
            }
        }

        if let Ok(level) = std::env::var("FILEGATE_LOG_LEVEL") {
            if !level.is_empty() {
                tracing::info!("Overriding log level from environment: {}", level);
                self.log.level = level;
            }
        }
    }

    /// Validate the configuration values.
    ///
    /// Returns an error if any configuration value is outside the valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        let ttl = self.session.ttl_secs;
        if !(MIN_SESSION_TTL_SECS..=MAX_SESSION_TTL_SECS).contains(&ttl) {
            return Err(ConfigError::InvalidSessionTtl(ttl));
        }

        if self.session.secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }

        let name = &self.session.cookie_name;
        if name.is_empty()
            || name
                .chars()
                .any(|c| c == ';' || c == '=' || c == ',' || c.is_whitespace() || c.is_control())
        {
            return Err(ConfigError::InvalidCookieName(name.clone()));
        }

        if self.files.max_upload_size == 0 {
            return Err(ConfigError::InvalidMaxUploadSize(self.files.max_upload_size));
        }

        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.auth.bcrypt_cost) {
            return Err(ConfigError::InvalidBcryptCost(self.auth.bcrypt_cost));
        }

        let level = self.log.level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.log.level.clone()));
        }

        if self.session.uses_default_secret() {
            tracing::warn!(
                "Session secret is the built-in default; set [session] secret to a random value"
            );
        }

        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}
