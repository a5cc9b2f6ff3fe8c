//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::client::AuthContext;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub datasource: DatasourceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// TSDS datasource configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatasourceConfig {
    /// Base URL of the TSDS web service
    #[serde(default = "default_url")]
    pub url: String,

    /// Datasource name adhoc filters are bound to
    #[serde(default = "default_name")]
    pub name: String,

    /// Pre-encoded `Authorization` header value
    pub basic_auth: Option<String>,

    #[serde(default)]
    pub with_credentials: bool,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_name() -> String {
    "tsds".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for DatasourceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            name: default_name(),
            basic_auth: None,
            with_credentials: false,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl DatasourceConfig {
    /// Credentials to attach to every outbound request
    pub fn auth_context(&self) -> AuthContext {
        match &self.basic_auth {
            Some(header) => AuthContext::basic(header.clone()),
            None => AuthContext {
                authorization: None,
                with_credentials: self.with_credentials,
            },
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("tsds").join("config.toml")),
            Some(PathBuf::from("/etc/tsds/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `TSDS_*` overrides from a variable lookup
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("TSDS_URL") {
            self.datasource.url = url;
        }
        if let Some(name) = lookup("TSDS_DATASOURCE_NAME") {
            self.datasource.name = name;
        }
        if let Some(auth) = lookup("TSDS_BASIC_AUTH") {
            self.datasource.basic_auth = Some(auth);
        }

        if let Some(level) = lookup("TSDS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("TSDS_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# TSDS Datasource Configuration
#
# Environment variables override these settings:
# - TSDS_URL
# - TSDS_DATASOURCE_NAME
# - TSDS_BASIC_AUTH
# - TSDS_LOG_LEVEL
# - TSDS_LOG_FORMAT

[datasource]
# Base URL of the TSDS web service
url = "http://localhost:8080"

# Datasource name (adhoc filters are bound to it)
name = "tsds"

# Pre-encoded Authorization header, e.g. "Basic dXNlcjpwYXNz"
# basic_auth = ""

# Forward ambient credentials with every request
with_credentials = false

# Request timeout in seconds
request_timeout_secs = 30

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/tsds/tsds.log"
"#
    .to_string()
}
