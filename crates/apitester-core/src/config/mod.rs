//! Configuration management for apitester.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `apitester.toml` file
//! 3. User config `~/.config/apitester/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP service configuration.
    pub server: ServerConfig,

    /// Document store configuration.
    pub storage: StorageConfig,

    /// Suite execution configuration.
    pub runner: RunnerConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./apitester.toml` (project local)
    /// 2. `~/.config/apitester/config.toml` (user config)
    /// 3. Falls back to defaults
    ///
    /// Environment overrides apply in every case.
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new(LOCAL_CONFIG_FILE).exists() {
            return Self::from_file(LOCAL_CONFIG_FILE);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join(USER_CONFIG_DIR).join(USER_CONFIG_FILE);
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(port) = std::env::var("APITESTER_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("APITESTER_PORT is not a port: {port}")))?;
        }
        if let Ok(host) = std::env::var("APITESTER_HOST") {
            self.server.host = host;
        }

        // BASE_PATH is the name older deployments used for the data root.
        if let Ok(dir) = std::env::var("APITESTER_DATA_DIR").or_else(|_| std::env::var("BASE_PATH")) {
            self.storage.data_dir = dir;
        }

        if let Ok(secs) = std::env::var("APITESTER_REQUEST_TIMEOUT_SECS") {
            self.runner.request_timeout_secs = secs.parse().map_err(|_| {
                ConfigError::Invalid(format!("APITESTER_REQUEST_TIMEOUT_SECS is not a number: {secs}"))
            })?;
        }

        self.validate()
    }

    /// Checks values that would otherwise fail deep inside a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runner.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "runner.request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.storage.data_dir.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.data_dir must not be empty".to_string()));
        }
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// HTTP service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: u16,

    /// Address to bind.
    pub host: String,

    /// Maximum accepted request body, in bytes.
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: DEFAULT_HOST.to_string(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory; each suite gets a subdirectory named by its id.
    pub data_dir: String,

    /// Suite definition file name.
    pub suite_file: String,

    /// Suite result document file name.
    pub results_file: String,

    /// Subdirectory for per-case history documents.
    pub cases_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: DEFAULT_DATA_DIR.to_string(),
            suite_file: DEFAULT_SUITE_FILE.to_string(),
            results_file: DEFAULT_RESULTS_FILE.to_string(),
            cases_dir: DEFAULT_CASES_DIR.to_string(),
        }
    }
}

impl StorageConfig {
    /// Creates a storage config rooted at `data_dir`, other names default.
    pub fn rooted_at(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_string_lossy().to_string(),
            ..Self::default()
        }
    }

    /// Get the full path to a suite directory.
    pub fn suite_path(&self, suite_id: &str) -> PathBuf {
        PathBuf::from(&self.data_dir).join(suite_id)
    }
}

/// Suite execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Timeout applied to every outbound request.
    pub request_timeout_secs: u64,

    /// Header used to tag outbound requests with `{suiteId}.{caseName}`.
    /// An empty string (`correlation_header = ""`) sends no such header.
    pub correlation_header: Option<String>,

    /// User agent for outbound requests.
    pub user_agent: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            correlation_header: Some(DEFAULT_CORRELATION_HEADER.to_string()),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl RunnerConfig {
    /// The correlation header to send, if any.
    pub fn correlation_header_name(&self) -> Option<String> {
        self.correlation_header
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }

    /// Request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
