//! Configuration management for docs-hub
//!
//! Configuration is read once at startup from a YAML (or TOML) file, then
//! selected values are overridden from the environment:
//!
//! | Variable | Overrides |
//! |---|---|
//! | `PORT` | `server.port` |
//! | `REFRESH_INTERVAL` | `refresh_interval` |
//! | `DOCS_HUB_HOST` | `server.host` |
//! | `DOCS_HUB_LOG_LEVEL` | `logging.level` |
//! | `DOCS_HUB_LOG_FORMAT` | `logging.format` |
//!
//! # Example
//!
//! ```yaml
//! environment: dev
//! refresh_interval: 5m
//! server:
//!   port: "9000"
//! services:
//!   - name: orders
//!     display_name: Order Service
//!     base_url: http://orders:8080
//!     doc_path: /v3/api-docs
//!     health_check: /actuator/health
//!     status: stable
//!     owner: commerce
//!     tags: [core]
//! ```

pub mod duration;

pub use duration::parse_duration;

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::fetcher::{DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_BODY_BYTES};
use crate::refresh::DEFAULT_REFRESH_INTERVAL;
use crate::registry::{RegistryError, ServiceDescriptor, ServiceRegistry};

/// Environment variable holding the config file path
pub const ENV_CONFIG_PATH: &str = "CONFIG_PATH";

/// Config file used when neither flag nor environment names one
pub const DEFAULT_CONFIG_PATH: &str = "configs/dev.yaml";

pub const ENV_PORT: &str = "PORT";
pub const ENV_REFRESH_INTERVAL: &str = "REFRESH_INTERVAL";
pub const ENV_HOST: &str = "DOCS_HUB_HOST";
pub const ENV_LOG_LEVEL: &str = "DOCS_HUB_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "DOCS_HUB_LOG_FORMAT";

const DEFAULT_PORT: u16 = 9000;

// ============================================================================
// Errors
// ============================================================================

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl ConfigError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Configuration Types
// ============================================================================

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Deployment environment label (dev, staging, prod)
    #[serde(default)]
    pub environment: String,

    #[serde(default)]
    pub tenant: String,

    #[serde(default)]
    pub region: String,

    /// Period of the recurring refresh, e.g. `5m`
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub fetcher: FetcherConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Backend services, in display order
    #[serde(default)]
    pub services: Vec<ServiceDescriptor>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,

    /// Accepts `9000` or `"9000"`
    #[serde(deserialize_with = "deserialize_port")]
    pub port: u16,

    pub enable_cors: bool,

    pub enable_request_logging: bool,
}

/// Backend fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Timeout applied to every health check and document request
    pub timeout_secs: u64,

    /// Largest document body accepted from a backend
    pub max_body_bytes: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

fn default_refresh_interval() -> String {
    "5m".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            enable_cors: true,
            enable_request_logging: true,
        }
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: String::new(),
            tenant: String::new(),
            region: String::new(),
            refresh_interval: default_refresh_interval(),
            server: ServerConfig::default(),
            fetcher: FetcherConfig::default(),
            logging: LoggingConfig::default(),
            services: Vec::new(),
        }
    }
}

fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) if text.trim().is_empty() => Ok(DEFAULT_PORT),
        Port::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid port: {text}"))),
    }
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    /// Resolve the config path from an explicit value, `CONFIG_PATH`, or the default
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(ENV_CONFIG_PATH).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load a config file, apply environment overrides, and validate
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file; `.toml` files are read as TOML, anything else as YAML
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        // An empty document means "all defaults"
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Override values from the process environment
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var(ENV_PORT) {
            match port.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid {ENV_PORT}"),
            }
        }

        if let Ok(interval) = std::env::var(ENV_REFRESH_INTERVAL) {
            self.refresh_interval = interval;
        }

        if let Ok(host) = std::env::var(ENV_HOST) {
            self.server.host = host;
        }

        if let Ok(level) = std::env::var(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }

        if let Ok(format) = std::env::var(ENV_LOG_FORMAT) {
            self.logging.format = format;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port", "must be greater than 0"));
        }

        if self.fetcher.timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "fetcher.timeout_secs",
                "must be greater than 0",
            ));
        }

        if self.fetcher.max_body_bytes == 0 {
            return Err(ConfigError::invalid(
                "fetcher.max_body_bytes",
                "must be greater than 0",
            ));
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(ConfigError::invalid(
                "logging.format",
                format!("expected 'text' or 'json', got '{}'", self.logging.format),
            ));
        }

        for service in &self.services {
            let field = format!("services.{}.base_url", service.name);
            let url = url::Url::parse(&service.base_url)
                .map_err(|e| ConfigError::invalid(&field, format!("{}: {e}", service.base_url)))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::invalid(
                    field,
                    format!("unsupported scheme '{}'", url.scheme()),
                ));
            }
        }

        // Name uniqueness is enforced by the registry itself
        ServiceRegistry::new(self.services.clone())?;

        Ok(())
    }

    /// Build the service registry
    pub fn registry(&self) -> Result<ServiceRegistry, ConfigError> {
        Ok(ServiceRegistry::new(self.services.clone())?)
    }

    /// Refresh period; malformed or zero values fall back to 5 minutes
    #[must_use]
    pub fn refresh_duration(&self) -> Duration {
        match parse_duration(&self.refresh_interval) {
            Some(d) if !d.is_zero() => d,
            _ => DEFAULT_REFRESH_INTERVAL,
        }
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetcher.timeout_secs)
    }

    /// `host:port` to bind the HTTP server on
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

// ============================================================================
// Tests
// ============================================================================
