//! Configuration management for solr-exporter
//!
//! Handles loading and validating configuration from YAML files.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error reading the configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Error parsing the configuration file
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation error
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Solr target configuration
    #[serde(default)]
    pub solr: SolrConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Solr target configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolrConfig {
    /// Base URLs of the Solr nodes to poll (e.g. "http://localhost:8983")
    #[serde(default = "default_servers")]
    pub servers: Vec<String>,

    /// Optional username for basic auth
    pub username: Option<String>,

    /// Optional password for basic auth
    pub password: Option<String>,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,

    /// Only collect mbeans for these cores (empty means every discovered core)
    #[serde(default)]
    pub cores: Vec<String>,

    /// Maximum in-flight mbeans requests per server
    #[serde(default = "default_max_concurrent_cores")]
    pub max_concurrent_cores: usize,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Metrics endpoint path
    #[serde(default = "default_metrics_path")]
    pub path: String,

    /// Server bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

// Default value functions
fn default_servers() -> Vec<String> {
    vec!["http://localhost:8983".to_string()]
}

fn default_timeout() -> u64 {
    5000
}

fn default_max_concurrent_cores() -> usize {
    8
}

fn default_port() -> u16 {
    9983
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

impl Default for SolrConfig {
    fn default() -> Self {
        Self {
            servers: default_servers(),
            username: None,
            password: None,
            timeout_ms: default_timeout(),
            cores: Vec::new(),
            max_concurrent_cores: default_max_concurrent_cores(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            path: default_metrics_path(),
            bind_address: default_bind_address(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    /// Use `Config::load_or_default()` to fall back to defaults for a missing file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file, falling back to defaults if not found
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        Self::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if !self.server.path.starts_with('/') {
            return Err(ConfigError::ValidationError(
                "Metrics path must start with '/'".to_string(),
            ));
        }

        if self.server.path == "/" || self.server.path == "/health" {
            return Err(ConfigError::ValidationError(format!(
                "Metrics path '{}' conflicts with a built-in route",
                self.server.path
            )));
        }

        if self.solr.servers.is_empty() {
            return Err(ConfigError::ValidationError(
                "At least one Solr server must be configured".to_string(),
            ));
        }

        for server in &self.solr.servers {
            let url = url::Url::parse(server).map_err(|e| {
                ConfigError::ValidationError(format!("Invalid Solr server URL '{}': {}", server, e))
            })?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(ConfigError::ValidationError(format!(
                    "Solr server URL '{}' must use http or https",
                    server
                )));
            }
        }

        if self.solr.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "Solr timeout must be greater than 0".to_string(),
            ));
        }

        if self.solr.max_concurrent_cores == 0 {
            return Err(ConfigError::ValidationError(
                "max_concurrent_cores must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
