//! CLI argument parsing for solr-exporter
//!
//! This module provides the command-line interface using clap derive macros.
//!
//! # Options
//!
//! - `--config` / `-c`: Configuration file path (default: config.yaml, env: SOLR_EXPORTER_CONFIG)
//! - `--port` / `-p`: Server port (env: SOLR_EXPORTER_PORT)
//! - `--bind-address`: Server bind address (env: SOLR_EXPORTER_BIND_ADDRESS)
//! - `--metrics-path`: Metrics endpoint path (env: SOLR_EXPORTER_METRICS_PATH)
//! - `--server` / `-s`: Solr base URL, repeatable (env: SOLR_EXPORTER_SERVERS, comma separated)
//! - `--timeout`: Solr request timeout in milliseconds (env: SOLR_EXPORTER_TIMEOUT)
//! - `--username` / `--password`: Solr basic auth (env: SOLR_EXPORTER_USERNAME / SOLR_EXPORTER_PASSWORD)
//! - `--validate`: Validate configuration without starting server
//! - `--once`: Run a single collection cycle and print the records as JSON
//! - `--log-level` / `-l`: Log level (env: SOLR_EXPORTER_LOG_LEVEL)
//!
//! # Precedence
//!
//! 1. CLI arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::Config;

/// solr-exporter - Solr core and handler metrics collector
///
/// Discovers the cores of one or more Solr servers, reads their mbeans
/// statistics and exports them in Prometheus format.
#[derive(Parser, Debug)]
#[command(name = "solr-exporter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config.yaml",
        env = "SOLR_EXPORTER_CONFIG"
    )]
    pub config: PathBuf,

    /// Server port (overrides config file)
    #[arg(short, long, value_name = "PORT", env = "SOLR_EXPORTER_PORT")]
    pub port: Option<u16>,

    /// Server bind address (overrides config file)
    /// Supported values: IP addresses (0.0.0.0, 127.0.0.1, ::1) or "localhost"
    #[arg(long, value_name = "ADDRESS", env = "SOLR_EXPORTER_BIND_ADDRESS")]
    pub bind_address: Option<String>,

    /// Metrics endpoint path (overrides config file)
    #[arg(long, value_name = "PATH", env = "SOLR_EXPORTER_METRICS_PATH")]
    pub metrics_path: Option<String>,

    /// Solr base URL to poll; repeat for several servers (replaces configured servers)
    #[arg(
        short = 's',
        long = "server",
        value_name = "URL",
        env = "SOLR_EXPORTER_SERVERS",
        value_delimiter = ','
    )]
    pub servers: Vec<String>,

    /// Solr request timeout in milliseconds (overrides config file)
    #[arg(long, value_name = "MS", env = "SOLR_EXPORTER_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Solr basic auth username (overrides config file)
    #[arg(long, value_name = "USERNAME", env = "SOLR_EXPORTER_USERNAME")]
    pub username: Option<String>,

    /// Solr basic auth password (overrides config file)
    #[arg(long, value_name = "PASSWORD", env = "SOLR_EXPORTER_PASSWORD")]
    pub password: Option<String>,

    /// Validate configuration without starting server
    #[arg(long)]
    pub validate: bool,

    /// Run one collection cycle, print the records as JSON and exit
    #[arg(long, conflicts_with = "validate")]
    pub once: bool,

    /// Log level
    #[arg(
        short,
        long,
        value_enum,
        default_value = "info",
        env = "SOLR_EXPORTER_LOG_LEVEL"
    )]
    pub log_level: LogLevel,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(bind_address) = &self.bind_address {
            config.server.bind_address = bind_address.clone();
        }
        if let Some(path) = &self.metrics_path {
            config.server.path = path.clone();
        }
        if !self.servers.is_empty() {
            config.solr.servers = self.servers.clone();
        }
        if let Some(timeout) = self.timeout {
            config.solr.timeout_ms = timeout;
        }
        if let Some(username) = &self.username {
            config.solr.username = Some(username.clone());
        }
        if let Some(password) = &self.password {
            config.solr.password = Some(password.clone());
        }
    }
}

/// Log level options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Most verbose
    Trace,
    Debug,
    /// Default
    Info,
    Warn,
    /// Least verbose
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(level)
    }
}
