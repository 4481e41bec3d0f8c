//! solr-exporter library
//!
//! This crate discovers the cores of Solr servers, reads their mbeans
//! statistics and turns them into metric records (`solr_admin`, `solr_core`,
//! `solr_queryhandler`, `solr_updatehandler`, `solr_cache`, `solr_dih`) that
//! can be exported in Prometheus format.

pub mod accumulator;
pub mod cli;
pub mod collector;
pub mod config;
pub mod error;
pub mod metrics;
pub mod server;
pub mod transformer;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging subsystem
///
/// `RUST_LOG` takes precedence over `level` when set. Logs go to stderr so
/// that `--once` output on stdout stays machine readable.
///
/// # Errors
/// Returns an error if a global subscriber is already installed
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
