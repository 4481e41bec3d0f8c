//! HTTP server module
//!
//! Provides the Axum-based HTTP server for serving metrics.

pub mod handlers;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::collector::Collector;
use crate::config::Config;
use crate::error::AppResult;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Solr collector, shared so per-server metrics accumulate across scrapes
    pub collector: Arc<Collector>,
}

impl AppState {
    /// Build state from a validated configuration
    pub fn from_config(config: Config) -> AppResult<Self> {
        let collector = Collector::from_config(&config.solr)?;
        Ok(Self {
            config: Arc::new(config),
            collector: Arc::new(collector),
        })
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let metrics_path = state.config.server.path.clone();

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route(&metrics_path, get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Parse the bind address, accepting "localhost" as IPv4 loopback
pub fn parse_bind_address(bind_address: &str) -> Result<IpAddr> {
    if bind_address == "localhost" {
        return Ok(IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
    bind_address.parse().map_err(|e| {
        anyhow::anyhow!(
            "Invalid bind_address '{}': {}. Use an IP address (e.g., '0.0.0.0', '127.0.0.1') or 'localhost'.",
            bind_address,
            e
        )
    })
}

/// Run the HTTP server until Ctrl+C or SIGTERM
///
/// # Errors
/// Returns an error if the collector cannot be built or the listener fails
pub async fn run(config: Config) -> Result<()> {
    let addr = SocketAddr::from((
        parse_bind_address(&config.server.bind_address)?,
        config.server.port,
    ));
    let metrics_path = config.server.path.clone();
    let servers = config.solr.servers.len();

    let app = router(AppState::from_config(config)?);

    info!(address = %addr, metrics_path = %metrics_path, servers, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
