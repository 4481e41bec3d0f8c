//! HTTP request handlers
//!
//! Contains handlers for all HTTP endpoints.

use std::time::Instant;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    Json,
};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::AppState;
use crate::accumulator::MemoryAccumulator;
use crate::error::{AppError, AppResult};
use crate::transformer::{records_to_metrics, MetricType, PrometheusFormatter, PrometheusMetric};

/// Prometheus text exposition content type
const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Health status
    status: String,
    /// Application version
    version: String,
    /// Number of configured Solr servers
    servers: usize,
}

/// Root endpoint - displays basic info
pub async fn root(State(state): State<AppState>) -> Html<String> {
    let servers: String = state
        .collector
        .servers()
        .iter()
        .map(|s| format!("        <li><code>{}</code></li>\n", s))
        .collect();

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>solr-exporter</title>
</head>
<body>
    <h1>solr-exporter</h1>
    <p>Version: {}</p>
    <ul>
        <li><a href="/health">Health Check</a></li>
        <li><a href="{}">Metrics</a></li>
    </ul>
    <h2>Solr servers</h2>
    <ul>
{}    </ul>
</body>
</html>"#,
        env!("CARGO_PKG_VERSION"),
        state.config.server.path,
        servers
    );
    Html(html)
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        servers: state.collector.servers().len(),
    })
}

/// Metrics endpoint - runs one collection cycle and returns Prometheus text
///
/// Partial failures are reported through `solr_exporter_scrape_errors`. When
/// every configured server fails the scrape itself fails with 502.
#[instrument(skip(state), name = "metrics_handler")]
pub async fn metrics(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let start = Instant::now();
    let acc = MemoryAccumulator::new();

    let errors = match state.collector.gather(&acc).await {
        Ok(summary) => summary.core_failures,
        Err(e) => {
            if e.failures().len() >= state.collector.servers().len() {
                return Err(AppError::Gather(e));
            }
            warn!(error = %e, "Partial collection failure");
            e.error_count()
        }
    };

    let records = acc.take();
    let formatter = PrometheusFormatter::new();

    let mut output = formatter.format(&records_to_metrics(&records));
    output.push_str(&formatter.format(&state.collector.metrics().to_prometheus_metrics()));
    output.push_str(&formatter.format(&exporter_metrics(
        start.elapsed().as_secs_f64(),
        errors,
        records.len(),
    )));

    debug!(
        duration_ms = start.elapsed().as_millis() as u64,
        records = records.len(),
        errors,
        "Metrics collection complete"
    );

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        output,
    ))
}

/// Exporter self metrics for one scrape
fn exporter_metrics(duration_seconds: f64, errors: usize, records: usize) -> Vec<PrometheusMetric> {
    vec![
        PrometheusMetric::new("solr_exporter_info", 1.0)
            .with_type(MetricType::Gauge)
            .with_help("solr-exporter information")
            .with_label("version", env!("CARGO_PKG_VERSION")),
        PrometheusMetric::new("solr_exporter_scrape_duration_seconds", duration_seconds)
            .with_type(MetricType::Gauge)
            .with_help("Time spent collecting from all Solr servers"),
        PrometheusMetric::new("solr_exporter_scrape_errors", errors as f64)
            .with_type(MetricType::Gauge)
            .with_help("Failed servers or cores during this scrape"),
        PrometheusMetric::new("solr_exporter_records_scraped", records as f64)
            .with_type(MetricType::Gauge)
            .with_help("Number of records collected during this scrape"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exporter_metrics() {
        let output = PrometheusFormatter::new().format(&exporter_metrics(0.5, 2, 7));
        assert!(output.contains(&format!(
            "solr_exporter_info{{version=\"{}\"}} 1\n",
            env!("CARGO_PKG_VERSION")
        )));
        assert!(output.contains("solr_exporter_scrape_duration_seconds 0.5\n"));
        assert!(output.contains("solr_exporter_scrape_errors 2\n"));
        assert!(output.contains("solr_exporter_records_scraped 7\n"));
    }
}
