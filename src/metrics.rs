//! Internal observability metrics for solr-exporter
//!
//! Per-server counters kept across collection cycles and exposed after the
//! Solr metrics on every scrape.
//!
//! # Metrics
//!
//! - `solr_exporter_server_scrape_success_total{server="..."}` - Successful server scrapes
//! - `solr_exporter_server_scrape_failure_total{server="..."}` - Failed server scrapes
//! - `solr_exporter_server_core_failures_total{server="..."}` - Core mbeans requests that failed
//! - `solr_exporter_server_scrape_duration_seconds{server="..."}` - Histogram of server scrape durations

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::transformer::{MetricType, PrometheusMetric};

/// Default histogram buckets for scrape duration (in seconds)
pub const DEFAULT_HISTOGRAM_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Label carrying the Solr server URL
const SERVER_LABEL: &str = "server";

/// Thread-safe counter using atomic operations
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    /// Create a new counter initialized to 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the counter by 1
    pub fn inc(&self) {
        self.inc_by(1);
    }

    /// Increment the counter by a specific amount
    pub fn inc_by(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    /// Get the current value
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Thread-safe cumulative histogram
#[derive(Debug)]
pub struct Histogram {
    /// Upper bounds, ending with +Inf
    buckets: Vec<f64>,
    /// Observations <= the matching bound
    bucket_counts: Vec<AtomicU64>,
    /// Sum of observations, stored as f64 bits
    sum: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    /// Create a new histogram with the given bucket boundaries
    pub fn new(buckets: &[f64]) -> Self {
        let mut bounds: Vec<f64> = buckets.iter().copied().filter(|b| !b.is_nan()).collect();
        bounds.sort_by(f64::total_cmp);
        bounds.dedup();
        if bounds.last().map_or(true, |b| b.is_finite()) {
            bounds.push(f64::INFINITY);
        }

        let bucket_counts = bounds.iter().map(|_| AtomicU64::new(0)).collect();

        Self {
            buckets: bounds,
            bucket_counts,
            sum: AtomicU64::new(0.0_f64.to_bits()),
            count: AtomicU64::new(0),
        }
    }

    /// Observe a value
    pub fn observe(&self, v: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);

        // atomic f64 add; the closure always returns Some
        let _ = self
            .sum
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + v).to_bits())
            });

        for (bound, count) in self.buckets.iter().zip(&self.bucket_counts) {
            if v <= *bound {
                count.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Sum of all observations
    pub fn sum(&self) -> f64 {
        f64::from_bits(self.sum.load(Ordering::Relaxed))
    }

    /// Number of observations
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Bucket boundaries and their cumulative counts
    pub fn buckets(&self) -> Vec<(f64, u64)> {
        self.buckets
            .iter()
            .zip(&self.bucket_counts)
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new(DEFAULT_HISTOGRAM_BUCKETS)
    }
}

/// Per-server metrics
#[derive(Debug, Default)]
pub struct ServerMetrics {
    /// Scrapes where core discovery succeeded
    pub scrape_success_total: Counter,
    /// Scrapes where core discovery failed
    pub scrape_failure_total: Counter,
    /// Core mbeans requests that failed
    pub core_failures_total: Counter,
    /// Server scrape durations
    pub scrape_duration_seconds: Histogram,
}

/// Internal metrics registry
///
/// Cloning shares the underlying registry.
#[derive(Debug, Clone, Default)]
pub struct InternalMetrics {
    servers: Arc<RwLock<BTreeMap<String, Arc<ServerMetrics>>>>,
}

impl InternalMetrics {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create metrics for a server
    pub fn server(&self, server: &str) -> Arc<ServerMetrics> {
        {
            let servers = self.servers.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(metrics) = servers.get(server) {
                return Arc::clone(metrics);
            }
        }

        let mut servers = self.servers.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(servers.entry(server.to_string()).or_default())
    }

    /// Record a successful server scrape
    pub fn record_scrape_success(&self, server: &str, duration_seconds: f64, core_failures: u64) {
        let metrics = self.server(server);
        metrics.scrape_success_total.inc();
        metrics.core_failures_total.inc_by(core_failures);
        metrics.scrape_duration_seconds.observe(duration_seconds);
    }

    /// Record a failed server scrape
    pub fn record_scrape_failure(&self, server: &str, duration_seconds: f64) {
        let metrics = self.server(server);
        metrics.scrape_failure_total.inc();
        metrics.scrape_duration_seconds.observe(duration_seconds);
    }

    /// Format all internal metrics as Prometheus samples, ordered by server
    ///
    /// Samples of one name are interleaved across servers; the formatter groups them.
    pub fn to_prometheus_metrics(&self) -> Vec<PrometheusMetric> {
        let servers = self.servers.read().unwrap_or_else(PoisonError::into_inner);
        let mut metrics = Vec::new();

        for (server, server_metrics) in servers.iter() {
            let counters = [
                (
                    "solr_exporter_server_scrape_success_total",
                    "Total number of successful Solr server scrapes",
                    &server_metrics.scrape_success_total,
                ),
                (
                    "solr_exporter_server_scrape_failure_total",
                    "Total number of failed Solr server scrapes",
                    &server_metrics.scrape_failure_total,
                ),
                (
                    "solr_exporter_server_core_failures_total",
                    "Total number of failed core mbeans requests",
                    &server_metrics.core_failures_total,
                ),
            ];
            for (name, help, counter) in counters {
                metrics.push(
                    PrometheusMetric::new(name, counter.get() as f64)
                        .with_type(MetricType::Counter)
                        .with_help(help)
                        .with_label(SERVER_LABEL, server.as_str()),
                );
            }
        }

        for (server, server_metrics) in servers.iter() {
            let histogram = &server_metrics.scrape_duration_seconds;
            for (bound, count) in histogram.buckets() {
                let le = if bound.is_infinite() {
                    "+Inf".to_string()
                } else {
                    bound.to_string()
                };
                metrics.push(
                    PrometheusMetric::new(
                        "solr_exporter_server_scrape_duration_seconds_bucket",
                        count as f64,
                    )
                    .with_type(MetricType::Gauge)
                    .with_help("Histogram of Solr server scrape durations")
                    .with_label(SERVER_LABEL, server.as_str())
                    .with_label("le", le),
                );
            }
            metrics.push(
                PrometheusMetric::new(
                    "solr_exporter_server_scrape_duration_seconds_sum",
                    histogram.sum(),
                )
                .with_type(MetricType::Gauge)
                .with_help("Total time spent scraping Solr servers")
                .with_label(SERVER_LABEL, server.as_str()),
            );
            metrics.push(
                PrometheusMetric::new(
                    "solr_exporter_server_scrape_duration_seconds_count",
                    histogram.count() as f64,
                )
                .with_type(MetricType::Gauge)
                .with_help("Total number of Solr server scrapes")
                .with_label(SERVER_LABEL, server.as_str()),
            );
        }

        metrics
    }
}
