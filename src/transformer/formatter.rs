//! Prometheus Exposition Format output
//!
//! Converts [`MetricRecord`]s into Prometheus samples and renders them in the
//! text exposition format (version 0.0.4).
//!
//! # Mapping
//!
//! ```text
//! solr_cache{core=main,handler=filterCache} hits=10 hitratio=0.5
//!   -> solr_cache_hits{core="main",handler="filterCache",server="..."} 10
//!   -> solr_cache_hitratio{core="main",handler="filterCache",server="..."} 0.5
//! solr_dih{...} status="IDLE"
//!   -> solr_dih_status_info{...,value="IDLE"} 1
//! ```

use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};

use super::record::{FieldValue, MetricRecord};

/// Label carrying the record's originating server
pub const SERVER_LABEL: &str = "server";

/// Prometheus metric type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricType {
    /// A value that can go up and down
    Gauge,
    /// A monotonically increasing value
    Counter,
    /// Type is not specified
    #[default]
    Untyped,
}

impl MetricType {
    /// Returns the Prometheus type string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
            MetricType::Counter => "counter",
            MetricType::Untyped => "untyped",
        }
    }
}

impl Serialize for MetricType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// A single Prometheus sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrometheusMetric {
    /// Metric name
    pub name: String,
    /// Metric type
    pub metric_type: MetricType,
    /// Help text
    pub help: Option<String>,
    /// Labels, sorted by name
    pub labels: BTreeMap<String, String>,
    /// Sample value
    pub value: f64,
}

impl PrometheusMetric {
    /// Create a new untyped sample
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            metric_type: MetricType::Untyped,
            help: None,
            labels: BTreeMap::new(),
            value,
        }
    }

    /// Set the metric type
    pub fn with_type(mut self, metric_type: MetricType) -> Self {
        self.metric_type = metric_type;
        self
    }

    /// Set help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Add a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Convert records to Prometheus samples
///
/// Every numeric field becomes one gauge named `<measurement>_<field>`. String
/// fields become an info-style sample with the text in a `value` label. Record
/// tags become labels, plus `server` when the record has one.
pub fn records_to_metrics(records: &[MetricRecord]) -> Vec<PrometheusMetric> {
    let mut metrics = Vec::new();

    for record in records {
        let mut labels = record.tags.clone();
        if !record.server.is_empty() {
            labels.insert(SERVER_LABEL.to_string(), record.server.clone());
        }

        for (field, value) in &record.fields {
            let base = sanitize_name(&format!("{}_{}", record.measurement, field));
            let mut metric = match value {
                FieldValue::String(text) => {
                    PrometheusMetric::new(format!("{}_info", base), 1.0)
                        .with_type(MetricType::Gauge)
                        .with_help(format!("Solr {} {} as a label", record.measurement, field))
                        .with_label("value", text.as_str())
                }
                numeric => PrometheusMetric::new(base, numeric.as_f64().unwrap_or(0.0))
                    .with_type(MetricType::Gauge)
                    .with_help(format!("Solr {} {}", record.measurement, field)),
            };

            metric
                .labels
                .extend(labels.iter().map(|(k, v)| (k.clone(), v.clone())));
            metrics.push(metric);
        }
    }

    metrics
}

/// Replace characters that are not valid in a metric name
fn sanitize_name(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == ':' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.starts_with(|c: char| c.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    sanitized
}

/// Prometheus exposition format formatter
///
/// # Example
///
/// ```ignore
/// use solr_exporter::transformer::{records_to_metrics, PrometheusFormatter};
///
/// let output = PrometheusFormatter::new().format(&records_to_metrics(&records));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PrometheusFormatter;

impl PrometheusFormatter {
    /// Create a new formatter
    pub fn new() -> Self {
        Self
    }

    /// Format metrics into Prometheus exposition format
    ///
    /// HELP and TYPE lines are emitted once per metric name. Samples sharing a
    /// name are grouped under it, in order of first occurrence.
    pub fn format(&self, metrics: &[PrometheusMetric]) -> String {
        if metrics.is_empty() {
            return String::new();
        }

        let mut output = String::with_capacity(metrics.len() * 100);

        for (name, group) in Self::group_by_name(metrics) {
            if let Some(help) = &group[0].help {
                output.push_str(&format!("# HELP {} {}\n", name, Self::escape_help(help)));
            }
            output.push_str(&format!(
                "# TYPE {} {}\n",
                name,
                group[0].metric_type.as_str()
            ));

            for metric in group {
                output.push_str(&Self::format_metric_line(metric));
                output.push('\n');
            }
        }

        output
    }

    /// Group metrics by name, preserving order of first occurrence
    fn group_by_name(metrics: &[PrometheusMetric]) -> Vec<(&str, Vec<&PrometheusMetric>)> {
        let mut groups: HashMap<&str, Vec<&PrometheusMetric>> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();

        for metric in metrics {
            let name = metric.name.as_str();
            groups
                .entry(name)
                .or_insert_with(|| {
                    order.push(name);
                    Vec::new()
                })
                .push(metric);
        }

        order
            .into_iter()
            .filter_map(|name| groups.remove(name).map(|g| (name, g)))
            .collect()
    }

    fn format_metric_line(metric: &PrometheusMetric) -> String {
        let mut line = metric.name.clone();

        if !metric.labels.is_empty() {
            let label_pairs: Vec<String> = metric
                .labels
                .iter()
                .map(|(k, v)| format!("{}=\"{}\"", k, Self::escape_label_value(v)))
                .collect();

            line.push('{');
            line.push_str(&label_pairs.join(","));
            line.push('}');
        }

        line.push(' ');
        line.push_str(&Self::format_value(metric.value));
        line
    }

    /// Format a numeric value
    ///
    /// - NaN → "NaN", ±Inf → "+Inf"/"-Inf"
    /// - Integral values without a decimal point
    /// - Very large or very small floats in scientific notation
    fn format_value(value: f64) -> String {
        if value.is_nan() {
            "NaN".to_string()
        } else if value.is_infinite() {
            if value.is_sign_positive() {
                "+Inf".to_string()
            } else {
                "-Inf".to_string()
            }
        } else if value.fract() == 0.0 && value.abs() < 1e15 {
            format!("{}", value as i64)
        } else if value.abs() >= 1e15 || (value.abs() < 1e-3 && value != 0.0) {
            format!("{:e}", value)
        } else {
            format!("{}", value)
        }
    }

    fn escape_help(help: &str) -> String {
        help.replace('\\', "\\\\").replace('\n', "\\n")
    }

    fn escape_label_value(value: &str) -> String {
        let mut escaped = String::with_capacity(value.len());
        for c in value.chars() {
            match c {
                '\\' => escaped.push_str("\\\\"),
                '"' => escaped.push_str("\\\""),
                '\n' => escaped.push_str("\\n"),
                _ => escaped.push(c),
            }
        }
        escaped
    }
}
