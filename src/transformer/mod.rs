//! Metric transformation module
//!
//! Turns parsed mbeans into [`MetricRecord`]s and records into Prometheus text.
//!
//! # Components
//!
//! - [`record`]: the record model shared by every measurement
//! - [`extractors`]: the fixed per-category extractor set
//! - [`formatter`]: Prometheus exposition format output

pub mod extractors;
pub mod formatter;
pub mod record;

pub use extractors::{
    extract_all, get_float, get_int, get_int_from_dih, Extractor, EXTRACTORS,
};
pub use formatter::{records_to_metrics, MetricType, PrometheusFormatter, PrometheusMetric};
pub use record::{
    FieldValue, MetricRecord, SOLR_ADMIN, SOLR_CACHE, SOLR_CORE, SOLR_DIH, SOLR_QUERYHANDLER,
    SOLR_UPDATEHANDLER, TAG_CORE, TAG_HANDLER,
};
