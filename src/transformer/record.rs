//! Metric records produced by a collection cycle
//!
//! A [`MetricRecord`] is one measurement (e.g. `solr_cache`) with a small tag
//! set identifying the core and handler, and a flat map of typed fields.

use serde::Serialize;
use std::collections::BTreeMap;

/// Measurement emitted once per discovered core from the cores status endpoint
pub const SOLR_ADMIN: &str = "solr_admin";
/// Searcher document statistics
pub const SOLR_CORE: &str = "solr_core";
/// Request handler counters and timings
pub const SOLR_QUERYHANDLER: &str = "solr_queryhandler";
/// Update handler commit/rollback/document counters
pub const SOLR_UPDATEHANDLER: &str = "solr_updatehandler";
/// Cache hit/miss/eviction statistics
pub const SOLR_CACHE: &str = "solr_cache";
/// Data import handler counters
pub const SOLR_DIH: &str = "solr_dih";

/// Tag key carrying the core name
pub const TAG_CORE: &str = "core";
/// Tag key carrying the bean (handler) name
pub const TAG_HANDLER: &str = "handler";

/// A single typed field value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Integer counter or gauge
    Integer(i64),
    /// Floating point rate, ratio or timing
    Float(f64),
    /// Free-form status text
    String(String),
}

impl FieldValue {
    /// Numeric view of the value, `None` for strings
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            FieldValue::String(_) => None,
        }
    }

    /// Integer view of the value, `None` for floats and strings
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

/// One measurement emitted to the accumulator
///
/// Tags and fields are ordered maps so that two runs over the same input
/// produce identical records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRecord {
    /// Measurement name, one of the `SOLR_*` constants
    pub measurement: String,
    /// Base URL of the Solr node the record came from. Not part of the tag set.
    pub server: String,
    /// `core` and, except for `solr_admin`, `handler`
    pub tags: BTreeMap<String, String>,
    /// Flat field map
    pub fields: BTreeMap<String, FieldValue>,
}

impl MetricRecord {
    /// Create an empty record for a measurement
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            server: String::new(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
        }
    }

    /// Set the originating server
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    /// Add a tag
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Add a field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Add a field in place
    pub fn insert_field(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Record tagged with `core` and `handler`
    pub fn for_handler(measurement: &str, core: &str, handler: &str) -> Self {
        Self::new(measurement)
            .with_tag(TAG_CORE, core)
            .with_tag(TAG_HANDLER, handler)
    }

    /// Tag value by key
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Field value by key
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// True when every given tag matches exactly and no other tags are present
    pub fn has_tags(&self, tags: &[(&str, &str)]) -> bool {
        self.tags.len() == tags.len()
            && tags
                .iter()
                .all(|(k, v)| self.tags.get(*k).map(String::as_str) == Some(*v))
    }
}
