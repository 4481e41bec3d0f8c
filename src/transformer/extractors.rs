//! Category extractors
//!
//! Each extractor is a pure function from a [`BeanTree`] to zero or more
//! [`MetricRecord`]s. Extractors never fail: values that do not have the
//! expected shape are coerced to a typed zero.
//!
//! Statistic names differ between Solr releases. Older releases use bare names
//! (`numDocs`, `avgTimePerRequest`), Solr 7+ prefixes them with a registry path
//! (`SEARCHER.searcher.numDocs`, `QUERY./select.requestTimes.mean_ms`). Lookups
//! accept a bare name or any key ending in `.<name>`.

use once_cell::sync::Lazy;
use regex::Regex;

use super::record::{
    MetricRecord, SOLR_CACHE, SOLR_CORE, SOLR_DIH, SOLR_QUERYHANDLER, SOLR_UPDATEHANDLER,
};
use crate::collector::{Bean, BeanTree, BeanValue, Category};

/// Signature shared by every category extractor
pub type ExtractFn = fn(core: &str, tree: &BeanTree) -> Vec<MetricRecord>;

/// A named extractor
#[derive(Clone, Copy)]
pub struct Extractor {
    /// Measurement produced by this extractor
    pub measurement: &'static str,
    /// Extraction function
    pub extract: ExtractFn,
}

/// The fixed extractor set, run in this order for every core
pub static EXTRACTORS: [Extractor; 5] = [
    Extractor {
        measurement: SOLR_CORE,
        extract: extract_core,
    },
    Extractor {
        measurement: SOLR_QUERYHANDLER,
        extract: extract_query_handlers,
    },
    Extractor {
        measurement: SOLR_UPDATEHANDLER,
        extract: extract_update_handler,
    },
    Extractor {
        measurement: SOLR_CACHE,
        extract: extract_caches,
    },
    Extractor {
        measurement: SOLR_DIH,
        extract: extract_dih,
    },
];

/// Run every extractor over one core's bean tree
pub fn extract_all(core: &str, tree: &BeanTree) -> Vec<MetricRecord> {
    EXTRACTORS
        .iter()
        .flat_map(|extractor| (extractor.extract)(core, tree))
        .collect()
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

/// `<non-numeric prefix>:<digits>`, split at the last delimiter
static DIH_COUNTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+):([0-9]+)$").expect("DIH counter pattern is valid"));

/// Request handler bean names: a path or a handler class
static REQUEST_HANDLER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(/.*|org\.apache\.solr\.handler\..+|standard)$")
        .expect("request handler pattern is valid")
});

/// Integer view of a statistic, 0 when absent or not integral
pub fn get_int(value: Option<&BeanValue>) -> i64 {
    match value {
        Some(BeanValue::Integer(i)) => *i,
        // saturating; NaN becomes 0
        Some(BeanValue::Float(f)) => *f as i64,
        Some(BeanValue::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Float view of a statistic, 0.0 when absent, unparseable or NaN
pub fn get_float(value: Option<&BeanValue>) -> f64 {
    let f = match value {
        Some(BeanValue::Integer(i)) => *i as f64,
        Some(BeanValue::Float(f)) => *f,
        Some(BeanValue::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };
    if f.is_nan() {
        0.0
    } else {
        f
    }
}

/// Decode a data import handler counter such as
/// `"java.util.concurrent.atomic.AtomicLong:12"`.
///
/// Only the encoded form is accepted. Non-strings, plain numbers (`"12"`),
/// strings without a delimiter and values that overflow `i64` all yield 0.
pub fn get_int_from_dih(value: Option<&BeanValue>) -> i64 {
    let Some(text) = value.and_then(BeanValue::as_str) else {
        return 0;
    };
    let Some(caps) = DIH_COUNTER.captures(text) else {
        return 0;
    };
    if caps[1].bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }
    caps[2].parse().unwrap_or(0)
}

/// Parse a duration like `"15000ms"` (or a bare number) into milliseconds
fn get_millis(value: Option<&BeanValue>) -> i64 {
    match value {
        Some(BeanValue::String(s)) => {
            let s = s.trim();
            s.strip_suffix("ms").unwrap_or(s).trim().parse().unwrap_or(0)
        }
        other => get_int(other),
    }
}

// ---------------------------------------------------------------------------
// Table-driven field extraction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Kind {
    Int,
    Float,
    Millis,
}

/// Output field, its type, and the statistic names it may be read from
struct FieldSpec {
    field: &'static str,
    kind: Kind,
    keys: &'static [&'static str],
}

const fn int(field: &'static str, keys: &'static [&'static str]) -> FieldSpec {
    FieldSpec {
        field,
        kind: Kind::Int,
        keys,
    }
}

const fn float(field: &'static str, keys: &'static [&'static str]) -> FieldSpec {
    FieldSpec {
        field,
        kind: Kind::Float,
        keys,
    }
}

const SEARCHER_FIELDS: &[FieldSpec] = &[
    int("num_docs", &["numDocs"]),
    int("max_docs", &["maxDoc"]),
    int("deleted_docs", &["deletedDocs"]),
    int("warmup_time", &["warmupTime"]),
];

const QUERY_HANDLER_FIELDS: &[FieldSpec] = &[
    int("requests", &["requests"]),
    int("errors", &["errors", "errors.count"]),
    int("timeouts", &["timeouts", "timeouts.count"]),
    int("handler_start", &["handlerStart"]),
    float("avg_requests_per_second", &["avgRequestsPerSecond", "requestTimes.meanRate"]),
    float("avg_time_per_request", &["avgTimePerRequest", "requestTimes.mean_ms"]),
    float("total_time", &["totalTime"]),
    float("median_request_time", &["medianRequestTime", "requestTimes.median_ms"]),
    float("5min_rate_reqs_per_second", &["5minRateReqsPerSecond", "requestTimes.5minRate"]),
    float("15min_rate_reqs_per_second", &["15minRateReqsPerSecond", "requestTimes.15minRate"]),
    float("75th_pc_request_time", &["75thPcRequestTime", "requestTimes.p75_ms"]),
    float("95th_pc_request_time", &["95thPcRequestTime", "requestTimes.p95_ms"]),
    float("99th_pc_request_time", &["99thPcRequestTime", "requestTimes.p99_ms"]),
    float("999th_pc_request_time", &["999thPcRequestTime", "requestTimes.p999_ms"]),
];

const UPDATE_HANDLER_FIELDS: &[FieldSpec] = &[
    int("adds", &["adds"]),
    int("autocommit_max_docs", &["autocommit maxDocs", "autoCommitMaxDocs"]),
    FieldSpec {
        field: "autocommit_max_time",
        kind: Kind::Millis,
        keys: &["autocommit maxTime", "autoCommitMaxTime"],
    },
    int("autocommits", &["autocommits", "autoCommits"]),
    int("commits", &["commits", "commits.count"]),
    int("cumulative_adds", &["cumulative_adds", "cumulativeAdds.count"]),
    int("cumulative_deletes_by_id", &["cumulative_deletesById", "cumulativeDeletesById.count"]),
    int(
        "cumulative_deletes_by_query",
        &["cumulative_deletesByQuery", "cumulativeDeletesByQuery.count"],
    ),
    int("cumulative_errors", &["cumulative_errors", "cumulativeErrors.count"]),
    int("deletes_by_id", &["deletesById"]),
    int("deletes_by_query", &["deletesByQuery"]),
    int("docs_pending", &["docsPending"]),
    int("errors", &["errors"]),
    int("expunge_deletes", &["expungeDeletes", "expungeDeletes.count"]),
    int("optimizes", &["optimizes", "optimizes.count"]),
    int("rollbacks", &["rollbacks", "rollbacks.count"]),
    int("soft_autocommits", &["soft autocommits", "softAutoCommits"]),
];

const CACHE_INT_FIELDS: &[&str] = &[
    "lookups",
    "hits",
    "inserts",
    "evictions",
    "size",
    "cumulative_lookups",
    "cumulative_hits",
    "cumulative_inserts",
    "cumulative_evictions",
];

const CACHE_FLOAT_FIELDS: &[&str] = &["hitratio", "cumulative_hitratio"];

/// Normalized DIH counter names (spaces removed, lowercase) -> field
const DIH_COUNTERS: &[(&str, &[&str])] = &[
    ("documents_processed", &["documentsprocessed"]),
    ("documents_deleted", &["documentsdeleted"]),
    ("documents_skipped", &["documentsskipped"]),
    ("rows_fetched", &["rowsfetched"]),
    (
        "requests_made_to_datasource",
        &["requestsmadetodatasource", "requeststodatasource"],
    ),
    ("total_documents_processed", &["totaldocumentsprocessed"]),
    ("total_documents_deleted", &["totaldocumentsdeleted"]),
    ("total_documents_skipped", &["totaldocumentsskipped"]),
    ("total_rows_fetched", &["totalrowsfetched"]),
    (
        "total_requests_made_to_datasource",
        &["totalrequestsmadetodatasource", "totalrequeststodatasource"],
    ),
];

fn key_matches(key: &str, name: &str) -> bool {
    key == name
        || key
            .strip_suffix(name)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn lookup<'a>(stats: &[(String, &'a BeanValue)], keys: &[&str]) -> Option<&'a BeanValue> {
    keys.iter()
        .find_map(|name| stats.iter().find(|(key, _)| key_matches(key, name)))
        .map(|(_, value)| *value)
}

/// Segment after the last `.` of a statistic key
fn leaf(key: &str) -> &str {
    key.rsplit('.').next().unwrap_or(key)
}

/// Build a record from a field table. `None` when the bean carries none of the
/// listed statistics; otherwise every field is present, missing ones as zero.
fn record_from_specs(
    measurement: &str,
    core: &str,
    handler: &str,
    bean: &Bean,
    specs: &[FieldSpec],
) -> Option<MetricRecord> {
    let stats = bean.flat_stats();
    let mut record = MetricRecord::for_handler(measurement, core, handler);
    let mut recognized = false;

    for spec in specs {
        let value = lookup(&stats, spec.keys);
        recognized |= value.is_some();
        match spec.kind {
            Kind::Int => record.insert_field(spec.field, get_int(value)),
            Kind::Float => record.insert_field(spec.field, get_float(value)),
            Kind::Millis => record.insert_field(spec.field, get_millis(value)),
        }
    }

    recognized.then_some(record)
}

// ---------------------------------------------------------------------------
// Extractors
// ---------------------------------------------------------------------------

/// CORE: the `searcher` bean
pub fn extract_core(core: &str, tree: &BeanTree) -> Vec<MetricRecord> {
    const SEARCHER: &str = "searcher";

    tree.bean(Category::Core, SEARCHER)
        .and_then(|bean| record_from_specs(SOLR_CORE, core, SEARCHER, bean, SEARCHER_FIELDS))
        .into_iter()
        .collect()
}

/// True when a QUERYHANDLER bean name denotes a request handler
pub fn is_request_handler(name: &str) -> bool {
    REQUEST_HANDLER.is_match(name)
}

/// QUERYHANDLER: one record per request handler with recognized statistics
pub fn extract_query_handlers(core: &str, tree: &BeanTree) -> Vec<MetricRecord> {
    tree.beans(Category::QueryHandler)
        .filter(|(name, _)| is_request_handler(name))
        .filter_map(|(name, bean)| {
            let record =
                record_from_specs(SOLR_QUERYHANDLER, core, name, bean, QUERY_HANDLER_FIELDS);
            if record.is_none() {
                tracing::trace!(core = %core, handler = %name, "Handler has no request statistics");
            }
            record
        })
        .collect()
}

/// UPDATEHANDLER: the `updateHandler` bean
pub fn extract_update_handler(core: &str, tree: &BeanTree) -> Vec<MetricRecord> {
    const UPDATE_HANDLER: &str = "updateHandler";

    tree.bean(Category::UpdateHandler, UPDATE_HANDLER)
        .and_then(|bean| {
            record_from_specs(
                SOLR_UPDATEHANDLER,
                core,
                UPDATE_HANDLER,
                bean,
                UPDATE_HANDLER_FIELDS,
            )
        })
        .into_iter()
        .collect()
}

/// CACHE: one record per cache bean with recognized statistics
pub fn extract_caches(core: &str, tree: &BeanTree) -> Vec<MetricRecord> {
    tree.beans(Category::Cache)
        .filter_map(|(name, bean)| {
            let mut record = MetricRecord::for_handler(SOLR_CACHE, core, name);
            for (key, value) in bean.flat_stats() {
                let stat = leaf(&key);
                if CACHE_INT_FIELDS.contains(&stat) {
                    record.insert_field(stat, get_int(Some(value)));
                } else if CACHE_FLOAT_FIELDS.contains(&stat) {
                    record.insert_field(stat, get_float(Some(value)));
                } else if stat == "warmupTime" {
                    record.insert_field("warmup_time", get_int(Some(value)));
                }
            }
            (!record.fields.is_empty()).then_some(record)
        })
        .collect()
}

/// True when a QUERYHANDLER bean is a data import handler
pub fn is_data_import_handler(name: &str, bean: &Bean) -> bool {
    name.starts_with("/dataimport")
        || bean
            .class
            .as_deref()
            .is_some_and(|class| class.ends_with("DataImportHandler"))
}

fn normalize_counter_name(key: &str) -> String {
    leaf(key)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// DIH: one record per data import handler with recognized counters
pub fn extract_dih(core: &str, tree: &BeanTree) -> Vec<MetricRecord> {
    tree.beans(Category::QueryHandler)
        .filter(|(name, bean)| is_data_import_handler(name, bean))
        .filter_map(|(name, bean)| {
            let mut record = MetricRecord::for_handler(SOLR_DIH, core, name);
            for (key, value) in bean.flat_stats() {
                let normalized = normalize_counter_name(&key);
                if normalized == "status" {
                    if let Some(status) = value.as_str() {
                        record.insert_field("status", status);
                    }
                    continue;
                }
                if let Some((field, _)) = DIH_COUNTERS
                    .iter()
                    .find(|(_, names)| names.contains(&normalized.as_str()))
                {
                    record.insert_field(*field, get_int_from_dih(Some(value)));
                }
            }
            (!record.fields.is_empty()).then_some(record)
        })
        .collect()
}
