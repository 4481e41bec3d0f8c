//! Solr mbeans JSON 응답 파서
//!
//! `/admin/mbeans?stats=true&wt=json` 응답을 버전에 상관없이 하나의 [`BeanTree`] 로 변환합니다.
//!
//! Solr 는 같은 데이터를 두 가지 모양으로 돌려줍니다.
//!
//! ```text
//! legacy  : {"solr-mbeans": ["CORE", {"searcher": {...}}, "CACHE", {...}]}
//! current : {"solr-mbeans": {"CORE": {"searcher": {...}}, "CACHE": {...}}}
//! ```
//!
//! 빈 응답이나 깨진 JSON 은 에러가 아니라 빈 트리가 됩니다.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::CollectorError;

/// Collector 작업 결과 타입
pub type CollectResult<T> = Result<T, CollectorError>;

/// mbeans 문서 안의 카테고리 키
const SOLR_MBEANS_KEY: &str = "solr-mbeans";

/// mbean 통계 키
const STATS_KEY: &str = "stats";

/// mbean 구현 클래스 키
const CLASS_KEY: &str = "class";

/// 추출 대상 mbean 카테고리
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    /// CORE (searcher, core)
    Core,
    /// QUERYHANDLER (request handlers, DIH)
    QueryHandler,
    /// UPDATEHANDLER (updateHandler)
    UpdateHandler,
    /// CACHE (filterCache, queryResultCache, ...)
    Cache,
}

impl Category {
    /// 요청 URL 에 넣는 카테고리 목록
    pub const ALL: [Category; 4] = [
        Category::Core,
        Category::QueryHandler,
        Category::UpdateHandler,
        Category::Cache,
    ];

    /// Solr 카테고리 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Core => "CORE",
            Category::QueryHandler => "QUERYHANDLER",
            Category::UpdateHandler => "UPDATEHANDLER",
            Category::Cache => "CACHE",
        }
    }

    /// 카테고리 이름 파싱. 모르는 카테고리는 `None`.
    ///
    /// Solr 7 이후의 `QUERY` / `UPDATE` 이름도 받습니다.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "CORE" => Some(Category::Core),
            "QUERYHANDLER" | "QUERY" => Some(Category::QueryHandler),
            "UPDATEHANDLER" | "UPDATE" => Some(Category::UpdateHandler),
            "CACHE" => Some(Category::Cache),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// mbean 통계 값 - JSON 값의 태그 유니온
#[derive(Debug, Clone, PartialEq)]
pub enum BeanValue {
    /// Null
    Null,
    /// 불리언
    Boolean(bool),
    /// 정수
    Integer(i64),
    /// 실수
    Float(f64),
    /// 문자열 (DIH 카운터 `"java.util.concurrent.atomic.AtomicLong:12"` 포함)
    String(String),
    /// 중첩 객체
    Nested(BTreeMap<String, BeanValue>),
    /// 배열
    List(Vec<BeanValue>),
}

impl BeanValue {
    /// 문자열 값이면 참조 반환
    pub fn as_str(&self) -> Option<&str> {
        match self {
            BeanValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Value> for BeanValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => BeanValue::Null,
            Value::Bool(b) => BeanValue::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => BeanValue::Integer(i),
                // u64 above i64::MAX and real numbers both land here
                None => BeanValue::Float(n.as_f64().unwrap_or(0.0)),
            },
            Value::String(s) => BeanValue::String(s),
            Value::Array(arr) => BeanValue::List(arr.into_iter().map(BeanValue::from).collect()),
            Value::Object(map) => BeanValue::Nested(
                map.into_iter()
                    .map(|(k, v)| (k, BeanValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// 하나의 mbean
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bean {
    /// 구현 클래스 (예: "org.apache.solr.handler.dataimport.DataImportHandler")
    pub class: Option<String>,
    /// 통계 이름 -> 값
    pub stats: BTreeMap<String, BeanValue>,
}

impl Bean {
    /// 통계 값 조회
    pub fn stat(&self, key: &str) -> Option<&BeanValue> {
        self.stats.get(key)
    }

    /// 중첩된 통계를 `.` 으로 이어 붙인 평면 목록으로 변환
    pub fn flat_stats(&self) -> Vec<(String, &BeanValue)> {
        let mut result = Vec::new();
        for (key, value) in &self.stats {
            flatten_into(key.clone(), value, &mut result);
        }
        result
    }
}

fn flatten_into<'a>(prefix: String, value: &'a BeanValue, out: &mut Vec<(String, &'a BeanValue)>) {
    match value {
        BeanValue::Nested(map) => {
            for (key, inner) in map {
                flatten_into(format!("{}.{}", prefix, key), inner, out);
            }
        }
        _ => out.push((prefix, value)),
    }
}

/// 카테고리 -> 빈 이름 -> 빈
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeanTree {
    categories: BTreeMap<Category, BTreeMap<String, Bean>>,
}

impl BeanTree {
    /// 빈 트리 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 빈이 하나도 없는지 확인
    pub fn is_empty(&self) -> bool {
        self.categories.values().all(BTreeMap::is_empty)
    }

    /// 전체 빈 개수
    pub fn bean_count(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }

    /// 빈 추가 (같은 이름이면 덮어씀)
    pub fn insert(&mut self, category: Category, name: impl Into<String>, bean: Bean) {
        self.categories
            .entry(category)
            .or_default()
            .insert(name.into(), bean);
    }

    /// 카테고리 내 빈 순회 (이름 순)
    pub fn beans(&self, category: Category) -> impl Iterator<Item = (&str, &Bean)> {
        self.categories
            .get(&category)
            .into_iter()
            .flat_map(|beans| beans.iter().map(|(name, bean)| (name.as_str(), bean)))
    }

    /// 이름으로 빈 조회
    pub fn bean(&self, category: Category, name: &str) -> Option<&Bean> {
        self.categories.get(&category).and_then(|beans| beans.get(name))
    }
}

/// `solr-mbeans` 컨테이너 모양
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MBeansLayout {
    /// `[category, {beans}, category, {beans}, ...]`
    Legacy,
    /// `{category: {beans}}`
    Current,
}

/// 문서 모양으로 레이아웃 판별
pub fn detect_layout(doc: &Value) -> Option<MBeansLayout> {
    match doc.get(SOLR_MBEANS_KEY)? {
        Value::Array(_) => Some(MBeansLayout::Legacy),
        Value::Object(_) => Some(MBeansLayout::Current),
        _ => None,
    }
}

/// mbeans 응답 본문 파싱
///
/// 실패하지 않습니다. 비어 있거나 해석할 수 없는 문서는 빈 [`BeanTree`] 를 돌려줍니다.
pub fn parse_mbeans(body: &str) -> BeanTree {
    if body.trim().is_empty() {
        tracing::debug!("Empty mbeans document");
        return BeanTree::new();
    }

    let mut doc: Value = match serde_json::from_str(body) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!(error = %e, "Unparseable mbeans document, treating as empty");
            return BeanTree::new();
        }
    };

    let layout = detect_layout(&doc);
    let mbeans = doc
        .get_mut(SOLR_MBEANS_KEY)
        .map(Value::take)
        .unwrap_or(Value::Null);

    match (layout, mbeans) {
        (Some(MBeansLayout::Legacy), Value::Array(pairs)) => decode_legacy(pairs),
        (Some(MBeansLayout::Current), Value::Object(map)) => decode_current(map),
        _ => {
            tracing::debug!("No solr-mbeans section in document");
            BeanTree::new()
        }
    }
}

fn decode_legacy(pairs: Vec<Value>) -> BeanTree {
    let mut tree = BeanTree::new();
    let mut iter = pairs.into_iter();
    while let (Some(name), Some(beans)) = (iter.next(), iter.next()) {
        insert_category(&mut tree, &key_string(name), beans);
    }
    tree
}

fn decode_current(map: Map<String, Value>) -> BeanTree {
    let mut tree = BeanTree::new();
    for (name, beans) in map {
        insert_category(&mut tree, &name, beans);
    }
    tree
}

fn insert_category(tree: &mut BeanTree, name: &str, beans: Value) {
    let Some(category) = Category::from_name(name) else {
        tracing::trace!(category = %name, "Ignoring unknown mbean category");
        return;
    };

    let Some(entries) = named_list(beans) else {
        tracing::debug!(category = %name, "Category is neither an object nor a named list");
        return;
    };

    for (bean_name, bean) in entries {
        tree.insert(category, bean_name, parse_bean(bean));
    }
}

fn parse_bean(value: Value) -> Bean {
    let mut bean = Bean::default();
    let Some(entries) = named_list(value) else {
        return bean;
    };

    for (key, value) in entries {
        match key.as_str() {
            CLASS_KEY => bean.class = value.as_str().map(str::to_string),
            STATS_KEY => {
                if let Some(stats) = named_list(value) {
                    bean.stats = stats
                        .into_iter()
                        .map(|(k, v)| (k, BeanValue::from(v)))
                        .collect();
                }
            }
            _ => {}
        }
    }

    bean
}

/// 객체 또는 `[name, value, name, value]` 형태의 flat named list 를 (이름, 값) 목록으로 변환
fn named_list(value: Value) -> Option<Vec<(String, Value)>> {
    match value {
        Value::Object(map) => Some(map.into_iter().collect()),
        Value::Array(arr) => {
            let mut entries = Vec::with_capacity(arr.len() / 2);
            let mut iter = arr.into_iter();
            while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
                entries.push((key_string(key), value));
            }
            Some(entries)
        }
        _ => None,
    }
}

fn key_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURRENT: &str = r#"{
        "responseHeader": {"status": 0, "QTime": 1},
        "solr-mbeans": {
            "CORE": {
                "searcher": {
                    "class": "org.apache.solr.search.SolrIndexSearcher",
                    "stats": {"numDocs": 100, "maxDoc": 120, "deletedDocs": 20}
                }
            },
            "CACHE": {
                "filterCache": {"stats": {"hits": 10, "lookups": 20, "hitratio": 0.5}}
            },
            "OTHER": {"whatever": {"stats": {"x": 1}}}
        }
    }"#;

    const LEGACY: &str = r#"{
        "responseHeader": {"status": 0, "QTime": 1},
        "solr-mbeans": [
            "CORE",
            {
                "searcher": {
                    "class": "org.apache.solr.search.SolrIndexSearcher",
                    "stats": ["numDocs", 100, "maxDoc", 120, "deletedDocs", 20]
                }
            },
            "CACHE",
            {"filterCache": {"stats": ["hits", 10, "lookups", 20, "hitratio", 0.5]}},
            "OTHER",
            {"whatever": {"stats": ["x", 1]}}
        ]
    }"#;

    #[test]
    fn test_detect_layout() {
        let legacy: Value = serde_json::from_str(LEGACY).unwrap();
        let current: Value = serde_json::from_str(CURRENT).unwrap();
        assert_eq!(detect_layout(&legacy), Some(MBeansLayout::Legacy));
        assert_eq!(detect_layout(&current), Some(MBeansLayout::Current));
        assert_eq!(detect_layout(&serde_json::json!({"a": 1})), None);
    }

    #[test]
    fn test_parse_current_layout() {
        let tree = parse_mbeans(CURRENT);
        assert_eq!(tree.bean_count(), 2);

        let searcher = tree.bean(Category::Core, "searcher").unwrap();
        assert_eq!(
            searcher.class.as_deref(),
            Some("org.apache.solr.search.SolrIndexSearcher")
        );
        assert_eq!(searcher.stat("numDocs"), Some(&BeanValue::Integer(100)));

        let cache = tree.bean(Category::Cache, "filterCache").unwrap();
        assert_eq!(cache.stat("hitratio"), Some(&BeanValue::Float(0.5)));
    }

    #[test]
    fn test_layouts_produce_identical_trees() {
        assert_eq!(parse_mbeans(LEGACY), parse_mbeans(CURRENT));
    }

    #[test]
    fn test_empty_and_malformed_documents() {
        assert!(parse_mbeans("").is_empty());
        assert!(parse_mbeans("\n").is_empty());
        assert!(parse_mbeans("{not json").is_empty());
        assert!(parse_mbeans(r#"{"responseHeader": {"status": 0}}"#).is_empty());
        assert!(parse_mbeans(r#"{"solr-mbeans": 42}"#).is_empty());
        assert!(parse_mbeans(r#"{"solr-mbeans": ["CORE"]}"#).is_empty());
    }

    #[test]
    fn test_category_aliases() {
        let tree = parse_mbeans(
            r#"{"solr-mbeans": {"QUERY": {"/select": {"stats": {"requests": 3}}},
                                "UPDATE": {"updateHandler": {"stats": {"adds": 1}}}}}"#,
        );
        assert!(tree.bean(Category::QueryHandler, "/select").is_some());
        assert!(tree.bean(Category::UpdateHandler, "updateHandler").is_some());
    }

    #[test]
    fn test_bean_without_stats() {
        let tree = parse_mbeans(r#"{"solr-mbeans": {"CORE": {"core": {"class": "x"}}}}"#);
        let bean = tree.bean(Category::Core, "core").unwrap();
        assert!(bean.stats.is_empty());
    }

    #[test]
    fn test_flat_stats_nested() {
        let tree = parse_mbeans(
            r#"{"solr-mbeans": {"QUERYHANDLER": {"/dataimport": {"stats": {
                "Status": "IDLE",
                "dih": {"Total Rows Fetched": "java.util.concurrent.atomic.AtomicLong:7"}
            }}}}}"#,
        );
        let bean = tree.bean(Category::QueryHandler, "/dataimport").unwrap();
        let flat = bean.flat_stats();
        assert_eq!(flat.len(), 2);
        assert!(flat.iter().any(|(k, v)| k == "dih.Total Rows Fetched"
            && v.as_str() == Some("java.util.concurrent.atomic.AtomicLong:7")));
    }

    #[test]
    fn test_bean_value_from_json() {
        assert_eq!(BeanValue::from(serde_json::json!(null)), BeanValue::Null);
        assert_eq!(BeanValue::from(serde_json::json!(true)), BeanValue::Boolean(true));
        assert_eq!(BeanValue::from(serde_json::json!(-3)), BeanValue::Integer(-3));
        assert_eq!(BeanValue::from(serde_json::json!(1.5)), BeanValue::Float(1.5));
        assert_eq!(
            BeanValue::from(serde_json::json!([1, "a"])),
            BeanValue::List(vec![BeanValue::Integer(1), BeanValue::String("a".into())])
        );
    }
}
