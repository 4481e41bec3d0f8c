//! 코어 탐색
//!
//! `/solr/admin/cores?action=STATUS&wt=json` 응답에서 활성 코어 목록과 코어별 기본 상태를 읽습니다.
//! 이 문서를 해석하지 못하면 해당 서버 전체 수집이 실패합니다.

use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::parser::CollectResult;
use crate::error::CollectorError;
use crate::transformer::record::{MetricRecord, SOLR_ADMIN, TAG_CORE};

/// Solr 응답 헤더
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResponseHeader {
    /// 0 이면 성공
    #[serde(default)]
    pub status: i64,
    /// 처리 시간 (밀리초)
    #[serde(rename = "QTime", default)]
    pub qtime: i64,
}

/// 코어 하나의 기본 상태
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreStatus {
    /// 코어 이름
    pub name: String,
    pub num_docs: i64,
    pub max_doc: i64,
    pub deleted_docs: i64,
    pub size_in_bytes: i64,
    /// 가동 시간 (밀리초)
    pub uptime_ms: i64,
    /// 시작 시각 (Unix epoch 밀리초, 알 수 없으면 0)
    pub start_time_ms: i64,
    /// 인덱스 마지막 수정 시각 (Unix epoch 밀리초, 알 수 없으면 0)
    pub last_modified_ms: i64,
}

impl CoreStatus {
    /// `solr_admin` 레코드로 변환
    pub fn to_record(&self, server: &str) -> MetricRecord {
        MetricRecord::new(SOLR_ADMIN)
            .with_server(server)
            .with_tag(TAG_CORE, self.name.as_str())
            .with_field("num_docs", self.num_docs)
            .with_field("max_docs", self.max_doc)
            .with_field("deleted_docs", self.deleted_docs)
            .with_field("size_in_bytes", self.size_in_bytes)
            .with_field("uptime", self.uptime_ms)
            .with_field("start_time", self.start_time_ms)
            .with_field("last_modified", self.last_modified_ms)
    }
}

/// 서버 전체 관리 상태
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminStatus {
    /// 응답 헤더
    pub header: ResponseHeader,
    /// 로딩에 실패한 코어 -> 에러 메시지
    pub init_failures: BTreeMap<String, String>,
    /// 활성 코어 (이름 순)
    pub cores: Vec<CoreStatus>,
}

impl AdminStatus {
    /// 활성 코어 이름 목록
    pub fn core_names(&self) -> Vec<&str> {
        self.cores.iter().map(|c| c.name.as_str()).collect()
    }

    /// 코어별 `solr_admin` 레코드
    pub fn to_records(&self, server: &str) -> Vec<MetricRecord> {
        self.cores.iter().map(|core| core.to_record(server)).collect()
    }
}

/// 내부 파싱용 구조체
#[derive(Deserialize)]
struct RawAdminResponse {
    #[serde(rename = "responseHeader", default)]
    response_header: ResponseHeader,
    #[serde(rename = "initFailures", default)]
    init_failures: BTreeMap<String, Value>,
    #[serde(default)]
    status: BTreeMap<String, RawCoreStatus>,
    #[serde(default)]
    error: Option<RawSolrError>,
}

#[derive(Deserialize)]
struct RawSolrError {
    #[serde(default)]
    msg: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawCoreStatus {
    start_time: Option<String>,
    uptime: Option<i64>,
    index: RawIndex,
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawIndex {
    num_docs: i64,
    max_doc: i64,
    deleted_docs: i64,
    size_in_bytes: i64,
    last_modified: Option<String>,
}

/// 코어 상태 응답 파싱
pub fn parse_admin_status(json: &str) -> CollectResult<AdminStatus> {
    let raw: RawAdminResponse =
        serde_json::from_str(json).map_err(|e| CollectorError::JsonParse(e.to_string()))?;

    if raw.response_header.status != 0 {
        return Err(CollectorError::SolrStatus {
            status: raw.response_header.status,
            message: raw
                .error
                .and_then(|e| e.msg)
                .unwrap_or_else(|| "core status request failed".to_string()),
        });
    }

    let init_failures = raw
        .init_failures
        .into_iter()
        .map(|(core, reason)| {
            let reason = match reason {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (core, reason)
        })
        .collect();

    let cores = raw
        .status
        .into_iter()
        .map(|(name, core)| CoreStatus {
            name,
            num_docs: core.index.num_docs,
            max_doc: core.index.max_doc,
            deleted_docs: core.index.deleted_docs,
            size_in_bytes: core.index.size_in_bytes,
            uptime_ms: core.uptime.unwrap_or(0),
            start_time_ms: epoch_millis(core.start_time.as_deref()),
            last_modified_ms: epoch_millis(core.index.last_modified.as_deref()),
        })
        .collect();

    Ok(AdminStatus {
        header: raw.response_header,
        init_failures,
        cores,
    })
}

/// ISO-8601 시각을 epoch 밀리초로 변환 (실패 시 0)
fn epoch_millis(timestamp: Option<&str>) -> i64 {
    timestamp
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(0)
}
