//! Error types for solr-exporter
//!
//! This module defines the error types used throughout the application.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::collector::GatherSummary;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Collector could not be built
    #[error("Collector error: {0}")]
    Collector(#[from] CollectorError),

    /// One or more servers failed during a collection cycle
    #[error("Gather error: {0}")]
    Gather(#[from] GatherError),
}

/// Collector 모듈 에러 타입
#[derive(Error, Debug)]
pub enum CollectorError {
    /// HTTP 클라이언트 초기화 실패
    #[error("Failed to initialize HTTP client: {0}")]
    HttpClientInit(#[source] reqwest::Error),

    /// HTTP 요청 실패
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[source] reqwest::Error),

    /// HTTP 응답 읽기 실패
    #[error("Failed to read HTTP response: {0}")]
    HttpResponse(#[source] reqwest::Error),

    /// HTTP 상태 코드 에러
    #[error("HTTP error status: {0}")]
    HttpStatus(u16),

    /// JSON 파싱 에러
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// Solr responseHeader 에 0 이 아닌 status
    #[error("Solr error (status {status}): {message}")]
    SolrStatus { status: i64, message: String },

    /// 잘못된 서버 URL
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// 타임아웃
    /// The value is the configured timeout in milliseconds, if known.
    #[error("Request timed out{}", .0.map(|ms| format!(" after {}ms", ms)).unwrap_or_default())]
    Timeout(Option<u64>),

    /// 연결 실패
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// 수집 태스크가 비정상 종료 (panic 또는 취소)
    #[error("Collection task failed: {0}")]
    TaskFailed(String),
}

impl CollectorError {
    /// Create a Timeout error with known duration
    pub fn timeout_with_duration(ms: u64) -> Self {
        CollectorError::Timeout(Some(ms))
    }
}

impl From<reqwest::Error> for CollectorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest doesn't expose the configured timeout; callers that know it
            // should use CollectorError::timeout_with_duration() instead.
            CollectorError::Timeout(None)
        } else if err.is_connect() {
            CollectorError::ConnectionFailed(err.to_string())
        } else if err.is_request() {
            CollectorError::HttpRequest(err)
        } else {
            CollectorError::HttpResponse(err)
        }
    }
}

/// A server whose core discovery failed during a cycle
#[derive(Error, Debug)]
#[error("{server}: {source}")]
pub struct ServerFailure {
    /// Base URL of the failing server
    pub server: String,
    /// Underlying collector error
    #[source]
    pub source: CollectorError,
}

/// Errors returned from a full collection cycle
#[derive(Error, Debug)]
pub enum GatherError {
    /// Discovery failed for at least one server. Records from the remaining
    /// servers have already been delivered to the accumulator.
    #[error("{} of {total} Solr servers failed: {}", .failures.len(), join_failures(.failures))]
    ServersFailed {
        failures: Vec<ServerFailure>,
        total: usize,
        /// Work done by the servers that did not fail
        summary: GatherSummary,
    },
}

impl GatherError {
    /// Failures reported by this cycle
    pub fn failures(&self) -> &[ServerFailure] {
        match self {
            GatherError::ServersFailed { failures, .. } => failures,
        }
    }

    /// Summary of the servers that were collected
    pub fn summary(&self) -> &GatherSummary {
        match self {
            GatherError::ServersFailed { summary, .. } => summary,
        }
    }

    /// Failed servers plus failed cores of the servers that succeeded
    pub fn error_count(&self) -> usize {
        self.failures().len() + self.summary().core_failures
    }
}

fn join_failures(failures: &[ServerFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, public_message, log_message) = match self {
            AppError::Collector(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Collector error",
                e.to_string(),
            ),
            AppError::Gather(e) => (StatusCode::BAD_GATEWAY, "Upstream error", e.to_string()),
        };

        tracing::error!(status = %status, error = %log_message, "Request failed");

        (status, public_message).into_response()
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;
