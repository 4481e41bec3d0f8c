//! Solr 메트릭 수집 모듈
//!
//! 설정된 Solr 서버마다 코어를 탐색하고, 코어별 mbeans 통계를 받아 레코드로 변환합니다.
//!
//! # Example
//!
//! ```ignore
//! use solr_exporter::accumulator::MemoryAccumulator;
//! use solr_exporter::collector::Collector;
//!
//! let collector = Collector::new(vec!["http://localhost:8983".into()], 5000)?;
//! let acc = MemoryAccumulator::new();
//! let summary = collector.gather(&acc).await?;
//! ```

mod client;
mod discovery;
mod parser;

pub use client::SolrClient;
pub use discovery::{parse_admin_status, AdminStatus, CoreStatus, ResponseHeader};
pub use parser::{
    detect_layout, parse_mbeans, Bean, BeanTree, BeanValue, CollectResult, Category,
    MBeansLayout,
};

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::accumulator::Accumulator;
use crate::config::SolrConfig;
use crate::error::{CollectorError, GatherError, ServerFailure};
use crate::metrics::InternalMetrics;
use crate::transformer::{extract_all, MetricRecord};

/// 수집 사이클 요약
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatherSummary {
    /// 시도한 서버 수
    pub servers: usize,
    /// mbeans 수집에 성공한 코어 수
    pub cores: usize,
    /// mbeans 요청이 실패한 코어 수
    pub core_failures: usize,
    /// 누산기로 보낸 레코드 수
    pub records: usize,
}

/// 서버당 동시에 보내는 mbeans 요청 기본 상한
pub const DEFAULT_CORE_CONCURRENCY: usize = 8;

/// 서버 하나의 수집 결과
#[derive(Debug, Default)]
struct ServerScrape {
    records: Vec<MetricRecord>,
    cores: usize,
    core_failures: usize,
}

/// Collector 구조체 - 설정 기반 수집 오케스트레이터
#[derive(Clone)]
pub struct Collector {
    client: SolrClient,
    servers: Vec<String>,
    cores: Vec<String>,
    core_concurrency: usize,
    metrics: InternalMetrics,
}

impl Collector {
    /// 새 Collector 생성
    pub fn new(servers: Vec<String>, timeout_ms: u64) -> CollectResult<Self> {
        Ok(Self {
            client: SolrClient::new(timeout_ms)?,
            servers,
            cores: Vec::new(),
            core_concurrency: DEFAULT_CORE_CONCURRENCY,
            metrics: InternalMetrics::new(),
        })
    }

    /// `solr` 설정 섹션으로 생성 (인증, 코어 필터 포함)
    pub fn from_config(config: &SolrConfig) -> CollectResult<Self> {
        let mut collector = Self::new(config.servers.clone(), config.timeout_ms)?
            .with_cores(config.cores.clone())
            .with_core_concurrency(config.max_concurrent_cores);

        if let Some(username) = &config.username {
            let password = config.password.as_deref().unwrap_or_default();
            collector.client = collector.client.with_auth(username, password);
        }

        Ok(collector)
    }

    /// 수집할 코어 제한 (비어 있으면 전체)
    pub fn with_cores(mut self, cores: Vec<String>) -> Self {
        self.cores = cores;
        self
    }

    /// 서버당 동시 mbeans 요청 수 제한 (최소 1)
    pub fn with_core_concurrency(mut self, limit: usize) -> Self {
        self.core_concurrency = limit.max(1);
        self
    }

    /// 서버별 내부 메트릭을 기록할 레지스트리 지정
    pub fn with_metrics(mut self, metrics: InternalMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// 대상 서버 목록
    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    /// 내부 메트릭 레지스트리
    pub fn metrics(&self) -> &InternalMetrics {
        &self.metrics
    }

    /// 한 번의 수집 사이클 실행
    ///
    /// 서버와 코어는 각각 별도 태스크에서 동시에 수집되지만, 레코드는
    /// 서버 순서, 코어 이름 순서, 추출기 순서대로 누산기에 전달됩니다.
    /// 코어 탐색에 실패한 서버가 있으면 나머지 서버를 모두 처리한 뒤 에러를 돌려줍니다.
    #[instrument(skip(self, acc), fields(servers = self.servers.len()))]
    pub async fn gather(&self, acc: &dyn Accumulator) -> Result<GatherSummary, GatherError> {
        let handles: Vec<JoinHandle<(CollectResult<ServerScrape>, f64)>> = self
            .servers
            .iter()
            .map(|server| {
                let client = self.client.clone();
                let server = server.clone();
                let filter = self.cores.clone();
                let limit = self.core_concurrency;
                tokio::spawn(async move {
                    let start = Instant::now();
                    let result = scrape_server(&client, &server, &filter, limit).await;
                    (result, start.elapsed().as_secs_f64())
                })
            })
            .collect();

        let mut summary = GatherSummary {
            servers: self.servers.len(),
            ..GatherSummary::default()
        };
        let mut failures = Vec::new();

        for (server, handle) in self.servers.iter().zip(handles) {
            let (result, elapsed) = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => (Err(CollectorError::TaskFailed(e.to_string())), 0.0),
            };

            match result {
                Ok(scrape) => {
                    self.metrics
                        .record_scrape_success(server, elapsed, scrape.core_failures as u64);
                    summary.cores += scrape.cores;
                    summary.core_failures += scrape.core_failures;
                    summary.records += scrape.records.len();
                    for record in scrape.records {
                        acc.add_record(record);
                    }
                }
                Err(e) => {
                    self.metrics.record_scrape_failure(server, elapsed);
                    error!(server = %server, error = %e, "Failed to collect from Solr server");
                    failures.push(ServerFailure {
                        server: server.clone(),
                        source: e,
                    });
                }
            }
        }

        info!(
            servers = summary.servers,
            failed = failures.len(),
            cores = summary.cores,
            core_failures = summary.core_failures,
            records = summary.records,
            "Collection cycle finished"
        );

        if failures.is_empty() {
            Ok(summary)
        } else {
            Err(GatherError::ServersFailed {
                failures,
                total: self.servers.len(),
                summary,
            })
        }
    }
}

/// 서버 하나 수집: 코어 탐색 후 코어별 mbeans 를 동시에 수집
///
/// 동시에 진행되는 mbeans 요청은 `limit` 개로 제한됩니다.
/// 탐색 실패만 에러입니다. 코어 하나의 mbeans 요청 실패는 경고 후 건너뜁니다.
async fn scrape_server(
    client: &SolrClient,
    server: &str,
    filter: &[String],
    limit: usize,
) -> CollectResult<ServerScrape> {
    let status = client.fetch_core_status(server).await?;

    for (core, reason) in &status.init_failures {
        warn!(server = %server, core = %core, reason = %reason, "Core failed to initialize");
    }

    let mut scrape = ServerScrape {
        records: status.to_records(server),
        ..ServerScrape::default()
    };

    let selected: Vec<String> = status
        .core_names()
        .into_iter()
        .filter(|name| filter.is_empty() || filter.iter().any(|f| f.as_str() == *name))
        .map(str::to_string)
        .collect();

    for wanted in filter {
        if !selected.contains(wanted) {
            debug!(server = %server, core = %wanted, "Configured core not found on server");
        }
    }

    let permits = Arc::new(Semaphore::new(limit));
    let handles: Vec<JoinHandle<CollectResult<Vec<MetricRecord>>>> = selected
        .iter()
        .map(|core| {
            let client = client.clone();
            let server = server.to_string();
            let core = core.clone();
            let permits = Arc::clone(&permits);
            tokio::spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| CollectorError::TaskFailed(e.to_string()))?;
                let tree = client.fetch_mbeans(&server, &core).await?;
                if tree.is_empty() {
                    debug!(server = %server, core = %core, "No mbeans data for core");
                }
                Ok::<_, CollectorError>(extract_all(&core, &tree))
            })
        })
        .collect();

    for (core, handle) in selected.iter().zip(handles) {
        let result = handle
            .await
            .unwrap_or_else(|e| Err(CollectorError::TaskFailed(e.to_string())));

        match result {
            Ok(records) => {
                scrape.cores += 1;
                scrape
                    .records
                    .extend(records.into_iter().map(|r| r.with_server(server)));
            }
            Err(e) => {
                scrape.core_failures += 1;
                warn!(server = %server, core = %core, error = %e, "Failed to collect core mbeans");
            }
        }
    }

    Ok(scrape)
}
