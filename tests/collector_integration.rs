//! Collector 통합 테스트
//!
//! wiremock 으로 Solr 서버를 흉내 내어 코어 탐색부터 레코드 전달까지 확인합니다.

use serde_json::{json, Value};
use solr_exporter::accumulator::MemoryAccumulator;
use solr_exporter::collector::{Collector, SolrClient};
use solr_exporter::config::SolrConfig;
use solr_exporter::error::CollectorError;
use solr_exporter::transformer::{FieldValue, MetricRecord};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn admin_status(cores: &[&str]) -> Value {
    let status: serde_json::Map<String, Value> = cores
        .iter()
        .map(|name| {
            (
                name.to_string(),
                json!({
                    "name": name,
                    "instanceDir": format!("/var/solr/data/{}", name),
                    "startTime": "2017-03-29T12:00:00Z",
                    "uptime": 60000,
                    "index": {
                        "numDocs": 100,
                        "maxDoc": 100,
                        "deletedDocs": 0,
                        "sizeInBytes": 2048,
                        "lastModified": "2017-03-29T12:30:00Z"
                    }
                }),
            )
        })
        .collect();

    json!({
        "responseHeader": {"status": 0, "QTime": 1},
        "initFailures": {},
        "status": status
    })
}

/// `main` 코어 mbeans (current layout)
fn main_mbeans() -> Value {
    json!({
        "responseHeader": {"status": 0, "QTime": 2},
        "solr-mbeans": {
            "CORE": {
                "searcher": {
                    "class": "org.apache.solr.search.SolrIndexSearcher",
                    "stats": {"numDocs": 100, "maxDoc": 100, "deletedDocs": 0, "warmupTime": 0}
                }
            },
            "QUERYHANDLER": {
                "/dataimport": {
                    "class": "org.apache.solr.handler.dataimport.DataImportHandler",
                    "stats": {
                        "Status": "IDLE",
                        "Total Documents Processed": "java.util.concurrent.atomic.AtomicLong:5"
                    }
                }
            },
            "UPDATEHANDLER": {},
            "CACHE": {
                "filterCache": {
                    "class": "org.apache.solr.search.FastLRUCache",
                    "stats": {"hits": 10, "lookups": 20}
                }
            }
        }
    })
}

/// 모든 카테고리를 채운 mbeans (current layout)
fn full_mbeans_current() -> Value {
    json!({
        "solr-mbeans": {
            "CORE": {
                "searcher": {"stats": {"numDocs": 7, "maxDoc": 9, "deletedDocs": 2, "warmupTime": 1}}
            },
            "QUERYHANDLER": {
                "org.apache.solr.handler.component.SearchHandler": {
                    "class": "org.apache.solr.handler.component.SearchHandler",
                    "stats": {"requests": 4, "errors": 0, "timeouts": 0, "avgTimePerRequest": 1.5}
                }
            },
            "UPDATEHANDLER": {
                "updateHandler": {
                    "class": "org.apache.solr.update.DirectUpdateHandler2",
                    "stats": {"commits": 3, "autocommit maxTime": "15000ms", "docsPending": 1}
                }
            },
            "CACHE": {
                "filterCache": {"stats": {"hits": 10, "lookups": 20, "hitratio": 0.5}}
            }
        }
    })
}

/// [`full_mbeans_current`] 와 같은 데이터의 legacy layout
fn full_mbeans_legacy() -> Value {
    json!({
        "solr-mbeans": [
            "CORE",
            {"searcher": {"stats": {"numDocs": 7, "maxDoc": 9, "deletedDocs": 2, "warmupTime": 1}}},
            "QUERYHANDLER",
            {
                "org.apache.solr.handler.component.SearchHandler": {
                    "class": "org.apache.solr.handler.component.SearchHandler",
                    "stats": ["requests", 4, "errors", 0, "timeouts", 0, "avgTimePerRequest", 1.5]
                }
            },
            "UPDATEHANDLER",
            {
                "updateHandler": {
                    "class": "org.apache.solr.update.DirectUpdateHandler2",
                    "stats": {"commits": 3, "autocommit maxTime": "15000ms", "docsPending": 1}
                }
            },
            "CACHE",
            ["filterCache", {"stats": {"hits": 10, "lookups": 20, "hitratio": 0.5}}]
        ]
    })
}

async fn mount_admin(server: &MockServer, cores: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/solr/admin/cores"))
        .and(query_param("action", "STATUS"))
        .and(query_param("wt", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(admin_status(cores)))
        .mount(server)
        .await;
}

async fn mount_mbeans(server: &MockServer, core: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/solr/{}/admin/mbeans", core)))
        .and(query_param("stats", "true"))
        .and(query_param("wt", "json"))
        .respond_with(response)
        .mount(server)
        .await;
}

/// `main` + `core1` (mbeans 없음) 서버
async fn start_two_core_server() -> MockServer {
    let server = MockServer::start().await;
    mount_admin(&server, &["main", "core1"]).await;
    mount_mbeans(&server, "main", ResponseTemplate::new(200).set_body_json(main_mbeans())).await;
    mount_mbeans(&server, "core1", ResponseTemplate::new(200).set_body_string("")).await;
    server
}

fn collector_for(servers: &[&MockServer]) -> Collector {
    let urls = servers.iter().map(|s| s.uri()).collect();
    Collector::new(urls, 5000).unwrap()
}

fn without_server(records: Vec<MetricRecord>) -> Vec<MetricRecord> {
    records
        .into_iter()
        .map(|r| r.with_server(String::new()))
        .collect()
}

#[tokio::test]
async fn test_gather_two_cores() {
    let server = start_two_core_server().await;
    let collector = collector_for(&[&server]);
    let acc = MemoryAccumulator::new();

    let summary = collector.gather(&acc).await.unwrap();
    assert_eq!(summary.servers, 1);
    assert_eq!(summary.cores, 2);
    assert_eq!(summary.core_failures, 0);
    assert_eq!(summary.records, 5);

    let records = acc.records();
    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|r| r.server == server.uri()));

    assert!(acc.find("solr_admin", &[("core", "main")]).is_some());
    assert!(acc.find("solr_admin", &[("core", "core1")]).is_some());

    let core = acc
        .find("solr_core", &[("core", "main"), ("handler", "searcher")])
        .unwrap();
    assert_eq!(core.field("num_docs"), Some(&FieldValue::Integer(100)));

    let cache = acc
        .find("solr_cache", &[("core", "main"), ("handler", "filterCache")])
        .unwrap();
    assert_eq!(cache.field("hits"), Some(&FieldValue::Integer(10)));
    assert_eq!(cache.field("lookups"), Some(&FieldValue::Integer(20)));

    let dih = acc
        .find("solr_dih", &[("core", "main"), ("handler", "/dataimport")])
        .unwrap();
    assert_eq!(dih.field("total_documents_processed"), Some(&FieldValue::Integer(5)));
    assert_eq!(dih.field("status"), Some(&FieldValue::String("IDLE".to_string())));

    // core1 returned an empty body: only its admin record
    assert!(records
        .iter()
        .filter(|r| r.tag("core") == Some("core1"))
        .all(|r| r.measurement == "solr_admin"));
    assert!(!acc.has_measurement("solr_queryhandler"));
    assert!(!acc.has_measurement("solr_updatehandler"));
}

#[tokio::test]
async fn test_record_order_is_deterministic() {
    let server = start_two_core_server().await;
    let collector = collector_for(&[&server]);
    let acc = MemoryAccumulator::new();
    collector.gather(&acc).await.unwrap();

    let order: Vec<(String, Option<String>)> = acc
        .records()
        .iter()
        .map(|r| (r.measurement.clone(), r.tag("core").map(str::to_string)))
        .collect();

    assert_eq!(
        order,
        vec![
            ("solr_admin".to_string(), Some("core1".to_string())),
            ("solr_admin".to_string(), Some("main".to_string())),
            ("solr_core".to_string(), Some("main".to_string())),
            ("solr_cache".to_string(), Some("main".to_string())),
            ("solr_dih".to_string(), Some("main".to_string())),
        ]
    );
}

#[tokio::test]
async fn test_gather_is_idempotent() {
    let server = start_two_core_server().await;
    let collector = collector_for(&[&server]);

    let first = MemoryAccumulator::new();
    let second = MemoryAccumulator::new();
    collector.gather(&first).await.unwrap();
    collector.gather(&second).await.unwrap();

    assert_eq!(first.records(), second.records());
}

#[tokio::test]
async fn test_legacy_and_current_layouts_match() {
    let current = MockServer::start().await;
    mount_admin(&current, &["main"]).await;
    mount_mbeans(
        &current,
        "main",
        ResponseTemplate::new(200).set_body_json(full_mbeans_current()),
    )
    .await;

    let legacy = MockServer::start().await;
    mount_admin(&legacy, &["main"]).await;
    mount_mbeans(
        &legacy,
        "main",
        ResponseTemplate::new(200).set_body_json(full_mbeans_legacy()),
    )
    .await;

    let current_acc = MemoryAccumulator::new();
    let legacy_acc = MemoryAccumulator::new();
    collector_for(&[&current]).gather(&current_acc).await.unwrap();
    collector_for(&[&legacy]).gather(&legacy_acc).await.unwrap();

    let current_records = without_server(current_acc.take());
    let legacy_records = without_server(legacy_acc.take());
    assert_eq!(current_records.len(), 5);
    assert_eq!(current_records, legacy_records);

    let update = current_records
        .iter()
        .find(|r| r.measurement == "solr_updatehandler")
        .unwrap();
    assert_eq!(update.field("autocommit_max_time"), Some(&FieldValue::Integer(15000)));
}

#[tokio::test]
async fn test_failing_server_does_not_block_others() {
    let broken = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/admin/cores"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&broken)
        .await;

    let healthy = start_two_core_server().await;
    let collector = collector_for(&[&broken, &healthy]);
    let acc = MemoryAccumulator::new();

    let err = collector.gather(&acc).await.unwrap_err();
    assert_eq!(err.failures().len(), 1);
    assert_eq!(err.failures()[0].server, broken.uri());
    assert!(matches!(
        err.failures()[0].source,
        CollectorError::HttpStatus(500)
    ));
    assert!(err.to_string().starts_with("1 of 2 Solr servers failed"));

    // all records of the healthy server were delivered
    assert_eq!(acc.len(), 5);
    assert!(acc.records().iter().all(|r| r.server == healthy.uri()));

    let broken_metrics = collector.metrics().server(&broken.uri());
    assert_eq!(broken_metrics.scrape_failure_total.get(), 1);
    let healthy_metrics = collector.metrics().server(&healthy.uri());
    assert_eq!(healthy_metrics.scrape_success_total.get(), 1);
}

#[tokio::test]
async fn test_malformed_status_is_server_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/admin/cores"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;

    let acc = MemoryAccumulator::new();
    let err = collector_for(&[&server]).gather(&acc).await.unwrap_err();
    assert!(matches!(err.failures()[0].source, CollectorError::JsonParse(_)));
    assert!(acc.is_empty());
}

#[tokio::test]
async fn test_core_failure_is_not_fatal() {
    let server = MockServer::start().await;
    mount_admin(&server, &["main", "core1"]).await;
    mount_mbeans(&server, "main", ResponseTemplate::new(200).set_body_json(main_mbeans())).await;
    mount_mbeans(&server, "core1", ResponseTemplate::new(503)).await;

    let acc = MemoryAccumulator::new();
    let summary = collector_for(&[&server]).gather(&acc).await.unwrap();

    assert_eq!(summary.cores, 1);
    assert_eq!(summary.core_failures, 1);
    assert_eq!(acc.len(), 5);
    assert!(acc.find("solr_admin", &[("core", "core1")]).is_some());
}

#[tokio::test]
async fn test_core_filter() {
    let server = start_two_core_server().await;
    let collector = collector_for(&[&server]).with_cores(vec!["core1".to_string()]);
    let acc = MemoryAccumulator::new();

    let summary = collector.gather(&acc).await.unwrap();
    assert_eq!(summary.cores, 1);

    // admin records for every discovered core, mbeans only for core1
    assert_eq!(acc.len(), 2);
    assert!(acc.find("solr_admin", &[("core", "main")]).is_some());
    assert!(!acc.has_measurement("solr_core"));
}

#[tokio::test]
async fn test_core_requests_respect_concurrency_limit() {
    let server = MockServer::start().await;
    let cores = ["c1", "c2", "c3", "c4"];
    mount_admin(&server, &cores).await;
    for core in cores {
        mount_mbeans(
            &server,
            core,
            ResponseTemplate::new(200)
                .set_body_json(main_mbeans())
                .set_delay(std::time::Duration::from_millis(100)),
        )
        .await;
    }

    let collector = collector_for(&[&server]).with_core_concurrency(1);
    let acc = MemoryAccumulator::new();
    let start = std::time::Instant::now();
    let summary = collector.gather(&acc).await.unwrap();

    // one request at a time: four delayed responses back to back
    assert!(start.elapsed() >= std::time::Duration::from_millis(400));
    assert_eq!(summary.cores, 4);
    assert_eq!(summary.core_failures, 0);

    let searcher_cores: Vec<String> = acc
        .records()
        .iter()
        .filter(|r| r.measurement == "solr_core")
        .map(|r| r.tags["core"].clone())
        .collect();
    assert_eq!(searcher_cores, vec!["c1", "c2", "c3", "c4"]);
}

#[tokio::test]
async fn test_zero_cores() {
    let server = MockServer::start().await;
    mount_admin(&server, &[]).await;

    let acc = MemoryAccumulator::new();
    let summary = collector_for(&[&server]).gather(&acc).await.unwrap();
    assert_eq!(summary.cores, 0);
    assert!(acc.is_empty());
}

#[tokio::test]
async fn test_basic_auth_from_config() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/admin/cores"))
        .and(header("authorization", "Basic YWRtaW46c2VjcmV0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(admin_status(&[])))
        .mount(&server)
        .await;

    let config = SolrConfig {
        servers: vec![server.uri()],
        username: Some("admin".to_string()),
        password: Some("secret".to_string()),
        ..SolrConfig::default()
    };
    let collector = Collector::from_config(&config).unwrap();

    // without matching credentials wiremock answers 404
    assert!(collector.gather(&MemoryAccumulator::new()).await.is_ok());
}

#[tokio::test]
async fn test_client_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/admin/cores"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(admin_status(&[]))
                .set_delay(std::time::Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = SolrClient::new(50).unwrap();
    let err = client.fetch_core_status(&server.uri()).await.unwrap_err();
    assert!(matches!(err, CollectorError::Timeout(Some(50))));
}

#[tokio::test]
async fn test_connection_refused() {
    // nothing listens on port 1
    let client = SolrClient::new(1000).unwrap();
    let err = client.fetch_core_status("http://127.0.0.1:1").await.unwrap_err();
    assert!(matches!(
        err,
        CollectorError::ConnectionFailed(_) | CollectorError::HttpRequest(_)
    ));
}
