//! Solr HTTP 클라이언트
//!
//! Connection pooling과 타임아웃을 지원하는 비동기 HTTP 클라이언트입니다.
//! 한 서버의 여러 코어를 동시에 조회하므로 `Clone` 으로 풀을 공유합니다.

use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::discovery::{parse_admin_status, AdminStatus};
use super::parser::{parse_mbeans, BeanTree, Category, CollectResult};
use crate::error::CollectorError;

/// 코어 상태 조회 경로
const ADMIN_CORES_PATH: [&str; 3] = ["solr", "admin", "cores"];

/// Solr HTTP 클라이언트
#[derive(Clone)]
pub struct SolrClient {
    client: Client,
    timeout_ms: u64,
    auth: Option<(String, String)>,
}

impl SolrClient {
    /// 새 클라이언트 생성
    ///
    /// # Arguments
    /// * `timeout_ms` - 요청 하나당 타임아웃 (밀리초)
    ///
    /// # Example
    /// ```ignore
    /// let client = SolrClient::new(5000)?;
    /// let status = client.fetch_core_status("http://localhost:8983").await?;
    /// ```
    pub fn new(timeout_ms: u64) -> CollectResult<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_millis(timeout_ms))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(CollectorError::HttpClientInit)?;

        Ok(Self {
            client,
            timeout_ms,
            auth: None,
        })
    }

    /// Basic Auth 설정
    pub fn with_auth(mut self, username: &str, password: &str) -> Self {
        self.auth = Some((username.to_string(), password.to_string()));
        self
    }

    /// Basic Auth 사용 여부
    pub fn has_auth(&self) -> bool {
        self.auth.is_some()
    }

    /// 코어 상태 URL: `<server>/solr/admin/cores?action=STATUS&wt=json`
    pub fn admin_url(server: &str) -> CollectResult<Url> {
        let mut url = base_url(server)?;
        url.path_segments_mut()
            .map_err(|_| CollectorError::InvalidUrl(server.to_string()))?
            .pop_if_empty()
            .extend(ADMIN_CORES_PATH);
        url.query_pairs_mut()
            .append_pair("action", "STATUS")
            .append_pair("wt", "json");
        Ok(url)
    }

    /// mbeans URL: `<server>/solr/<core>/admin/mbeans?stats=true&wt=json&cat=...`
    ///
    /// 코어 이름은 경로 세그먼트 하나로 인코딩됩니다.
    pub fn mbeans_url(server: &str, core: &str) -> CollectResult<Url> {
        let mut url = base_url(server)?;
        url.path_segments_mut()
            .map_err(|_| CollectorError::InvalidUrl(server.to_string()))?
            .pop_if_empty()
            .extend(["solr", core, "admin", "mbeans"]);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("stats", "true").append_pair("wt", "json");
            for category in Category::ALL {
                query.append_pair("cat", category.as_str());
            }
        }
        Ok(url)
    }

    /// 서버의 코어 목록과 코어별 상태 조회
    #[instrument(skip(self), fields(server = %server))]
    pub async fn fetch_core_status(&self, server: &str) -> CollectResult<AdminStatus> {
        let url = Self::admin_url(server)?;
        let body = self.get_text(url).await?;
        parse_admin_status(&body)
    }

    /// 코어 하나의 mbeans 통계 조회
    ///
    /// 전송 실패나 비정상 상태 코드만 에러입니다. 본문을 해석할 수 없으면 빈 트리를 돌려줍니다.
    #[instrument(skip(self), fields(server = %server, core = %core))]
    pub async fn fetch_mbeans(&self, server: &str, core: &str) -> CollectResult<BeanTree> {
        let url = Self::mbeans_url(server, core)?;
        let body = self.get_text(url).await?;
        let tree = parse_mbeans(&body);
        debug!(beans = tree.bean_count(), "Parsed mbeans response");
        Ok(tree)
    }

    /// GET 요청 후 본문 반환
    async fn get_text(&self, url: Url) -> CollectResult<String> {
        debug!(url = %url, "Sending Solr request");

        let mut req = self.client.get(url);

        if let Some((username, password)) = &self.auth {
            req = req.basic_auth(username, Some(password));
        }

        let response = req.send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectorError::HttpStatus(status.as_u16()));
        }

        response.text().await.map_err(|e| self.map_send_error(e))
    }

    /// 타임아웃이면 설정값을 포함한 에러로 변환
    fn map_send_error(&self, err: reqwest::Error) -> CollectorError {
        if err.is_timeout() {
            CollectorError::timeout_with_duration(self.timeout_ms)
        } else {
            CollectorError::from(err)
        }
    }
}

/// 서버 베이스 URL 검증
fn base_url(server: &str) -> CollectResult<Url> {
    let url = Url::parse(server)
        .map_err(|e| CollectorError::InvalidUrl(format!("{}: {}", server, e)))?;
    if url.cannot_be_a_base() {
        return Err(CollectorError::InvalidUrl(server.to_string()));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_new() {
        let client = SolrClient::new(5000);
        assert!(client.is_ok());
    }

    #[test]
    fn test_client_with_auth() {
        let client = SolrClient::new(5000).unwrap().with_auth("user", "pass");
        assert!(client.has_auth());
    }

    #[test]
    fn test_admin_url() {
        let url = SolrClient::admin_url("http://localhost:8983").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8983/solr/admin/cores?action=STATUS&wt=json"
        );

        // trailing slash is not doubled
        let url = SolrClient::admin_url("http://localhost:8983/").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8983/solr/admin/cores?action=STATUS&wt=json"
        );
    }

    #[test]
    fn test_mbeans_url() {
        let url = SolrClient::mbeans_url("http://solr-1:8983", "main").unwrap();
        assert_eq!(
            url.as_str(),
            "http://solr-1:8983/solr/main/admin/mbeans?stats=true&wt=json\
             &cat=CORE&cat=QUERYHANDLER&cat=UPDATEHANDLER&cat=CACHE"
        );
    }

    #[test]
    fn test_mbeans_url_with_prefix_and_odd_core_name() {
        let url = SolrClient::mbeans_url("https://proxy/search", "my core").unwrap();
        assert_eq!(url.path(), "/search/solr/my%20core/admin/mbeans");
    }

    #[test]
    fn test_invalid_server_url() {
        assert!(matches!(
            SolrClient::admin_url("localhost:8983"),
            Err(CollectorError::InvalidUrl(_))
        ));
        assert!(matches!(
            SolrClient::mbeans_url("not a url", "main"),
            Err(CollectorError::InvalidUrl(_))
        ));
    }
}
