use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use serpcache::ScrapeError;
use serpcache::cache::{CacheSettings, ResultCache};
use serpcache::config::ScraperConfig;
use serpcache::data_models::SearchRequest;
use serpcache::db::MemoryCacheStore;
use serpcache::fetcher::{HttpFetcher, PageFetcher, build_search_url};
use serpcache::identity::BrowserProfile;

const RESULTS_PAGE: &str = include_str!("fixtures/results_page.html");

/// Matches the whole `User-Agent` value. Browser agents contain commas, which
/// `matchers::header` would split into separate values.
struct UserAgentIs(&'static str);

impl Match for UserAgentIs {
    fn matches(&self, request: &Request) -> bool {
        request
            .headers
            .get("user-agent")
            .and_then(|value| value.to_str().ok())
            == Some(self.0)
    }
}

fn config_for(server: &MockServer, timeout_seconds: u64) -> ScraperConfig {
    ScraperConfig {
        search_base_url: server.uri(),
        timeout_seconds,
        cache_ttl_seconds: 20,
    }
}

#[tokio::test]
async fn test_fetch_sends_query_and_identity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rust lang"))
        .and(query_param("num", "25"))
        .and(UserAgentIs(BrowserProfile::Safari.user_agent()))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(&config_for(&server, 5)).unwrap();
    let url = build_search_url(&server.uri(), &SearchRequest::new("rust lang", "1.2.3.4")).unwrap();
    let body = fetcher
        .fetch(&url, BrowserProfile::Safari.user_agent())
        .await
        .unwrap();
    assert_eq!(body, "<html>ok</html>");
}

#[tokio::test]
async fn test_non_success_status_is_fetch_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429).set_body_string("unusual traffic"))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(&config_for(&server, 5)).unwrap();
    let url = build_search_url(&server.uri(), &SearchRequest::new("rust", "1.2.3.4")).unwrap();
    let err = fetcher.fetch(&url, "test-agent").await.unwrap_err();
    assert!(matches!(err, ScrapeError::FetchFailed(_)));
    assert!(err.to_string().contains("429"));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(&config_for(&server, 1)).unwrap();
    let url = build_search_url(&server.uri(), &SearchRequest::new("rust", "1.2.3.4")).unwrap();
    let err = fetcher.fetch(&url, "test-agent").await.unwrap_err();
    assert!(matches!(err, ScrapeError::FetchFailed(_)));
}

#[tokio::test]
async fn test_cache_over_http_fetches_once_within_ttl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rust programming"))
        .and(UserAgentIs(BrowserProfile::Edge.user_agent()))
        .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server, 5);
    let cache = ResultCache::new(
        HttpFetcher::new(&config).unwrap(),
        MemoryCacheStore::new(),
        CacheSettings::from_scraper_config(&config),
    )
    .unwrap();

    let request =
        SearchRequest::new("rust programming", "192.168.1.10").with_browser_profile("edge");
    let first = cache.get_or_refresh(&request).await.unwrap();
    let second = cache.get_or_refresh(&request).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.found().unwrap().links.len(), 3);
    // MockServer verifies `expect(1)` on drop
}
