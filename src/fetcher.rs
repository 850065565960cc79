//! Single-page fetch of a search results page.

use std::future::Future;
use std::time::Duration;

use reqwest::Url;
use reqwest::header::USER_AGENT;

use crate::config::ScraperConfig;
use crate::data_models::SearchRequest;
use crate::error::ScrapeError;

/// Extra results asked for on top of the limit, since some blocks get skipped.
const RESULT_COUNT_HEADROOM: usize = 5;

/// Seam to the network: one GET, body text back.
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` presenting `user_agent`.
    ///
    /// # Errors
    ///
    /// [`ScrapeError::FetchFailed`] on transport failure or a non-2xx status.
    fn fetch(
        &self,
        url: &Url,
        user_agent: &str,
    ) -> impl Future<Output = Result<String, ScrapeError>> + Send;
}

/// Build `<base>/search?q=..&num=..[&hl=..][&cr=country..]`.
pub fn build_search_url(base: &str, request: &SearchRequest) -> Result<Url, ScrapeError> {
    let mut url = Url::parse(base)
        .and_then(|b| b.join("/search"))
        .map_err(|e| ScrapeError::Config(format!("invalid search base url {base:?}: {e}")))?;

    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("q", request.query.trim());
        pairs.append_pair(
            "num",
            &(request.result_limit + RESULT_COUNT_HEADROOM).to_string(),
        );
        if let Some(language) = request.language.as_deref().filter(|l| !l.is_empty()) {
            pairs.append_pair("hl", language);
        }
        if let Some(region) = request.region.as_deref().filter(|r| !r.is_empty()) {
            pairs.append_pair("cr", &format!("country{region}"));
        }
    }

    Ok(url)
}

/// reqwest-backed fetcher sharing one client across calls.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self, ScrapeError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| ScrapeError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, user_agent: &str) -> Result<String, ScrapeError> {
        log::debug!("fetching {url}");

        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, user_agent)
            .send()
            .await
            .map_err(|e| ScrapeError::FetchFailed(format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| ScrapeError::FetchFailed(format!("HTTP error: {e}")))?;

        let body = response
            .text()
            .await
            .map_err(|e| ScrapeError::FetchFailed(format!("reading response failed: {e}")))?;

        log::debug!("received {} bytes from {url}", body.len());
        Ok(body)
    }
}
