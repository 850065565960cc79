//! Result cache: the scrape pipeline's orchestrator.
//!
//! Results are kept per (requester identity, normalized query) for a short
//! TTL. A stale or missing entry triggers one fetch → parse → analyze pass,
//! whose outcome is upserted in place. Concurrent identical requests join the
//! refresh already in flight for their key and share its outcome, including
//! `NoRecords` and fetch errors.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use mongodb::bson::DateTime;
use tokio::sync::OnceCell;

use crate::analyzer::{AnalyzerConfig, TextAnalyzer};
use crate::config::ScraperConfig;
use crate::data_models::{
    CacheRecord, CacheRecordUpdate, NoRecordsFound, ScrapeOutcome, ScrapedResult, SearchRequest,
};
use crate::db::CacheStore;
use crate::error::ScrapeError;
use crate::fetcher::{PageFetcher, build_search_url};
use crate::identity::select_user_agent;
use crate::parser::{ParserConfig, ResultPageParser};

/// Immutable settings handed to [`ResultCache::new`].
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub search_base_url: String,
    pub parser: ParserConfig,
    pub analyzer: AnalyzerConfig,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::from_scraper_config(&ScraperConfig::default())
    }
}

impl CacheSettings {
    pub fn from_scraper_config(config: &ScraperConfig) -> Self {
        Self {
            ttl: Duration::from_secs(config.cache_ttl_seconds),
            search_base_url: config.search_base_url.clone(),
            parser: ParserConfig::default(),
            analyzer: AnalyzerConfig::default(),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// A record is fresh strictly before `last_modified + ttl`; at or after that it is stale.
pub fn is_fresh(last_modified: DateTime, now: DateTime, ttl: Duration) -> bool {
    let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    let expiry = last_modified.timestamp_millis().saturating_add(ttl_millis);
    now.timestamp_millis() < expiry
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    requester_identity: String,
    normalized_query: String,
}

type SharedRefresh = Arc<OnceCell<Result<ScrapeOutcome, ScrapeError>>>;

/// One caller's stake in an in-flight refresh. The last one out removes the
/// map entry, also when its future is dropped mid-refresh.
struct InFlightGuard<'a> {
    in_flight: &'a DashMap<CacheKey, SharedRefresh>,
    key: &'a CacheKey,
    refresh: SharedRefresh,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        // map entry + this guard
        self.in_flight.remove_if(self.key, |_, r| {
            Arc::ptr_eq(r, &self.refresh) && Arc::strong_count(r) <= 2
        });
    }
}

pub struct ResultCache<F, S> {
    fetcher: F,
    store: S,
    settings: CacheSettings,
    parser: ResultPageParser,
    analyzer: TextAnalyzer,
    in_flight: DashMap<CacheKey, SharedRefresh>,
}

impl<F: PageFetcher, S: CacheStore> ResultCache<F, S> {
    /// # Errors
    ///
    /// [`ScrapeError::Config`] if a parser selector does not compile.
    pub fn new(fetcher: F, store: S, settings: CacheSettings) -> Result<Self, ScrapeError> {
        Ok(Self {
            fetcher,
            store,
            parser: ResultPageParser::new(&settings.parser)?,
            analyzer: TextAnalyzer::from_config(&settings.analyzer),
            settings,
            in_flight: DashMap::new(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Return the cached result for this requester and query if it is still
    /// fresh, otherwise scrape, store and return a new one.
    ///
    /// A page without a result count yields [`ScrapeOutcome::NoRecords`],
    /// which is returned but never stored.
    ///
    /// # Errors
    ///
    /// - [`ScrapeError::NoQueryProvided`] for an empty query
    /// - [`ScrapeError::FetchFailed`] when the page could not be fetched
    /// - [`ScrapeError::Storage`] when a refreshed result could not be saved
    pub async fn get_or_refresh(
        &self,
        request: &SearchRequest,
    ) -> Result<ScrapeOutcome, ScrapeError> {
        if request.query.trim().is_empty() {
            log::debug!("empty query from {}", request.requester_identity);
            return Err(ScrapeError::NoQueryProvided);
        }

        let key = CacheKey {
            requester_identity: request.requester_identity.clone(),
            normalized_query: request.normalized_query(),
        };

        if let Some(result) = self.lookup_fresh(&key, request).await {
            return Ok(ScrapeOutcome::Found(result));
        }

        let guard = InFlightGuard {
            in_flight: &self.in_flight,
            key: &key,
            refresh: self.in_flight.entry(key.clone()).or_default().clone(),
        };

        guard
            .refresh
            .get_or_init(|| async {
                // a previous refresh may have stored a result since the first lookup
                match self.lookup_fresh(&key, request).await {
                    Some(result) => Ok(ScrapeOutcome::Found(result)),
                    None => self.refresh(&key, request).await,
                }
            })
            .await
            .clone()
            .map(|outcome| outcome.for_query(request.query.trim()))
    }

    /// The stored result if one exists and is fresh. Lookup errors count as a miss.
    async fn lookup_fresh(&self, key: &CacheKey, request: &SearchRequest) -> Option<ScrapedResult> {
        let record = match self
            .store
            .find(&key.requester_identity, &key.normalized_query)
            .await
        {
            Ok(record) => record?,
            Err(e) => {
                log::warn!("cache lookup failed, refreshing: {e:#}");
                return None;
            }
        };

        if !is_fresh(record.last_modified_at, DateTime::now(), self.settings.ttl) {
            log::debug!("cached result for {:?} is stale", key.normalized_query);
            return None;
        }

        match record.to_result() {
            Ok(mut result) => {
                result.query = request.query.trim().to_string();
                log::debug!("serving cached result for {:?}", key.normalized_query);
                Some(result)
            }
            Err(e) => {
                log::warn!("unreadable cached result {}, refreshing: {e}", record.id);
                None
            }
        }
    }

    async fn refresh(
        &self,
        key: &CacheKey,
        request: &SearchRequest,
    ) -> Result<ScrapeOutcome, ScrapeError> {
        let result = self.scrape(request).await?;

        if result.total_result_count.is_none() {
            log::info!("no records found for {:?}", key.normalized_query);
            return Ok(ScrapeOutcome::NoRecords(NoRecordsFound::new(
                request.query.trim(),
            )));
        }

        self.upsert(key, &result).await?;
        Ok(ScrapeOutcome::Found(result))
    }

    /// One fetch → parse → analyze pass.
    pub async fn scrape(&self, request: &SearchRequest) -> Result<ScrapedResult, ScrapeError> {
        let url = build_search_url(&self.settings.search_base_url, request)?;
        let user_agent = select_user_agent(
            request.browser_profile.as_deref(),
            request.fallback_user_agent.as_deref(),
        );

        let html = self.fetcher.fetch(&url, &user_agent).await?;
        Ok(self.analyze_page(&html, request))
    }

    fn analyze_page(&self, html: &str, request: &SearchRequest) -> ScrapedResult {
        let page = self.parser.parse(html, request.result_limit);

        let top_words = self
            .analyzer
            .word_frequencies(&page.entries)
            .top(request.top_words_limit);

        ScrapedResult {
            query: request.query.trim().to_string(),
            links: page
                .links
                .into_iter()
                .enumerate()
                .map(|(i, link)| (i + 1, link))
                .collect(),
            top_words,
            // a stats line with no parsable blocks still means nothing was found
            total_result_count: page
                .total_result_count
                .filter(|_| !page.entries.is_empty()),
            result_limit: request.result_limit,
            top_words_limit: request.top_words_limit,
        }
    }

    async fn upsert(&self, key: &CacheKey, result: &ScrapedResult) -> Result<(), ScrapeError> {
        let now = DateTime::now();
        let existing = self
            .store
            .find(&key.requester_identity, &key.normalized_query)
            .await
            .unwrap_or_else(|e| {
                log::warn!("lookup before upsert failed, inserting: {e:#}");
                None
            });

        let storage_err = |e: anyhow::Error| ScrapeError::Storage(format!("{e:#}"));
        let encode_err = |e: serde_json::Error| ScrapeError::Storage(e.to_string());

        let updated = match existing {
            Some(record) => {
                let fields = CacheRecordUpdate::from_result(result, now).map_err(encode_err)?;
                self.store
                    .update(record.id, &fields)
                    .await
                    .map_err(storage_err)?
            }
            None => false,
        };

        if !updated {
            let record = CacheRecord::new(key.requester_identity.clone(), result, now)
                .map_err(encode_err)?;
            self.store.insert(&record).await.map_err(storage_err)?;
        }

        log::info!(
            "stored result for {:?} ({} links)",
            key.normalized_query,
            result.links.len()
        );
        Ok(())
    }
}
