//! # serpcache
//!
//! Scrapes a search results page for a query, extracts the result count,
//! links and title/snippet text, ranks the most frequent words, and caches
//! the outcome per (requester, query) for a short TTL.
//!
//! ```no_run
//! # async fn example() -> anyhow::Result<()> {
//! use serpcache::cache::{CacheSettings, ResultCache};
//! use serpcache::config::ScraperConfig;
//! use serpcache::data_models::SearchRequest;
//! use serpcache::db::MemoryCacheStore;
//! use serpcache::fetcher::HttpFetcher;
//!
//! let config = ScraperConfig::default();
//! let cache = ResultCache::new(
//!     HttpFetcher::new(&config)?,
//!     MemoryCacheStore::new(),
//!     CacheSettings::from_scraper_config(&config),
//! )?;
//! let outcome = cache
//!     .get_or_refresh(&SearchRequest::new("rust web scraping", "127.0.0.1"))
//!     .await?;
//! println!("{}", serde_json::to_string_pretty(&outcome)?);
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod cache;
pub mod config;
pub mod data_models;
pub mod db;
pub mod error;
pub mod fetcher;
pub mod identity;
pub mod parser;

pub use error::{Result, ScrapeError};
