//! Error types for the scrape pipeline.
//!
//! Parsing irregularities never show up here: malformed result blocks are
//! skipped and a missing result-stats block is logged. Only conditions the
//! caller has to distinguish are represented.

/// Errors surfaced by [`crate::cache::ResultCache::get_or_refresh`] and the
/// components it drives.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScrapeError {
    /// The request carried an empty query. Callers usually send the user
    /// back to the input form.
    #[error("no query provided")]
    NoQueryProvided,

    /// The outbound GET failed at the transport level or returned a non-2xx status.
    #[error("fetch failed: {0}")]
    FetchFailed(String),

    /// Invalid configuration (bad selector, bad base URL, zero timeout).
    #[error("config error: {0}")]
    Config(String),

    /// The cache store could not persist a refreshed result.
    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
