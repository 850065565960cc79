use dotenvy::dotenv;
use once_cell::sync::Lazy;
use reqwest::Url;
use std::env;
use std::str::FromStr;

use crate::error::ScrapeError;

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config {
        mongo_uri: env::var("MONGO_URI").ok(),
        mongo_db_name: get_env_or_default("MONGO_DB_NAME", "serpcache"),
        scraper: ScraperConfig::from_env(),
    }
});

pub struct Config {
    pub mongo_uri: Option<String>,
    pub mongo_db_name: String,
    pub scraper: ScraperConfig,
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_parsed_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("ignoring unparsable {key}={raw:?}");
            default
        }),
        Err(_) => default,
    }
}

/// Network and freshness settings for the scrape pipeline.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Scheme and host of the search engine, without the `/search` path.
    pub search_base_url: String,
    /// Timeout for the single outbound GET.
    pub timeout_seconds: u64,
    /// Age after which a cached record is refreshed.
    pub cache_ttl_seconds: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            search_base_url: "https://www.google.com".to_string(),
            timeout_seconds: 10,
            cache_ttl_seconds: 20,
        }
    }
}

impl ScraperConfig {
    /// Defaults overridden by `SEARCH_BASE_URL`, `FETCH_TIMEOUT_SECS` and `CACHE_TTL_SECS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            search_base_url: get_env_or_default("SEARCH_BASE_URL", &defaults.search_base_url),
            timeout_seconds: get_env_parsed_or("FETCH_TIMEOUT_SECS", defaults.timeout_seconds),
            cache_ttl_seconds: get_env_parsed_or("CACHE_TTL_SECS", defaults.cache_ttl_seconds),
        }
    }

    pub fn validate(&self) -> Result<(), ScrapeError> {
        if self.timeout_seconds == 0 {
            return Err(ScrapeError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        Url::parse(&self.search_base_url).map_err(|e| {
            ScrapeError::Config(format!(
                "invalid search_base_url {:?}: {e}",
                self.search_base_url
            ))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sensible_values() {
        let config = ScraperConfig::default();
        assert_eq!(config.search_base_url, "https://www.google.com");
        assert_eq!(config.timeout_seconds, 10);
        assert_eq!(config.cache_ttl_seconds, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = ScraperConfig {
            timeout_seconds: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeout_seconds"));
    }

    #[test]
    fn bad_base_url_rejected() {
        let config = ScraperConfig {
            search_base_url: "not a url".into(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("search_base_url"));
    }

    #[test]
    fn zero_ttl_is_allowed() {
        // every request refreshes
        let config = ScraperConfig {
            cache_ttl_seconds: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
