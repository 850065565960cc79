use anyhow::Context;
use clap::Parser;
use serpcache::cache::{CacheSettings, ResultCache};
use serpcache::config::CONFIG;
use serpcache::data_models::{
    DEFAULT_RESULT_LIMIT, DEFAULT_TOP_WORDS_LIMIT, ScrapeOutcome, SearchRequest,
};
use serpcache::db::{CacheStore, Database, MemoryCacheStore, MongoCacheStore};
use serpcache::fetcher::HttpFetcher;

/// Scrape a search results page and print links and top words as JSON.
#[derive(Parser, Debug)]
#[command(name = "serpcache", version)]
struct Args {
    query: String,

    /// Identity the result is cached under
    #[arg(long, default_value = "127.0.0.1")]
    requester: String,

    /// Browser profile: chrome, firefox, safari, edge or opera
    #[arg(long)]
    profile: Option<String>,

    #[arg(long, default_value_t = DEFAULT_RESULT_LIMIT)]
    limit: usize,

    #[arg(long, default_value_t = DEFAULT_TOP_WORDS_LIMIT)]
    top_words: usize,

    /// Interface language (`hl`)
    #[arg(long)]
    lang: Option<String>,

    /// Country restriction (`cr=country<REGION>`)
    #[arg(long)]
    region: Option<String>,

    /// Keep results in memory instead of MongoDB
    #[arg(long)]
    memory: bool,
}

impl Args {
    fn request(&self) -> SearchRequest {
        let mut request = SearchRequest::new(self.query.clone(), self.requester.clone())
            .with_result_limit(self.limit)
            .with_top_words_limit(self.top_words);
        request.browser_profile = self.profile.clone();
        request.language = self.lang.clone();
        request.region = self.region.clone();
        request
    }
}

async fn run<S: CacheStore>(store: S, request: &SearchRequest) -> anyhow::Result<ScrapeOutcome> {
    let fetcher = HttpFetcher::new(&CONFIG.scraper)?;
    let cache = ResultCache::new(
        fetcher,
        store,
        CacheSettings::from_scraper_config(&CONFIG.scraper),
    )?;
    Ok(cache.get_or_refresh(request).await?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Also picks up `log` records through tracing-log
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .init();

    let args = Args::parse();
    let request = args.request();

    let outcome = if args.memory {
        run(MemoryCacheStore::new(), &request).await?
    } else {
        let db = Database::from_config().await?;
        let store = MongoCacheStore::init(&db).await?;
        run(store, &request).await?
    };

    let json = serde_json::to_string_pretty(&outcome).context("Failed to encode outcome")?;
    println!("{json}");
    Ok(())
}
