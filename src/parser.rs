//! Search results page parsing.
//!
//! Two independent passes over the same document: the result-count text and
//! the organic result blocks. Blocks that don't have the expected shape are
//! skipped, since non-organic entries (maps, videos, "people also ask") share
//! the container class.

use scraper::{ElementRef, Html, Selector};

use crate::error::ScrapeError;

/// CSS selectors describing the result page layout.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub stats_selector: String,
    pub block_selector: String,
    pub title_selector: String,
    pub snippet_selector: String,
    pub link_selector: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            stats_selector: "#result-stats".to_string(),
            block_selector: "div.g".to_string(),
            title_selector: "h3".to_string(),
            snippet_selector: "span.aCOpRe, div.VwiC3b, span.st".to_string(),
            link_selector: "a[href]".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEntry {
    pub title: String,
    pub snippet: String,
    pub href: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    /// `None` when the page has no result-stats block.
    pub total_result_count: Option<u64>,
    /// Every well-formed entry inspected before the link limit was reached.
    pub entries: Vec<ResultEntry>,
    /// External links in page order, at most `result_limit`.
    pub links: Vec<String>,
}

pub struct ResultPageParser {
    stats: Selector,
    block: Selector,
    title: Selector,
    snippet: Selector,
    link: Selector,
}

fn compile(kind: &str, css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css)
        .map_err(|e| ScrapeError::Config(format!("invalid {kind} selector {css:?}: {e:?}")))
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

impl ResultPageParser {
    pub fn new(config: &ParserConfig) -> Result<Self, ScrapeError> {
        Ok(Self {
            stats: compile("stats", &config.stats_selector)?,
            block: compile("block", &config.block_selector)?,
            title: compile("title", &config.title_selector)?,
            snippet: compile("snippet", &config.snippet_selector)?,
            link: compile("link", &config.link_selector)?,
        })
    }

    pub fn parse(&self, html: &str, result_limit: usize) -> ParsedPage {
        let document = Html::parse_document(html);
        ParsedPage {
            total_result_count: self.result_count(&document),
            ..self.entries(&document, result_limit)
        }
    }

    fn result_count(&self, document: &Html) -> Option<u64> {
        match document.select(&self.stats).next() {
            Some(stats) => {
                let text = element_text(stats);
                let count = parse_result_count(&text);
                if count.is_none() {
                    log::warn!("result stats text {text:?} holds no number");
                }
                count
            }
            None => {
                log::warn!("result stats block not found");
                None
            }
        }
    }

    fn entries(&self, document: &Html, result_limit: usize) -> ParsedPage {
        let mut page = ParsedPage::default();

        for block in document.select(&self.block) {
            if page.links.len() >= result_limit {
                break;
            }
            let Some(entry) = self.extract_entry(block) else {
                continue;
            };
            if !entry.title.is_empty() && entry.href.contains("http") {
                page.links.push(entry.href.clone());
            }
            page.entries.push(entry);
        }

        page
    }

    /// Title, snippet and first link of one result block, or `None` when any is missing.
    pub fn extract_entry(&self, block: ElementRef<'_>) -> Option<ResultEntry> {
        let title = block.select(&self.title).next()?;
        let snippet = block.select(&self.snippet).next()?;
        let href = block
            .select(&self.link)
            .find_map(|a| a.value().attr("href"))?;

        Some(ResultEntry {
            title: element_text(title),
            snippet: element_text(snippet),
            href: href.to_string(),
        })
    }
}

/// Extract the total hit count from the result-stats text.
///
/// Digit-led tokens are concatenated until the first non-digit token after
/// the first one; `.` and `,` are dropped as thousands separators. So
/// `"About 10,000 results"`, `"10.000 Ergebnisse"` and `"10 000 wyników"` all
/// give 10000. A leading word longer than one token (`"Page 2 of 1,000"`)
/// defeats this heuristic.
pub fn parse_result_count(stats_text: &str) -> Option<u64> {
    let mut number = String::new();
    for (i, token) in stats_text.split_whitespace().enumerate() {
        if token.starts_with(|c: char| c.is_ascii_digit()) {
            number.push_str(token);
        } else if i > 0 {
            break;
        }
    }
    number.retain(|c| c != '.' && c != ',');
    number.parse().ok()
}
