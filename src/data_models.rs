use std::collections::BTreeMap;
use std::fmt;

use mongodb::bson::{DateTime, oid::ObjectId};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const DEFAULT_RESULT_LIMIT: usize = 20;
pub const DEFAULT_TOP_WORDS_LIMIT: usize = 10;
pub const NO_RECORDS_FOUND: &str = "No records found";

/// One query as handed over by the web layer. Never persisted.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    /// Who is asking, e.g. the caller's network address. Half of the cache key.
    pub requester_identity: String,
    pub result_limit: usize,
    pub top_words_limit: usize,
    pub language: Option<String>,
    pub region: Option<String>,
    pub browser_profile: Option<String>,
    /// The `User-Agent` the caller arrived with.
    pub fallback_user_agent: Option<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, requester_identity: impl Into<String>) -> Self {
        SearchRequest {
            query: query.into(),
            requester_identity: requester_identity.into(),
            result_limit: DEFAULT_RESULT_LIMIT,
            top_words_limit: DEFAULT_TOP_WORDS_LIMIT,
            language: None,
            region: None,
            browser_profile: None,
            fallback_user_agent: None,
        }
    }

    pub fn with_result_limit(mut self, limit: usize) -> Self {
        self.result_limit = limit;
        self
    }

    pub fn with_top_words_limit(mut self, limit: usize) -> Self {
        self.top_words_limit = limit;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_browser_profile(mut self, profile: impl Into<String>) -> Self {
        self.browser_profile = Some(profile.into());
        self
    }

    pub fn with_fallback_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.fallback_user_agent = Some(user_agent.into());
        self
    }

    /// Lowercased, trimmed query used as the cache key.
    pub fn normalized_query(&self) -> String {
        normalize_query(&self.query)
    }
}

pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Word → frequency pairs, ordered by descending frequency.
///
/// Serializes as a JSON object whose key order is the ranking order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopWords(pub Vec<(String, u64)>);

impl TopWords {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn words(&self) -> Vec<&str> {
        self.0.iter().map(|(w, _)| w.as_str()).collect()
    }

    pub fn get(&self, word: &str) -> Option<u64> {
        self.0.iter().find(|(w, _)| w == word).map(|(_, c)| *c)
    }
}

impl Serialize for TopWords {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (word, count) in &self.0 {
            map.serialize_entry(word, count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TopWords {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TopWordsVisitor;

        impl<'de> Visitor<'de> for TopWordsVisitor {
            type Value = TopWords;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of word to frequency")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<TopWords, A::Error> {
                let mut words = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((word, count)) = access.next_entry::<String, u64>()? {
                    words.push((word, count));
                }
                Ok(TopWords(words))
            }
        }

        deserializer.deserialize_map(TopWordsVisitor)
    }
}

/// Output of one fetch → parse → analyze pass.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScrapedResult {
    pub query: String,
    /// 1-based rank → URL.
    pub links: BTreeMap<usize, String>,
    pub top_words: TopWords,
    pub total_result_count: Option<u64>,
    pub result_limit: usize,
    pub top_words_limit: usize,
}

/// Returned as a value, never persisted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NoRecordsFound {
    pub error: String,
    pub query: String,
}

impl NoRecordsFound {
    pub fn new(query: impl Into<String>) -> Self {
        NoRecordsFound {
            error: NO_RECORDS_FOUND.to_string(),
            query: query.into(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ScrapeOutcome {
    Found(ScrapedResult),
    NoRecords(NoRecordsFound),
}

impl ScrapeOutcome {
    pub fn found(&self) -> Option<&ScrapedResult> {
        match self {
            ScrapeOutcome::Found(result) => Some(result),
            ScrapeOutcome::NoRecords(_) => None,
        }
    }

    pub fn is_no_records(&self) -> bool {
        matches!(self, ScrapeOutcome::NoRecords(_))
    }

    /// Same outcome reported under `query`, for callers sharing one refresh.
    pub fn for_query(mut self, query: &str) -> Self {
        match &mut self {
            ScrapeOutcome::Found(result) => result.query = query.to_string(),
            ScrapeOutcome::NoRecords(none) => none.query = query.to_string(),
        }
        self
    }
}

/// Persisted result, one per (requester_identity, normalized_query).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CacheRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub requester_identity: String,
    pub normalized_query: String,
    pub total_result_count: Option<u64>,
    /// JSON-encoded `ScrapedResult::links`.
    pub links: String,
    /// JSON-encoded `ScrapedResult::top_words`.
    pub top_words: String,
    pub result_limit: u32,
    pub top_words_limit: u32,
    pub created_at: DateTime,
    pub last_modified_at: DateTime,
}

impl CacheRecord {
    pub fn new(
        requester_identity: String,
        result: &ScrapedResult,
        now: DateTime,
    ) -> serde_json::Result<CacheRecord> {
        let fields = CacheRecordUpdate::from_result(result, now)?;
        Ok(CacheRecord {
            id: ObjectId::new(),
            requester_identity,
            normalized_query: normalize_query(&result.query),
            total_result_count: fields.total_result_count,
            links: fields.links,
            top_words: fields.top_words,
            result_limit: fields.result_limit,
            top_words_limit: fields.top_words_limit,
            created_at: now,
            last_modified_at: now,
        })
    }

    /// Overwrite every non-key field, keeping `id` and `created_at`.
    pub fn apply(&mut self, update: &CacheRecordUpdate) {
        self.total_result_count = update.total_result_count;
        self.links = update.links.clone();
        self.top_words = update.top_words.clone();
        self.result_limit = update.result_limit;
        self.top_words_limit = update.top_words_limit;
        self.last_modified_at = update.last_modified_at;
    }

    /// The stored result; `query` is reported in its normalized form.
    pub fn to_result(&self) -> serde_json::Result<ScrapedResult> {
        Ok(ScrapedResult {
            query: self.normalized_query.clone(),
            links: serde_json::from_str(&self.links)?,
            top_words: serde_json::from_str(&self.top_words)?,
            total_result_count: self.total_result_count,
            result_limit: self.result_limit as usize,
            top_words_limit: self.top_words_limit as usize,
        })
    }
}

/// The fields a refresh rewrites.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CacheRecordUpdate {
    pub total_result_count: Option<u64>,
    pub links: String,
    pub top_words: String,
    pub result_limit: u32,
    pub top_words_limit: u32,
    pub last_modified_at: DateTime,
}

impl CacheRecordUpdate {
    pub fn from_result(result: &ScrapedResult, now: DateTime) -> serde_json::Result<Self> {
        Ok(CacheRecordUpdate {
            total_result_count: result.total_result_count,
            links: serde_json::to_string(&result.links)?,
            top_words: serde_json::to_string(&result.top_words)?,
            result_limit: clamp_u32(result.result_limit),
            top_words_limit: clamp_u32(result.top_words_limit),
            last_modified_at: now,
        })
    }
}

fn clamp_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> ScrapedResult {
        ScrapedResult {
            query: "Rust Lang".into(),
            links: BTreeMap::from([
                (1, "https://www.rust-lang.org/".to_string()),
                (2, "https://doc.rust-lang.org/book/".to_string()),
            ]),
            top_words: TopWords(vec![
                ("rust".into(), 5),
                ("language".into(), 3),
                ("book".into(), 3),
            ]),
            total_result_count: Some(1_230_000),
            result_limit: 20,
            top_words_limit: 10,
        }
    }

    #[test]
    fn top_words_serialize_in_ranking_order() {
        let words = TopWords(vec![("zeta".into(), 3), ("alpha".into(), 2)]);
        let json = serde_json::to_string(&words).unwrap();
        assert_eq!(json, r#"{"zeta":3,"alpha":2}"#);
        let back: TopWords = serde_json::from_str(&json).unwrap();
        assert_eq!(back.words(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn links_serialize_with_rank_keys() {
        let json = serde_json::to_string(&sample_result().links).unwrap();
        assert_eq!(
            json,
            r#"{"1":"https://www.rust-lang.org/","2":"https://doc.rust-lang.org/book/"}"#
        );
    }

    #[test]
    fn record_keeps_stored_result_intact() {
        let now = DateTime::now();
        let result = sample_result();
        let record = CacheRecord::new("10.0.0.1".into(), &result, now).unwrap();
        assert_eq!(record.normalized_query, "rust lang");
        assert_eq!(record.created_at, now);
        assert_eq!(record.last_modified_at, now);

        let restored = record.to_result().unwrap();
        assert_eq!(restored.links, result.links);
        assert_eq!(restored.top_words, result.top_words);
        assert_eq!(restored.total_result_count, Some(1_230_000));
    }

    #[test]
    fn apply_preserves_identity_and_created_at() {
        let created = DateTime::from_millis(1_000);
        let mut record = CacheRecord::new("10.0.0.1".into(), &sample_result(), created).unwrap();
        let id = record.id;

        let mut newer = sample_result();
        newer.total_result_count = Some(7);
        let update = CacheRecordUpdate::from_result(&newer, DateTime::from_millis(50_000)).unwrap();
        record.apply(&update);

        assert_eq!(record.id, id);
        assert_eq!(record.created_at, created);
        assert_eq!(record.last_modified_at, DateTime::from_millis(50_000));
        assert_eq!(record.total_result_count, Some(7));
    }

    #[test]
    fn no_records_shape() {
        let outcome = ScrapeOutcome::NoRecords(NoRecordsFound::new("asdfgh"));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "error": "No records found", "query": "asdfgh" })
        );
        assert!(outcome.is_no_records());
        assert!(outcome.found().is_none());
    }

    #[test]
    fn request_defaults_and_normalization() {
        let req = SearchRequest::new("  Hello World ", "127.0.0.1");
        assert_eq!(req.result_limit, DEFAULT_RESULT_LIMIT);
        assert_eq!(req.top_words_limit, DEFAULT_TOP_WORDS_LIMIT);
        assert_eq!(req.normalized_query(), "hello world");
    }
}
