use std::collections::{HashMap, HashSet};

use crate::data_models::TopWords;
use crate::parser::ResultEntry;

/// Symbols stripped from titles and snippets before tokenizing.
pub const DEFAULT_ODD_CHARS: &[char] = &[
    ':', '"', '“', '”', '—', '+', '-', '„', ',', '(', ')', '.',
];

/// Polish and German words filtered on top of the English list.
const EXTRA_STOP_WORDS: &[&str] = &[
    // pl
    "i", "w", "na", "z", "do", "nie", "się", "jest", "to", "że", "o", "jak", "co", "od",
    "po", "za", "dla", "oraz", "lub", "czy", "ale", "jego", "jej", "ich", "tak", "już",
    "przez", "przy", "który", "która", "które", "są", "być", "tym", "ten", "ta", "te",
    "tylko", "może", "ze", "we", "pod", "nad", "bez", "też", "także",
    // de
    "der", "die", "das", "und", "ist", "nicht", "ein", "eine", "einen", "mit", "von",
    "zu", "den", "dem", "des", "im", "auf", "für", "sich", "auch", "es", "wie", "oder",
    "bei", "aus", "nach", "sie", "wir", "ihr", "werden", "wird", "sind", "noch",
];

/// Odd chars and stopwords used by [`TextAnalyzer::from_config`].
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub odd_chars: Vec<char>,
    /// Matched case-insensitively.
    pub stop_words: HashSet<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        let mut stop_words: HashSet<String> = stop_words::get(stop_words::LANGUAGE::English)
            .into_iter()
            .map(|x| x.to_string().to_lowercase())
            .collect();
        stop_words.extend(EXTRA_STOP_WORDS.iter().map(|w| w.to_string()));

        Self {
            odd_chars: DEFAULT_ODD_CHARS.to_vec(),
            stop_words,
        }
    }
}

impl AnalyzerConfig {
    pub fn with_stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stop_words = words
            .into_iter()
            .map(|w| w.as_ref().to_lowercase())
            .collect();
        self
    }
}

/// A character filter receives the original text and may add, remove or change characters.
pub trait CharacterFilter: Send + Sync {
    fn filter(&self, text: String) -> String;
}

/// Removes a fixed set of punctuation and symbol characters.
pub struct OddCharFilter {
    odd_chars: HashSet<char>,
}

impl OddCharFilter {
    pub fn new(odd_chars: &[char]) -> Self {
        Self {
            odd_chars: odd_chars.iter().copied().collect(),
        }
    }
}

impl Default for OddCharFilter {
    fn default() -> Self {
        Self::new(DEFAULT_ODD_CHARS)
    }
}

impl CharacterFilter for OddCharFilter {
    fn filter(&self, mut text: String) -> String {
        text.retain(|c| !self.odd_chars.contains(&c));
        text
    }
}

/// A tokenizer breaks text up into individual tokens.
/// For instance, a whitespace tokenizer breaks text into tokens whenever it sees any whitespace.
/// It would convert the text "Quick brown fox!" into the terms [Quick, brown, fox!].
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: String) -> Vec<String>;
}

pub struct WhiteSpaceTokenizer;

impl Tokenizer for WhiteSpaceTokenizer {
    fn tokenize(&self, text: String) -> Vec<String> {
        text.split_whitespace()
            .map(|w| w.to_string())
            .collect::<Vec<String>>()
    }
}

/// A token filter receives the token stream and may add, remove, or change tokens.
pub trait TokenFilter: Send + Sync {
    fn filter(&self, tokens: Vec<String>) -> Vec<String>;
}

pub struct LowerCaseTokenFilter;

impl TokenFilter for LowerCaseTokenFilter {
    fn filter(&self, tokens: Vec<String>) -> Vec<String> {
        tokens.into_iter().map(|t| t.to_lowercase()).collect()
    }
}

/// Drops tokens shorter than `min_length` characters.
pub struct MinLengthTokenFilter {
    min_length: usize,
}

impl MinLengthTokenFilter {
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }
}

impl Default for MinLengthTokenFilter {
    fn default() -> Self {
        Self { min_length: 2 }
    }
}

impl TokenFilter for MinLengthTokenFilter {
    fn filter(&self, mut tokens: Vec<String>) -> Vec<String> {
        tokens.retain(|t| t.chars().count() >= self.min_length);
        tokens
    }
}

/// Filters out tokens made only of digits ("42", "2024").
pub struct NumericTokenFilter;

impl TokenFilter for NumericTokenFilter {
    fn filter(&self, mut tokens: Vec<String>) -> Vec<String> {
        tokens.retain(|t| !t.chars().all(char::is_numeric));
        tokens
    }
}

pub struct StopWordTokenFilter {
    stop_words: HashSet<String>,
}

impl StopWordTokenFilter {
    pub fn new(stop_words: HashSet<String>) -> Self {
        Self { stop_words }
    }
}

impl TokenFilter for StopWordTokenFilter {
    fn filter(&self, mut tokens: Vec<String>) -> Vec<String> {
        tokens.retain(|t| !self.stop_words.contains(&t.to_lowercase()));
        tokens
    }
}

/// Insertion-ordered word counter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordFrequencies {
    counts: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl WordFrequencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, word: String) {
        match self.index.get(&word) {
            Some(&i) => self.counts[i].1 += 1,
            None => {
                self.index.insert(word.clone(), self.counts.len());
                self.counts.push((word, 1));
            }
        }
    }

    pub fn extend<I: IntoIterator<Item = String>>(&mut self, words: I) {
        for word in words {
            self.add(word);
        }
    }

    pub fn get(&self, word: &str) -> Option<u64> {
        self.index.get(word).map(|&i| self.counts[i].1)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The `limit` most frequent words; ties keep first-insertion order.
    pub fn top(&self, limit: usize) -> TopWords {
        let mut ranked = self.counts.clone();
        // sort_by is stable
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(limit);
        TopWords(ranked)
    }
}

/// Pure text analysis pipeline, no I/O.
pub struct TextAnalyzer {
    char_filters: Vec<Box<dyn CharacterFilter>>,
    tokenizer: Box<dyn Tokenizer>,
    token_filters: Vec<Box<dyn TokenFilter>>,
}

impl TextAnalyzer {
    pub fn new(
        char_filters: Vec<Box<dyn CharacterFilter>>,
        tokenizer: Box<dyn Tokenizer>,
        token_filters: Vec<Box<dyn TokenFilter>>,
    ) -> Self {
        Self {
            char_filters,
            tokenizer,
            token_filters,
        }
    }

    /// The result-page analyzer: odd chars out, lowercase, length, numeric and stopword filters.
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self::new(
            vec![Box::new(OddCharFilter::new(&config.odd_chars))],
            Box::new(WhiteSpaceTokenizer),
            vec![
                Box::new(LowerCaseTokenFilter),
                Box::new(MinLengthTokenFilter::default()),
                Box::new(NumericTokenFilter),
                Box::new(StopWordTokenFilter::new(config.stop_words.clone())),
            ],
        )
    }

    pub fn char_filter(&self, mut content: String) -> String {
        for filter in self.char_filters.iter() {
            content = filter.filter(content);
        }
        content
    }

    pub fn tokenize(&self, content: String) -> Vec<String> {
        self.tokenizer.tokenize(content)
    }

    pub fn token_filter(&self, mut tokens: Vec<String>) -> Vec<String> {
        for filter in self.token_filters.iter() {
            tokens = filter.filter(tokens);
        }
        tokens
    }

    /// Analyzes raw text and returns the surviving tokens in order.
    pub fn analyze(&self, raw_content: &str) -> Vec<String> {
        let content = self.char_filter(raw_content.to_string());
        let tokens = self.tokenize(content);
        self.token_filter(tokens)
    }

    /// Counts snippet tokens, then title tokens, for every entry in order.
    pub fn word_frequencies(&self, entries: &[ResultEntry]) -> WordFrequencies {
        let mut frequencies = WordFrequencies::new();
        for entry in entries {
            frequencies.extend(self.analyze(&entry.snippet));
            frequencies.extend(self.analyze(&entry.title));
        }
        frequencies
    }
}

impl Default for TextAnalyzer {
    fn default() -> Self {
        Self::from_config(&AnalyzerConfig::default())
    }
}
