use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

use crate::error::Result;

lazy_static! {
    static ref EDGE_PUNCT: Regex =
        Regex::new(r"^[^\p{L}\p{N}]+|[^\p{L}\p{N}]+$").expect("valid regex");
}

const ENGLISH_STOPWORDS: &[&str] = &[
    "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
    "be","because","been","before","being","below","between","both","but","by",
    "can","can't","cannot","could","couldn't",
    "did","didn't","do","does","doesn't","doing","don't","down","during",
    "each","few","for","from","further",
    "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
    "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
    "let's","me","more","most","mustn't","my","myself",
    "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
    "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
    "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
    "under","until","up","very",
    "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
    "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves",
];

/// Text analysis used identically at build time and at query time.
pub trait Tokenizer: Send + Sync {
    /// Splits `text` into lowercase words.
    fn tokenize(&self, text: &str) -> Vec<String>;

    fn is_stopword(&self, word: &str) -> bool;

    fn stem(&self, word: &str) -> String;

    /// Full pipeline: tokenize, drop stopwords and single-character words, stem.
    fn terms(&self, text: &str) -> Vec<String> {
        self.tokenize(text)
            .into_iter()
            .map(|w| w.to_lowercase())
            .filter(|w| w.chars().count() > 1 && !self.is_stopword(w))
            .map(|w| self.stem(&w))
            .filter(|w| !w.is_empty())
            .collect()
    }
}

/// Immutable stopword set, loaded once and shared between workers.
#[derive(Debug, Clone, Default)]
pub struct Stopwords {
    words: HashSet<String>,
}

impl Stopwords {
    pub fn english() -> Self {
        Self::from_words(ENGLISH_STOPWORDS.iter().copied())
    }

    pub fn from_words<'a>(words: impl IntoIterator<Item = &'a str>) -> Self {
        Self { words: words.into_iter().map(str::to_lowercase).collect() }
    }

    /// One word per line; surrounding whitespace trimmed, blank lines skipped.
    pub fn parse(list: &str) -> Self {
        Self::from_words(list.lines().map(str::trim).filter(|l| !l.is_empty()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let list = fs::read_to_string(path.as_ref())?;
        let words = Self::parse(&list);
        tracing::debug!(path = %path.as_ref().display(), count = words.len(), "loaded stopwords");
        Ok(words)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Whitespace tokenizer with NFKC normalization, edge-punctuation stripping,
/// stopword filtering and optional Snowball English stemming.
pub struct EnglishTokenizer {
    stopwords: Arc<Stopwords>,
    stemmer: Option<Stemmer>,
}

impl EnglishTokenizer {
    pub fn new(stopwords: Arc<Stopwords>) -> Self {
        Self { stopwords, stemmer: Some(Stemmer::create(Algorithm::English)) }
    }

    /// Same pipeline with stemming disabled.
    pub fn without_stemming(stopwords: Arc<Stopwords>) -> Self {
        Self { stopwords, stemmer: None }
    }
}

impl Default for EnglishTokenizer {
    fn default() -> Self {
        Self::new(Arc::new(Stopwords::english()))
    }
}

impl Tokenizer for EnglishTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let normalized = text.nfkc().collect::<String>().to_lowercase();
        normalized
            .split_whitespace()
            .map(|raw| EDGE_PUNCT.replace_all(raw, "").into_owned())
            .filter(|w| !w.is_empty())
            .collect()
    }

    fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }

    fn stem(&self, word: &str) -> String {
        match &self.stemmer {
            Some(stemmer) => stemmer.stem(word).into_owned(),
            None => word.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = EnglishTokenizer::default().terms("Running, runner's run!");
        assert!(t.iter().any(|w| w == "run"));
    }

    #[test]
    fn drops_single_characters() {
        let t = EnglishTokenizer::without_stemming(Arc::new(Stopwords::default()));
        assert_eq!(t.terms("x marks a spot"), vec!["marks", "spot"]);
    }

    #[test]
    fn parse_skips_blank_lines() {
        let s = Stopwords::parse("the\n\n  and \nOf\n");
        assert_eq!(s.len(), 3);
        assert!(s.contains("and"));
        assert!(s.contains("of"));
    }
}
