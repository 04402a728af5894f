use std::sync::Arc;
use tfidf_core::{EnglishTokenizer, Stopwords, Tokenizer};

#[test]
fn it_normalizes_and_stems() {
    let words = EnglishTokenizer::default().terms("Running Runners RUN! The café's menu.");
    // Stemming to "run" should appear
    assert!(words.contains(&"run".to_string()));
    // possessive is stripped by the stemmer, the trailing period by the tokenizer
    assert!(words.iter().any(|w| w.starts_with("caf") && !w.contains('\'')));
    assert!(words.contains(&"menu".to_string()));
}

#[test]
fn it_filters_stopwords() {
    let words = EnglishTokenizer::default().terms("The quick brown fox and the lazy dog");
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
}

#[test]
fn stopwords_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stopwords.txt");
    std::fs::write(&path, "fox\n\nDOG\n").unwrap();
    let tok = EnglishTokenizer::without_stemming(Arc::new(Stopwords::load(&path).unwrap()));
    assert_eq!(tok.terms("the fox chased a dog"), vec!["the", "chased"]);
}

#[test]
fn punctuation_is_stripped_from_word_edges() {
    let tok = EnglishTokenizer::without_stemming(Arc::new(Stopwords::default()));
    assert_eq!(tok.terms("(hello), world!! don't"), vec!["hello", "world", "don't"]);
}
