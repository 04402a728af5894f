//! Global vocabulary: document frequency and IDF per term.

use crate::table::{StrTable, TermMap};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VocabEntry {
    /// Number of documents containing the term.
    pub doc_frequency: u32,
    /// `log2(N / doc_frequency)`, valid once `compute_idf` has run.
    pub idf: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    terms: StrTable<VocabEntry>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self { terms: StrTable::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { terms: StrTable::with_capacity(capacity) }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Bucket count of the underlying table.
    pub fn capacity(&self) -> usize {
        self.terms.capacity()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms.contains(term)
    }

    pub fn entry(&self, term: &str) -> Option<&VocabEntry> {
        self.terms.get(term)
    }

    /// IDF for `term`, `None` for a term never seen in the corpus.
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.terms.get(term).map(|e| e.idf)
    }

    pub fn doc_frequency(&self, term: &str) -> Option<u32> {
        self.terms.get(term).map(|e| e.doc_frequency)
    }

    /// Adds `term` with zeroed counters. No-op if it is already known.
    pub fn insert_term(&mut self, term: &str) -> bool {
        self.terms.set_if_absent(term, VocabEntry::default())
    }

    /// Stores a fully formed entry, replacing any previous one.
    pub fn insert_entry(&mut self, term: &str, entry: VocabEntry) {
        self.terms.set(term, entry);
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> + '_ {
        self.terms.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VocabEntry)> + '_ {
        self.terms.iter()
    }

    /// Set union with document frequencies summed. Used to fold per-shard counts
    /// into the global table: shards are disjoint, so sums are exact.
    pub fn merge_counts(&mut self, other: &Vocabulary) {
        for (term, entry) in other.terms.iter() {
            let dst = self.terms.get_or_insert_with(term, VocabEntry::default);
            dst.doc_frequency += entry.doc_frequency;
        }
    }
}

/// Every distinct term of `docs`, counters zeroed.
pub fn collect_vocabulary(docs: &[TermMap]) -> Vocabulary {
    let mut vocab = Vocabulary::new();
    for doc in docs {
        for term in doc.keys() {
            vocab.insert_term(term);
        }
    }
    vocab
}

/// Recounts, for every term of `vocab`, how many of `docs` contain it.
///
/// Walks each document once and bumps the counter of every term it holds, so the
/// cost is proportional to the number of (document, term) pairs rather than
/// `vocab.len() * docs.len()`. Presence counts, not occurrences. Terms of `docs`
/// missing from `vocab` are ignored.
pub fn compute_document_frequency(vocab: &mut Vocabulary, docs: &[TermMap]) {
    for entry in vocab.terms.values_mut() {
        entry.doc_frequency = 0;
    }
    for doc in docs {
        for term in doc.keys() {
            if let Some(entry) = vocab.terms.get_mut(term) {
                entry.doc_frequency += 1;
            }
        }
    }
}

/// Fills in `idf` for every term from its document frequency.
pub fn compute_idf(vocab: &mut Vocabulary, total_docs: usize) {
    for entry in vocab.terms.values_mut() {
        entry.idf = idf(total_docs, entry.doc_frequency);
    }
}

/// `log2(total_docs / doc_frequency)`, or `0.0` when the term occurs nowhere.
#[inline]
pub fn idf(total_docs: usize, doc_frequency: u32) -> f64 {
    if doc_frequency == 0 || total_docs == 0 {
        return 0.0;
    }
    (total_docs as f64 / doc_frequency as f64).log2()
}

/// `(1 + log2(freq)) * idf`; a non-positive frequency weighs nothing.
#[inline]
pub fn tf_idf_weight(freq: f64, idf: f64) -> f64 {
    if freq > 0.0 {
        (1.0 + freq.log2()) * idf
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(terms: &[&str]) -> TermMap {
        let mut m = TermMap::unallocated();
        for t in terms {
            m.increment(t, 1.0);
        }
        m
    }

    #[test]
    fn vocabulary_insert_is_idempotent() {
        let mut v = Vocabulary::new();
        assert!(v.insert_term("cat"));
        v.insert_entry("cat", VocabEntry { doc_frequency: 3, idf: 1.5 });
        assert!(!v.insert_term("cat"));
        assert_eq!(v.len(), 1);
        assert_eq!(v.doc_frequency("cat"), Some(3));
        assert_eq!(v.idf("cat"), Some(1.5));
    }

    #[test]
    fn document_frequency_counts_presence_not_occurrences() {
        let docs = vec![doc(&["cat", "cat", "cat"]), doc(&["cat", "dog"]), doc(&[])];
        let mut v = collect_vocabulary(&docs);
        compute_document_frequency(&mut v, &docs);
        assert_eq!(v.doc_frequency("cat"), Some(2));
        assert_eq!(v.doc_frequency("dog"), Some(1));
        // counters are reset before each recount
        compute_document_frequency(&mut v, &docs);
        assert_eq!(v.doc_frequency("cat"), Some(2));
    }

    #[test]
    fn idf_of_rare_and_ubiquitous_terms() {
        let mut docs: Vec<TermMap> = (0..10).map(|_| doc(&["common"])).collect();
        docs[3].increment("rare", 1.0);
        let mut v = collect_vocabulary(&docs);
        compute_document_frequency(&mut v, &docs);
        compute_idf(&mut v, docs.len());
        assert!((v.idf("rare").unwrap() - 10f64.log2()).abs() < 1e-12);
        assert_eq!(v.idf("common"), Some(0.0));
    }

    #[test]
    fn idf_guards_against_zero() {
        assert_eq!(idf(10, 0), 0.0);
        assert_eq!(idf(0, 0), 0.0);
        let mut v = Vocabulary::new();
        v.insert_term("ghost");
        compute_idf(&mut v, 5);
        let w = v.idf("ghost").unwrap();
        assert!(w.is_finite());
        assert_eq!(w, 0.0);
    }

    #[test]
    fn tf_idf_weight_uses_log_scaled_tf() {
        assert_eq!(tf_idf_weight(4.0, 2.0), 6.0);
        assert_eq!(tf_idf_weight(1.0, 2.0), 2.0);
        assert_eq!(tf_idf_weight(0.0, 2.0), 0.0);
    }

    #[test]
    fn merge_counts_sums_frequencies() {
        let mut a = Vocabulary::new();
        a.insert_entry("x", VocabEntry { doc_frequency: 2, idf: 0.0 });
        let mut b = Vocabulary::new();
        b.insert_entry("x", VocabEntry { doc_frequency: 3, idf: 0.0 });
        b.insert_entry("y", VocabEntry { doc_frequency: 1, idf: 0.0 });
        a.merge_counts(&b);
        assert_eq!(a.doc_frequency("x"), Some(5));
        assert_eq!(a.doc_frequency("y"), Some(1));
    }
}
