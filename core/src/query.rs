use crate::index::count_terms;
use crate::table::TermMap;
use crate::tokenizer::Tokenizer;
use crate::vocabulary::{tf_idf_weight, Vocabulary};

/// TF-IDF weights of one query plus their Euclidean norm.
#[derive(Debug, Clone, Default)]
pub struct QueryVector {
    pub weights: TermMap,
    pub norm: f64,
}

impl QueryVector {
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Runs `text` through the same pipeline as the documents and weighs each term
/// against the corpus IDF. Terms never seen in the corpus weigh `0.0`.
pub fn process_query<T: Tokenizer + ?Sized>(tokenizer: &T, text: &str, vocab: &Vocabulary) -> QueryVector {
    let counts = count_terms(tokenizer.terms(text));
    let mut weights = TermMap::unallocated();
    for (term, &freq) in counts.iter() {
        if freq <= 0.0 {
            continue;
        }
        let weight = match vocab.idf(term) {
            Some(idf) => tf_idf_weight(freq, idf),
            None => 0.0,
        };
        weights.set(term, weight);
    }
    let norm = weights.norm();
    tracing::debug!(terms = weights.len(), norm, "processed query");
    QueryVector { weights, norm }
}
