use crate::query::{process_query, QueryVector};
use crate::similarity::{compute_similarities, rank_top_k, Hit};
use crate::table::TermMap;
use crate::tokenizer::Tokenizer;
use crate::vocabulary::{tf_idf_weight, Vocabulary};

pub type DocId = u32;

/// One term map per document, indexed by document id.
///
/// Maps hold raw term counts after the first build phase and are rewritten in
/// place to TF-IDF weights by the second. Empty documents keep an unallocated map.
#[derive(Debug, Clone, Default)]
pub struct DocumentIndex {
    docs: Vec<TermMap>,
}

impl DocumentIndex {
    /// `num_docs` empty slots.
    pub fn with_len(num_docs: usize) -> Self {
        let mut docs = Vec::with_capacity(num_docs);
        docs.resize_with(num_docs, TermMap::unallocated);
        Self { docs }
    }

    pub fn from_docs(docs: Vec<TermMap>) -> Self {
        Self { docs }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn get(&self, doc_id: DocId) -> Option<&TermMap> {
        self.docs.get(doc_id as usize)
    }

    pub fn docs(&self) -> &[TermMap] {
        &self.docs
    }

    pub fn docs_mut(&mut self) -> &mut [TermMap] {
        &mut self.docs
    }
}

/// Raw term counts for one document.
pub fn count_terms<I, S>(terms: I) -> TermMap
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tf = TermMap::unallocated();
    for term in terms {
        tf.increment(term.as_ref(), 1.0);
    }
    tf
}

/// Rewrites raw counts into TF-IDF weights. Terms unknown to `vocab` get IDF 0.
pub fn apply_tf_idf(docs: &mut [TermMap], vocab: &Vocabulary) {
    for doc in docs.iter_mut() {
        for (term, value) in doc.iter_mut() {
            if *value > 0.0 {
                let idf = vocab.idf(term).unwrap_or(0.0);
                *value = tf_idf_weight(*value, idf);
            }
        }
    }
}

/// Writes the Euclidean norm of `docs[i]` into `norms[i]`.
pub fn document_norms(docs: &[TermMap], norms: &mut [f64]) {
    debug_assert_eq!(docs.len(), norms.len());
    for (doc, norm) in docs.iter().zip(norms.iter_mut()) {
        *norm = doc.norm();
    }
}

/// A finished index: TF-IDF document vectors, the vocabulary with final IDF
/// values and one norm per document. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub index: DocumentIndex,
    pub vocabulary: Vocabulary,
    pub norms: Vec<f64>,
}

impl Model {
    pub fn num_docs(&self) -> usize {
        self.index.len()
    }

    pub fn query<T: Tokenizer + ?Sized>(&self, tokenizer: &T, text: &str) -> QueryVector {
        process_query(tokenizer, text, &self.vocabulary)
    }

    /// Top `k` documents for `text` by cosine similarity, scored on `threads` workers.
    pub fn search<T: Tokenizer + ?Sized>(
        &self,
        tokenizer: &T,
        text: &str,
        k: usize,
        threads: usize,
    ) -> Vec<Hit> {
        let query = self.query(tokenizer, text);
        let scores = compute_similarities(&query, self.index.docs(), &self.norms, threads);
        rank_top_k(&scores, k)
    }
}
