//! Cosine scoring of a query against every document, and top-k ranking.

use std::cmp::Ordering;
use std::thread;

use crate::index::DocId;
use crate::query::QueryVector;
use crate::table::TermMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub doc_id: DocId,
    pub score: f64,
}

/// `dot(q, d) / (|q| * |d|)`, or `0.0` when either norm is zero.
pub fn cosine_similarity(query: &TermMap, query_norm: f64, doc: &TermMap, doc_norm: f64) -> f64 {
    if query_norm <= 0.0 || doc_norm <= 0.0 {
        return 0.0;
    }
    let dot: f64 = query
        .iter()
        .filter_map(|(term, qw)| doc.get(term).map(|dw| qw * dw))
        .sum();
    dot / (query_norm * doc_norm)
}

/// Similarity of `query` with every document, indexed by document id.
///
/// Documents are split into contiguous shards, one per thread; each thread writes
/// only its own slice of the output.
pub fn compute_similarities(query: &QueryVector, docs: &[TermMap], norms: &[f64], threads: usize) -> Vec<f64> {
    debug_assert_eq!(docs.len(), norms.len());
    let mut scores = vec![0.0; docs.len()];
    if query.is_empty() || query.norm <= 0.0 || docs.is_empty() {
        return scores;
    }
    let threads = threads.clamp(1, docs.len());
    let chunk = docs.len().div_ceil(threads);
    if threads == 1 {
        score_shard(query, docs, norms, &mut scores);
        return scores;
    }
    thread::scope(|s| {
        for ((out, docs), norms) in scores
            .chunks_mut(chunk)
            .zip(docs.chunks(chunk))
            .zip(norms.chunks(chunk))
        {
            s.spawn(move || score_shard(query, docs, norms, out));
        }
    });
    scores
}

fn score_shard(query: &QueryVector, docs: &[TermMap], norms: &[f64], out: &mut [f64]) {
    for ((doc, &norm), slot) in docs.iter().zip(norms).zip(out.iter_mut()) {
        *slot = cosine_similarity(&query.weights, query.norm, doc, norm);
    }
}

/// Best `k` documents: score descending, ties broken by ascending doc id.
pub fn rank_top_k(scores: &[f64], k: usize) -> Vec<Hit> {
    let mut hits: Vec<Hit> = scores
        .iter()
        .enumerate()
        .map(|(i, &score)| Hit { doc_id: i as DocId, score })
        .collect();
    hits.sort_by(|a, b| match b.score.total_cmp(&a.score) {
        Ordering::Equal => a.doc_id.cmp(&b.doc_id),
        other => other,
    });
    hits.truncate(k);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(pairs: &[(&str, f64)]) -> TermMap {
        let mut m = TermMap::unallocated();
        for (k, v) in pairs {
            m.set(k, *v);
        }
        m
    }

    #[test]
    fn self_similarity_is_one() {
        let v = vector(&[("a", 1.5), ("b", 0.25), ("c", 3.0)]);
        let n = v.norm();
        assert!((cosine_similarity(&v, n, &v, n) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn similarity_is_bounded() {
        let a = vector(&[("a", 1.0), ("b", 2.0)]);
        let b = vector(&[("b", 5.0), ("c", 0.5)]);
        let s = cosine_similarity(&a, a.norm(), &b, b.norm());
        assert!((0.0..=1.0).contains(&s));
        assert!(s > 0.0);
    }

    #[test]
    fn zero_norms_score_zero() {
        let a = vector(&[("a", 1.0)]);
        let empty = TermMap::unallocated();
        assert_eq!(cosine_similarity(&a, 1.0, &empty, 0.0), 0.0);
        assert_eq!(cosine_similarity(&empty, 0.0, &a, 1.0), 0.0);
    }

    #[test]
    fn threaded_scores_match_single_threaded() {
        let docs: Vec<TermMap> = (0..37)
            .map(|i| vector(&[("a", i as f64), ("b", 1.0 + (i % 3) as f64)]))
            .collect();
        let norms: Vec<f64> = docs.iter().map(TermMap::norm).collect();
        let q = vector(&[("a", 1.0), ("b", 2.0)]);
        let query = QueryVector { norm: q.norm(), weights: q };
        let one = compute_similarities(&query, &docs, &norms, 1);
        let many = compute_similarities(&query, &docs, &norms, 5);
        assert_eq!(one, many);
    }

    #[test]
    fn empty_query_scores_all_zero() {
        let docs = vec![vector(&[("a", 1.0)])];
        let scores = compute_similarities(&QueryVector::default(), &docs, &[1.0], 4);
        assert_eq!(scores, vec![0.0]);
    }

    #[test]
    fn ranking_breaks_ties_by_doc_id() {
        let hits = rank_top_k(&[0.5, 0.9, 0.5, 0.1], 3);
        let ids: Vec<DocId> = hits.iter().map(|h| h.doc_id).collect();
        assert_eq!(ids, vec![1, 0, 2]);
        assert_eq!(rank_top_k(&[0.3], 10).len(), 1);
    }
}
