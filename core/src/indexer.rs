//! Two-phase parallel index build.
//!
//! Every worker owns a contiguous range of document ids and the matching slices of
//! the document index and norm array, so per-document data is never locked.
//!
//! Phase 1: fetch the range, tokenize, count terms into the worker's own slots and
//! count document frequencies for the shard. The shard vocabulary is folded into
//! the global one under a mutex.
//!
//! Between phases all workers meet at a barrier. The barrier leader turns the
//! global counts into IDF values and publishes the frozen vocabulary; a second
//! barrier holds everybody until that is done.
//!
//! Phase 2: rewrite counts into TF-IDF weights and compute norms, again on the
//! worker's own slices, reading the published vocabulary without locks.
//!
//! A failing worker raises a shared flag but still passes both barriers. The leader
//! then publishes nothing, every worker skips phase 2 and the build returns the
//! first failure. No partial model escapes.

use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Barrier, OnceLock};
use std::thread;

use crate::config::BuildConfig;
use crate::error::{Error, Result};
use crate::index::{apply_tf_idf, count_terms, document_norms, DocumentIndex, Model};
use crate::store::DocumentStore;
use crate::table::TermMap;
use crate::tokenizer::Tokenizer;
use crate::vocabulary::{collect_vocabulary, compute_document_frequency, compute_idf, Vocabulary};

/// Half-open range `[start, end)` of document ids owned by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardRange {
    pub worker: usize,
    pub start: usize,
    pub end: usize,
}

impl ShardRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Splits `[0, total)` into `workers` contiguous ranges whose sizes differ by at
/// most one; the first `total % workers` ranges get the extra id.
pub fn partition(total: usize, workers: usize) -> Vec<ShardRange> {
    let workers = workers.max(1);
    let base = total / workers;
    let rem = total % workers;
    (0..workers)
        .map(|i| {
            let start = i * base + i.min(rem);
            let end = start + base + usize::from(i < rem);
            ShardRange { worker: i, start, end }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
struct WorkerReport {
    docs: usize,
    terms: usize,
}

struct Shared {
    barrier: Barrier,
    vocabulary: Mutex<Vocabulary>,
    published: OnceLock<Vocabulary>,
    failed: AtomicBool,
}

pub struct ParallelIndexer<'a, S: ?Sized, T: ?Sized> {
    store: &'a S,
    tokenizer: &'a T,
    config: BuildConfig,
    publish: fn(&Shared, usize),
}

impl<'a, S, T> ParallelIndexer<'a, S, T>
where
    S: DocumentStore + ?Sized,
    T: Tokenizer + ?Sized,
{
    pub fn new(store: &'a S, tokenizer: &'a T, config: BuildConfig) -> Self {
        Self { store, tokenizer, config, publish: Self::publish_idf }
    }

    pub fn build(&self) -> Result<Model> {
        self.config.validate()?;
        let available = usize::try_from(self.store.row_count(&self.config.table)?).unwrap_or(0);
        let total = self.config.limit.map_or(available, |limit| limit.min(available));
        let ranges = partition(total, self.config.threads);
        tracing::info!(total, threads = ranges.len(), table = %self.config.table, "building index");

        let mut index = DocumentIndex::with_len(total);
        let mut norms = vec![0.0; total];
        let shared = Shared {
            barrier: Barrier::new(ranges.len()),
            vocabulary: Mutex::new(Vocabulary::new()),
            published: OnceLock::new(),
            failed: AtomicBool::new(false),
        };

        let results: Vec<Result<WorkerReport>> = thread::scope(|s| {
            let mut docs_rest = index.docs_mut();
            let mut norms_rest = norms.as_mut_slice();
            let mut handles = Vec::with_capacity(ranges.len());
            for &range in &ranges {
                let (docs, d_tail) = std::mem::take(&mut docs_rest).split_at_mut(range.len());
                let (norms, n_tail) = std::mem::take(&mut norms_rest).split_at_mut(range.len());
                docs_rest = d_tail;
                norms_rest = n_tail;
                let shared = &shared;
                handles.push(s.spawn(move || self.run_worker(shared, range, total, docs, norms)));
            }
            handles
                .into_iter()
                .enumerate()
                .map(|(worker, h)| h.join().unwrap_or(Err(Error::WorkerPanicked(worker))))
                .collect()
        });

        let mut docs_indexed = 0;
        for result in results {
            docs_indexed += result?.docs;
        }
        let vocabulary = shared.published.into_inner().ok_or_else(|| Error::Worker {
            worker: 0,
            message: "vocabulary was never published".into(),
        })?;

        tracing::info!(num_docs = total, docs_indexed, num_terms = vocabulary.len(), "index build complete");
        Ok(Model { index, vocabulary, norms })
    }

    fn run_worker(
        &self,
        shared: &Shared,
        range: ShardRange,
        total: usize,
        docs: &mut [TermMap],
        norms: &mut [f64],
    ) -> Result<WorkerReport> {
        tracing::debug!(worker = range.worker, start = range.start, end = range.end, "worker started");

        let phase_one = panic::catch_unwind(AssertUnwindSafe(|| -> Result<WorkerReport> {
            let (local, report) = self.index_shard(shared, range, docs)?;
            shared.vocabulary.lock().merge_counts(&local);
            Ok(report)
        }))
        .unwrap_or(Err(Error::WorkerPanicked(range.worker)));
        let mut report = phase_one.inspect_err(|e| {
            shared.failed.store(true, Ordering::Release);
            tracing::warn!(worker = range.worker, error = %e, "worker failed, aborting build");
        });

        // nothing between the two barriers may unwind, or the others wait forever
        if shared.barrier.wait().is_leader()
            && panic::catch_unwind(AssertUnwindSafe(|| (self.publish)(shared, total))).is_err()
        {
            shared.failed.store(true, Ordering::Release);
            tracing::warn!(worker = range.worker, "idf publication panicked, aborting build");
            report = report.and(Err(Error::WorkerPanicked(range.worker)));
        }
        shared.barrier.wait();

        let report = report?;
        let Some(vocab) = shared.published.get() else {
            // another worker failed; its error is the one reported
            return Ok(report);
        };
        apply_tf_idf(docs, vocab);
        document_norms(docs, norms);
        tracing::debug!(worker = range.worker, docs = report.docs, terms = report.terms, "worker finished");
        Ok(report)
    }

    fn index_shard(
        &self,
        shared: &Shared,
        range: ShardRange,
        docs: &mut [TermMap],
    ) -> Result<(Vocabulary, WorkerReport)> {
        let mut report = WorkerReport::default();
        if range.is_empty() {
            return Ok((Vocabulary::new(), report));
        }
        let rows = self
            .store
            .fetch_text_range(&self.config.table, range.start as i64, range.end as i64 - 1)
            .map_err(|e| Error::Worker { worker: range.worker, message: e.to_string() })?;

        for (id, text) in rows {
            if shared.failed.load(Ordering::Acquire) {
                break;
            }
            let slot = usize::try_from(id - range.start as i64).ok().filter(|&s| s < docs.len());
            let Some(slot) = slot else {
                tracing::warn!(worker = range.worker, id, "store returned an id outside the shard");
                continue;
            };
            let tf = count_terms(self.tokenizer.terms(&text));
            report.docs += 1;
            report.terms += tf.len();
            docs[slot] = tf;
        }

        let mut local = collect_vocabulary(docs);
        compute_document_frequency(&mut local, docs);
        Ok((local, report))
    }

    fn publish_idf(shared: &Shared, total: usize) {
        if shared.failed.load(Ordering::Acquire) {
            return;
        }
        let mut vocab = std::mem::take(&mut *shared.vocabulary.lock());
        compute_idf(&mut vocab, total);
        tracing::debug!(terms = vocab.len(), total, "published idf table");
        let _ = shared.published.set(vocab);
    }
}
