use criterion::{criterion_group, criterion_main, Criterion};
use tfidf_core::{BuildConfig, EnglishTokenizer, MemoryStore, ParallelIndexer, TermMap, Tokenizer};

const TEXT: &str = "Rust is a multi-paradigm, general-purpose programming language that \
emphasizes performance, type safety, and concurrency. It enforces memory safety, meaning \
that all references point to valid memory, without a garbage collector.";

fn corpus(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{TEXT} document{i} topic{}", i % 17)).collect()
}

fn bench_tokenize(c: &mut Criterion) {
    let tok = EnglishTokenizer::default();
    c.bench_function("tokenize_paragraph", |b| b.iter(|| tok.terms(TEXT)));
}

fn bench_term_map(c: &mut Criterion) {
    let keys: Vec<String> = (0..10_000).map(|i| format!("term{i}")).collect();
    c.bench_function("term_map_insert_10k", |b| {
        b.iter(|| {
            let mut m = TermMap::with_capacity(16);
            for k in &keys {
                m.increment(k, 1.0);
            }
            m
        })
    });
}

fn bench_build(c: &mut Criterion) {
    let store = MemoryStore::new(corpus(2_000));
    let tok = EnglishTokenizer::default();
    for threads in [1, 4] {
        c.bench_function(&format!("build_2k_docs_{threads}_threads"), |b| {
            b.iter(|| {
                ParallelIndexer::new(&store, &tok, BuildConfig::new("bench").threads(threads))
                    .build()
                    .unwrap()
            })
        });
    }
}

criterion_group!(benches, bench_tokenize, bench_term_map, bench_build);
criterion_main!(benches);
