//! Parallel TF-IDF indexing and cosine-similarity search over a document table.

pub mod config;
pub mod error;
pub mod index;
pub mod indexer;
pub mod persist;
pub mod query;
pub mod similarity;
pub mod store;
pub mod table;
pub mod tokenizer;
pub mod vocabulary;

pub use config::BuildConfig;
pub use error::{Error, Result};
pub use index::{DocId, DocumentIndex, Model};
pub use indexer::{partition, ParallelIndexer, ShardRange};
pub use query::QueryVector;
pub use similarity::Hit;
pub use store::{DocumentStore, MemoryStore, SqliteStore};
pub use table::{StrTable, TermMap};
pub use tokenizer::{EnglishTokenizer, Stopwords, Tokenizer};
pub use vocabulary::{VocabEntry, Vocabulary};
