use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the indexer, the document store and model persistence.
///
/// Zero-frequency terms, empty documents and zero-norm vectors are not errors;
/// they score `0.0`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("table not found: {0}")]
    UnknownTable(String),

    #[error("corrupt model: {0}")]
    CorruptModel(String),

    #[error("worker {worker} failed: {message}")]
    Worker { worker: usize, message: String },

    #[error("worker {0} panicked")]
    WorkerPanicked(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("model encoding failed: {0}")]
    Encode(#[from] bincode::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
