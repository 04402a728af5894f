use crate::error::{Error, Result};

pub const MAX_THREADS: usize = 16;
/// Largest corpus the indexer accepts.
pub const MAX_DOCS: usize = 97_549;
pub const DEFAULT_TABLE: &str = "sample_articles";

#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Worker threads, `1..=MAX_THREADS`.
    pub threads: usize,
    /// Index only the first `limit` documents; `None` indexes the whole table.
    pub limit: Option<usize>,
    pub table: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self { threads: 4, limit: None, table: DEFAULT_TABLE.to_string() }
    }
}

impl BuildConfig {
    pub fn new(table: impl Into<String>) -> Self {
        Self { table: table.into(), ..Self::default() }
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 || self.threads > MAX_THREADS {
            return Err(Error::InvalidConfig(format!(
                "thread count must be between 1 and {MAX_THREADS}, got {}",
                self.threads
            )));
        }
        if let Some(limit) = self.limit {
            if limit > MAX_DOCS {
                return Err(Error::InvalidConfig(format!(
                    "corpus limit {limit} exceeds the maximum of {MAX_DOCS} documents"
                )));
            }
        }
        if self.table.trim().is_empty() {
            return Err(Error::InvalidConfig("table name is empty".into()));
        }
        Ok(())
    }
}
