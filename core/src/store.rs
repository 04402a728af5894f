//! Document sources for the indexer.

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Read-only access to the corpus. Ids are dense and zero-based.
pub trait DocumentStore: Send + Sync {
    fn row_count(&self, table: &str) -> Result<i64>;

    /// `(id, text)` for every id in the inclusive range `[start, end]`, ordered by id.
    /// Rows whose text is NULL are omitted.
    fn fetch_text_range(&self, table: &str, start: i64, end: i64) -> Result<Vec<(i64, String)>>;

    /// Text for each of `ids`, in the same order; `None` for unknown ids.
    fn fetch_text_by_ids(&self, table: &str, ids: &[i64]) -> Result<Vec<Option<String>>>;
}

const ID_COLUMN: &str = "article_id";
const TEXT_COLUMN: &str = "article_text";

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQLite-backed store. Every call opens its own read-only connection, so one
/// store can be shared by all indexing workers.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(conn)
    }

    fn ensure_table(conn: &Connection, table: &str) -> Result<()> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
                params![table],
                |row| row.get(0),
            )
            .optional()?;
        match found {
            Some(_) => Ok(()),
            None => Err(Error::UnknownTable(table.to_string())),
        }
    }
}

impl DocumentStore for SqliteStore {
    fn row_count(&self, table: &str) -> Result<i64> {
        let conn = self.open()?;
        Self::ensure_table(&conn, table)?;
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let count = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count)
    }

    fn fetch_text_range(&self, table: &str, start: i64, end: i64) -> Result<Vec<(i64, String)>> {
        let conn = self.open()?;
        Self::ensure_table(&conn, table)?;
        let sql = format!(
            "SELECT {id}, {text} FROM {table} WHERE {id} BETWEEN ?1 AND ?2 AND {text} IS NOT NULL ORDER BY {id}",
            id = quote_ident(ID_COLUMN),
            text = quote_ident(TEXT_COLUMN),
            table = quote_ident(table),
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![start, end], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<(i64, String)>>>()?;
        Ok(rows)
    }

    fn fetch_text_by_ids(&self, table: &str, ids: &[i64]) -> Result<Vec<Option<String>>> {
        let conn = self.open()?;
        Self::ensure_table(&conn, table)?;
        let sql = format!(
            "SELECT {text} FROM {table} WHERE {id} = ?1",
            id = quote_ident(ID_COLUMN),
            text = quote_ident(TEXT_COLUMN),
            table = quote_ident(table),
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let text: Option<Option<String>> =
                stmt.query_row(params![id], |row| row.get(0)).optional()?;
            out.push(text.flatten());
        }
        Ok(out)
    }
}

/// In-memory corpus; document `i` has id `i`. Any table name is accepted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    docs: Vec<String>,
}

impl MemoryStore {
    pub fn new<I, S>(docs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { docs: docs.into_iter().map(Into::into).collect() }
    }
}

impl DocumentStore for MemoryStore {
    fn row_count(&self, _table: &str) -> Result<i64> {
        Ok(self.docs.len() as i64)
    }

    fn fetch_text_range(&self, _table: &str, start: i64, end: i64) -> Result<Vec<(i64, String)>> {
        let lo = start.max(0);
        let hi = end.min(self.docs.len() as i64 - 1);
        Ok((lo..=hi).map(|id| (id, self.docs[id as usize].clone())).collect())
    }

    fn fetch_text_by_ids(&self, _table: &str, ids: &[i64]) -> Result<Vec<Option<String>>> {
        Ok(ids
            .iter()
            .map(|&id| usize::try_from(id).ok().and_then(|i| self.docs.get(i)).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seed(path: &Path) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE sample_articles (article_id INTEGER PRIMARY KEY, article_text TEXT);
             INSERT INTO sample_articles VALUES (0, 'first text'), (1, NULL), (2, 'third text');",
        )
        .unwrap();
    }

    #[test]
    fn sqlite_store_counts_and_fetches() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("corpus.db");
        seed(&db);
        let store = SqliteStore::new(&db);
        assert_eq!(store.row_count("sample_articles").unwrap(), 3);

        let rows = store.fetch_text_range("sample_articles", 0, 2).unwrap();
        assert_eq!(rows, vec![(0, "first text".to_string()), (2, "third text".to_string())]);

        let texts = store.fetch_text_by_ids("sample_articles", &[2, 9, 1]).unwrap();
        assert_eq!(texts, vec![Some("third text".to_string()), None, None]);
    }

    #[test]
    fn sqlite_store_reports_unknown_table() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("corpus.db");
        seed(&db);
        let err = SqliteStore::new(&db).row_count("nope").unwrap_err();
        assert!(matches!(err, Error::UnknownTable(t) if t == "nope"));
    }

    #[test]
    fn memory_store_clamps_range() {
        let store = MemoryStore::new(["a", "b"]);
        assert_eq!(store.fetch_text_range("t", 1, 5).unwrap(), vec![(1, "b".to_string())]);
        assert!(store.fetch_text_range("t", 3, 5).unwrap().is_empty());
    }
}
