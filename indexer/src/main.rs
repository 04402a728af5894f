use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use tfidf_core::persist::{load_meta, load_model, save_model, BuildSettings, ModelPaths};
use tfidf_core::{
    BuildConfig, DocumentStore, EnglishTokenizer, Hit, Model, ParallelIndexer, SqliteStore, Stopwords,
};

const SNIPPET_CHARS: usize = 200;

#[derive(Parser, Debug)]
#[command(name = "tfidf")]
#[command(about = "Build a TF-IDF index over a SQLite table and rank documents against a query", long_about = None)]
struct Cli {
    /// Worker threads for indexing and scoring
    #[arg(long, default_value_t = 4)]
    threads: usize,
    /// Index only the first N documents (default: whole table)
    #[arg(long)]
    entries: Option<usize>,
    /// SQLite database holding the corpus
    #[arg(long, default_value = "wiki-small.db")]
    db: PathBuf,
    /// Table with `article_id` and `article_text` columns
    #[arg(long, default_value = tfidf_core::config::DEFAULT_TABLE)]
    table: String,
    /// Directory holding model.bin and meta.json
    #[arg(long, default_value = "./model")]
    model: PathBuf,
    /// Stopword list, one word per line (default: built-in English list)
    #[arg(long)]
    stopwords: Option<PathBuf>,
    /// Disable Snowball stemming
    #[arg(long, default_value_t = false)]
    no_stem: bool,
    /// Free-text query
    #[arg(long, conflicts_with = "query_file")]
    query: Option<String>,
    /// Read the query from a file
    #[arg(long)]
    query_file: Option<PathBuf>,
    /// Number of results to show
    #[arg(long, default_value_t = 10)]
    top_k: usize,
    /// Rebuild even if a saved model exists
    #[arg(long, default_value_t = false)]
    rebuild: bool,
    /// Debug-level logging unless RUST_LOG says otherwise
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt().with_env_filter(filter).init();

    for line in run(&cli)? {
        println!("{line}");
    }
    Ok(())
}

/// Builds or loads the model and answers the query, returning the lines to print.
fn run(cli: &Cli) -> Result<Vec<String>> {
    let config = BuildConfig::new(&cli.table).threads(cli.threads).limit(cli.entries);
    config.validate()?;

    let stopwords = match &cli.stopwords {
        Some(path) => Stopwords::load(path).with_context(|| format!("loading stopwords from {}", path.display()))?,
        None => Stopwords::english(),
    };
    let stopwords = Arc::new(stopwords);
    let tokenizer = if cli.no_stem {
        EnglishTokenizer::without_stemming(stopwords)
    } else {
        EnglishTokenizer::new(stopwords)
    };

    let settings = BuildSettings {
        table: cli.table.clone(),
        limit: cli.entries.map(|n| n as u64),
        stemming: !cli.no_stem,
        stopwords: cli.stopwords.as_ref().map(|p| p.display().to_string()),
    };
    let store = SqliteStore::new(&cli.db);
    let paths = ModelPaths::new(&cli.model);
    let model = if !cli.rebuild && saved_model_matches(&paths, &settings) {
        tracing::info!(path = %paths.model().display(), "loading saved model");
        load_model(&paths)?
    } else {
        if !cli.db.is_file() {
            anyhow::bail!("database not found: {}", cli.db.display());
        }
        let model = ParallelIndexer::new(&store, &tokenizer, config).build()?;
        save_model(&paths, &model, &settings)?;
        model
    };

    let query = match (&cli.query, &cli.query_file) {
        (Some(q), _) => q.clone(),
        (None, Some(path)) => fs::read_to_string(path).with_context(|| format!("reading query file {}", path.display()))?,
        (None, None) => {
            tracing::info!("no query given");
            return Ok(Vec::new());
        }
    };

    let hits = model.search(&tokenizer, &query, cli.top_k, cli.threads);
    render_hits(&store, &cli.table, &model, &hits)
}

/// True when `model.bin` exists and its `meta.json` was written for the same settings.
fn saved_model_matches(paths: &ModelPaths, settings: &BuildSettings) -> bool {
    if !paths.exists() {
        return false;
    }
    match load_meta(paths) {
        Ok(meta) if meta.matches(settings) => true,
        Ok(meta) => {
            tracing::info!(saved = ?meta.settings, version = meta.version, "saved model does not match, rebuilding");
            false
        }
        Err(e) => {
            tracing::warn!(error = %e, "unreadable model metadata, rebuilding");
            false
        }
    }
}

fn render_hits(store: &dyn DocumentStore, table: &str, model: &Model, hits: &[Hit]) -> Result<Vec<String>> {
    let ids: Vec<i64> = hits.iter().map(|h| h.doc_id as i64).collect();
    let texts = if ids.is_empty() { Vec::new() } else { store.fetch_text_by_ids(table, &ids)? };
    let mut lines = Vec::with_capacity(hits.len() + 1);
    lines.push(format!("top {} of {} documents", hits.len(), model.num_docs()));
    for (rank, (hit, text)) in hits.iter().zip(texts).enumerate() {
        let snippet: String = text
            .as_deref()
            .unwrap_or("<missing>")
            .chars()
            .take(SNIPPET_CHARS)
            .map(|c| if c.is_whitespace() { ' ' } else { c })
            .collect();
        lines.push(format!("{:>3}. doc {:<8} score {:.6}  {}", rank + 1, hit.doc_id, hit.score, snippet));
    }
    Ok(lines)
}
