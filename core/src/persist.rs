//! On-disk model: `model.bin` plus a `meta.json` sidecar.
//!
//! `model.bin` is the magic `TFIX` and a little-endian `u32` format version,
//! followed by a bincode body (fixed-width little-endian integers, `u64` lengths):
//!
//! ```text
//! num_docs u64
//! num_docs x { bucket_count u64 | live_count u64 | live_count x (key_len u64, key, value f64) }
//! idf:            bucket_count u64 | live_count u64 | live_count x (key_len u64, key, idf f64)
//! doc_frequency:  live_count u64 | live_count x u32, in idf entry order
//! norms:          count u64 | count x f64
//! ```
//!
//! A document slot with `bucket_count == 0` is an empty document.

use bincode::Options;
use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::index::{DocumentIndex, Model};
use crate::table::{StrTable, TermMap, DEFAULT_CAPACITY};
use crate::vocabulary::{VocabEntry, Vocabulary};

const MAGIC: &[u8; 4] = b"TFIX";
const HEADER_LEN: usize = 8;
pub const FORMAT_VERSION: u32 = 2;

/// Settings that shape a model. A saved model is only reused when they match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSettings {
    pub table: String,
    pub limit: Option<u64>,
    pub stemming: bool,
    pub stopwords: Option<String>,
}

impl BuildSettings {
    /// Whole table, stemming on, built-in stopwords.
    pub fn new(table: impl Into<String>) -> Self {
        Self { table: table.into(), limit: None, stemming: true, stopwords: None }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u64,
    pub vocab_size: u64,
    pub created_at: String,
    pub version: u32,
    pub settings: BuildSettings,
}

impl MetaFile {
    pub fn matches(&self, settings: &BuildSettings) -> bool {
        self.version == FORMAT_VERSION && &self.settings == settings
    }
}

pub struct ModelPaths {
    pub root: PathBuf,
}

impl ModelPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn model(&self) -> PathBuf { self.root.join("model.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }

    pub fn exists(&self) -> bool {
        self.model().is_file()
    }
}

#[derive(Serialize, Deserialize)]
struct MapRecord {
    bucket_count: u64,
    entries: Vec<(String, f64)>,
}

#[derive(Serialize, Deserialize)]
struct ModelRecord {
    docs: Vec<MapRecord>,
    idf: MapRecord,
    doc_frequency: Vec<u32>,
    norms: Vec<f64>,
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

fn map_record(map: &TermMap) -> MapRecord {
    MapRecord {
        bucket_count: map.capacity() as u64,
        entries: map.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
    }
}

pub fn encode_model(model: &Model) -> Result<Vec<u8>> {
    let (idf_entries, doc_frequency): (Vec<(String, f64)>, Vec<u32>) = model
        .vocabulary
        .iter()
        .map(|(term, entry)| ((term.to_string(), entry.idf), entry.doc_frequency))
        .unzip();
    let record = ModelRecord {
        docs: model.index.docs().iter().map(map_record).collect(),
        idf: MapRecord { bucket_count: model.vocabulary.capacity() as u64, entries: idf_entries },
        doc_frequency,
        norms: model.norms.clone(),
    };

    let mut out = Vec::with_capacity(HEADER_LEN);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    codec().serialize_into(&mut out, &record)?;
    Ok(out)
}

/// Bucket count for a table holding `live` entries. Anything larger than growth
/// from the default capacity could have produced is rejected.
fn checked_capacity(raw: u64, live: usize) -> Result<usize> {
    let bound = DEFAULT_CAPACITY.max(live.saturating_mul(3).next_power_of_two());
    match usize::try_from(raw) {
        Ok(0) if live == 0 => Ok(0),
        Ok(c) if c.is_power_of_two() && c <= bound => Ok(c),
        _ => Err(Error::CorruptModel(format!("invalid bucket count {raw} for {live} entries"))),
    }
}

fn table_with<V>(cap: usize) -> StrTable<V> {
    if cap == 0 {
        StrTable::unallocated()
    } else {
        StrTable::with_capacity(cap)
    }
}

fn read_term_map(record: MapRecord) -> Result<TermMap> {
    let live = record.entries.len();
    let mut map = table_with(checked_capacity(record.bucket_count, live)?);
    for (key, value) in record.entries {
        map.set(&key, value);
    }
    if map.len() != live {
        return Err(Error::CorruptModel("duplicate key in term map".into()));
    }
    Ok(map)
}

fn read_vocabulary(record: MapRecord, doc_frequency: Vec<u32>) -> Result<Vocabulary> {
    let live = record.entries.len();
    if doc_frequency.len() != live {
        return Err(Error::CorruptModel(format!(
            "{} document frequencies for {live} terms",
            doc_frequency.len()
        )));
    }
    let cap = checked_capacity(record.bucket_count, live)?.max(1);
    let mut vocab = Vocabulary::with_capacity(cap);
    for ((term, idf), doc_frequency) in record.entries.into_iter().zip(doc_frequency) {
        vocab.insert_entry(&term, VocabEntry { doc_frequency, idf });
    }
    if vocab.len() != live {
        return Err(Error::CorruptModel("duplicate term in vocabulary".into()));
    }
    Ok(vocab)
}

pub fn decode_model(bytes: &[u8]) -> Result<Model> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::CorruptModel("truncated header".into()));
    }
    let (header, body) = bytes.split_at(HEADER_LEN);
    if &header[..4] != MAGIC {
        return Err(Error::CorruptModel("not a model file".into()));
    }
    let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if version != FORMAT_VERSION {
        return Err(Error::CorruptModel(format!("unsupported format version {version}")));
    }

    let record: ModelRecord = codec()
        .deserialize(body)
        .map_err(|e| Error::CorruptModel(e.to_string()))?;
    if record.norms.len() != record.docs.len() {
        return Err(Error::CorruptModel(format!(
            "{} norms for {} documents",
            record.norms.len(),
            record.docs.len()
        )));
    }

    let docs = record.docs.into_iter().map(read_term_map).collect::<Result<Vec<_>>>()?;
    let vocabulary = read_vocabulary(record.idf, record.doc_frequency)?;
    Ok(Model { index: DocumentIndex::from_docs(docs), vocabulary, norms: record.norms })
}

/// Writes `model.bin` through a temp file and rename, then `meta.json`.
pub fn save_model(paths: &ModelPaths, model: &Model, settings: &BuildSettings) -> Result<()> {
    create_dir_all(&paths.root)?;
    let bytes = encode_model(model)?;
    let tmp = paths.root.join("model.bin.tmp");
    let mut f = File::create(&tmp)?;
    f.write_all(&bytes)?;
    f.sync_all()?;
    fs::rename(&tmp, paths.model())?;

    let meta = MetaFile {
        num_docs: model.num_docs() as u64,
        vocab_size: model.vocabulary.len() as u64,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "".into()),
        version: FORMAT_VERSION,
        settings: settings.clone(),
    };
    save_meta(paths, &meta)?;
    tracing::info!(path = %paths.model().display(), bytes = bytes.len(), "model saved");
    Ok(())
}
pub fn load_model(paths: &ModelPaths) -> Result<Model> {
    let mut f = File::open(paths.model())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let model = decode_model(&buf)?;
    tracing::info!(
        path = %paths.model().display(),
        num_docs = model.num_docs(),
        num_terms = model.vocabulary.len(),
        "model loaded"
    );
    Ok(model)
}

pub fn save_meta(paths: &ModelPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &ModelPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}
