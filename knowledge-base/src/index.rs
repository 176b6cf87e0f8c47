//! Vector index with HNSW search and on-disk persistence
//!
//! Entries and their vectors are kept in insertion order, one vector per
//! entry. Small indexes are searched exactly; larger ones go through an
//! instant-distance HNSW graph built on the first search after a change.
//!
//! On disk a store is three files in one directory:
//! - `index.bin`: entry ids and vectors (bincode)
//! - `entries.json`: the entry side table
//! - `meta.json`: format version, embedder name, dimension, entry count
//!
//! A save writes all three into a sibling `<dir>.staging` directory and then
//! swaps it in, keeping the previous directory as `<dir>.old` until the new
//! one is in place. A failed save leaves the previous store loadable.

use instant_distance::{Builder, HnswMap, Point, Search};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::entry::{Entry, EntryId, SearchHit, StoredEntry};
use crate::error::{KbError, Result};

pub const FORMAT_VERSION: u32 = 1;
pub const INDEX_FILE: &str = "index.bin";
pub const ENTRIES_FILE: &str = "entries.json";
pub const META_FILE: &str = "meta.json";

/// Up to this many vectors, search is an exact linear scan
///
/// Above it the HNSW graph is rebuilt from scratch on the first search after
/// any append or truncate, so interleaving single adds with searches on a
/// large collection costs a full build each time.
const LINEAR_SCAN_LIMIT: usize = 512;
const EF_CONSTRUCTION: usize = 100;
const EF_SEARCH: usize = 100;

const STAGING_SUFFIX: &str = "staging";
const BACKUP_SUFFIX: &str = "old";

/// HNSW point wrapper over an embedding
#[derive(Clone)]
struct IndexPoint {
    vector: Vec<f32>,
}

impl Point for IndexPoint {
    fn distance(&self, other: &Self) -> f32 {
        cosine_distance(&self.vector, &other.vector)
    }
}

#[derive(Serialize, Deserialize)]
struct StoredVectors {
    dimension: usize,
    ids: Vec<EntryId>,
    vectors: Vec<Vec<f32>>,
}

/// Contents of `meta.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub version: u32,
    pub embedder: String,
    pub dimension: usize,
    pub entry_count: usize,
}

/// In-memory vector index owning its entries
pub struct VectorIndex {
    dimension: usize,
    records: Vec<StoredEntry>,
    points: Vec<IndexPoint>,
    hnsw: OnceLock<HnswMap<IndexPoint, usize>>,
}

impl VectorIndex {
    /// Empty index for vectors of `dimension`
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            records: Vec::new(),
            points: Vec::new(),
            hnsw: OnceLock::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Stored entries in insertion order
    pub fn records(&self) -> &[StoredEntry] {
        &self.records
    }

    /// Append entries with their vectors, returning the assigned ids
    pub fn add(&mut self, entries: Vec<Entry>, vectors: Vec<Vec<f32>>) -> Result<Vec<EntryId>> {
        if entries.len() != vectors.len() {
            return Err(KbError::other(format!(
                "{} entries but {} vectors",
                entries.len(),
                vectors.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(KbError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }

        let mut ids = Vec::with_capacity(entries.len());
        for (entry, vector) in entries.into_iter().zip(vectors) {
            let record = StoredEntry::new(entry);
            ids.push(record.id);
            self.records.push(record);
            self.points.push(IndexPoint { vector });
        }

        self.hnsw = OnceLock::new();
        Ok(ids)
    }

    /// Drop everything after the first `len` entries
    pub fn truncate(&mut self, len: usize) {
        if len >= self.records.len() {
            return;
        }
        self.records.truncate(len);
        self.points.truncate(len);
        self.hnsw = OnceLock::new();
    }

    /// Nearest `k` entries to `query`, nearest first
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension {
            return Err(KbError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let ranked = if self.points.len() > LINEAR_SCAN_LIMIT && k <= EF_SEARCH {
            let hnsw = self.hnsw.get_or_init(|| self.build_hnsw());
            let query_point = IndexPoint {
                vector: query.to_vec(),
            };
            let mut search = Search::default();
            hnsw.search(&query_point, &mut search)
                .take(k)
                .map(|item| (*item.value, item.distance))
                .collect()
        } else {
            self.linear_search(query, k)
        };

        Ok(ranked
            .into_iter()
            .map(|(idx, distance)| SearchHit::new(self.records[idx].entry.clone(), distance))
            .collect())
    }

    /// Exact scan over every vector
    fn linear_search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let mut results: Vec<(usize, f32)> = self
            .points
            .iter()
            .enumerate()
            .map(|(idx, point)| (idx, cosine_distance(query, &point.vector)))
            .collect();

        results.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k);
        results
    }

    fn build_hnsw(&self) -> HnswMap<IndexPoint, usize> {
        log::debug!("Building HNSW graph over {} vectors", self.points.len());
        let values: Vec<usize> = (0..self.points.len()).collect();
        Builder::default()
            .ef_construction(EF_CONSTRUCTION)
            .ef_search(EF_SEARCH)
            .build(self.points.clone(), values)
    }

    /// Whether `dir` exists and contains anything
    pub fn has_persisted(dir: &Path) -> bool {
        fs::read_dir(dir)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false)
    }

    /// Write the index into `dir`, replacing any previous state
    ///
    /// On error `dir` still holds the previous store.
    pub fn save(&self, dir: &Path, embedder: &str) -> Result<()> {
        let staging = sibling_dir(dir, STAGING_SUFFIX)?;
        let backup = sibling_dir(dir, BACKUP_SUFFIX)?;

        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;
        if let Err(e) = self.write_files(&staging, embedder) {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        if backup.exists() {
            fs::remove_dir_all(&backup)?;
        }
        let had_previous = dir.exists();
        if had_previous {
            fs::rename(dir, &backup)?;
        }
        if let Err(e) = fs::rename(&staging, dir) {
            if had_previous {
                let _ = fs::rename(&backup, dir);
            }
            return Err(e.into());
        }
        if had_previous {
            if let Err(e) = fs::remove_dir_all(&backup) {
                log::warn!("Failed to remove {}: {}", backup.display(), e);
            }
        }
        Ok(())
    }

    fn write_files(&self, dir: &Path, embedder: &str) -> Result<()> {
        let vectors = StoredVectors {
            dimension: self.dimension,
            ids: self.records.iter().map(|r| r.id).collect(),
            vectors: self.points.iter().map(|p| p.vector.clone()).collect(),
        };
        fs::write(dir.join(INDEX_FILE), bincode::serialize(&vectors)?)?;
        fs::write(
            dir.join(ENTRIES_FILE),
            serde_json::to_vec_pretty(&self.records)?,
        )?;

        let meta = IndexMeta {
            version: FORMAT_VERSION,
            embedder: embedder.to_string(),
            dimension: self.dimension,
            entry_count: self.records.len(),
        };
        fs::write(dir.join(META_FILE), serde_json::to_vec_pretty(&meta)?)?;
        Ok(())
    }

    /// Put back a store left as `<dir>.old` by a save that stopped between
    /// moving the previous store aside and moving the new one in
    pub fn recover_interrupted_save(dir: &Path) -> Result<()> {
        let backup = sibling_dir(dir, BACKUP_SUFFIX)?;
        if !dir.exists() && backup.is_dir() {
            log::warn!("Restoring vector store {} from {}", dir.display(), backup.display());
            fs::rename(&backup, dir)?;
        }
        Ok(())
    }

    /// Read an index from `dir`, requiring vectors of `dimension` produced
    /// by the embedder named `embedder`
    pub fn load(dir: &Path, dimension: usize, embedder: &str) -> Result<Self> {
        let meta_path = dir.join(META_FILE);
        if !meta_path.exists() {
            return Err(KbError::corrupt(format!(
                "{} missing in {}",
                META_FILE,
                dir.display()
            )));
        }
        let meta: IndexMeta = serde_json::from_slice(&fs::read(&meta_path)?)?;
        if meta.version != FORMAT_VERSION {
            return Err(KbError::corrupt(format!(
                "unsupported format version {} (expected {})",
                meta.version, FORMAT_VERSION
            )));
        }
        if meta.dimension != dimension {
            return Err(KbError::DimensionMismatch {
                expected: dimension,
                actual: meta.dimension,
            });
        }
        if meta.embedder != embedder {
            return Err(KbError::corrupt(format!(
                "store was built with embedder {}, not {}",
                meta.embedder, embedder
            )));
        }

        let vectors: StoredVectors = bincode::deserialize(&fs::read(dir.join(INDEX_FILE))?)?;
        let records: Vec<StoredEntry> =
            serde_json::from_slice(&fs::read(dir.join(ENTRIES_FILE))?)?;

        if vectors.ids.len() != vectors.vectors.len()
            || records.len() != vectors.ids.len()
            || records.len() != meta.entry_count
        {
            return Err(KbError::corrupt(format!(
                "count mismatch: meta {}, ids {}, vectors {}, entries {}",
                meta.entry_count,
                vectors.ids.len(),
                vectors.vectors.len(),
                records.len()
            )));
        }
        if records.iter().zip(&vectors.ids).any(|(r, id)| r.id != *id) {
            return Err(KbError::corrupt("entry ids out of step with vectors"));
        }
        if let Some(bad) = vectors.vectors.iter().find(|v| v.len() != dimension) {
            return Err(KbError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }

        Ok(Self {
            dimension,
            records,
            points: vectors
                .vectors
                .into_iter()
                .map(|vector| IndexPoint { vector })
                .collect(),
            hnsw: OnceLock::new(),
        })
    }
}

/// `<dir>.<suffix>` next to `dir`
fn sibling_dir(dir: &Path, suffix: &str) -> Result<PathBuf> {
    let name = dir
        .file_name()
        .ok_or_else(|| KbError::other(format!("invalid store path {}", dir.display())))?;
    let mut sibling = name.to_os_string();
    sibling.push(".");
    sibling.push(suffix);
    Ok(dir.with_file_name(sibling))
}

/// Cosine distance, `1 - cosine_similarity`, in [0, 2]
///
/// A zero vector has similarity 0 with everything, so distance 1.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Calculate cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
