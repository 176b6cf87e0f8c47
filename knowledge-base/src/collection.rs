//! Named, independently persisted knowledge collections
//!
//! A collection stores its vector index under
//! `<storage_path>/vector_store/`. It is loaded from there on construction
//! when possible and starts empty otherwise; every `add_entries` call
//! writes the whole index back before returning.

use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::embedding::VectorEngine;
use crate::entry::{Entry, Metadata, SearchHit, StoredEntry};
use crate::error::Result;
use crate::index::VectorIndex;

/// Subdirectory of a collection holding the serialized index
pub const VECTOR_STORE_DIR: &str = "vector_store";

/// Scale turning a [0, 1] score threshold into a maximum distance.
///
/// `max_allowed_distance = (1 - score_threshold) * DISTANCE_SCALE`. This is
/// an uncalibrated heuristic; with cosine distance (range [0, 2]) any
/// threshold below 0.8 keeps every hit.
pub const DISTANCE_SCALE: f32 = 10.0;

/// Largest distance a hit may have under `score_threshold`
pub fn max_allowed_distance(score_threshold: f32) -> f32 {
    (1.0 - score_threshold) * DISTANCE_SCALE
}

/// One named vector store of entries
pub struct Collection {
    name: String,
    storage_path: PathBuf,
    engine: Arc<VectorEngine>,
    index: RwLock<VectorIndex>,
}

impl Collection {
    /// Open the collection stored at `storage_path`
    ///
    /// Never fails: a missing, empty, or unreadable store yields an empty
    /// collection and a warning.
    pub fn open(
        name: impl Into<String>,
        storage_path: impl Into<PathBuf>,
        engine: Arc<VectorEngine>,
    ) -> Self {
        let name = name.into();
        let storage_path = storage_path.into();
        let store_dir = storage_path.join(VECTOR_STORE_DIR);

        let index = Self::load_index(&name, &store_dir, &engine)
            .unwrap_or_else(|| VectorIndex::new(engine.dimension()));

        Self {
            name,
            storage_path,
            engine,
            index: RwLock::new(index),
        }
    }

    fn load_index(name: &str, store_dir: &Path, engine: &VectorEngine) -> Option<VectorIndex> {
        if let Err(e) = VectorIndex::recover_interrupted_save(store_dir) {
            log::warn!("Knowledge base {}: could not restore previous store: {}", name, e);
        }
        if !store_dir.exists() {
            log::warn!(
                "Knowledge base {}: no vector store at {}, starting empty",
                name,
                store_dir.display()
            );
            return None;
        }
        if !VectorIndex::has_persisted(store_dir) {
            log::warn!(
                "Knowledge base {}: vector store {} is empty, starting empty",
                name,
                store_dir.display()
            );
            return None;
        }

        match VectorIndex::load(store_dir, engine.dimension(), engine.name()) {
            Ok(index) => {
                log::info!("Loaded knowledge base {} ({} entries)", name, index.len());
                Some(index)
            }
            Err(e) => {
                log::warn!(
                    "Failed to load vector store for {}: {}. Creating a new one",
                    name,
                    e
                );
                None
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    /// Directory the index is persisted in
    pub fn vector_store_path(&self) -> PathBuf {
        self.storage_path.join(VECTOR_STORE_DIR)
    }

    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Snapshot of the stored entries in insertion order
    pub fn entries(&self) -> Vec<StoredEntry> {
        self.index.read().records().to_vec()
    }

    /// Embed, append, and persist `entries`
    ///
    /// Embedding runs before the write lock is taken; the append and the
    /// save happen under it, so concurrent writers on one collection are
    /// serialized. If persisting fails the append is rolled back and the
    /// error returned.
    pub fn add_entries(&self, entries: Vec<Entry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let texts: Vec<&str> = entries.iter().map(|e| e.text.as_str()).collect();
        let vectors = self.engine.embed_many(&texts)?;

        let mut index = self.index.write();
        let previous_len = index.len();
        let count = entries.len();
        index.add(entries, vectors)?;

        if let Err(e) = index.save(&self.vector_store_path(), self.engine.name()) {
            index.truncate(previous_len);
            log::error!("Failed to persist knowledge base {}: {}", self.name, e);
            return Err(e);
        }

        log::info!(
            "Added {} entries to knowledge base {} ({} total)",
            count,
            self.name,
            index.len()
        );
        Ok(())
    }

    /// Add texts, pairing each with the metadata at the same position
    ///
    /// Missing metadata (no list, or a shorter list) means an empty mapping.
    pub fn add_texts(&self, texts: &[&str], metadatas: Option<Vec<Metadata>>) -> Result<()> {
        let mut metadatas = metadatas.unwrap_or_default().into_iter();
        let entries = texts
            .iter()
            .map(|text| Entry::with_metadata(*text, metadatas.next().unwrap_or_default()))
            .collect();
        self.add_entries(entries)
    }

    /// Search, surfacing failures
    pub fn try_search(
        &self,
        query: &str,
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<SearchHit>> {
        let query_vector = self.engine.embed_one(query)?;
        let hits = self.index.read().search(&query_vector, top_k)?;

        let max_distance = max_allowed_distance(score_threshold);
        Ok(hits
            .into_iter()
            .filter(|hit| hit.distance <= max_distance)
            .collect())
    }

    /// Nearest entries to `query` within the threshold, nearest first
    ///
    /// Failures are logged and reported as no hits.
    pub fn search(&self, query: &str, top_k: usize, score_threshold: f32) -> Vec<SearchHit> {
        match self.try_search(query, top_k, score_threshold) {
            Ok(hits) => hits,
            Err(e) => {
                log::error!("Search in knowledge base {} failed: {}", self.name, e);
                Vec::new()
            }
        }
    }

    /// Write the index to disk, replacing the previous state
    pub fn persist(&self) -> Result<()> {
        self.index
            .read()
            .save(&self.vector_store_path(), self.engine.name())?;
        log::info!("Knowledge base saved: {}", self.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{ENTRIES_FILE, INDEX_FILE, META_FILE};
    use crate::test_support::{token_engine, FailingEmbedder};
    use std::fs;
    use tempfile::TempDir;

    fn meta(source: &str, desc: &str) -> Metadata {
        Metadata::from([
            ("source".to_string(), source.to_string()),
            ("desc".to_string(), desc.to_string()),
        ])
    }

    #[test]
    fn test_max_allowed_distance() {
        assert!((max_allowed_distance(0.4) - 6.0).abs() < 1e-5);
        assert_eq!(max_allowed_distance(1.0), 0.0);
        assert_eq!(max_allowed_distance(0.0), 10.0);
    }

    #[test]
    fn test_fresh_collection_is_empty() {
        let dir = TempDir::new().unwrap();
        let collection = Collection::open("NameNodeExpert", dir.path(), token_engine());

        assert!(collection.is_empty());
        assert!(collection.search("anything", 3, 0.4).is_empty());
    }

    #[test]
    fn test_add_texts_then_self_search() {
        let dir = TempDir::new().unwrap();
        let collection = Collection::open("DataNodeExpert", dir.path(), token_engine());
        let texts = [
            "DataNode cannot connect to NameNode check network and firewall",
            "DataNode disk full causes block replication failure",
            "DataNode heartbeat timeout from network latency",
        ];
        collection.add_texts(&texts, None).unwrap();
        assert_eq!(collection.len(), 3);

        for text in texts {
            let hits = collection.search(text, texts.len(), 0.4);
            assert!(hits.iter().any(|h| h.entry.text == text));
            assert_eq!(hits[0].entry.text, text);
        }
    }

    #[test]
    fn test_add_texts_zips_metadata_positionally() {
        let dir = TempDir::new().unwrap();
        let collection = Collection::open("c", dir.path(), token_engine());
        collection
            .add_texts(&["one", "two"], Some(vec![meta("A", "first")]))
            .unwrap();

        let entries = collection.entries();
        assert_eq!(entries[0].entry.source_value(), Some("A"));
        assert!(entries[1].entry.metadata.is_empty());
    }

    #[test]
    fn test_add_empty_is_noop() {
        let dir = TempDir::new().unwrap();
        let collection = Collection::open("c", dir.path(), token_engine());
        collection.add_entries(vec![]).unwrap();
        assert!(!collection.vector_store_path().exists());
    }

    #[test]
    fn test_add_persists_and_reloads() {
        let dir = TempDir::new().unwrap();
        let engine = token_engine();
        {
            let collection = Collection::open("c", dir.path(), engine.clone());
            collection
                .add_entries(vec![Entry::new("yarn queue full").source("ops")])
                .unwrap();
        }

        let reopened = Collection::open("c", dir.path(), engine);
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.entries()[0].entry.source_value(), Some("ops"));
    }

    #[test]
    fn test_persist_twice_is_identical() {
        let dir = TempDir::new().unwrap();
        let engine = token_engine();
        let collection = Collection::open("c", dir.path(), engine.clone());
        collection.add_texts(&["alpha beta", "gamma"], None).unwrap();

        let read_all = || -> Vec<Vec<u8>> {
            [INDEX_FILE, ENTRIES_FILE, META_FILE]
                .iter()
                .map(|f| fs::read(collection.vector_store_path().join(f)).unwrap())
                .collect()
        };
        collection.persist().unwrap();
        let first = read_all();
        collection.persist().unwrap();
        assert_eq!(first, read_all());

        let reopened = Collection::open("c", dir.path(), engine);
        assert_eq!(reopened.entries(), collection.entries());
    }

    #[test]
    fn test_corrupt_store_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join(VECTOR_STORE_DIR);
        fs::create_dir_all(&store).unwrap();
        fs::write(store.join(META_FILE), b"garbage").unwrap();
        fs::write(store.join(INDEX_FILE), b"garbage").unwrap();

        let collection = Collection::open("c", dir.path(), token_engine());
        assert!(collection.is_empty());

        // Still usable, and the next add overwrites the bad state
        collection.add_texts(&["fresh"], None).unwrap();
        let reopened = Collection::open("c", dir.path(), token_engine());
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn test_empty_store_dir_starts_empty() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(VECTOR_STORE_DIR)).unwrap();
        let collection = Collection::open("c", dir.path(), token_engine());
        assert!(collection.is_empty());
    }

    #[test]
    fn test_threshold_filters_distant_hits() {
        let dir = TempDir::new().unwrap();
        let collection = Collection::open("c", dir.path(), token_engine());
        collection
            .add_texts(&["namenode safemode", "completely unrelated words"], None)
            .unwrap();

        // 0.95 allows distance up to 0.5
        let hits = collection.search("namenode safemode", 5, 0.95);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.text, "namenode safemode");

        // Default threshold keeps everything cosine distance can produce
        assert_eq!(collection.search("namenode safemode", 5, 0.4).len(), 2);
    }

    #[test]
    fn test_search_failure_is_empty_not_error() {
        let dir = TempDir::new().unwrap();
        let engine = Arc::new(VectorEngine::with_embedder(Box::new(FailingEmbedder::new(8))));
        let collection = Collection::open("c", dir.path(), engine);

        assert!(collection.search("q", 3, 0.4).is_empty());
        assert!(collection.try_search("q", 3, 0.4).is_err());
    }

    #[test]
    fn test_embedding_failure_adds_nothing() {
        let dir = TempDir::new().unwrap();
        let engine = Arc::new(VectorEngine::with_embedder(Box::new(FailingEmbedder::new(8))));
        let collection = Collection::open("c", dir.path(), engine);

        assert!(collection.add_texts(&["x"], None).is_err());
        assert!(collection.is_empty());
    }

    #[test]
    fn test_persist_failure_rolls_back() {
        let dir = TempDir::new().unwrap();
        // A file where the collection directory should be makes create_dir_all fail
        let blocked = dir.path().join("blocked");
        fs::write(&blocked, b"").unwrap();
        let collection = Collection::open("c", &blocked, token_engine());

        assert!(collection.add_texts(&["lost"], None).is_err());
        assert!(collection.is_empty());
        assert!(collection.search("lost", 3, 0.4).is_empty());
    }

    #[test]
    fn test_failed_save_keeps_saved_entries_on_disk() {
        let dir = TempDir::new().unwrap();
        let engine = token_engine();
        let collection = Collection::open("c", dir.path(), engine.clone());
        collection.add_texts(&["alpha one", "beta two"], None).unwrap();

        let blocker = dir.path().join("vector_store.staging");
        fs::write(&blocker, b"").unwrap();
        assert!(collection.add_texts(&["gamma three"], None).is_err());
        assert_eq!(collection.len(), 2);

        fs::remove_file(&blocker).unwrap();
        let reopened = Collection::open("c", dir.path(), engine);
        let texts: Vec<String> = reopened.entries().into_iter().map(|e| e.entry.text).collect();
        assert_eq!(texts, vec!["alpha one", "beta two"]);
    }

    #[test]
    fn test_unwritable_live_file_does_not_break_save() {
        let dir = TempDir::new().unwrap();
        let engine = token_engine();
        let collection = Collection::open("c", dir.path(), engine.clone());
        collection.add_texts(&["alpha one", "beta two"], None).unwrap();

        let entries_file = collection.vector_store_path().join(ENTRIES_FILE);
        fs::remove_file(&entries_file).unwrap();
        fs::create_dir(&entries_file).unwrap();
        collection.add_texts(&["gamma three"], None).unwrap();

        assert_eq!(Collection::open("c", dir.path(), engine).len(), 3);
    }

    #[test]
    fn test_open_restores_store_moved_aside_by_interrupted_save() {
        let dir = TempDir::new().unwrap();
        let engine = token_engine();
        Collection::open("c", dir.path(), engine.clone())
            .add_texts(&["alpha one", "beta two"], None)
            .unwrap();

        fs::rename(
            dir.path().join(VECTOR_STORE_DIR),
            dir.path().join("vector_store.old"),
        )
        .unwrap();

        let reopened = Collection::open("c", dir.path(), engine);
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.search("alpha one", 1, 0.4)[0].entry.text, "alpha one");
    }

    #[test]
    fn test_store_from_other_embedder_starts_empty() {
        let dir = TempDir::new().unwrap();
        Collection::open("c", dir.path(), token_engine())
            .add_texts(&["alpha one"], None)
            .unwrap();

        // Same dimension, different model
        let zero = Arc::new(VectorEngine::zero_vector(256));
        assert!(Collection::open("c", dir.path(), zero).is_empty());
        assert_eq!(Collection::open("c", dir.path(), token_engine()).len(), 1);
    }

    #[test]
    fn test_concurrent_writers_do_not_lose_updates() {
        let dir = TempDir::new().unwrap();
        let engine = token_engine();
        let collection = Arc::new(Collection::open("c", dir.path(), engine.clone()));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let collection = collection.clone();
                std::thread::spawn(move || {
                    for i in 0..5 {
                        let text = format!("writer {} entry {}", t, i);
                        collection.add_texts(&[text.as_str()], None).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(collection.len(), 20);
        let reopened = Collection::open("c", dir.path(), engine);
        assert_eq!(reopened.len(), 20);
    }
}
