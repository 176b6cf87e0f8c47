//! Collection registry
//!
//! Owns every open collection, creates them lazily by name, and maps free
//! text topic labels onto collection names.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::collection::Collection;
use crate::config::KbConfig;
use crate::embedding::VectorEngine;
use crate::entry::SearchHit;
use crate::error::{KbError, Result};

/// Primary (NameNode) expert knowledge
pub const NAMENODE_EXPERT: &str = "NameNodeExpert";
/// Worker (DataNode) expert knowledge
pub const DATANODE_EXPERT: &str = "DataNodeExpert";
/// Resource manager (YARN) expert knowledge
pub const YARN_EXPERT: &str = "YARNExpert";
/// Historical incidents; also the fallback topic
pub const HISTORY_CASES: &str = "HistoryCases";
/// Official documentation
pub const HADOOP_DOCS: &str = "HadoopDocs";

/// Collections guaranteed to exist once a registry is built
pub const DEFAULT_COLLECTIONS: [&str; 5] = [
    NAMENODE_EXPERT,
    DATANODE_EXPERT,
    YARN_EXPERT,
    HISTORY_CASES,
    HADOOP_DOCS,
];

/// Ordered topic rules: the first rule with a keyword contained in the
/// lowercased label wins.
const TOPIC_RULES: &[(&[&str], &str)] = &[
    (&["namenode", "nn"], NAMENODE_EXPERT),
    (&["datanode", "dn"], DATANODE_EXPERT),
    (&["yarn"], YARN_EXPERT),
];

/// Map a topic label to the collection serving it
///
/// Plain substring matching, so short keywords also hit inside longer
/// words ("connection" contains "nn").
pub fn match_topic(label: &str) -> &'static str {
    let label = label.to_lowercase();
    TOPIC_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| label.contains(k)))
        .map(|(_, name)| *name)
        .unwrap_or(HISTORY_CASES)
}

/// Set of named collections sharing one embedding engine
pub struct Registry {
    config: KbConfig,
    engine: Arc<VectorEngine>,
    collections: RwLock<BTreeMap<String, Arc<Collection>>>,
}

impl Registry {
    /// Build a registry and open the default collections
    pub fn new(config: KbConfig, engine: Arc<VectorEngine>) -> Self {
        let registry = Self {
            config,
            engine,
            collections: RwLock::new(BTreeMap::new()),
        };

        for name in DEFAULT_COLLECTIONS {
            registry.get_or_create(name);
        }
        log::info!(
            "Registry ready at {} with {} collections ({})",
            registry.config.collections_root().display(),
            registry.len(),
            registry.engine.name()
        );
        registry
    }

    /// Build the engine from `config` and then the registry
    pub fn from_config(config: KbConfig, install_root: Option<&Path>) -> Self {
        let engine = Arc::new(VectorEngine::from_config(&config.embedder, install_root));
        Self::new(config, engine)
    }

    /// Existing collection named `name`, or a newly opened one
    pub fn get_or_create(&self, name: &str) -> Arc<Collection> {
        if let Some(existing) = self.collections.read().get(name) {
            return existing.clone();
        }

        let mut collections = self.collections.write();
        collections
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(Collection::open(
                    name,
                    self.config.collection_path(name),
                    self.engine.clone(),
                ))
            })
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.collections.read().contains_key(name)
    }

    /// Registered collection names, sorted
    pub fn names(&self) -> Vec<String> {
        self.collections.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.collections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.read().is_empty()
    }

    pub fn engine(&self) -> &Arc<VectorEngine> {
        &self.engine
    }

    pub fn config(&self) -> &KbConfig {
        &self.config
    }

    /// See [`match_topic`]
    pub fn match_topic(&self, label: &str) -> &'static str {
        match_topic(label)
    }

    /// Search one collection by name, or all of them when `topic_name` is None
    ///
    /// An unknown name is an error, never a fallback to all collections.
    /// Across all collections, hits are merged, sorted by ascending distance
    /// (stable, so ties keep collection-name order), and cut to `top_k`.
    /// Collections that fail are skipped unless every one of them fails.
    pub fn try_search(
        &self,
        query: &str,
        topic_name: Option<&str>,
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<SearchHit>> {
        if let Some(name) = topic_name {
            let collection = self
                .get(name)
                .ok_or_else(|| KbError::UnknownCollection(name.to_string()))?;
            return collection.try_search(query, top_k, score_threshold);
        }

        let collections: Vec<Arc<Collection>> = self.collections.read().values().cloned().collect();
        let mut all_hits = Vec::new();
        let mut last_error = None;
        let mut succeeded = 0;

        for collection in &collections {
            match collection.try_search(query, top_k, score_threshold) {
                Ok(hits) => {
                    succeeded += 1;
                    all_hits.extend(hits);
                }
                Err(e) => {
                    log::error!("Search in knowledge base {} failed: {}", collection.name(), e);
                    last_error = Some(e);
                }
            }
        }

        if succeeded == 0 {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        all_hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        all_hits.truncate(top_k);
        Ok(all_hits)
    }

    /// Like [`Registry::try_search`], reporting failures as no hits
    pub fn search(
        &self,
        query: &str,
        topic_name: Option<&str>,
        top_k: usize,
        score_threshold: f32,
    ) -> Vec<SearchHit> {
        match self.try_search(query, topic_name, top_k, score_threshold) {
            Ok(hits) => hits,
            Err(KbError::UnknownCollection(name)) => {
                log::warn!("Knowledge base does not exist: {}", name);
                Vec::new()
            }
            Err(e) => {
                log::error!("Knowledge search failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Persist every collection
    pub fn persist_all(&self) -> Result<()> {
        let collections: Vec<Arc<Collection>> = self.collections.read().values().cloned().collect();
        for collection in collections {
            collection.persist()?;
        }
        Ok(())
    }

    /// Registry statistics
    pub fn stats(&self) -> serde_json::Value {
        let collections = self.collections.read();
        let by_collection: BTreeMap<&str, usize> = collections
            .iter()
            .map(|(name, c)| (name.as_str(), c.len()))
            .collect();
        let total: usize = by_collection.values().sum();

        serde_json::json!({
            "totalEntries": total,
            "collections": by_collection,
            "embedder": self.engine.name(),
            "dimension": self.engine.dimension(),
            "root": self.config.collections_root(),
        })
    }
}
