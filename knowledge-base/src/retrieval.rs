//! Retrieval facade
//!
//! The entry point used by the diagnostic agent: resolve a topic, search,
//! and render the hits as plain text for a prompt.

use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;

use crate::config::{KbConfig, SearchOptions};
use crate::entry::SearchHit;
use crate::error::Result;
use crate::registry::Registry;

/// Topic value that searches every collection
pub const ALL_TOPICS: &str = "all";

/// Knowledge retrieval context
///
/// Created once at startup and passed to whoever needs knowledge lookups.
#[derive(Clone)]
pub struct KnowledgeRetriever {
    registry: Arc<Registry>,
}

impl KnowledgeRetriever {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Build the engine and registry described by `config`
    pub fn from_config(config: KbConfig, install_root: Option<&Path>) -> Self {
        Self::new(Arc::new(Registry::from_config(config, install_root)))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Hits for `query`, surfacing subsystem failures
    ///
    /// `topic` equal to "all" (any case) searches every collection; anything
    /// else is mapped through [`crate::match_topic`] to one collection.
    pub fn try_retrieve(
        &self,
        query: &str,
        topic: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>> {
        let collection = if topic.eq_ignore_ascii_case(ALL_TOPICS) {
            None
        } else {
            Some(self.registry.match_topic(topic))
        };

        self.registry.try_search(
            query,
            collection,
            options.top_k,
            options.score_threshold,
        )
    }

    /// Rendered knowledge for `query`; never fails
    pub fn retrieve(&self, query: &str, topic: &str, options: &SearchOptions) -> String {
        let hits = match self.try_retrieve(query, topic, options) {
            Ok(hits) => hits,
            Err(e) => {
                log::error!("Knowledge retrieval failed for topic {}: {}", topic, e);
                Vec::new()
            }
        };
        render_hits(query, &hits)
    }

    /// Agent-facing lookup keyed by expert type ("namenode", "datanode", "all", ...)
    pub fn search_diagnosis_knowledge(
        &self,
        query: &str,
        expert_type: &str,
        options: &SearchOptions,
    ) -> String {
        self.retrieve(query, expert_type, options)
    }
}

/// Render hits as the text block handed to the agent
///
/// Similarity is shown as `1 - distance` without clamping.
pub fn render_hits(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("No knowledge found related to '{}'", query);
    }

    let mut out = format!("Found {} relevant knowledge entries:\n\n", hits.len());
    for (idx, hit) in hits.iter().enumerate() {
        let _ = writeln!(
            out,
            "[Knowledge {}] (similarity: {:.2})",
            idx + 1,
            hit.similarity()
        );
        if let Some(source) = hit.entry.source_value() {
            let _ = writeln!(out, "Source: {}", source);
        }
        if let Some(desc) = hit.entry.desc_value() {
            let _ = writeln!(out, "Description: {}", desc);
        }
        let _ = writeln!(out, "Content: {}\n", hit.entry.text);
    }
    out
}
