//! Diagnosis Knowledge Base
//!
//! Vector-backed knowledge retrieval for a cluster diagnosis assistant.
//! Short passages live in named topical collections; queries are embedded
//! and matched by cosine distance, within one collection or across all.
//!
//! ## Features
//!
//! - **Topical collections** - one independently persisted vector store per topic
//! - **Embedding cache** - Model2Vec static embeddings with a per-text cache
//! - **Graceful degradation** - missing models, unreadable stores and failed
//!   searches turn into "no knowledge found" instead of errors
//! - **HNSW search** - instant-distance graph for larger collections
//!
//! ## Example
//!
//! ```ignore
//! use diagnosis_kb::{KbConfig, KnowledgeRetriever, SearchOptions};
//!
//! let retriever = KnowledgeRetriever::from_config(KbConfig::default(), None);
//! let text = retriever.search_diagnosis_knowledge(
//!     "NameNode fails to start",
//!     "namenode",
//!     &SearchOptions::default(),
//! );
//! println!("{text}");
//! ```

pub mod collection;
pub mod config;
pub mod embedding;
pub mod entry;
pub mod error;
pub mod index;
pub mod registry;
pub mod retrieval;
pub mod samples;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use collection::{max_allowed_distance, Collection, DISTANCE_SCALE};
pub use config::{EmbedderConfig, EmbedderKind, KbConfig, SearchOptions};
pub use embedding::{Embedder, VectorEngine};
pub use entry::{Entry, EntryId, Metadata, SearchHit, StoredEntry};
pub use error::{KbError, Result};
pub use registry::{match_topic, Registry, DEFAULT_COLLECTIONS};
pub use retrieval::{render_hits, KnowledgeRetriever};
pub use samples::seed_sample_knowledge;
