//! Embedding module
//!
//! Maps text to fixed-dimension vectors. Model2Vec provides real static
//! embeddings; the zero-vector embedder keeps the pipeline running when no
//! model is available.

mod discovery;
mod engine;
mod static_model;
mod zero;

pub use discovery::{find_model_path, has_model_files, MODEL_FILES, MODEL_PATH_ENV};
pub use engine::VectorEngine;
pub use static_model::{Model2VecConfig, Model2VecEmbedder};
pub use zero::ZeroVectorEmbedder;

use crate::error::Result;

/// Embedding model abstraction
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Get embedding dimension
    fn dimension(&self) -> usize;

    /// Get model name/identifier
    fn name(&self) -> &str;
}
