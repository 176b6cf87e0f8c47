//! Degenerate zero-vector embedder

use super::Embedder;
use crate::error::Result;

/// Returns all-zero vectors of a fixed dimension
///
/// Every vector is identical, so search degrades to insertion order. Used
/// when no model is configured or the model failed to load.
pub struct ZeroVectorEmbedder {
    dimension: usize,
    name: String,
}

impl ZeroVectorEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            name: format!("zero-{}", dimension),
        }
    }
}

impl Embedder for ZeroVectorEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        log::warn!("Using zero-vector embeddings; install a Model2Vec model for real search");
        Ok(vec![0.0; self.dimension])
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        log::warn!("Using zero-vector embeddings; install a Model2Vec model for real search");
        Ok(vec![vec![0.0; self.dimension]; texts.len()])
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.name
    }
}
