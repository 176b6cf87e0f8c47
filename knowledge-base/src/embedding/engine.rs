//! Vector embedding engine
//!
//! High-level API for generating and caching embeddings.

use super::discovery::find_model_path;
use super::static_model::Model2VecEmbedder;
use super::zero::ZeroVectorEmbedder;
use super::Embedder;
use crate::config::{EmbedderConfig, EmbedderKind};
use crate::error::{KbError, Result};
use dashmap::DashMap;
use std::path::Path;

/// Vector embedding engine with caching
///
/// Wraps one embedder with a DashMap cache keyed by text. Shared by every
/// collection of a registry so the model is loaded once.
pub struct VectorEngine {
    model: Box<dyn Embedder>,
    cache: DashMap<String, Vec<f32>>,
    dimension: usize,
}

impl VectorEngine {
    /// Build the engine selected by `config`
    ///
    /// A Model2Vec engine whose model cannot be found or loaded degrades to
    /// zero vectors with a warning; construction itself never fails.
    pub fn from_config(config: &EmbedderConfig, install_root: Option<&Path>) -> Self {
        match config.kind {
            EmbedderKind::ZeroVector => Self::zero_vector(config.zero_dimension),
            EmbedderKind::Model2Vec => {
                let loaded = find_model_path(config, install_root)
                    .and_then(|path| Model2VecEmbedder::from_path(&path));
                match loaded {
                    Ok(model) => {
                        log::info!("VectorEngine ready ({}d, {})", model.dimension(), model.name());
                        Self::with_embedder(Box::new(model))
                    }
                    Err(e) => {
                        log::warn!("{}; falling back to zero-vector embeddings", e);
                        Self::zero_vector(config.zero_dimension)
                    }
                }
            }
        }
    }

    /// Engine producing zero vectors of `dimension`
    pub fn zero_vector(dimension: usize) -> Self {
        Self::with_embedder(Box::new(ZeroVectorEmbedder::new(dimension)))
    }

    /// Engine over an arbitrary embedder
    pub fn with_embedder(model: Box<dyn Embedder>) -> Self {
        let dimension = model.dimension();
        Self {
            model,
            cache: DashMap::new(),
            dimension,
        }
    }

    /// Generate embedding with caching
    pub fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self.cache.get(text) {
            return Ok(cached.clone());
        }

        let embedding = self.model.embed(text)?;
        self.check_dimension(&embedding)?;
        self.cache.insert(text.to_string(), embedding.clone());
        Ok(embedding)
    }

    /// Batch embed with caching; output order matches `texts`
    pub fn embed_many(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results: Vec<Option<Vec<f32>>> = texts
            .iter()
            .map(|text| self.cache.get(*text).map(|v| v.clone()))
            .collect();

        let uncached: Vec<(usize, &str)> = results
            .iter()
            .enumerate()
            .filter(|(_, cached)| cached.is_none())
            .map(|(i, _)| (i, texts[i]))
            .collect();

        if uncached.is_empty() {
            return Ok(results.into_iter().flatten().collect());
        }

        let uncached_texts: Vec<&str> = uncached.iter().map(|(_, t)| *t).collect();
        let new_embeddings = self.model.embed_batch(&uncached_texts)?;
        if new_embeddings.len() != uncached_texts.len() {
            return Err(KbError::embedding(format!(
                "Embedder returned {} vectors for {} texts",
                new_embeddings.len(),
                uncached_texts.len()
            )));
        }

        for ((idx, text), emb) in uncached.iter().zip(new_embeddings.into_iter()) {
            self.check_dimension(&emb)?;
            self.cache.insert(text.to_string(), emb.clone());
            results[*idx] = Some(emb);
        }

        Ok(results.into_iter().flatten().collect())
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dimension {
            return Err(KbError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }
        Ok(())
    }

    /// Get embedding dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Name of the underlying embedder
    pub fn name(&self) -> &str {
        self.model.name()
    }

    /// Get cache size
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    /// Clear the cache
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
