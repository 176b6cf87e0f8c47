//! Model2Vec static embeddings
//!
//! Fast embeddings from static token lookup tables.

use super::Embedder;
use crate::error::{KbError, Result};
use std::path::Path;

/// Model2Vec configuration
#[derive(Debug, Clone)]
pub struct Model2VecConfig {
    /// Whether to normalize embeddings (default: true)
    pub normalize: bool,
}

impl Default for Model2VecConfig {
    fn default() -> Self {
        Self { normalize: true }
    }
}

/// Model2Vec embedding model wrapper
pub struct Model2VecEmbedder {
    model: model2vec::Model2Vec,
    config: Model2VecConfig,
    dimension: usize,
    name: String,
}

impl Model2VecEmbedder {
    /// Load Model2Vec from local path
    ///
    /// Required files in the directory:
    /// - model.safetensors
    /// - tokenizer.json
    /// - config.json
    pub fn from_path(model_path: &Path) -> Result<Self> {
        Self::from_path_with_config(model_path, Model2VecConfig::default())
    }

    /// Load Model2Vec with custom configuration
    pub fn from_path_with_config(model_path: &Path, config: Model2VecConfig) -> Result<Self> {
        let path_str = model_path
            .to_str()
            .ok_or_else(|| KbError::model("Invalid UTF-8 in model path"))?;

        let safetensors_path = model_path.join("model.safetensors");
        if !safetensors_path.exists() {
            return Err(KbError::model(format!(
                "Model2Vec model not found at: {}",
                safetensors_path.display()
            )));
        }

        log::info!("Loading Model2Vec from: {}", model_path.display());

        let model = model2vec::Model2Vec::from_pretrained(path_str, Some(config.normalize), None)
            .map_err(|e| KbError::model(format!("Failed to load Model2Vec: {}", e)))?;

        // Dimension is not in the config file, so measure it on one input
        let sample = model
            .encode(["test"])
            .map_err(|e| KbError::model(format!("Failed to encode test string: {}", e)))?;
        let dimension = sample.shape()[1];

        log::info!(
            "Loaded Model2Vec ({}d, normalize: {})",
            dimension,
            config.normalize
        );

        Ok(Self {
            model,
            config,
            dimension,
            name: format!("model2vec-{}", dimension),
        })
    }

    /// Get configuration
    pub fn config(&self) -> &Model2VecConfig {
        &self.config
    }
}

impl Embedder for Model2VecEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self
            .model
            .encode([text])
            .map_err(|e| KbError::embedding(format!("Failed to encode text: {}", e)))?;

        Ok(embeddings.row(0).to_vec())
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let embeddings = self
            .model
            .encode(texts)
            .map_err(|e| KbError::embedding(format!("Failed to encode texts: {}", e)))?;

        Ok(embeddings
            .rows()
            .into_iter()
            .map(|row| row.to_vec())
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.name
    }
}
