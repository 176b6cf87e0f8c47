//! Knowledge base configuration
//!
//! Loaded from an optional JSON file. Every field has a default, so an empty
//! object (or no file at all) yields a working configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{KbError, Result};

/// Directory under `base_dir` that holds one subdirectory per collection
pub const KNOWLEDGE_BASE_DIR: &str = "knowledge_base";
/// Default pretrained Model2Vec model
pub const DEFAULT_MODEL_ID: &str = "minishlab/potion-base-8M";
/// Dimension of the zero-vector fallback embedder
pub const ZERO_VECTOR_DIM: usize = 384;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbConfig {
    /// Installation root; collections live under `<base_dir>/knowledge_base/`
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    #[serde(default)]
    pub embedder: EmbedderConfig,

    #[serde(default)]
    pub search: SearchOptions,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for KbConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            embedder: EmbedderConfig::default(),
            search: SearchOptions::default(),
        }
    }
}

impl KbConfig {
    /// Config rooted at `base_dir` with defaults elsewhere
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from `path` when given, otherwise defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        if self.embedder.zero_dimension == 0 {
            return Err(KbError::config("embedder.zero_dimension must be positive"));
        }
        Ok(())
    }

    /// Root directory holding all collections
    pub fn collections_root(&self) -> PathBuf {
        self.base_dir.join(KNOWLEDGE_BASE_DIR)
    }

    /// Storage directory of one collection
    pub fn collection_path(&self, name: &str) -> PathBuf {
        self.collections_root().join(name)
    }
}

/// Which embedder to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderKind {
    /// Model2Vec static embeddings, degrading to zero vectors if the model is missing
    #[default]
    Model2Vec,
    /// Always zero vectors
    ZeroVector,
}

/// Embedder selection and model resolution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderConfig {
    #[serde(default)]
    pub kind: EmbedderKind,

    /// HuggingFace model id used for the download cache layout
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Explicit local model directory
    #[serde(default)]
    pub model_dir: Option<PathBuf>,

    /// Directory downloaded models are cached in
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    #[serde(default = "default_zero_dimension")]
    pub zero_dimension: usize,
}

fn default_model_id() -> String {
    DEFAULT_MODEL_ID.to_string()
}

fn default_zero_dimension() -> usize {
    ZERO_VECTOR_DIM
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            kind: EmbedderKind::default(),
            model_id: default_model_id(),
            model_dir: None,
            cache_dir: None,
            zero_dimension: default_zero_dimension(),
        }
    }
}

impl EmbedderConfig {
    /// Zero-vector embedder with default settings
    pub fn zero_vector() -> Self {
        Self {
            kind: EmbedderKind::ZeroVector,
            ..Self::default()
        }
    }

    /// Cache directory, defaulting to `~/.diagnosis-kb/models`
    pub fn resolved_cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir.clone().or_else(|| {
            std::env::var_os("HOME")
                .or_else(|| std::env::var_os("USERPROFILE"))
                .map(|home| PathBuf::from(home).join(".diagnosis-kb").join("models"))
        })
    }

    /// Directory a downloaded copy of `model_id` lives in under the cache
    pub fn cached_model_dir(&self) -> Option<PathBuf> {
        self.resolved_cache_dir()
            .map(|dir| dir.join(self.model_id.replace('/', "--")))
    }
}

/// Per-query retrieval options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Maximum number of hits
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum score in [0, 1]; higher keeps fewer hits
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
}

fn default_top_k() -> usize {
    3
}

fn default_score_threshold() -> f32 {
    0.4
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            score_threshold: default_score_threshold(),
        }
    }
}

impl SearchOptions {
    pub fn new(top_k: usize, score_threshold: f32) -> Self {
        Self {
            top_k,
            score_threshold,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(KbError::config("search.top_k must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(KbError::config(format!(
                "search.score_threshold must be in [0, 1], got {}",
                self.score_threshold
            )));
        }
        Ok(())
    }
}
