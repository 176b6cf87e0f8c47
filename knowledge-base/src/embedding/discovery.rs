//! Model path discovery utilities
//!
//! Finds a local Model2Vec model across the supported locations.

use crate::config::EmbedderConfig;
use crate::error::{KbError, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding every other model location
pub const MODEL_PATH_ENV: &str = "DIAGNOSIS_KB_MODEL_PATH";

/// Files a Model2Vec model directory must contain
pub const MODEL_FILES: &[&str] = &["model.safetensors", "tokenizer.json", "config.json"];

/// Whether `dir` holds a complete model
pub fn has_model_files(dir: &Path) -> bool {
    MODEL_FILES.iter().all(|f| dir.join(f).exists())
}

/// Find the Model2Vec model path with priority:
/// 1. DIAGNOSIS_KB_MODEL_PATH environment variable
/// 2. `model_dir` from configuration
/// 3. Bundled location (`<install_root>/models/model2vec`)
/// 4. Download cache (`<cache_dir>/<model id>`)
pub fn find_model_path(config: &EmbedderConfig, install_root: Option<&Path>) -> Result<PathBuf> {
    if let Ok(env_path) = std::env::var(MODEL_PATH_ENV) {
        let path = PathBuf::from(&env_path);
        if has_model_files(&path) {
            log::info!("Using {}: {}", MODEL_PATH_ENV, path.display());
            return Ok(path);
        }
        log::warn!("{} set but model not found: {}", MODEL_PATH_ENV, env_path);
    }

    if let Some(dir) = &config.model_dir {
        if has_model_files(dir) {
            log::info!("Using configured model: {}", dir.display());
            return Ok(dir.clone());
        }
        log::warn!("Configured model_dir has no model: {}", dir.display());
    }

    if let Some(root) = install_root {
        let bundled = root.join("models").join("model2vec");
        if has_model_files(&bundled) {
            log::info!("Using bundled Model2Vec: {}", bundled.display());
            return Ok(bundled);
        }
    }

    if let Some(cached) = config.cached_model_dir() {
        if has_model_files(&cached) {
            log::info!("Using cached Model2Vec: {}", cached.display());
            return Ok(cached);
        }
    }

    Err(KbError::model(format!(
        "Model2Vec model not found. Checked:\n\
         - {} environment variable\n\
         - embedder.model_dir from config\n\
         - bundled location (<install root>/models/model2vec)\n\
         - download cache for {}\n\
         \n\
         Run `diagnosis-kb --download-model` to fetch it.",
        MODEL_PATH_ENV, config.model_id
    )))
}
