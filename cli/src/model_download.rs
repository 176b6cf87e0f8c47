//! Download of the Model2Vec embedding model
//!
//! Fetches the configured HuggingFace model into the cache directory
//! (`~/.diagnosis-kb/models/<org>--<name>/` by default), where model
//! discovery picks it up on the next start.

use anyhow::{anyhow, Context, Result};
use diagnosis_kb::embedding::{has_model_files, MODEL_FILES};
use diagnosis_kb::EmbedderConfig;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const HF_BASE_URL: &str = "https://huggingface.co";

/// Ensure the configured model is in the cache, downloading it if needed
pub fn ensure_model_downloaded(config: &EmbedderConfig) -> Result<PathBuf> {
    let model_dir = config
        .cached_model_dir()
        .ok_or_else(|| anyhow!("Cannot determine model cache directory"))?;

    if has_model_files(&model_dir) && !model_dir.join(".downloading").exists() {
        tracing::debug!("Model already available at: {}", model_dir.display());
        return Ok(model_dir);
    }

    download_model(&config.model_id, &model_dir)?;
    Ok(model_dir)
}

fn model_url(model_id: &str, filename: &str) -> String {
    format!("{HF_BASE_URL}/{model_id}/resolve/main/{filename}")
}

fn download_model(model_id: &str, target_dir: &Path) -> Result<()> {
    let marker = target_dir.join(".downloading");

    // Clean up partial downloads from a previous interrupted attempt
    if marker.exists() {
        tracing::warn!("Found partial download, cleaning up...");
        fs::remove_dir_all(target_dir).context("Failed to clean up partial download")?;
    }

    fs::create_dir_all(target_dir)
        .with_context(|| format!("Failed to create {}", target_dir.display()))?;
    fs::write(&marker, "").context("Failed to write download marker")?;

    tracing::info!("Downloading {model_id} to {}...", target_dir.display());

    for filename in MODEL_FILES {
        let url = model_url(model_id, filename);
        let dest = target_dir.join(filename);

        tracing::info!("  Downloading {filename}...");

        let response = ureq::get(&url)
            .call()
            .with_context(|| format!("Failed to download {filename}"))?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .with_context(|| format!("Failed to read {filename}"))?;

        let size_mb = bytes.len() as f64 / (1024.0 * 1024.0);
        tracing::info!("  {filename}: {size_mb:.1} MB");

        let mut file = fs::File::create(&dest)
            .with_context(|| format!("Failed to create {}", dest.display()))?;
        file.write_all(&bytes)
            .with_context(|| format!("Failed to write {}", dest.display()))?;
    }

    // Remove marker on success
    let _ = fs::remove_file(&marker);

    tracing::info!("Model download complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_model_url() {
        assert_eq!(
            model_url("minishlab/potion-base-8M", "tokenizer.json"),
            "https://huggingface.co/minishlab/potion-base-8M/resolve/main/tokenizer.json"
        );
    }

    #[test]
    fn test_existing_model_is_not_downloaded_again() {
        let cache = TempDir::new().unwrap();
        let config = EmbedderConfig {
            cache_dir: Some(cache.path().to_path_buf()),
            ..EmbedderConfig::default()
        };
        let model_dir = config.cached_model_dir().unwrap();
        fs::create_dir_all(&model_dir).unwrap();
        for f in MODEL_FILES {
            fs::write(model_dir.join(f), b"").unwrap();
        }

        assert_eq!(ensure_model_downloaded(&config).unwrap(), model_dir);
    }
}
