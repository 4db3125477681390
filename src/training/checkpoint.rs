//! Trained-model persistence: safetensors weights + JSON metadata.
use candle_core::{Device, Tensor};
use std::collections::HashMap;
use std::path::Path;

use crate::Result;

/// Checkpoint metadata, stored as a JSON sidecar next to the weights
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct CheckpointMetadata {
    /// Epochs completed when the checkpoint was taken
    pub epochs_run: usize,
    /// Learning rate at checkpoint
    pub learning_rate: f64,
    /// Validation accuracy at checkpoint
    pub valid_accuracy: Option<f64>,
    /// Training configuration (as JSON string)
    pub config: Option<String>,
}

fn metadata_path(weights_path: &Path) -> std::path::PathBuf {
    weights_path.with_extension("json")
}

/// Save model parameters and metadata.
///
/// Weights go to `path` in safetensors format; metadata goes to the
/// same path with a `.json` extension.
pub fn save_checkpoint<P: AsRef<Path>>(
    tensors: &HashMap<String, Tensor>,
    path: P,
    metadata: &CheckpointMetadata,
) -> Result<()> {
    let path = path.as_ref();

    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }

    candle_core::safetensors::save(tensors, path)?;

    let json = serde_json::to_string_pretty(metadata)?;
    std::fs::write(metadata_path(path), json)?;

    log::info!("Checkpoint saved to {:?}", path);

    Ok(())
}

/// Load model parameters and metadata saved by [`save_checkpoint`].
///
/// A missing or unreadable metadata sidecar degrades to defaults
/// rather than failing the load.
pub fn load_checkpoint<P: AsRef<Path>>(
    path: P,
    device: &Device,
) -> Result<(HashMap<String, Tensor>, CheckpointMetadata)> {
    let path = path.as_ref();

    let tensors = candle_core::safetensors::load(path, device)?;

    let metadata = match std::fs::read(metadata_path(path)) {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
        Err(_) => {
            log::warn!("no metadata sidecar for {:?}, using defaults", path);
            CheckpointMetadata::default()
        }
    };

    Ok((tensors, metadata))
}
