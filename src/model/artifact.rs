//! Persisted Model Artifact
//!
//! The artifact is the sole contract between training and inference: an
//! architecture descriptor (`<stem>.json`) plus a weights record
//! (`<stem>.mpk`). Loading rebuilds a callable classifier without the
//! caller re-declaring the architecture, and never falls back to a
//! freshly initialized model: a missing or unreadable artifact is a
//! distinguishable, fatal error.

use std::path::{Path, PathBuf};

use burn::config::Config;
use burn::module::Module;
use burn::record::CompactRecorder;
use burn::tensor::backend::Backend;

use crate::model::cnn::{DinoClassifier, DinoClassifierConfig};
use crate::utils::error::{DinoError, Result};

/// Path of the architecture descriptor for an artifact stem
pub fn architecture_path(stem: &Path) -> PathBuf {
    stem.with_extension("json")
}

/// Path of the weights record for an artifact stem
pub fn weights_path(stem: &Path) -> PathBuf {
    stem.with_extension("mpk")
}

/// Write the model and its architecture descriptor under one stem.
///
/// Creates parent directories as needed. Overwrites any previous artifact
/// at the same stem, so each improved checkpoint is durable immediately.
pub fn save_artifact<B: Backend>(
    model: &DinoClassifier<B>,
    config: &DinoClassifierConfig,
    stem: &Path,
) -> Result<()> {
    if let Some(parent) = stem.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    config
        .save(architecture_path(stem))
        .map_err(|e| DinoError::Serialization(format!("failed to save architecture: {}", e)))?;

    let recorder = CompactRecorder::new();
    model
        .clone()
        .save_file(stem, &recorder)
        .map_err(|e| DinoError::Serialization(format!("failed to save weights: {:?}", e)))?;

    Ok(())
}

/// Reconstruct a callable classifier from an artifact stem.
///
/// Returns `ArtifactNotFound` when either file is missing and
/// `InvalidArtifact` when a file exists but cannot be read back.
pub fn load_artifact<B: Backend>(
    stem: &Path,
    device: &B::Device,
) -> Result<(DinoClassifier<B>, DinoClassifierConfig)> {
    let arch_path = architecture_path(stem);
    let record_path = weights_path(stem);

    if !arch_path.exists() {
        return Err(DinoError::ArtifactNotFound(arch_path));
    }
    if !record_path.exists() {
        return Err(DinoError::ArtifactNotFound(record_path));
    }

    let config = DinoClassifierConfig::load(&arch_path)
        .map_err(|e| DinoError::InvalidArtifact(arch_path, e.to_string()))?;

    let recorder = CompactRecorder::new();
    let model = DinoClassifier::<B>::new(&config, device)
        .load_file(stem, &recorder, device)
        .map_err(|e| DinoError::InvalidArtifact(record_path, format!("{:?}", e)))?;

    Ok((model, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Tensor;
    use tempfile::TempDir;

    type TestBackend = burn::backend::NdArray;

    fn small_config() -> DinoClassifierConfig {
        DinoClassifierConfig::new()
            .with_input_size(32)
            .with_base_filters(4)
            .with_hidden_units(8)
    }

    fn fixed_input(device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 4> {
        let values: Vec<f32> = (0..3 * 32 * 32).map(|i| (i % 255) as f32 / 255.0).collect();
        Tensor::<TestBackend, 1>::from_floats(values.as_slice(), device).reshape([1, 3, 32, 32])
    }

    #[test]
    fn test_round_trip_preserves_prediction() {
        let device = Default::default();
        let config = small_config();
        let model = DinoClassifier::<TestBackend>::new(&config, &device);

        let input = fixed_input(&device);
        let before: f32 = model.forward_probability(input.clone()).into_scalar();

        let dir = TempDir::new().unwrap();
        let stem = dir.path().join("dinosaur_classifier");
        save_artifact(&model, &config, &stem).unwrap();

        let (loaded, loaded_config) = load_artifact::<TestBackend>(&stem, &device).unwrap();
        assert_eq!(loaded_config.input_size, 32);

        let after: f32 = loaded.forward_probability(input).into_scalar();
        assert!(
            (before - after).abs() < 1e-6,
            "prediction drifted across save/load: {} vs {}",
            before,
            after
        );
    }

    #[test]
    fn test_missing_artifact_is_not_found() {
        let device: <TestBackend as Backend>::Device = Default::default();
        let dir = TempDir::new().unwrap();
        let stem = dir.path().join("nope");

        let result = load_artifact::<TestBackend>(&stem, &device);
        assert!(matches!(result, Err(DinoError::ArtifactNotFound(_))));
    }

    #[test]
    fn test_garbage_artifact_is_invalid_not_fresh() {
        let device: <TestBackend as Backend>::Device = Default::default();
        let dir = TempDir::new().unwrap();
        let stem = dir.path().join("garbage");

        std::fs::write(architecture_path(&stem), b"{ not json").unwrap();
        std::fs::write(weights_path(&stem), b"junk bytes").unwrap();

        let result = load_artifact::<TestBackend>(&stem, &device);
        assert!(matches!(result, Err(DinoError::InvalidArtifact(_, _))));
    }

    #[test]
    fn test_weights_missing_is_not_found() {
        let device: <TestBackend as Backend>::Device = Default::default();
        let dir = TempDir::new().unwrap();
        let stem = dir.path().join("half");

        small_config().save(architecture_path(&stem)).unwrap();

        let result = load_artifact::<TestBackend>(&stem, &device);
        assert!(matches!(result, Err(DinoError::ArtifactNotFound(_))));
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let device = Default::default();
        let config = small_config();
        let model = DinoClassifier::<TestBackend>::new(&config, &device);

        let dir = TempDir::new().unwrap();
        let stem = dir.path().join("models/nested/dinosaur_classifier");
        save_artifact(&model, &config, &stem).unwrap();

        assert!(architecture_path(&stem).exists());
        assert!(weights_path(&stem).exists());
    }
}
