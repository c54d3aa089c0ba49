//! Training module
//!
//! - `trainer`: the epoch loop, evaluation pass, and fit state machine
//! - `monitor`: the per-epoch checkpoint/early-stop decision and history
//!
//! `run_training` is the end-to-end entry point used by the CLI: it loads
//! both splits from a processed directory tree, trains, and leaves behind
//! the artifact plus an exported history.

pub mod monitor;
pub mod trainer;

use std::path::Path;

use burn::tensor::backend::AutodiffBackend;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use monitor::{CheckpointMonitor, EpochDecision, EpochRecord, TrainingHistory};
pub use trainer::{EvalMetrics, FitOutcome, Trainer, TrainingState};

use crate::dataset::batcher::CachedImageDataset;
use crate::dataset::loader::ImageFolder;
use crate::model::cnn::DinoClassifierConfig;
use crate::utils::error::{DinoError, Result};

/// Training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Epoch ceiling; early stopping usually ends the run sooner
    pub epochs: usize,
    /// Examples per gradient update
    pub batch_size: usize,
    /// Adam learning rate
    pub learning_rate: f64,
    /// Epochs without improvement before stopping
    pub patience: usize,
    /// Seed for epoch shuffling and augmentation draws
    pub seed: u64,
    /// Whether to augment training batches
    pub augment: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: crate::DEFAULT_EPOCHS,
            batch_size: crate::DEFAULT_BATCH_SIZE,
            learning_rate: 1e-3,
            patience: crate::DEFAULT_PATIENCE,
            seed: crate::DEFAULT_SEED,
            augment: true,
        }
    }
}

impl TrainingConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(DinoError::Config("epochs must be greater than 0".to_string()));
        }
        if self.batch_size == 0 {
            return Err(DinoError::Config(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        if self.learning_rate <= 0.0 {
            return Err(DinoError::Config(
                "learning_rate must be positive".to_string(),
            ));
        }
        if self.patience == 0 {
            return Err(DinoError::Config(
                "patience must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Name of the exported per-epoch metrics file, written next to the artifact
pub const HISTORY_FILE: &str = "training_history.json";

/// Train a classifier from a processed split tree.
///
/// Expects `data_dir/{train,test}/{class}/` as produced by the
/// preprocessor. Saves the best artifact under `artifact_stem` and exports
/// the training history next to it.
pub fn run_training<B: AutodiffBackend>(
    data_dir: &Path,
    artifact_stem: &Path,
    model_config: DinoClassifierConfig,
    config: TrainingConfig,
    device: B::Device,
) -> Result<FitOutcome> {
    config.validate()?;

    println!("{}", "Loading dataset...".cyan());
    let train_folder = ImageFolder::open(data_dir.join("train"))?;
    let test_folder = ImageFolder::open(data_dir.join("test"))?;

    println!("{}", "Train split:".cyan().bold());
    train_folder.stats().print();
    println!("{}", "Test split:".cyan().bold());
    test_folder.stats().print();

    let image_size = model_config.input_size as u32;
    println!("{}", "Caching decoded images...".cyan());
    let train = CachedImageDataset::from_folder(&train_folder, image_size, crate::POSITIVE_CLASS)?;
    let test = CachedImageDataset::from_folder(&test_folder, image_size, crate::POSITIVE_CLASS)?;

    if train.len() < config.batch_size {
        warn!(
            "training split ({}) is smaller than one batch ({})",
            train.len(),
            config.batch_size
        );
    }

    println!();
    println!("{}", "Training configuration:".cyan().bold());
    println!("  Training samples:  {}", train.len());
    println!("  Test samples:      {}", test.len());
    println!("  Epoch ceiling:     {}", config.epochs);
    println!("  Batch size:        {}", config.batch_size);
    println!("  Learning rate:     {}", config.learning_rate);
    println!("  Patience:          {}", config.patience);
    println!("  Augmentation:      {}", config.augment);
    println!();

    let mut trainer = Trainer::<B>::new(model_config, config, device);
    let outcome = trainer.fit(&train, &test, artifact_stem)?;

    let history_path = artifact_stem
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join(HISTORY_FILE);
    outcome.history.save(&history_path)?;

    println!();
    println!("{}", "Training complete!".green().bold());
    println!(
        "  Best epoch: {} (validation loss {:.4})",
        outcome.best_epoch + 1,
        outcome.best_val_loss
    );
    if outcome.stopped_early {
        println!("  Stopped early after {} epochs", outcome.history.len());
    }
    println!("  Artifact:   {:?}", crate::model::artifact::weights_path(artifact_stem));
    println!("  History:    {:?}", history_path);

    Ok(outcome)
}
