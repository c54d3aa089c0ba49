//! # Dino Classifier
//!
//! A binary image-classification pipeline built with the Burn framework:
//! is the photo a dinosaur, or not?
//!
//! ## Pipeline
//!
//! 1. **Preprocess**: clean and resize raw class directories, then split
//!    each class into disjoint train/test sets
//! 2. **Load**: read the split directory tree into cached, batched examples
//! 3. **Augment**: randomized label-preserving transforms, training only
//! 4. **Train**: CNN with binary cross-entropy, Adam, checkpoint-on-improve
//!    and early stopping on validation loss
//! 5. **Predict**: load the persisted artifact and classify a single image
//!
//! ## Modules
//!
//! - `dataset`: preprocessing, loading, batching, and augmentation
//! - `model`: CNN architecture and artifact persistence
//! - `training`: training loop, checkpoint/early-stop policy, history
//! - `inference`: single-image prediction over a saved artifact
//! - `utils`: errors, logging, and evaluation metrics

pub mod backend;
pub mod dataset;
pub mod inference;
pub mod model;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use dataset::augmentation::{AugmentationConfig, Augmenter};
pub use dataset::batcher::{CachedImageDataset, DinoBatch, DinoBatcher, DinoItem, EpochSampler};
pub use dataset::loader::{DatasetStats, ImageFolder, ImageSample};
pub use dataset::preprocess::{
    prepare_dataset, resize_and_clean_images, split_train_test, CleanReport, PreprocessConfig,
    PrepareSummary,
};
pub use inference::predictor::{Prediction, Predictor};
pub use model::artifact::{load_artifact, save_artifact};
pub use model::cnn::{DinoClassifier, DinoClassifierConfig};
pub use training::monitor::{CheckpointMonitor, EpochDecision, EpochRecord, TrainingHistory};
pub use training::trainer::{EvalMetrics, FitOutcome, Trainer, TrainingState};
pub use training::TrainingConfig;
pub use utils::error::{DinoError, Result};
pub use utils::metrics::BinaryConfusion;

/// Class-directory name treated as the positive class
pub const POSITIVE_CLASS: &str = "dinosaur";

/// Edge length of every example fed to the model
pub const IMAGE_SIZE: usize = 224;

/// Default batch size
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Default epoch ceiling
pub const DEFAULT_EPOCHS: usize = 30;

/// Default early-stopping patience (epochs without improvement)
pub const DEFAULT_PATIENCE: usize = 2;

/// Default held-out fraction per class
pub const DEFAULT_TEST_RATIO: f64 = 0.2;

/// Default random seed for reproducible sampling
pub const DEFAULT_SEED: u64 = 42;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
