//! Dataset module: preprocessing, loading, batching, and augmentation.
//!
//! Data flows through this module in order:
//! raw class directories -> `preprocess` (clean, resize, split) ->
//! `loader` (scan the split tree) -> `batcher` (decode, cache, batch) ->
//! `augmentation` (training batches only).

pub mod augmentation;
pub mod batcher;
pub mod loader;
pub mod preprocess;

pub use augmentation::{AugmentationConfig, Augmenter};
pub use batcher::{CachedImageDataset, DinoBatch, DinoBatcher, DinoItem, EpochSampler};
pub use loader::{DatasetStats, ImageFolder, ImageSample};
pub use preprocess::{
    prepare_dataset, resize_and_clean_images, split_train_test, CleanReport, PreprocessConfig,
    PrepareSummary,
};

/// The two class-directory names expected under the raw data root
pub const CLASS_NAMES: [&str; 2] = ["dinosaur", "not_dinosaur"];

/// Raster file extensions accepted as input images (matched case-insensitively)
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// Check whether a path carries an accepted image extension
pub fn has_image_extension(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
