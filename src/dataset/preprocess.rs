//! Dataset Preparation Module
//!
//! Turns raw class directories into the processed split tree consumed by
//! training:
//!
//! ```text
//! processed/
//! ├── train/
//! │   ├── dinosaur/0000.jpg ...
//! │   └── not_dinosaur/0000.jpg ...
//! └── test/
//!     ├── dinosaur/...
//!     └── not_dinosaur/...
//! ```
//!
//! Cleaning normalizes every readable image to a fixed-size RGB JPEG;
//! unreadable files are skipped and counted, never fatal. The per-class
//! split shuffles with a caller-supplied seeded RNG so repeated runs are
//! reproducible.

use std::fs;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::dataset::has_image_extension;
use crate::utils::error::{DinoError, Result};
use crate::utils::logging::ProgressLogger;

/// Configuration for the preprocessing stage
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Edge length of the output square images
    pub image_size: u32,
    /// Fraction of each class held out as the test set
    pub test_ratio: f64,
    /// Optional cap on cleaned images per class
    pub max_images_per_class: Option<usize>,
    /// JPEG encoding quality for cleaned images
    pub jpeg_quality: u8,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            image_size: crate::IMAGE_SIZE as u32,
            test_ratio: crate::DEFAULT_TEST_RATIO,
            max_images_per_class: None,
            jpeg_quality: 95,
        }
    }
}

/// Outcome of cleaning one class directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanReport {
    /// Images successfully cleaned and written
    pub cleaned: usize,
    /// Unreadable or corrupt files skipped
    pub skipped: usize,
}

/// Per-class outcome of a full preparation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassSummary {
    pub class: String,
    pub cleaned: usize,
    pub skipped: usize,
    pub train: usize,
    pub test: usize,
}

/// Outcome of a full preparation run across all classes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrepareSummary {
    pub classes: Vec<ClassSummary>,
}

impl PrepareSummary {
    /// Total cleaned images across all classes
    pub fn total_cleaned(&self) -> usize {
        self.classes.iter().map(|c| c.cleaned).sum()
    }

    /// Largest-to-smallest class size ratio among non-empty classes
    pub fn imbalance_ratio(&self) -> Option<f64> {
        let counts: Vec<usize> = self
            .classes
            .iter()
            .map(|c| c.cleaned)
            .filter(|&n| n > 0)
            .collect();
        let min = *counts.iter().min()?;
        let max = *counts.iter().max()?;
        Some(max as f64 / min as f64)
    }
}

/// Clean one class directory: decode every accepted raster file, normalize
/// to RGB, resize to the configured square, and write sequentially numbered
/// JPEGs into `output_dir`.
///
/// Unreadable files are logged and counted in the report; they never abort
/// the run. Output names are dense: `0000.jpg .. {cleaned-1:04}.jpg`.
pub fn resize_and_clean_images(
    input_dir: &Path,
    output_dir: &Path,
    config: &PreprocessConfig,
) -> Result<CleanReport> {
    if !input_dir.exists() {
        return Err(DinoError::PathNotFound(input_dir.to_path_buf()));
    }
    fs::create_dir_all(output_dir)?;

    let mut entries: Vec<PathBuf> = WalkDir::new(input_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.path().to_path_buf())
        .filter(|p| has_image_extension(p))
        .collect();
    entries.sort();

    let cap = config.max_images_per_class.unwrap_or(usize::MAX);
    let mut report = CleanReport::default();
    let mut progress = ProgressLogger::new("Cleaning", entries.len().min(cap)).with_interval(50);

    for path in &entries {
        if report.cleaned >= cap {
            break;
        }
        match clean_one(path, output_dir, report.cleaned, config) {
            Ok(()) => {
                report.cleaned += 1;
                progress.increment();
            }
            Err(e) => {
                warn!("skipping unreadable image {:?}: {}", path, e);
                report.skipped += 1;
            }
        }
    }
    progress.finish();

    info!(
        "cleaned {} images from {:?} ({} skipped)",
        report.cleaned, input_dir, report.skipped
    );
    Ok(report)
}

fn clean_one(
    path: &Path,
    output_dir: &Path,
    index: usize,
    config: &PreprocessConfig,
) -> Result<()> {
    let img = image::open(path)
        .map_err(|e| DinoError::ImageLoad(path.to_path_buf(), e.to_string()))?;

    // to_rgb8 collapses grayscale, RGBA, and palette inputs to 3 channels
    let rgb = img
        .resize_exact(config.image_size, config.image_size, FilterType::Lanczos3)
        .to_rgb8();

    let output_path = output_dir.join(format!("{:04}.jpg", index));
    let mut out = fs::File::create(&output_path)?;
    let encoder = JpegEncoder::new_with_quality(&mut out, config.jpeg_quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| DinoError::Dataset(format!("failed to encode {:?}: {}", output_path, e)))?;

    Ok(())
}

/// Split cleaned images into disjoint train/test sets by copy.
///
/// Filenames are shuffled with the caller's RNG, the first
/// `(1 - test_ratio)` fraction goes to `train_dir`, the remainder to
/// `test_dir`. Returns `(n_train, n_test)`; the counts always sum to the
/// cleaned count and the two sets share no filename.
pub fn split_train_test(
    input_dir: &Path,
    train_dir: &Path,
    test_dir: &Path,
    test_ratio: f64,
    rng: &mut ChaCha8Rng,
) -> Result<(usize, usize)> {
    if !(0.0..1.0).contains(&test_ratio) {
        return Err(DinoError::Config(format!(
            "test_ratio must be in [0.0, 1.0), got {}",
            test_ratio
        )));
    }
    if !input_dir.exists() {
        return Err(DinoError::PathNotFound(input_dir.to_path_buf()));
    }
    fs::create_dir_all(train_dir)?;
    fs::create_dir_all(test_dir)?;

    let mut names: Vec<String> = fs::read_dir(input_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| has_image_extension(p))
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .collect();
    names.sort();
    names.shuffle(rng);

    let split_idx = (names.len() as f64 * (1.0 - test_ratio)) as usize;

    for (i, name) in names.iter().enumerate() {
        let dest_dir = if i < split_idx { train_dir } else { test_dir };
        fs::copy(input_dir.join(name), dest_dir.join(name))?;
    }

    info!(
        "split {:?}: {} train, {} test",
        input_dir,
        split_idx,
        names.len() - split_idx
    );
    Ok((split_idx, names.len() - split_idx))
}

/// Run the full preprocessing stage: clean and split every class directory
/// under `raw_root` into `processed_root/{train,test}/{class}/`.
///
/// A missing raw root is fatal; an empty class directory is a warning and
/// the remaining classes proceed. Surfaces a warning when class sizes are
/// strongly imbalanced.
pub fn prepare_dataset(
    raw_root: &Path,
    processed_root: &Path,
    config: &PreprocessConfig,
    rng: &mut ChaCha8Rng,
) -> Result<PrepareSummary> {
    if !raw_root.exists() {
        return Err(DinoError::PathNotFound(raw_root.to_path_buf()));
    }

    let mut classes: Vec<String> = fs::read_dir(raw_root)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|e| e.file_name().to_str().map(|s| s.to_string()))
        .collect();
    classes.sort();

    if classes.is_empty() {
        return Err(DinoError::Dataset(format!(
            "no class directories found under {:?}",
            raw_root
        )));
    }
    if classes != crate::dataset::CLASS_NAMES {
        warn!(
            "expected class directories {:?}, found {:?}",
            crate::dataset::CLASS_NAMES,
            classes
        );
    }

    let mut summary = PrepareSummary::default();

    for class in &classes {
        info!("processing class '{}'", class);

        let raw_dir = raw_root.join(class);
        let staging_dir = processed_root.join(format!("tmp_{}", class));

        let report = resize_and_clean_images(&raw_dir, &staging_dir, config)?;

        if report.cleaned == 0 {
            warn!("class '{}' has no usable images, skipping split", class);
            fs::remove_dir_all(&staging_dir)?;
            summary.classes.push(ClassSummary {
                class: class.clone(),
                cleaned: 0,
                skipped: report.skipped,
                train: 0,
                test: 0,
            });
            continue;
        }

        let (train, test) = split_train_test(
            &staging_dir,
            &processed_root.join("train").join(class),
            &processed_root.join("test").join(class),
            config.test_ratio,
            rng,
        )?;
        fs::remove_dir_all(&staging_dir)?;

        summary.classes.push(ClassSummary {
            class: class.clone(),
            cleaned: report.cleaned,
            skipped: report.skipped,
            train,
            test,
        });
    }

    if let Some(ratio) = summary.imbalance_ratio() {
        if ratio > 2.0 {
            warn!("class imbalance ratio {:.1}:1 - consider rebalancing", ratio);
        } else {
            info!("class imbalance ratio {:.1}:1", ratio);
        }
    }

    Ok(summary)
}
