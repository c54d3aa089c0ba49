//! Burn Dataset Integration
//!
//! Bridges the split directory tree to Burn tensors: items carry CHW float
//! data normalized to [0, 1] with a binary target (1 = dinosaur), the
//! cached dataset decodes every image once and keeps it in memory across
//! epochs, and the epoch sampler is the explicit restartable batch
//! sequence (reshuffled per epoch for training, stable for evaluation).

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use image::imageops::FilterType;
use image::RgbImage;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::dataset::augmentation::Augmenter;
use crate::dataset::loader::ImageFolder;
use crate::utils::error::{DinoError, Result};

/// A single example ready for batching
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DinoItem {
    /// Image data as flattened CHW float array [3 * H * W], in [0, 1]
    pub image: Vec<f32>,
    /// Binary target: 1 = positive class, 0 = negative
    pub target: i64,
    /// Source path (for debugging/logging)
    pub path: String,
}

impl DinoItem {
    /// Convert a decoded RGB image into CHW floats scaled to [0, 1]
    pub fn from_rgb(img: &RgbImage, target: i64, path: String) -> Self {
        let (width, height) = img.dimensions();
        let (width, height) = (width as usize, height as usize);
        let mut image = vec![0.0f32; 3 * height * width];

        for (x, y, pixel) in img.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            image[y * width + x] = pixel[0] as f32 / 255.0;
            image[height * width + y * width + x] = pixel[1] as f32 / 255.0;
            image[2 * height * width + y * width + x] = pixel[2] as f32 / 255.0;
        }

        Self {
            image,
            target,
            path,
        }
    }
}

/// In-memory dataset of decoded images.
///
/// Every sample is decoded and resized once at construction; the dataset
/// fits in memory at this problem's scale, so epochs after the first do no
/// disk I/O. Augmentation happens per access so each epoch sees fresh
/// transforms of the same cached pixels.
pub struct CachedImageDataset {
    images: Vec<RgbImage>,
    targets: Vec<i64>,
    paths: Vec<String>,
    image_size: u32,
}

impl CachedImageDataset {
    /// Decode all samples of a split into memory.
    ///
    /// The vocabulary must contain exactly two classes and include the
    /// positive class; targets are 1 for the positive class and 0
    /// otherwise. Images are re-resized here, so the loader tolerates
    /// upstream size inconsistencies.
    pub fn from_folder(
        folder: &ImageFolder,
        image_size: u32,
        positive_class: &str,
    ) -> Result<Self> {
        if folder.num_classes() != 2 {
            return Err(DinoError::Dataset(format!(
                "expected exactly 2 classes, found {}: {:?}",
                folder.num_classes(),
                folder.classes
            )));
        }
        let positive = folder.class_index(positive_class).ok_or_else(|| {
            DinoError::Dataset(format!(
                "positive class '{}' not found in {:?}",
                positive_class, folder.classes
            ))
        })?;

        let mut images = Vec::with_capacity(folder.len());
        let mut targets = Vec::with_capacity(folder.len());
        let mut paths = Vec::with_capacity(folder.len());

        for sample in &folder.samples {
            let img = image::open(&sample.path)
                .map_err(|e| DinoError::ImageLoad(sample.path.clone(), e.to_string()))?
                .resize_exact(image_size, image_size, FilterType::Triangle)
                .to_rgb8();

            images.push(img);
            targets.push((sample.label == positive) as i64);
            paths.push(sample.path.to_string_lossy().to_string());
        }

        Ok(Self {
            images,
            targets,
            paths,
            image_size,
        })
    }

    /// Build a dataset from already-decoded images (programmatic use)
    pub fn from_images(images: Vec<RgbImage>, targets: Vec<i64>, image_size: u32) -> Result<Self> {
        if images.len() != targets.len() {
            return Err(DinoError::Dataset(format!(
                "{} images but {} targets",
                images.len(),
                targets.len()
            )));
        }
        let paths = (0..images.len()).map(|i| format!("<memory:{}>", i)).collect();
        Ok(Self {
            images,
            targets,
            paths,
            image_size,
        })
    }

    /// Number of cached examples
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Check if the dataset is empty
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Edge length of the cached images
    pub fn image_size(&self) -> u32 {
        self.image_size
    }

    /// Number of positive-class examples
    pub fn num_positive(&self) -> usize {
        self.targets.iter().filter(|&&t| t == 1).count()
    }

    /// Plain item: cached pixels, no augmentation (evaluation path)
    pub fn item(&self, index: usize) -> Option<DinoItem> {
        let img = self.images.get(index)?;
        Some(DinoItem::from_rgb(
            img,
            self.targets[index],
            self.paths[index].clone(),
        ))
    }

    /// Augmented item: fresh random transform of the cached pixels
    /// (training path only)
    pub fn augmented_item(
        &self,
        index: usize,
        augmenter: &Augmenter,
        rng: &mut ChaCha8Rng,
    ) -> Option<DinoItem> {
        let img = self.images.get(index)?;
        let augmented = augmenter.augment(img.clone(), rng);
        Some(DinoItem::from_rgb(
            &augmented,
            self.targets[index],
            self.paths[index].clone(),
        ))
    }
}

impl Dataset<DinoItem> for CachedImageDataset {
    fn get(&self, index: usize) -> Option<DinoItem> {
        self.item(index)
    }

    fn len(&self) -> usize {
        self.images.len()
    }
}

/// Restartable batch index sequence over one dataset.
///
/// `reset(Some(rng))` starts a new epoch with a full-dataset reshuffle
/// (training); `reset(None)` restarts in stable order (evaluation).
#[derive(Debug, Clone)]
pub struct EpochSampler {
    indices: Vec<usize>,
    batch_size: usize,
}

impl EpochSampler {
    /// Create a sampler over `len` examples in identity order
    pub fn new(len: usize, batch_size: usize) -> Self {
        Self {
            indices: (0..len).collect(),
            batch_size: batch_size.max(1),
        }
    }

    /// Begin a new epoch, reshuffling when an RNG is supplied
    pub fn reset(&mut self, rng: Option<&mut ChaCha8Rng>) {
        if let Some(rng) = rng {
            self.indices.shuffle(rng);
        }
    }

    /// Iterate over the epoch's batches of indices
    pub fn batches(&self) -> std::slice::Chunks<'_, usize> {
        self.indices.chunks(self.batch_size)
    }

    /// Number of batches per epoch (last batch may be short)
    pub fn num_batches(&self) -> usize {
        self.indices.len().div_ceil(self.batch_size)
    }
}

/// A batch of examples as tensors
#[derive(Clone, Debug)]
pub struct DinoBatch<B: Backend> {
    /// Images with shape [batch_size, 3, height, width], values in [0, 1]
    pub images: Tensor<B, 4>,
    /// Binary targets with shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher stacking items into training batches
#[derive(Clone, Debug)]
pub struct DinoBatcher {
    image_size: usize,
}

impl DinoBatcher {
    /// Create a batcher for the given image edge length
    pub fn new(image_size: usize) -> Self {
        Self { image_size }
    }
}

impl<B: Backend> Batcher<B, DinoItem, DinoBatch<B>> for DinoBatcher {
    fn batch(&self, items: Vec<DinoItem>, device: &B::Device) -> DinoBatch<B> {
        let batch_size = items.len();
        let channels = 3;
        let height = self.image_size;
        let width = self.image_size;

        let images_data: Vec<f32> = items.iter().flat_map(|item| item.image.clone()).collect();
        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, channels, height, width]),
            device,
        );

        let targets_data: Vec<i64> = items.iter().map(|item| item.target).collect();
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [batch_size]), device);

        DinoBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use rand::SeedableRng;

    type TestBackend = burn::backend::NdArray;

    fn solid_image(size: u32, value: u8) -> RgbImage {
        ImageBuffer::from_pixel(size, size, Rgb([value, value, value]))
    }

    #[test]
    fn test_item_values_are_normalized() {
        let img = solid_image(8, 255);
        let item = DinoItem::from_rgb(&img, 1, "test".to_string());

        assert_eq!(item.image.len(), 3 * 8 * 8);
        assert!(item.image.iter().all(|&v| (v - 1.0).abs() < 1e-6));

        let dark = DinoItem::from_rgb(&solid_image(8, 0), 0, "test".to_string());
        assert!(dark.image.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_item_is_chw() {
        // One red pixel at (0, 0): channel planes must separate R from G/B
        let mut img = solid_image(4, 0);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        let item = DinoItem::from_rgb(&img, 0, "test".to_string());

        assert!((item.image[0] - 1.0).abs() < 1e-6); // R plane
        assert_eq!(item.image[16], 0.0); // G plane
        assert_eq!(item.image[32], 0.0); // B plane
    }

    #[test]
    fn test_cached_dataset_from_images() {
        let images = vec![solid_image(8, 10), solid_image(8, 200)];
        let dataset = CachedImageDataset::from_images(images, vec![1, 0], 8).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.num_positive(), 1);
        assert_eq!(dataset.item(0).unwrap().target, 1);
        assert_eq!(dataset.item(1).unwrap().target, 0);
        assert!(dataset.item(2).is_none());
    }

    #[test]
    fn test_cached_dataset_length_mismatch() {
        let result = CachedImageDataset::from_images(vec![solid_image(8, 0)], vec![1, 0], 8);
        assert!(matches!(result, Err(DinoError::Dataset(_))));
    }

    #[test]
    fn test_augmented_item_keeps_label_and_shape() {
        let dataset =
            CachedImageDataset::from_images(vec![solid_image(16, 100)], vec![1], 16).unwrap();
        let augmenter = Augmenter::with_defaults();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let item = dataset.augmented_item(0, &augmenter, &mut rng).unwrap();
        assert_eq!(item.target, 1);
        assert_eq!(item.image.len(), 3 * 16 * 16);
    }

    #[test]
    fn test_sampler_reshuffles_train_but_not_test() {
        let mut sampler = EpochSampler::new(50, 8);
        let initial: Vec<usize> = sampler.batches().flatten().copied().collect();

        // Stable reset keeps the evaluation order
        sampler.reset(None);
        let stable: Vec<usize> = sampler.batches().flatten().copied().collect();
        assert_eq!(initial, stable);

        // Shuffled reset permutes without losing indices
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        sampler.reset(Some(&mut rng));
        let shuffled: Vec<usize> = sampler.batches().flatten().copied().collect();
        assert_ne!(initial, shuffled);

        let mut sorted = shuffled.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, initial);
    }

    #[test]
    fn test_sampler_batch_count() {
        let sampler = EpochSampler::new(100, 32);
        assert_eq!(sampler.num_batches(), 4);
        assert_eq!(sampler.batches().count(), 4);
        assert_eq!(sampler.batches().last().unwrap().len(), 4);
    }

    #[test]
    fn test_batcher_shapes_and_targets() {
        let device = Default::default();
        let batcher = DinoBatcher::new(8);

        let items = vec![
            DinoItem::from_rgb(&solid_image(8, 0), 0, "a".to_string()),
            DinoItem::from_rgb(&solid_image(8, 255), 1, "b".to_string()),
        ];
        let batch: DinoBatch<TestBackend> = batcher.batch(items, &device);

        assert_eq!(batch.images.dims(), [2, 3, 8, 8]);
        assert_eq!(batch.targets.dims(), [2]);

        let targets: Vec<i64> = batch.targets.into_data().to_vec().unwrap();
        assert_eq!(targets, vec![0, 1]);
    }
}
