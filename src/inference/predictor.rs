//! Inference Predictor Module
//!
//! Loads the persisted artifact once and classifies individual images.
//! Preprocessing here mirrors training exactly: resize to the artifact's
//! input resolution, scale pixels to [0, 1], CHW layout. If the artifact
//! is missing or unreadable the load fails; a prediction is never
//! fabricated from a fresh model.

use std::path::{Path, PathBuf};
use std::time::Instant;

use burn::tensor::{backend::Backend, ElementConversion, Tensor};
use image::{imageops::FilterType, DynamicImage};
use serde::{Deserialize, Serialize};

use crate::model::artifact::load_artifact;
use crate::model::cnn::{DinoClassifier, DinoClassifierConfig};
use crate::utils::error::{DinoError, Result};

/// Result of classifying one image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Path to the input image (if applicable)
    pub image_path: Option<PathBuf>,
    /// Probability that the image depicts a dinosaur
    pub probability: f32,
    /// Decision at the 0.5 threshold
    pub is_dinosaur: bool,
    /// Confidence in the decision: max(p, 1 - p)
    pub confidence: f32,
    /// Inference time in milliseconds
    pub inference_time_ms: f64,
}

impl Prediction {
    /// Human-readable class label for the decision
    pub fn label(&self) -> &'static str {
        if self.is_dinosaur {
            "dinosaur"
        } else {
            "not_dinosaur"
        }
    }
}

impl std::fmt::Display for Prediction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(path) = &self.image_path {
            writeln!(f, "Image: {:?}", path)?;
        }
        writeln!(f, "Prediction: {}", self.label())?;
        writeln!(f, "P(dinosaur): {:.1}%", self.probability * 100.0)?;
        writeln!(f, "Confidence: {:.1}%", self.confidence * 100.0)?;
        write!(f, "Time: {:.2} ms", self.inference_time_ms)
    }
}

/// Predictor holding a loaded classifier
pub struct Predictor<B: Backend> {
    model: DinoClassifier<B>,
    image_size: u32,
    device: B::Device,
}

impl<B: Backend> Predictor<B> {
    /// Load a predictor from a persisted artifact stem.
    ///
    /// Fails with `ArtifactNotFound` / `InvalidArtifact` rather than
    /// falling back to an untrained model.
    pub fn load(artifact_stem: &Path, device: B::Device) -> Result<Self> {
        let (model, config) = load_artifact::<B>(artifact_stem, &device)?;
        Ok(Self {
            model,
            image_size: config.input_size as u32,
            device,
        })
    }

    /// Wrap an in-memory model (used when the model was just trained)
    pub fn from_model(
        model: DinoClassifier<B>,
        config: &DinoClassifierConfig,
        device: B::Device,
    ) -> Self {
        Self {
            model,
            image_size: config.input_size as u32,
            device,
        }
    }

    /// Expected input edge length
    pub fn image_size(&self) -> u32 {
        self.image_size
    }

    /// Resize and normalize one image to CHW floats in [0, 1]
    pub fn preprocess(&self, image: &DynamicImage) -> Vec<f32> {
        let rgb = image
            .resize_exact(self.image_size, self.image_size, FilterType::Lanczos3)
            .to_rgb8();

        let size = self.image_size as usize;
        let num_pixels = size * size;
        let mut data = vec![0.0f32; 3 * num_pixels];

        for (i, pixel) in rgb.pixels().enumerate() {
            data[i] = pixel[0] as f32 / 255.0;
            data[num_pixels + i] = pixel[1] as f32 / 255.0;
            data[2 * num_pixels + i] = pixel[2] as f32 / 255.0;
        }

        data
    }

    /// Classify one image of arbitrary size
    pub fn predict_image(&self, image: &DynamicImage) -> Prediction {
        let data = self.preprocess(image);
        let size = self.image_size as usize;

        let tensor = Tensor::<B, 1>::from_floats(data.as_slice(), &self.device)
            .reshape([1, 3, size, size]);

        let start = Instant::now();
        let probability: f32 = self.model.forward_probability(tensor).into_scalar().elem();
        let inference_time = start.elapsed();

        let is_dinosaur = probability >= 0.5;
        Prediction {
            image_path: None,
            probability,
            is_dinosaur,
            confidence: if is_dinosaur {
                probability
            } else {
                1.0 - probability
            },
            inference_time_ms: inference_time.as_secs_f64() * 1000.0,
        }
    }

    /// Classify an image from a file path
    pub fn predict_file(&self, path: &Path) -> Result<Prediction> {
        let image = image::open(path)
            .map_err(|e| DinoError::ImageLoad(path.to_path_buf(), e.to_string()))?;
        let mut prediction = self.predict_image(&image);
        prediction.image_path = Some(path.to_path_buf());
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::artifact::save_artifact;
    use image::{ImageBuffer, Rgb};
    use tempfile::TempDir;

    type TestBackend = burn::backend::NdArray;

    fn small_config() -> DinoClassifierConfig {
        DinoClassifierConfig::new()
            .with_input_size(32)
            .with_base_filters(4)
            .with_hidden_units(8)
    }

    fn test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 100])
        }))
    }

    #[test]
    fn test_preprocess_shape_and_range() {
        let device = Default::default();
        let config = small_config();
        let model = DinoClassifier::<TestBackend>::new(&config, &device);
        let predictor = Predictor::from_model(model, &config, device);

        // Arbitrary input size collapses to the artifact's resolution
        let data = predictor.preprocess(&test_image(123, 77));
        assert_eq!(data.len(), 3 * 32 * 32);
        assert!(data.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_predict_produces_unit_interval_probability() {
        let device = Default::default();
        let config = small_config();
        let model = DinoClassifier::<TestBackend>::new(&config, &device);
        let predictor = Predictor::from_model(model, &config, device);

        let prediction = predictor.predict_image(&test_image(64, 64));
        assert!(prediction.probability.is_finite());
        assert!((0.0..=1.0).contains(&prediction.probability));
        assert!(prediction.confidence >= 0.5);
        assert_eq!(
            prediction.is_dinosaur,
            prediction.probability >= 0.5
        );
    }

    #[test]
    fn test_loaded_predictor_matches_in_memory_model() {
        let device: <TestBackend as Backend>::Device = Default::default();
        let config = small_config();
        let model = DinoClassifier::<TestBackend>::new(&config, &device);

        let dir = TempDir::new().unwrap();
        let stem = dir.path().join("dinosaur_classifier");
        save_artifact(&model, &config, &stem).unwrap();

        let in_memory = Predictor::from_model(model, &config, device.clone());
        let loaded = Predictor::<TestBackend>::load(&stem, device).unwrap();

        let img = test_image(48, 48);
        let a = in_memory.predict_image(&img);
        let b = loaded.predict_image(&img);
        assert!((a.probability - b.probability).abs() < 1e-6);
    }

    #[test]
    fn test_missing_artifact_fails_loudly() {
        let device: <TestBackend as Backend>::Device = Default::default();
        let result = Predictor::<TestBackend>::load(Path::new("/no/such/model"), device);
        assert!(matches!(result, Err(DinoError::ArtifactNotFound(_))));
    }

    #[test]
    fn test_predict_file_missing_image() {
        let device = Default::default();
        let config = small_config();
        let model = DinoClassifier::<TestBackend>::new(&config, &device);
        let predictor = Predictor::from_model(model, &config, device);

        let result = predictor.predict_file(Path::new("/no/such/image.jpg"));
        assert!(matches!(result, Err(DinoError::ImageLoad(_, _))));
    }
}
