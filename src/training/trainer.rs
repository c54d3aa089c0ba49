//! Training Loop
//!
//! A custom training loop over Burn's autodiff API: forward pass, binary
//! cross-entropy on logits, backward pass, Adam update. Each epoch ends
//! with a full evaluation pass over the stable test sequence on the inner
//! (non-autodiff) backend, after which the checkpoint/early-stop decision
//! is made. Every improved checkpoint is written to disk immediately, so
//! an interrupted run keeps its best completed epoch.

use std::path::Path;

use burn::{
    data::dataloader::batcher::Batcher,
    module::AutodiffModule,
    nn::loss::BinaryCrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{
        activation::sigmoid,
        backend::{AutodiffBackend, Backend},
        ElementConversion,
    },
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::dataset::augmentation::{AugmentationConfig, Augmenter};
use crate::dataset::batcher::{CachedImageDataset, DinoBatch, DinoBatcher, EpochSampler};
use crate::model::artifact::{load_artifact, save_artifact};
use crate::model::cnn::{DinoClassifier, DinoClassifierConfig};
use crate::training::monitor::{CheckpointMonitor, EpochDecision, EpochRecord, TrainingHistory};
use crate::training::TrainingConfig;
use crate::utils::error::{DinoError, Result};
use crate::utils::logging::TrainingLogger;
use crate::utils::metrics::BinaryConfusion;

/// Mutable bookkeeping for a training run
#[derive(Debug, Clone, Default)]
pub struct TrainingState {
    /// Current epoch (0-indexed)
    pub epoch: usize,
    /// Gradient updates performed so far
    pub iteration: usize,
    /// Training examples consumed so far
    pub samples_seen: usize,
}

/// Metrics from one evaluation pass
#[derive(Debug, Clone)]
pub struct EvalMetrics {
    pub loss: f64,
    pub accuracy: f64,
    pub confusion: BinaryConfusion,
}

/// Result of a completed training run
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub history: TrainingHistory,
    pub stopped_early: bool,
    pub best_epoch: usize,
    pub best_val_loss: f64,
}

/// Trainer for the classifier. Sole writer of the model parameters during
/// a run.
pub struct Trainer<B: AutodiffBackend> {
    pub model: DinoClassifier<B>,
    pub model_config: DinoClassifierConfig,
    pub config: TrainingConfig,
    pub state: TrainingState,
    device: B::Device,
    batcher: DinoBatcher,
}

impl<B: AutodiffBackend> Trainer<B> {
    /// Create a trainer with a freshly initialized model
    pub fn new(
        model_config: DinoClassifierConfig,
        config: TrainingConfig,
        device: B::Device,
    ) -> Self {
        let model = DinoClassifier::new(&model_config, &device);
        let batcher = DinoBatcher::new(model_config.input_size);

        Self {
            model,
            model_config,
            config,
            state: TrainingState::default(),
            device,
            batcher,
        }
    }

    /// One full pass over the training split.
    ///
    /// Returns (average loss, accuracy). A non-finite batch loss aborts the
    /// run with `DivergentLoss`.
    fn train_epoch<O>(
        &mut self,
        optimizer: &mut O,
        dataset: &CachedImageDataset,
        sampler: &EpochSampler,
        augmenter: Option<&Augmenter>,
        rng: &mut ChaCha8Rng,
    ) -> Result<(f64, f64)>
    where
        O: Optimizer<DinoClassifier<B>, B>,
    {
        let loss_fn = BinaryCrossEntropyLossConfig::new()
            .with_logits(true)
            .init(&self.device);

        let mut total_loss = 0.0f64;
        let mut correct = 0usize;
        let mut total = 0usize;
        let num_batches = sampler.num_batches();

        for (batch_idx, indices) in sampler.batches().enumerate() {
            let items: Vec<_> = indices
                .iter()
                .filter_map(|&i| match augmenter {
                    Some(augmenter) => dataset.augmented_item(i, augmenter, rng),
                    None => dataset.item(i),
                })
                .collect();
            if items.is_empty() {
                continue;
            }
            let batch: DinoBatch<B> = self.batcher.batch(items, &self.device);
            let batch_len = batch.targets.dims()[0];

            let logits = self.model.forward(batch.images.clone()).squeeze::<1>(1);
            let loss = loss_fn.forward(logits.clone(), batch.targets.clone());

            let loss_value: f64 = loss.clone().into_scalar().elem();
            if !loss_value.is_finite() {
                return Err(DinoError::DivergentLoss {
                    epoch: self.state.epoch,
                    loss: loss_value,
                });
            }
            total_loss += loss_value;

            let predictions = sigmoid(logits).greater_equal_elem(0.5).int();
            let batch_correct: i64 = predictions
                .equal(batch.targets.clone())
                .int()
                .sum()
                .into_scalar()
                .elem();
            correct += batch_correct as usize;
            total += batch_len;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &self.model);
            self.model = optimizer.step(self.config.learning_rate, self.model.clone(), grads);

            self.state.iteration += 1;
            self.state.samples_seen += batch_len;

            if (batch_idx + 1) % 10 == 0 || batch_idx == num_batches - 1 {
                debug!(
                    "  batch {}/{}: loss = {:.4}, acc = {:.2}%",
                    batch_idx + 1,
                    num_batches,
                    loss_value,
                    100.0 * correct as f64 / total.max(1) as f64
                );
            }
        }

        let avg_loss = total_loss / num_batches.max(1) as f64;
        let accuracy = correct as f64 / total.max(1) as f64;
        Ok((avg_loss, accuracy))
    }

    /// Evaluate on a dataset in stable order with no augmentation and no
    /// parameter updates, using the inner (non-autodiff) model.
    pub fn evaluate(&self, dataset: &CachedImageDataset) -> Result<EvalMetrics> {
        let device = <B::InnerBackend as Backend>::Device::default();
        let model = self.model.valid();
        let loss_fn = BinaryCrossEntropyLossConfig::new()
            .with_logits(true)
            .init(&device);

        let sampler = EpochSampler::new(dataset.len(), self.config.batch_size);
        let mut total_loss = 0.0f64;
        let mut predicted = Vec::with_capacity(dataset.len());
        let mut actual = Vec::with_capacity(dataset.len());

        for indices in sampler.batches() {
            let items: Vec<_> = indices.iter().filter_map(|&i| dataset.item(i)).collect();
            if items.is_empty() {
                continue;
            }
            let batch: DinoBatch<B::InnerBackend> = self.batcher.batch(items, &device);

            let logits = model.forward(batch.images).squeeze::<1>(1);
            let loss_value: f64 = loss_fn
                .forward(logits.clone(), batch.targets.clone())
                .into_scalar()
                .elem();
            if !loss_value.is_finite() {
                return Err(DinoError::DivergentLoss {
                    epoch: self.state.epoch,
                    loss: loss_value,
                });
            }
            total_loss += loss_value;

            let batch_predictions: Vec<i64> = sigmoid(logits)
                .greater_equal_elem(0.5)
                .int()
                .into_data()
                .to_vec()
                .map_err(|e| DinoError::Training(format!("failed to read predictions: {:?}", e)))?;
            let batch_targets: Vec<i64> = batch
                .targets
                .into_data()
                .to_vec()
                .map_err(|e| DinoError::Training(format!("failed to read targets: {:?}", e)))?;

            predicted.extend(batch_predictions.iter().map(|&p| p == 1));
            actual.extend(batch_targets.iter().map(|&t| t == 1));
        }

        let confusion = BinaryConfusion::from_predictions(&predicted, &actual);
        Ok(EvalMetrics {
            loss: total_loss / sampler.num_batches().max(1) as f64,
            accuracy: confusion.accuracy(),
            confusion,
        })
    }

    /// Run the full training loop.
    ///
    /// Per epoch: train pass, evaluation pass, then the monitor decision.
    /// `Checkpoint` persists the artifact, `Stop` halts before the epoch
    /// ceiling. On both exit paths the best checkpoint is restored into
    /// the in-memory model, so the run always finishes with the
    /// best-validation-loss parameters and the artifact on disk matches.
    pub fn fit(
        &mut self,
        train: &CachedImageDataset,
        test: &CachedImageDataset,
        artifact_stem: &Path,
    ) -> Result<FitOutcome> {
        if train.is_empty() {
            return Err(DinoError::Dataset("training split is empty".to_string()));
        }
        if test.is_empty() {
            return Err(DinoError::Dataset("test split is empty".to_string()));
        }

        let mut optimizer = AdamConfig::new().init();
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut sampler = EpochSampler::new(train.len(), self.config.batch_size);
        let augmenter = self
            .config
            .augment
            .then(|| Augmenter::new(AugmentationConfig::default()));
        let mut monitor = CheckpointMonitor::new(self.config.patience);
        let mut history = TrainingHistory::default();
        let mut logger = TrainingLogger::new(self.config.epochs);
        let mut stopped_early = false;

        for epoch in 0..self.config.epochs {
            self.state.epoch = epoch;
            logger.start_epoch(epoch);

            sampler.reset(Some(&mut rng));
            let (train_loss, train_accuracy) = self.train_epoch(
                &mut optimizer,
                train,
                &sampler,
                augmenter.as_ref(),
                &mut rng,
            )?;

            let eval = self.evaluate(test)?;
            logger.end_epoch(train_loss, eval.loss, eval.accuracy);

            history.push(EpochRecord {
                epoch,
                train_loss,
                train_accuracy,
                val_loss: eval.loss,
                val_accuracy: eval.accuracy,
            });

            match monitor.observe(epoch, eval.loss) {
                EpochDecision::Checkpoint => {
                    save_artifact(&self.model, &self.model_config, artifact_stem)?;
                    logger.log_new_best(eval.loss);
                }
                EpochDecision::Continue => {}
                EpochDecision::Stop => {
                    logger.log_early_stop(self.config.patience);
                    stopped_early = true;
                    break;
                }
            }
        }

        // Restore the best checkpoint so the returned model matches the
        // artifact regardless of which transition ended the run
        let (best_model, _) = load_artifact::<B>(artifact_stem, &self.device)?;
        self.model = best_model;

        history.finalize(stopped_early);
        let best = history
            .best_epoch()
            .ok_or_else(|| DinoError::Training("no epochs completed".to_string()))?;
        let outcome = FitOutcome {
            stopped_early,
            best_epoch: best.epoch,
            best_val_loss: best.val_loss,
            history,
        };
        logger.log_complete(outcome.history.len(), outcome.best_val_loss);

        Ok(outcome)
    }

    /// Get a reference to the model
    pub fn model(&self) -> &DinoClassifier<B> {
        &self.model
    }

    /// Get the device
    pub fn device(&self) -> &B::Device {
        &self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use image::{ImageBuffer, Rgb, RgbImage};
    use tempfile::TempDir;

    type TestBackend = Autodiff<NdArray>;

    fn tiny_config() -> (DinoClassifierConfig, TrainingConfig) {
        let model_config = DinoClassifierConfig::new()
            .with_input_size(16)
            .with_base_filters(2)
            .with_hidden_units(4);
        let config = TrainingConfig {
            epochs: 2,
            batch_size: 4,
            learning_rate: 1e-3,
            patience: 2,
            seed: 42,
            augment: false,
        };
        (model_config, config)
    }

    fn tiny_dataset() -> CachedImageDataset {
        // Positive class bright, negative class dark
        let mut images: Vec<RgbImage> = Vec::new();
        let mut targets = Vec::new();
        for i in 0..8u8 {
            let value = if i % 2 == 0 { 220 } else { 30 };
            images.push(ImageBuffer::from_pixel(16, 16, Rgb([value, value, value])));
            targets.push((i % 2 == 0) as i64);
        }
        CachedImageDataset::from_images(images, targets, 16).unwrap()
    }

    #[test]
    fn test_fit_writes_artifact_and_restores_best() {
        let device = Default::default();
        let (model_config, config) = tiny_config();
        let mut trainer = Trainer::<TestBackend>::new(model_config, config, device);

        let train = tiny_dataset();
        let test = tiny_dataset();

        let dir = TempDir::new().unwrap();
        let stem = dir.path().join("dinosaur_classifier");
        let outcome = trainer.fit(&train, &test, &stem).unwrap();

        assert!(crate::model::artifact::weights_path(&stem).exists());
        assert!(crate::model::artifact::architecture_path(&stem).exists());

        assert!(!outcome.history.is_empty());
        assert!(outcome.history.len() <= 2);
        assert!(outcome.best_val_loss.is_finite());
        assert_eq!(
            outcome.best_epoch,
            outcome.history.best_epoch().unwrap().epoch
        );
    }

    #[test]
    fn test_fit_rejects_empty_split() {
        let device = Default::default();
        let (model_config, config) = tiny_config();
        let mut trainer = Trainer::<TestBackend>::new(model_config, config, device);

        let empty = CachedImageDataset::from_images(vec![], vec![], 16).unwrap();
        let full = tiny_dataset();

        let dir = TempDir::new().unwrap();
        let result = trainer.fit(&empty, &full, &dir.path().join("m"));
        assert!(matches!(result, Err(DinoError::Dataset(_))));
    }

    #[test]
    fn test_evaluate_reports_loss_and_confusion() {
        let device = Default::default();
        let (model_config, config) = tiny_config();
        let trainer = Trainer::<TestBackend>::new(model_config, config, device);

        let eval = trainer.evaluate(&tiny_dataset()).unwrap();
        assert!(eval.loss.is_finite());
        assert!((0.0..=1.0).contains(&eval.accuracy));
        assert_eq!(eval.confusion.total(), 8);
    }
}
