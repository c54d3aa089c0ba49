//! Checkpoint and Early-Stop Policy
//!
//! The per-epoch decision is a plain function of (epoch, validation loss,
//! best-so-far state), so the trainer's state machine can be tested
//! without running any real training. The trainer acts on the decision:
//! `Checkpoint` overwrites the durable artifact, `Stop` ends the run
//! before the epoch ceiling.

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::utils::error::{DinoError, Result};

/// Outcome of observing one epoch's validation loss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochDecision {
    /// Validation loss strictly improved: persist the current parameters
    Checkpoint,
    /// No improvement, but patience is not exhausted
    Continue,
    /// No improvement for `patience` consecutive epochs: halt the run
    Stop,
}

/// Tracks best-so-far validation loss and the plateau counter
#[derive(Debug, Clone)]
pub struct CheckpointMonitor {
    patience: usize,
    best_val_loss: f64,
    best_epoch: Option<usize>,
    stagnant_epochs: usize,
}

impl CheckpointMonitor {
    /// Create a monitor that stops after `patience` epochs without
    /// improvement
    pub fn new(patience: usize) -> Self {
        Self {
            patience: patience.max(1),
            best_val_loss: f64::INFINITY,
            best_epoch: None,
            stagnant_epochs: 0,
        }
    }

    /// Observe one completed epoch and decide what the trainer should do.
    ///
    /// Improvement means strictly lower validation loss than every earlier
    /// epoch in this run. The checkpoint decision is evaluated every epoch,
    /// independent of stopping.
    pub fn observe(&mut self, epoch: usize, val_loss: f64) -> EpochDecision {
        if val_loss < self.best_val_loss {
            self.best_val_loss = val_loss;
            self.best_epoch = Some(epoch);
            self.stagnant_epochs = 0;
            EpochDecision::Checkpoint
        } else {
            self.stagnant_epochs += 1;
            if self.stagnant_epochs >= self.patience {
                EpochDecision::Stop
            } else {
                EpochDecision::Continue
            }
        }
    }

    /// Best validation loss observed so far, if any epoch completed
    pub fn best_val_loss(&self) -> Option<f64> {
        self.best_epoch.map(|_| self.best_val_loss)
    }

    /// Epoch index of the best validation loss
    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }
}

/// One completed pass over the training split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochRecord {
    pub epoch: usize,
    pub train_loss: f64,
    pub train_accuracy: f64,
    pub val_loss: f64,
    pub val_accuracy: f64,
}

/// Time series of per-epoch metrics for one training run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub records: Vec<EpochRecord>,
    pub stopped_early: bool,
    pub completed_at: Option<String>,
}

impl TrainingHistory {
    /// Append one epoch's record
    pub fn push(&mut self, record: EpochRecord) {
        self.records.push(record);
    }

    /// Number of completed epochs
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check whether any epoch completed
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The record with the lowest validation loss
    pub fn best_epoch(&self) -> Option<&EpochRecord> {
        self.records
            .iter()
            .min_by(|a, b| a.val_loss.total_cmp(&b.val_loss))
    }

    /// Mark the run finished and stamp the completion time
    pub fn finalize(&mut self, stopped_early: bool) {
        self.stopped_early = stopped_early;
        self.completed_at = Some(Local::now().to_rfc3339());
    }

    /// Export the history as pretty-printed JSON
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| DinoError::Serialization(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a previously exported history
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| DinoError::Serialization(e.to_string()))
    }
}
