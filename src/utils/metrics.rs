//! Metrics Module for Model Evaluation
//!
//! Binary classification metrics: confusion counts plus the usual derived
//! quantities (accuracy, precision, recall, F1). The positive class is
//! "dinosaur" throughout the pipeline.

use serde::{Deserialize, Serialize};

/// Confusion counts for a binary classifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryConfusion {
    /// Positive examples predicted positive
    pub true_positives: usize,
    /// Negative examples predicted positive
    pub false_positives: usize,
    /// Negative examples predicted negative
    pub true_negatives: usize,
    /// Positive examples predicted negative
    pub false_negatives: usize,
}

impl BinaryConfusion {
    /// Build confusion counts from paired predictions and ground truth
    pub fn from_predictions(predictions: &[bool], targets: &[bool]) -> Self {
        assert_eq!(
            predictions.len(),
            targets.len(),
            "predictions and targets must have the same length"
        );

        let mut counts = Self::default();
        for (&predicted, &actual) in predictions.iter().zip(targets.iter()) {
            match (predicted, actual) {
                (true, true) => counts.true_positives += 1,
                (true, false) => counts.false_positives += 1,
                (false, false) => counts.true_negatives += 1,
                (false, true) => counts.false_negatives += 1,
            }
        }
        counts
    }

    /// Total number of examples counted
    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    /// Fraction of examples classified correctly
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.true_positives + self.true_negatives) as f64 / total as f64
    }

    /// Of everything predicted positive, how much actually was
    pub fn precision(&self) -> f64 {
        let denom = self.true_positives + self.false_positives;
        if denom == 0 {
            return 0.0;
        }
        self.true_positives as f64 / denom as f64
    }

    /// Of everything actually positive, how much was found
    pub fn recall(&self) -> f64 {
        let denom = self.true_positives + self.false_negatives;
        if denom == 0 {
            return 0.0;
        }
        self.true_positives as f64 / denom as f64
    }

    /// Harmonic mean of precision and recall
    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            return 0.0;
        }
        2.0 * p * r / (p + r)
    }
}

impl std::fmt::Display for BinaryConfusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Confusion matrix ({} samples):", self.total())?;
        writeln!(
            f,
            "  TP: {:>5}  FP: {:>5}",
            self.true_positives, self.false_positives
        )?;
        writeln!(
            f,
            "  FN: {:>5}  TN: {:>5}",
            self.false_negatives, self.true_negatives
        )?;
        writeln!(
            f,
            "  accuracy: {:.2}%  precision: {:.2}%  recall: {:.2}%  F1: {:.3}",
            self.accuracy() * 100.0,
            self.precision() * 100.0,
            self.recall() * 100.0,
            self.f1()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_classifier() {
        let predictions = [true, true, false, false];
        let targets = [true, true, false, false];

        let counts = BinaryConfusion::from_predictions(&predictions, &targets);

        assert_eq!(counts.true_positives, 2);
        assert_eq!(counts.true_negatives, 2);
        assert_eq!(counts.accuracy(), 1.0);
        assert_eq!(counts.f1(), 1.0);
    }

    #[test]
    fn test_mixed_predictions() {
        // 2 TP, 1 FP, 1 TN, 1 FN
        let predictions = [true, true, true, false, false];
        let targets = [true, true, false, false, true];

        let counts = BinaryConfusion::from_predictions(&predictions, &targets);

        assert_eq!(counts.total(), 5);
        assert_eq!(counts.true_positives, 2);
        assert_eq!(counts.false_positives, 1);
        assert_eq!(counts.true_negatives, 1);
        assert_eq!(counts.false_negatives, 1);
        assert!((counts.accuracy() - 0.6).abs() < 1e-9);
        assert!((counts.precision() - 2.0 / 3.0).abs() < 1e-9);
        assert!((counts.recall() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_is_zero_not_nan() {
        let counts = BinaryConfusion::default();
        assert_eq!(counts.accuracy(), 0.0);
        assert_eq!(counts.precision(), 0.0);
        assert_eq!(counts.recall(), 0.0);
        assert_eq!(counts.f1(), 0.0);
    }
}
