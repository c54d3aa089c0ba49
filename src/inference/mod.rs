//! Inference module: single-image prediction over a persisted artifact.

pub mod predictor;

pub use predictor::{Prediction, Predictor};
