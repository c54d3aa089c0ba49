//! Error Handling Module
//!
//! Defines the error taxonomy for the pipeline. Corrupt source images are
//! recoverable (skipped and counted by the preprocessor); missing paths,
//! unreadable artifacts, and divergent training losses are fatal for the
//! invoking stage.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for classifier operations
#[derive(Error, Debug)]
pub enum DinoError {
    /// Error decoding or processing an image
    #[error("failed to load image '{0}': {1}")]
    ImageLoad(PathBuf, String),

    /// Error with dataset operations
    #[error("dataset error: {0}")]
    Dataset(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Error with training
    #[error("training error: {0}")]
    Training(String),

    /// Training loss became NaN or infinite; retrying the same
    /// configuration is expected to reproduce the divergence
    #[error("training diverged at epoch {epoch}: loss = {loss}")]
    DivergentLoss { epoch: usize, loss: f64 },

    /// A required path does not exist
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    /// No model artifact exists at the given path
    #[error("model artifact not found at '{0}'")]
    ArtifactNotFound(PathBuf),

    /// An artifact file exists but cannot be read back into a model
    #[error("invalid model artifact at '{0}': {1}")]
    InvalidArtifact(PathBuf, String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience Result type for classifier operations
pub type Result<T> = std::result::Result<T, DinoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DinoError::Dataset("test error".to_string());
        assert_eq!(format!("{}", err), "dataset error: test error");
    }

    #[test]
    fn test_image_load_error() {
        let path = PathBuf::from("/path/to/image.jpg");
        let err = DinoError::ImageLoad(path, "file truncated".to_string());
        assert!(format!("{}", err).contains("image.jpg"));
    }

    #[test]
    fn test_artifact_errors_are_distinguishable() {
        let missing = DinoError::ArtifactNotFound(PathBuf::from("models/x.mpk"));
        let invalid =
            DinoError::InvalidArtifact(PathBuf::from("models/x.mpk"), "bad record".to_string());

        assert!(matches!(missing, DinoError::ArtifactNotFound(_)));
        assert!(matches!(invalid, DinoError::InvalidArtifact(_, _)));
        assert_ne!(format!("{}", missing), format!("{}", invalid));
    }

    #[test]
    fn test_divergent_loss_display() {
        let err = DinoError::DivergentLoss {
            epoch: 3,
            loss: f64::NAN,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("epoch 3"));
        assert!(msg.contains("NaN"));
    }
}
