//! Error types for the training harness.
//!
//! Uses thiserror for ergonomic error definitions. There is deliberately no
//! retry machinery anywhere: a failed image decode, a missing dataset root or
//! a shape mismatch terminates the run.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the harness.
#[derive(Error, Debug)]
pub enum Error {
    /// Error discovering or reading the dataset
    #[error("dataset error: {0}")]
    Dataset(String),

    /// Error loading or decoding an image file
    #[error("failed to load image {0:?}: {1}")]
    ImageLoad(PathBuf, String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// The architecture description and the tensors flowing through it disagree
    #[error("shape mismatch: {0}")]
    Shape(String),

    /// Error during the training loop (checkpointing, report output)
    #[error("training error: {0}")]
    Training(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for harness operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Dataset("no class directories".to_string());
        assert_eq!(format!("{}", err), "dataset error: no class directories");
    }

    #[test]
    fn test_image_load_error_mentions_path() {
        let err = Error::ImageLoad(PathBuf::from("/data/a.png"), "truncated".to_string());
        assert!(format!("{}", err).contains("a.png"));
    }
}
