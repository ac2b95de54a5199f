//! Error types for spam-rs

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for classifier operations
pub type Result<T> = std::result::Result<T, SpamError>;

/// Classifier error types
#[derive(Error, Debug)]
pub enum SpamError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Artifact could not be read from disk
    #[error("Failed to read artifact {path}: {source}")]
    ArtifactRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Artifact bytes could not be encoded or decoded
    #[error("Artifact serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Artifact decoded but is not what was expected
    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),

    /// Feature vector does not match the classifier's feature space
    #[error("Feature vector has {actual} dimensions, classifier expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Linguistic resource (stopword list) unavailable
    #[error("Linguistic resource error: {0}")]
    Resource(String),

    /// Training corpus is unusable
    #[error("Training error: {0}")]
    Training(String),
}
