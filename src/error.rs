//! Error types for careermap.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CareerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("missing configuration: {0}")]
    MissingConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("vector index error: {0}")]
    VectorIndex(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: &'static str, seconds: u64 },
}

impl CareerError {
    /// Short machine-readable code, used in robot output.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::MissingConfig(_) => "missing_config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Dataset(_) => "dataset",
            Self::Embedding(_) => "embedding",
            Self::VectorIndex(_) => "vector_index",
            Self::Generation(_) => "generation",
            Self::Timeout { .. } => "timeout",
        }
    }
}

pub type Result<T> = std::result::Result<T, CareerError>;
