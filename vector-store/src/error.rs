use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VectorStoreError {
    /// Vectors of the wrong width reached the store.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The persisted store could not be decoded.
    #[error("Corrupt store {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The store cannot serve requests right now.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Embedding error: {0}")]
    Embedding(#[from] lore_embeddings::EmbeddingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
