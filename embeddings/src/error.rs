use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The ONNX model could not be downloaded or loaded.
    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    /// The provider failed while encoding a batch.
    #[error("Embedding failed: {0}")]
    Encoding(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<fastembed::Error> for EmbeddingError {
    fn from(err: fastembed::Error) -> Self {
        EmbeddingError::Encoding(err.to_string())
    }
}
