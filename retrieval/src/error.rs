use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrievalError {
    /// The lexical index holds no documents (or was never built).
    #[error("Lexical index is empty: no documents to rank")]
    EmptyCollection,

    /// The semantic store or the query embedder cannot be used.
    #[error("Semantic index unavailable: {0}")]
    IndexUnavailable(String),

    /// The pairwise relevance model failed to load or to score.
    #[error("Reranker unavailable: {0}")]
    RerankerUnavailable(String),

    /// No retrieval source could serve the query.
    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The caller cancelled the query between two pipeline stages.
    #[error("Retrieval cancelled")]
    Cancelled,
}

impl From<lore_vector_store::VectorStoreError> for RetrievalError {
    fn from(err: lore_vector_store::VectorStoreError) -> Self {
        RetrievalError::IndexUnavailable(err.to_string())
    }
}

impl From<lore_embeddings::EmbeddingError> for RetrievalError {
    fn from(err: lore_embeddings::EmbeddingError) -> Self {
        RetrievalError::IndexUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
