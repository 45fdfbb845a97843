use crate::error::EmbeddingError;

/// A source of dense text embeddings.
///
/// Implementations must be deterministic for a given input so that the
/// vectors persisted at indexing time stay comparable with query vectors.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, returning one vector per input in order.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single text.
    fn embed_single(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut embeddings = self.embed(&[text.to_string()])?;
        embeddings
            .pop()
            .ok_or_else(|| EmbeddingError::Encoding("No embedding generated".into()))
    }

    /// Dimension of the vectors produced by this provider.
    fn dimension(&self) -> usize;

    /// Short human-readable name, used in logs.
    fn name(&self) -> &str;
}
