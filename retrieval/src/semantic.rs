use crate::error::{Result, RetrievalError};
use log::debug;
use lore_embeddings::EmbeddingProvider;
use lore_vector_store::{Document, DocumentStore};
use std::sync::Arc;

/// Nearest-neighbor search over a persisted vector store.
#[derive(Clone)]
pub struct SemanticIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn DocumentStore>,
}

impl SemanticIndex {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn DocumentStore>) -> Self {
        Self { embedder, store }
    }

    /// Top `k` `(document, similarity)` pairs with similarity in `[0, 1]`
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<(Document, f32)>> {
        let embedding = self.embedder.embed_single(query)?;
        if embedding.is_empty() {
            return Err(RetrievalError::IndexUnavailable(format!(
                "{} returned an empty query embedding",
                self.embedder.name()
            )));
        }

        let neighbors = self.store.query(&embedding, k).await?;
        debug!("Semantic search returned {} neighbors", neighbors.len());

        Ok(neighbors
            .into_iter()
            .map(|(document, distance)| (document, distance_to_similarity(distance)))
            .collect())
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }
}

/// `1 - distance`, clamped to `[0, 1]`
pub fn distance_to_similarity(distance: f32) -> f32 {
    if distance.is_nan() {
        return 0.0;
    }
    (1.0 - distance).clamp(0.0, 1.0)
}
