use crate::document::{Document, DocumentId};
use crate::error::VectorStoreError;
use async_trait::async_trait;
use log::{debug, info, warn};
use lore_embeddings::EmbeddingProvider;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A persisted collection of embedded documents.
///
/// `query` returns `(document, cosine distance)` pairs, nearest first.
/// `get_all` returns every stored document in insertion order.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Embed and persist documents. Returns how many were newly stored.
    async fn add(&self, documents: Vec<Document>) -> Result<usize, VectorStoreError>;

    /// The `k` documents nearest to `embedding`.
    async fn query(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<(Document, f32)>, VectorStoreError>;

    async fn get_all(&self) -> Result<Vec<Document>, VectorStoreError>;

    async fn count(&self) -> Result<usize, VectorStoreError>;
}

/// Configuration for the vector store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// Expected embedding dimension; taken from the provider when unset
    #[serde(default)]
    pub embedding_dim: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredDocument {
    document: Document,
    vector: Vec<f32>,
}

#[derive(Default)]
struct StoreState {
    entries: Vec<StoredDocument>,
    ids: HashSet<DocumentId>,
}

/// Vector store persisted as a single JSON file.
pub struct VectorStore {
    db_path: PathBuf,
    embedder: Arc<dyn EmbeddingProvider>,
    embedding_dim: usize,
    state: RwLock<StoreState>,
}

impl VectorStore {
    /// Open (or create) the store at `db_path`.
    pub async fn new(
        db_path: &Path,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, VectorStoreError> {
        Self::with_config(db_path, embedder, VectorStoreConfig::default()).await
    }

    pub async fn with_config(
        db_path: &Path,
        embedder: Arc<dyn EmbeddingProvider>,
        config: VectorStoreConfig,
    ) -> Result<Self, VectorStoreError> {
        info!(
            "Opening vector store at {} with {} embeddings",
            db_path.display(),
            embedder.name()
        );

        let embedding_dim = config.embedding_dim.unwrap_or_else(|| embedder.dimension());
        if embedding_dim != embedder.dimension() {
            return Err(VectorStoreError::DimensionMismatch {
                expected: embedder.dimension(),
                actual: embedding_dim,
            });
        }

        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut state = StoreState::default();
        if tokio::fs::try_exists(db_path).await? {
            let entries = Self::load_from_disk(db_path).await?;
            if let Some(bad) = entries.iter().find(|e| e.vector.len() != embedding_dim) {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: embedding_dim,
                    actual: bad.vector.len(),
                });
            }
            state.ids = entries.iter().map(|e| e.document.id()).collect();
            state.entries = entries;
        }

        info!("Vector store holds {} documents", state.entries.len());
        Ok(Self {
            db_path: db_path.to_path_buf(),
            embedder,
            embedding_dim,
            state: RwLock::new(state),
        })
    }

    async fn load_from_disk(path: &Path) -> Result<Vec<StoredDocument>, VectorStoreError> {
        let content = tokio::fs::read(path).await?;
        serde_json::from_slice(&content).map_err(|e| VectorStoreError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    async fn save_to_disk(&self, entries: &[StoredDocument]) -> Result<(), VectorStoreError> {
        let content = serde_json::to_vec(entries)?;
        // Write-then-rename so readers never observe a half-written file.
        let tmp_path = self.db_path.with_extension("tmp");
        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, &self.db_path).await?;
        Ok(())
    }

    /// Remove every document from the store and from disk.
    pub async fn clear(&self) -> Result<(), VectorStoreError> {
        let mut state = self.state.write().await;
        // Disk first; memory only changes once the empty store is persisted.
        if let Err(err) = self.save_to_disk(&[]).await {
            warn!("Failed to clear vector store: {err}");
            return Err(err);
        }
        state.entries.clear();
        state.ids.clear();
        info!("Vector store cleared");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }
}

#[async_trait]
impl DocumentStore for VectorStore {
    async fn add(&self, documents: Vec<Document>) -> Result<usize, VectorStoreError> {
        let mut state = self.state.write().await;

        let mut seen = HashSet::new();
        let fresh: Vec<Document> = documents
            .into_iter()
            .filter(|d| {
                let id = d.id();
                !state.ids.contains(&id) && seen.insert(id)
            })
            .collect();
        if fresh.is_empty() {
            debug!("No new documents to add");
            return Ok(0);
        }

        info!("Adding {} documents to vector store", fresh.len());

        let texts: Vec<String> = fresh.iter().map(|d| d.content.clone()).collect();
        let vectors = self.embedder.embed(&texts)?;
        if vectors.len() != fresh.len() {
            return Err(VectorStoreError::Unavailable(format!(
                "embedder returned {} vectors for {} documents",
                vectors.len(),
                fresh.len()
            )));
        }

        let added = fresh.len();
        let new_ids: Vec<DocumentId> = fresh.iter().map(Document::id).collect();
        let persisted = state.entries.len();
        for (document, vector) in fresh.into_iter().zip(vectors) {
            state.entries.push(StoredDocument { document, vector });
        }

        // Ids are only recorded once the entries reach disk, so a failed
        // write can be retried.
        if let Err(err) = self.save_to_disk(&state.entries).await {
            warn!("Failed to persist vector store: {err}");
            state.entries.truncate(persisted);
            return Err(err);
        }
        state.ids.extend(new_ids);

        Ok(added)
    }

    async fn query(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<(Document, f32)>, VectorStoreError> {
        if embedding.len() != self.embedding_dim {
            return Err(VectorStoreError::InvalidQuery(format!(
                "query vector has dimension {}, expected {}",
                embedding.len(),
                self.embedding_dim
            )));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let state = self.state.read().await;
        let mut distances: Vec<(usize, f32)> = state
            .entries
            .iter()
            .enumerate()
            .map(|(idx, stored)| (idx, 1.0 - cosine_similarity(embedding, &stored.vector)))
            .collect();

        // Stable: equal distances keep insertion order.
        distances.sort_by(|a, b| a.1.total_cmp(&b.1));

        let results: Vec<(Document, f32)> = distances
            .into_iter()
            .take(k)
            .map(|(idx, distance)| (state.entries[idx].document.clone(), distance))
            .collect();

        debug!("Vector query returned {} documents", results.len());
        Ok(results)
    }

    async fn get_all(&self) -> Result<Vec<Document>, VectorStoreError> {
        let state = self.state.read().await;
        Ok(state.entries.iter().map(|e| e.document.clone()).collect())
    }

    async fn count(&self) -> Result<usize, VectorStoreError> {
        Ok(self.state.read().await.entries.len())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}
