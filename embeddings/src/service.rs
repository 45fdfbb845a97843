use crate::DEFAULT_EMBEDDING_DIM;
use crate::error::EmbeddingError;
use crate::provider::EmbeddingProvider;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Configuration for the embedding service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model to use for embeddings
    #[serde(default)]
    pub model: EmbeddingModelType,

    /// Target embedding dimension (for Matryoshka truncation)
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Maximum batch size for embedding generation
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Show download progress when downloading models
    #[serde(default)]
    pub show_download_progress: bool,
}

fn default_dimension() -> usize {
    DEFAULT_EMBEDDING_DIM
}

fn default_batch_size() -> usize {
    32
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: EmbeddingModelType::default(),
            dimension: default_dimension(),
            batch_size: default_batch_size(),
            show_download_progress: false,
        }
    }
}

/// Supported embedding models
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingModelType {
    /// Nomic-embed-text-v1.5, long context, good general prose quality
    #[default]
    NomicEmbedTextV15,
    /// All-MiniLM-L6-v2 (lightweight, faster)
    AllMiniLmL6V2,
    /// Multilingual E5 small, for corpora that are not written in English
    MultilingualE5Small,
}

impl EmbeddingModelType {
    fn to_fastembed_model(self) -> EmbeddingModel {
        match self {
            EmbeddingModelType::NomicEmbedTextV15 => EmbeddingModel::NomicEmbedTextV15,
            EmbeddingModelType::AllMiniLmL6V2 => EmbeddingModel::AllMiniLML6V2,
            EmbeddingModelType::MultilingualE5Small => EmbeddingModel::MultilingualE5Small,
        }
    }

    /// Dimension of the vectors the model natively produces.
    pub fn native_dimension(self) -> usize {
        match self {
            EmbeddingModelType::NomicEmbedTextV15 => 768,
            EmbeddingModelType::AllMiniLmL6V2 | EmbeddingModelType::MultilingualE5Small => 384,
        }
    }
}

/// Neural embedding provider backed by a local ONNX model.
pub struct EmbeddingService {
    model: TextEmbedding,
    config: EmbeddingConfig,
}

impl EmbeddingService {
    /// Create a new embedding service with default configuration
    pub async fn new() -> Result<Self, EmbeddingError> {
        Self::with_config(EmbeddingConfig::default()).await
    }

    /// Create a new embedding service with custom configuration
    pub async fn with_config(config: EmbeddingConfig) -> Result<Self, EmbeddingError> {
        if config.batch_size == 0 {
            return Err(EmbeddingError::InvalidInput(
                "batch_size must be > 0".to_string(),
            ));
        }

        info!(
            "Initializing embedding service with model {:?}, dimension {}",
            config.model, config.dimension
        );

        let init_options = InitOptions::new(config.model.to_fastembed_model())
            .with_show_download_progress(config.show_download_progress);

        let model = TextEmbedding::try_new(init_options)
            .map_err(|e| EmbeddingError::ModelUnavailable(e.to_string()))?;

        info!("Embedding service initialized successfully");

        Ok(Self { model, config })
    }

    /// Get the configuration of this service
    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}

impl EmbeddingProvider for EmbeddingService {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let dimension = self.dimension();
        let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in text_refs.chunks(self.config.batch_size) {
            let batch_embeddings = self.model.embed(batch.to_vec(), None)?;

            for mut embedding in batch_embeddings {
                // Matryoshka truncation
                if embedding.len() > dimension {
                    embedding.truncate(dimension);
                }
                all_embeddings.push(embedding);
            }
        }

        debug!("Generated {} embeddings", all_embeddings.len());

        Ok(all_embeddings)
    }

    fn dimension(&self) -> usize {
        self.config.dimension.min(self.config.model.native_dimension())
    }

    fn name(&self) -> &str {
        match self.config.model {
            EmbeddingModelType::NomicEmbedTextV15 => "nomic-embed-text-v1.5",
            EmbeddingModelType::AllMiniLmL6V2 => "all-minilm-l6-v2",
            EmbeddingModelType::MultilingualE5Small => "multilingual-e5-small",
        }
    }
}
