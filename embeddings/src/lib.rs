//! # Lore Embeddings
//!
//! Text embedding providers for semantic search over worldbuilding documents.
//!
//! ## Providers
//!
//! - [`EmbeddingService`]: local neural embeddings (ONNX Runtime via fastembed),
//!   with optional Matryoshka truncation.
//! - [`HashingEmbedder`]: deterministic feature-hashing embedder with no model
//!   download, for air-gapped machines and tests.
//!
//! Both implement [`EmbeddingProvider`], which is what the vector store and
//! the retrieval pipeline depend on.
//!
//! ## Example
//!
//! ```no_run
//! use lore_embeddings::{EmbeddingProvider, EmbeddingService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = EmbeddingService::new().await?;
//!     let texts = vec!["Alex Chen is a Nexus technician".to_string()];
//!     let embeddings = service.embed(&texts)?;
//!     println!("Generated {} embeddings", embeddings.len());
//!     Ok(())
//! }
//! ```

mod error;
mod hashing;
mod provider;
mod service;

pub use error::EmbeddingError;
pub use hashing::{DEFAULT_HASHING_DIM, HashingEmbedder};
pub use provider::EmbeddingProvider;
pub use service::{EmbeddingConfig, EmbeddingModelType, EmbeddingService};

/// Default embedding dimension for Nomic-embed-text-v1.5
pub const DEFAULT_EMBEDDING_DIM: usize = 768;
