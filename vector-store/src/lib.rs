//! # Lore Vector Store
//!
//! Document model and persisted vector storage for semantic search over a
//! writer's worldbuilding notes.
//!
//! [`DocumentStore`] is the capability the retrieval pipeline consumes:
//! `add`, nearest-neighbour `query` by cosine distance, and `get_all` (used to
//! rebuild the lexical index from the same collection). [`VectorStore`] is the
//! bundled implementation, persisted as a single JSON file and embedding
//! documents through an injected [`lore_embeddings::EmbeddingProvider`].
//!
//! ## Example
//!
//! ```no_run
//! use lore_embeddings::{EmbeddingProvider, HashingEmbedder};
//! use lore_vector_store::{Document, DocumentStore, VectorStore};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let embedder = Arc::new(HashingEmbedder::default());
//!     let store = VectorStore::new(Path::new(".lore/store.json"), embedder.clone()).await?;
//!     store.add(vec![Document::new("The Nexus is the Consortium's data core")]).await?;
//!
//!     let query = embedder.embed_single("data core")?;
//!     for (doc, distance) in store.query(&query, 5).await? {
//!         println!("{distance:.3} {}", doc.preview(60));
//!     }
//!     Ok(())
//! }
//! ```

mod document;
mod error;
mod store;

pub use document::{Document, DocumentId, DocumentMetadata};
pub use error::VectorStoreError;
pub use store::{DocumentStore, VectorStore, VectorStoreConfig};
