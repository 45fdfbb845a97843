/*!
# Lore Retrieval

Hybrid retrieval and reranking over a fiction writer's document collection:
- **Lexical search** via BM25 for exact names, places and invented terms
- **Semantic search** via vector embeddings for conceptual similarity
- **Weighted score fusion** of both rankings
- **Pairwise reranking** of the over-fetched candidate set

## Architecture

```text
Query
  ├─> Lexical search (BM25)          ┐
  │     └─> retrieve_k candidates    │ concurrent
  ├─> Semantic search (embeddings)   │
  │     └─> retrieve_k candidates    ┘
  └─> Fusion (weighted, min_score)
        └─> Reranking (relevance model)
              └─> Top-k RankedResult
```

`retrieve_k` is `k * candidate_multiplier` when reranking, `k` otherwise.
When one source fails the query continues on the other and the failure is
recorded in [`RankedResult::degradations`]. Only the loss of every source
is an error.

## Example

```rust,no_run
use lore_embeddings::{EmbeddingProvider, HashingEmbedder};
use lore_retrieval::{
    HybridRetrieval, LexicalSearcher, Reranker, RetrievalConfig, SemanticIndex,
    TermOverlapModel,
};
use lore_vector_store::{DocumentStore, VectorStore};
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RetrievalConfig::default();
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::default());
    let store: Arc<dyn DocumentStore> =
        Arc::new(VectorStore::new(Path::new("store.json"), Arc::clone(&embedder)).await?);

    let lexical = Arc::new(LexicalSearcher::from_config(&config));
    lexical.rebuild_from_store(store.as_ref()).await?;

    let reranker = Reranker::from_config(Arc::new(TermOverlapModel::new()), &config);
    let retrieval = HybridRetrieval::new(
        config,
        Some(lexical),
        Some(SemanticIndex::new(embedder, store)),
        Some(reranker),
    )?;

    let result = retrieval.retrieve("Who is Alex?", 5, true, true).await?;
    for doc in result.top(5) {
        println!("{}. {} (score: {:.2})", doc.rank + 1, doc.document.source(), doc.score);
    }

    Ok(())
}
```

## Configuration

- `lexical_weight` / `semantic_weight`: relative fusion weights (0.4 / 0.6)
- `candidate_multiplier`: over-fetch factor before reranking (3)
- `reranker_model_profile`: `fast`, `accurate` or `multilingual`
- `min_score`: fused candidates below this are dropped (0.0)
*/

mod config;
mod cross_encoder;
mod error;
mod fusion;
mod lexical;
mod rerank;
mod result;
mod retrieval;
mod semantic;
mod tokenizer;

pub use config::{RerankerProfile, RetrievalConfig};
pub use cross_encoder::CrossEncoderModel;
pub use error::{Result, RetrievalError};
pub use fusion::{FusedCandidates, ScoreFuser};
pub use lexical::{LexicalIndex, LexicalSearcher};
pub use rerank::{RelevanceModel, Reranker, TermOverlapModel};
pub use result::{
    Candidate, Degradation, RankedDocument, RankedResult, RetrievalStage, SearchMethod,
    SearchStats,
};
pub use retrieval::HybridRetrieval;
pub use semantic::{SemanticIndex, distance_to_similarity};
pub use tokenizer::tokenize;
