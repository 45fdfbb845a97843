use crate::config::RetrievalConfig;
use crate::error::{Result, RetrievalError};
use crate::fusion::ScoreFuser;
use crate::lexical::LexicalSearcher;
use crate::rerank::Reranker;
use crate::result::{
    Candidate, Degradation, RankedDocument, RankedResult, RetrievalStage, SearchMethod,
    SearchStats,
};
use crate::semantic::SemanticIndex;
use log::{debug, info, warn};
use lore_vector_store::Document;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Hybrid retrieval engine: lexical + semantic search, weighted fusion, reranking
pub struct HybridRetrieval {
    config: RetrievalConfig,
    lexical: Option<Arc<LexicalSearcher>>,
    semantic: Option<SemanticIndex>,
    reranker: Option<Reranker>,
    fuser: ScoreFuser,
}

impl HybridRetrieval {
    /// Create new hybrid retrieval engine.
    ///
    /// At least one of `lexical` and `semantic` must be provided.
    pub fn new(
        config: RetrievalConfig,
        lexical: Option<Arc<LexicalSearcher>>,
        semantic: Option<SemanticIndex>,
        reranker: Option<Reranker>,
    ) -> Result<Self> {
        config.validate().map_err(RetrievalError::InvalidConfig)?;

        if lexical.is_none() && semantic.is_none() {
            return Err(RetrievalError::InvalidConfig(
                "at least one of the lexical and semantic indexes is required".to_string(),
            ));
        }

        info!(
            "Initializing hybrid retrieval (lexical: {}, semantic: {}, reranker: {})",
            lexical.is_some(),
            semantic.is_some(),
            reranker.as_ref().map_or("none", Reranker::model_name)
        );

        let fuser = ScoreFuser::new(&config);
        Ok(Self {
            config,
            lexical,
            semantic,
            reranker,
            fuser,
        })
    }

    /// Retrieve at most `k` documents for `query`
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        use_hybrid: bool,
        use_reranking: bool,
    ) -> Result<RankedResult> {
        self.retrieve_with_cancel(query, k, use_hybrid, use_reranking, &CancellationToken::new())
            .await
    }

    /// Like [`HybridRetrieval::retrieve`], abandoning the query with
    /// `Cancelled` once `cancel` fires.
    pub async fn retrieve_with_cancel(
        &self,
        query: &str,
        k: usize,
        use_hybrid: bool,
        use_reranking: bool,
        cancel: &CancellationToken,
    ) -> Result<RankedResult> {
        Self::validate_query(query, k)?;
        let start = Instant::now();

        let retrieve_k = if use_reranking {
            k.saturating_mul(self.config.candidate_multiplier)
        } else {
            k
        };
        debug!("Retrieving '{query}' (k={k}, retrieve_k={retrieve_k}, hybrid={use_hybrid})");

        let mut result = RankedResult::new(query);
        let mut stats = SearchStats {
            retrieve_k,
            ..Default::default()
        };

        Self::check_cancelled(cancel)?;
        result.enter(RetrievalStage::Retrieving);

        let candidates = match self
            .gather_candidates(query, retrieve_k, use_hybrid, cancel, &mut result, &mut stats)
            .await
        {
            Ok(candidates) => candidates,
            Err(err) => {
                if !matches!(err, RetrievalError::Cancelled) {
                    warn!("Retrieval failed for '{query}': {err}");
                }
                return Err(err);
            }
        };
        stats.fused_count = candidates.len();

        let results = if use_reranking {
            Self::check_cancelled(cancel)?;
            self.rerank_or_fallback(query, candidates, k, &mut result, &mut stats)
        } else {
            Self::into_ranked(candidates, k)
        };

        result.enter(RetrievalStage::Done);
        stats.total_time_ms = start.elapsed().as_millis() as u64;

        info!(
            "Search completed in {}ms, returned {} results",
            stats.total_time_ms,
            results.len()
        );

        Ok(result.with_results(results).with_stats(stats))
    }

    /// Lexical-only, semantic-only and hybrid+reranked results side by side.
    ///
    /// A method that fails or is not configured yields an empty list.
    pub async fn compare_methods(
        &self,
        query: &str,
        k: usize,
    ) -> Result<BTreeMap<SearchMethod, Vec<Document>>> {
        Self::validate_query(query, k)?;

        let (lexical, semantic, hybrid) = tokio::join!(
            self.lexical_only(query, k),
            self.semantic_only(query, k),
            self.retrieve(query, k, true, true),
        );

        let mut methods = BTreeMap::new();
        methods.insert(
            SearchMethod::Lexical,
            Self::documents_or_empty(SearchMethod::Lexical, lexical),
        );
        methods.insert(
            SearchMethod::Semantic,
            Self::documents_or_empty(SearchMethod::Semantic, semantic),
        );
        methods.insert(
            SearchMethod::Hybrid,
            Self::documents_or_empty(
                SearchMethod::Hybrid,
                hybrid.map(|r| r.results.into_iter().map(|d| d.document).collect()),
            ),
        );

        Ok(methods)
    }

    /// Rebuild the lexical index from every document in the semantic store
    pub async fn rebuild_lexical(&self) -> Result<usize> {
        let lexical = self.lexical.as_ref().ok_or_else(|| {
            RetrievalError::InvalidConfig("no lexical index configured".to_string())
        })?;
        let semantic = self.semantic.as_ref().ok_or_else(|| {
            RetrievalError::IndexUnavailable("no semantic store to rebuild from".to_string())
        })?;

        lexical.rebuild_from_store(semantic.store().as_ref()).await
    }

    /// Get configuration
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn lexical(&self) -> Option<&Arc<LexicalSearcher>> {
        self.lexical.as_ref()
    }

    pub fn semantic(&self) -> Option<&SemanticIndex> {
        self.semantic.as_ref()
    }

    pub fn has_reranker(&self) -> bool {
        self.reranker.is_some()
    }

    fn validate_query(query: &str, k: usize) -> Result<()> {
        if query.trim().is_empty() {
            return Err(RetrievalError::InvalidQuery("query is empty".to_string()));
        }
        if k == 0 {
            return Err(RetrievalError::InvalidQuery("k must be positive".to_string()));
        }
        Ok(())
    }

    fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            debug!("Query cancelled between stages");
            return Err(RetrievalError::Cancelled);
        }
        Ok(())
    }

    async fn gather_candidates(
        &self,
        query: &str,
        retrieve_k: usize,
        use_hybrid: bool,
        cancel: &CancellationToken,
        result: &mut RankedResult,
        stats: &mut SearchStats,
    ) -> Result<Vec<Candidate>> {
        let retrieval_start = Instant::now();

        match (&self.lexical, &self.semantic) {
            (Some(lexical), Some(semantic)) if use_hybrid => {
                let searches = async {
                    tokio::join!(
                        lexical.search(query, retrieve_k),
                        semantic.search(query, retrieve_k)
                    )
                };
                let (lexical_results, semantic_results) = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(RetrievalError::Cancelled),
                    out = searches => out,
                };
                stats.retrieval_time_ms = retrieval_start.elapsed().as_millis() as u64;
                stats.lexical_count = lexical_results.as_ref().map_or(0, Vec::len);
                stats.semantic_count = semantic_results.as_ref().map_or(0, Vec::len);

                Self::check_cancelled(cancel)?;
                result.enter(RetrievalStage::Fusing);

                let fusion_start = Instant::now();
                let fused = self
                    .fuser
                    .fuse(lexical_results, semantic_results, retrieve_k)?;
                stats.fusion_time_ms = fusion_start.elapsed().as_millis() as u64;

                for degradation in fused.degradations {
                    result.degrade(degradation);
                }
                Ok(fused.candidates)
            }
            // Semantic search is the non-hybrid path whenever it exists.
            (_, Some(semantic)) => {
                let semantic_results = semantic.search(query, retrieve_k).await.map_err(|err| {
                    RetrievalError::RetrievalUnavailable(format!("semantic search failed: {err}"))
                })?;
                stats.retrieval_time_ms = retrieval_start.elapsed().as_millis() as u64;
                stats.semantic_count = semantic_results.len();

                Ok(self
                    .fuser
                    .rank_single(semantic_results, SearchMethod::Semantic, retrieve_k))
            }
            (Some(_), None) => {
                let lexical_results = self.lexical_only_raw(query, retrieve_k).await?;
                stats.retrieval_time_ms = retrieval_start.elapsed().as_millis() as u64;
                stats.lexical_count = lexical_results.len();

                Ok(self.fuser.rank_single(
                    ScoreFuser::normalize_lexical(lexical_results),
                    SearchMethod::Lexical,
                    retrieve_k,
                ))
            }
            (None, None) => Err(RetrievalError::RetrievalUnavailable(
                "no retrieval source configured".to_string(),
            )),
        }
    }

    /// Lexical results when lexical search is the only source.
    ///
    /// An empty collection is an empty answer here, not a failure.
    async fn lexical_only_raw(&self, query: &str, k: usize) -> Result<Vec<(Document, f32)>> {
        let lexical = self.lexical.as_ref().ok_or_else(|| {
            RetrievalError::RetrievalUnavailable("no lexical index configured".to_string())
        })?;

        match lexical.search(query, k).await {
            Ok(results) => Ok(results),
            Err(RetrievalError::EmptyCollection) => {
                debug!("Lexical index is empty, returning no results");
                Ok(Vec::new())
            }
            Err(err) => Err(RetrievalError::RetrievalUnavailable(err.to_string())),
        }
    }

    async fn lexical_only(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        let results = self.lexical_only_raw(query, k).await?;
        Ok(self
            .fuser
            .rank_single(
                ScoreFuser::normalize_lexical(results),
                SearchMethod::Lexical,
                k,
            )
            .into_iter()
            .map(|c| c.document)
            .collect())
    }

    async fn semantic_only(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        let semantic = self.semantic.as_ref().ok_or_else(|| {
            RetrievalError::IndexUnavailable("no semantic index configured".to_string())
        })?;
        let results = semantic.search(query, k).await?;
        Ok(self
            .fuser
            .rank_single(results, SearchMethod::Semantic, k)
            .into_iter()
            .map(|c| c.document)
            .collect())
    }

    fn documents_or_empty(method: SearchMethod, outcome: Result<Vec<Document>>) -> Vec<Document> {
        outcome.unwrap_or_else(|err| {
            warn!("{method} search failed during comparison: {err}");
            Vec::new()
        })
    }

    fn rerank_or_fallback(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
        k: usize,
        result: &mut RankedResult,
        stats: &mut SearchStats,
    ) -> Vec<RankedDocument> {
        let Some(reranker) = &self.reranker else {
            result.degrade(Degradation::RerankerUnavailable {
                reason: "no reranker configured".to_string(),
            });
            return Self::into_ranked(candidates, k);
        };

        result.enter(RetrievalStage::Reranking);
        let rerank_start = Instant::now();
        let outcome = reranker.rerank(query, &candidates, k);
        stats.rerank_time_ms = rerank_start.elapsed().as_millis() as u64;

        match outcome {
            Ok(ranked) => {
                stats.reranked = true;
                debug!("Reranking produced {} results", ranked.len());
                ranked
            }
            Err(err) => {
                warn!("Reranking failed, returning fused order: {err}");
                result.degrade(Degradation::RerankerUnavailable {
                    reason: err.to_string(),
                });
                Self::into_ranked(candidates, k)
            }
        }
    }

    fn into_ranked(candidates: Vec<Candidate>, k: usize) -> Vec<RankedDocument> {
        candidates
            .into_iter()
            .take(k)
            .enumerate()
            .map(|(rank, candidate)| RankedDocument::from_candidate(candidate, rank))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rerank::TermOverlapModel;
    use pretty_assertions::assert_eq;

    async fn lexical_with(contents: &[&str]) -> Arc<LexicalSearcher> {
        let searcher = Arc::new(LexicalSearcher::new(1.5, 0.75));
        let documents = contents.iter().map(|c| Document::new(*c)).collect();
        searcher.rebuild(documents).await.unwrap();
        searcher
    }

    fn overlap_reranker() -> Reranker {
        Reranker::new(Arc::new(TermOverlapModel::new()), 32)
    }

    #[test]
    fn test_requires_a_source() {
        let result = HybridRetrieval::new(RetrievalConfig::default(), None, None, None);
        assert!(matches!(result, Err(RetrievalError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = RetrievalConfig {
            candidate_multiplier: 0,
            ..Default::default()
        };
        let searcher = Arc::new(LexicalSearcher::new(1.5, 0.75));
        let result = HybridRetrieval::new(config, Some(searcher), None, None);
        assert!(matches!(result, Err(RetrievalError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_invalid_queries() {
        let lexical = lexical_with(&["a tale of two harbors"]).await;
        let retrieval =
            HybridRetrieval::new(RetrievalConfig::default(), Some(lexical), None, None).unwrap();

        assert!(matches!(
            retrieval.retrieve("   ", 3, true, true).await,
            Err(RetrievalError::InvalidQuery(_))
        ));
        assert!(matches!(
            retrieval.retrieve("harbors", 0, true, true).await,
            Err(RetrievalError::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn test_lexical_only_configuration() {
        let lexical = lexical_with(&[
            "The harbor master counted ships",
            "A storm rolled over the harbor",
            "Bread was baked at dawn",
        ])
        .await;
        let retrieval = HybridRetrieval::new(
            RetrievalConfig::default(),
            Some(lexical),
            None,
            Some(overlap_reranker()),
        )
        .unwrap();

        let result = retrieval.retrieve("harbor storm", 2, true, true).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result.results[0].document.content, "A storm rolled over the harbor");
        assert!(result.stats.reranked);
        assert!(!result.is_degraded());
        assert_eq!(
            result.stages,
            vec![
                RetrievalStage::Idle,
                RetrievalStage::Retrieving,
                RetrievalStage::Reranking,
                RetrievalStage::Done
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_lexical_only_collection_returns_nothing() {
        let retrieval = HybridRetrieval::new(
            RetrievalConfig::default(),
            Some(Arc::new(LexicalSearcher::new(1.5, 0.75))),
            None,
            None,
        )
        .unwrap();

        let result = retrieval.retrieve("anything", 5, true, false).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_missing_reranker_falls_back_to_fused_order() {
        let lexical = lexical_with(&["red fox", "red red fox", "blue whale"]).await;
        let retrieval =
            HybridRetrieval::new(RetrievalConfig::default(), Some(lexical), None, None).unwrap();

        let result = retrieval.retrieve("red", 1, true, true).await.unwrap();

        assert_eq!(result.len(), 1);
        assert!(!result.stats.reranked);
        assert!(matches!(
            result.degradations.as_slice(),
            [Degradation::RerankerUnavailable { .. }]
        ));
        assert_eq!(result.stats.retrieve_k, 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let lexical = lexical_with(&["the quiet archive"]).await;
        let retrieval =
            HybridRetrieval::new(RetrievalConfig::default(), Some(lexical), None, None).unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let result = retrieval
            .retrieve_with_cancel("archive", 1, true, false, &token)
            .await;
        assert!(matches!(result, Err(RetrievalError::Cancelled)));
    }

    #[tokio::test]
    async fn test_rebuild_lexical_requires_store() {
        let lexical = lexical_with(&["x marks the spot"]).await;
        let retrieval =
            HybridRetrieval::new(RetrievalConfig::default(), Some(lexical), None, None).unwrap();
        assert!(matches!(
            retrieval.rebuild_lexical().await,
            Err(RetrievalError::IndexUnavailable(_))
        ));
    }
}
