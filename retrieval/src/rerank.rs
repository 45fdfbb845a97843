use crate::config::RetrievalConfig;
use crate::error::{Result, RetrievalError};
use crate::result::{Candidate, RankedDocument};
use crate::tokenizer::tokenize;
use log::debug;
use lore_vector_store::DocumentId;
use std::collections::HashSet;
use std::sync::Arc;

/// Scores (query, document text) pairs jointly.
///
/// Only the ordering of the returned scores is consumed, so they need not be
/// normalized. Must return exactly one score per document.
pub trait RelevanceModel: Send + Sync {
    fn score_batch(&self, query: &str, documents: &[&str]) -> Result<Vec<f32>>;

    fn name(&self) -> &str;
}

/// Second-pass ordering of fused candidates by a [`RelevanceModel`]
#[derive(Clone)]
pub struct Reranker {
    model: Arc<dyn RelevanceModel>,
    batch_size: usize,
}

impl Reranker {
    pub fn new(model: Arc<dyn RelevanceModel>, batch_size: usize) -> Self {
        Self {
            model,
            batch_size: batch_size.max(1),
        }
    }

    pub fn from_config(model: Arc<dyn RelevanceModel>, config: &RetrievalConfig) -> Self {
        Self::new(model, config.rerank_batch_size)
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Score every document against `query`, batching model calls
    pub fn score_documents(&self, query: &str, documents: &[&str]) -> Result<Vec<f32>> {
        let mut scores = Vec::with_capacity(documents.len());

        for batch in documents.chunks(self.batch_size) {
            let batch_scores = self.model.score_batch(query, batch)?;
            if batch_scores.len() != batch.len() {
                return Err(RetrievalError::RerankerUnavailable(format!(
                    "{} returned {} scores for {} documents",
                    self.model.name(),
                    batch_scores.len(),
                    batch.len()
                )));
            }
            scores.extend(batch_scores);
        }

        Ok(scores)
    }

    /// Reorder `candidates` by model score and keep the best `top_k`.
    ///
    /// Equal scores are ordered by document id, so the output does not depend
    /// on the order candidates arrive in.
    pub fn rerank(
        &self,
        query: &str,
        candidates: &[Candidate],
        top_k: usize,
    ) -> Result<Vec<RankedDocument>> {
        if candidates.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        // Each id is hashed once and reused for dedup and tie-breaks.
        let mut seen = HashSet::new();
        let unique: Vec<(DocumentId, &Candidate)> = candidates
            .iter()
            .map(|c| (c.document.id(), c))
            .filter(|(id, _)| seen.insert(id.clone()))
            .collect();

        debug!(
            "Reranking {} candidates with {}",
            unique.len(),
            self.model.name()
        );

        let texts: Vec<&str> = unique
            .iter()
            .map(|(_, c)| c.document.content.as_str())
            .collect();
        let scores = self.score_documents(query, &texts)?;

        let mut scored: Vec<(f32, DocumentId, &Candidate)> = scores
            .into_iter()
            .map(|score| if score.is_nan() { f32::NEG_INFINITY } else { score })
            .zip(unique)
            .map(|(score, (id, candidate))| (score, id, candidate))
            .collect();

        scored.sort_by(|(score_a, id_a, _), (score_b, id_b, _)| {
            score_b.total_cmp(score_a).then_with(|| id_a.cmp(id_b))
        });
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(rank, (score, _, candidate))| RankedDocument {
                document: candidate.document.clone(),
                score,
                method: candidate.method,
                rank,
            })
            .collect())
    }
}

/// Relevance heuristic that needs no model download.
///
/// Scores weighted query-term coverage, boosted for an exact phrase match and
/// damped for very short or very long passages.
#[derive(Debug, Clone, Default)]
pub struct TermOverlapModel;

#[derive(Debug)]
struct OverlapFeatures {
    exact_phrase: bool,
    coverage: f32,
    density: f32,
    doc_terms: usize,
}

impl TermOverlapModel {
    pub fn new() -> Self {
        Self
    }

    fn extract_features(query_terms: &[String], document: &str) -> OverlapFeatures {
        let doc_terms = tokenize(document);
        let doc_set: HashSet<&str> = doc_terms.iter().map(String::as_str).collect();

        let mut distinct = HashSet::new();
        let mut total_weight = 0.0f32;
        let mut matched_weight = 0.0f32;
        for term in query_terms {
            if !distinct.insert(term.as_str()) {
                continue;
            }
            // Longer terms are usually more specific.
            let weight = 1.0 + (term.chars().count() as f32).ln();
            total_weight += weight;
            if doc_set.contains(term.as_str()) {
                matched_weight += weight;
            }
        }

        let coverage = if total_weight > 0.0 {
            matched_weight / total_weight
        } else {
            0.0
        };

        let hits = doc_terms
            .iter()
            .filter(|t| distinct.contains(t.as_str()))
            .count();
        let density = if doc_terms.is_empty() {
            0.0
        } else {
            hits as f32 / doc_terms.len() as f32
        };

        let exact_phrase = query_terms.len() > 1
            && doc_terms
                .windows(query_terms.len())
                .any(|window| window == query_terms);

        OverlapFeatures {
            exact_phrase,
            coverage,
            density,
            doc_terms: doc_terms.len(),
        }
    }

    fn score_features(features: &OverlapFeatures) -> f32 {
        if features.coverage == 0.0 {
            return 0.0;
        }

        let mut score = features.coverage + 0.1 * features.density;

        if features.exact_phrase {
            score *= 1.3;
        }

        let size_penalty = if features.doc_terms < 5 {
            0.9 // Too small
        } else if features.doc_terms > 400 {
            0.85 // Too large
        } else {
            1.0
        };

        score * size_penalty
    }
}

impl RelevanceModel for TermOverlapModel {
    fn score_batch(&self, query: &str, documents: &[&str]) -> Result<Vec<f32>> {
        let query_terms = tokenize(query);
        Ok(documents
            .iter()
            .map(|doc| Self::score_features(&Self::extract_features(&query_terms, doc)))
            .collect())
    }

    fn name(&self) -> &str {
        "term-overlap"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::SearchMethod;
    use lore_vector_store::Document;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    fn candidate(content: &str, score: f32) -> Candidate {
        Candidate::new(Document::new(content), score, SearchMethod::Hybrid)
    }

    fn overlap_reranker(batch_size: usize) -> Reranker {
        Reranker::new(Arc::new(TermOverlapModel::new()), batch_size)
    }

    /// Records batch sizes and scores by content length.
    #[derive(Default)]
    struct RecordingModel {
        batches: Mutex<Vec<usize>>,
    }

    impl RelevanceModel for RecordingModel {
        fn score_batch(&self, _query: &str, documents: &[&str]) -> Result<Vec<f32>> {
            self.batches.lock().unwrap().push(documents.len());
            Ok(documents.iter().map(|d| d.len() as f32).collect())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    struct ShortModel;

    impl RelevanceModel for ShortModel {
        fn score_batch(&self, _query: &str, _documents: &[&str]) -> Result<Vec<f32>> {
            Ok(vec![1.0])
        }

        fn name(&self) -> &str {
            "short"
        }
    }

    #[test]
    fn test_empty_input() {
        let reranker = overlap_reranker(4);
        assert!(reranker.rerank("anything", &[], 5).unwrap().is_empty());
    }

    #[test]
    fn test_rerank_orders_by_model_score() {
        let reranker = overlap_reranker(32);
        let candidates = vec![
            candidate("Maya is a programmer in Zone Alpha", 0.9),
            candidate("The Nexus is the Consortium's data core", 0.8),
            candidate("Alex Chen is a Nexus technician", 0.1),
        ];

        let reranked = reranker.rerank("Who is Alex?", &candidates, 2).unwrap();

        assert_eq!(reranked.len(), 2);
        assert_eq!(reranked[0].document.content, "Alex Chen is a Nexus technician");
        assert_eq!(reranked[0].rank, 0);
        assert_eq!(reranked[1].rank, 1);
        assert!(reranked[0].score >= reranked[1].score);
    }

    #[test]
    fn test_rerank_independent_of_input_order() {
        let reranker = overlap_reranker(2);
        let mut candidates = vec![
            candidate("the tower fell", 0.1),
            candidate("the tower stood", 0.2),
            candidate("a river ran", 0.3),
            candidate("the tower of dusk fell", 0.4),
        ];

        let forward = reranker.rerank("tower fell", &candidates, 4).unwrap();
        candidates.reverse();
        let backward = reranker.rerank("tower fell", &candidates, 4).unwrap();

        let ids = |r: &[RankedDocument]| r.iter().map(|d| d.document.id()).collect::<Vec<_>>();
        assert_eq!(ids(&forward), ids(&backward));
    }

    #[test]
    fn test_batching_does_not_change_order() {
        let candidates: Vec<Candidate> = (0..7)
            .map(|i| candidate(&"word ".repeat(i + 1), 0.0))
            .collect();

        let model = Arc::new(RecordingModel::default());
        let batched = Reranker::new(model.clone(), 3)
            .rerank("word", &candidates, 7)
            .unwrap();
        let single = Reranker::new(Arc::new(RecordingModel::default()), 100)
            .rerank("word", &candidates, 7)
            .unwrap();

        assert_eq!(*model.batches.lock().unwrap(), vec![3, 3, 1]);
        assert_eq!(batched, single);
        assert_eq!(batched[0].document.content, "word ".repeat(7));
    }

    #[test]
    fn test_equal_scores_ordered_by_document_id() {
        // Equal lengths give equal scores.
        let candidates = vec![
            candidate("ember", 0.9),
            candidate("frost", 0.5),
            candidate("gleam", 0.1),
        ];
        let reranker = Reranker::new(Arc::new(RecordingModel::default()), 2);

        let reranked = reranker.rerank("any", &candidates, 3).unwrap();

        let mut expected: Vec<_> = candidates.iter().map(|c| c.document.id()).collect();
        expected.sort();
        let ids: Vec<_> = reranked.iter().map(|d| d.document.id()).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_score_count_mismatch_is_reranker_error() {
        let reranker = Reranker::new(Arc::new(ShortModel), 8);
        let candidates = vec![candidate("a b", 0.5), candidate("c d", 0.4)];
        assert!(matches!(
            reranker.rerank("a", &candidates, 2),
            Err(RetrievalError::RerankerUnavailable(_))
        ));
    }

    #[test]
    fn test_duplicate_candidates_collapsed() {
        let reranker = overlap_reranker(8);
        let candidates = vec![candidate("same text", 0.5), candidate("same text", 0.4)];
        assert_eq!(reranker.rerank("text", &candidates, 5).unwrap().len(), 1);
    }

    #[test]
    fn test_term_overlap_exact_phrase_boost() {
        let model = TermOverlapModel::new();
        let scores = model
            .score_batch(
                "silver gate",
                &[
                    "they crossed the silver gate at dawn",
                    "the gate was silver and old at dawn",
                ],
            )
            .unwrap();
        assert!(scores[0] > scores[1]);
    }

    #[test]
    fn test_term_overlap_no_match_scores_zero() {
        let model = TermOverlapModel::new();
        let scores = model.score_batch("dragon", &["a quiet harbor town"]).unwrap();
        assert_eq!(scores, vec![0.0]);
        assert_eq!(model.score_batch("?", &["anything"]).unwrap(), vec![0.0]);
    }
}
