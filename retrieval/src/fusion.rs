use crate::config::RetrievalConfig;
use crate::error::{Result, RetrievalError};
use crate::result::{Candidate, Degradation, SearchMethod};
use log::{debug, warn};
use lore_vector_store::{Document, DocumentId};
use std::collections::HashMap;

/// Fused, thresholded candidates plus any source that had to be skipped
#[derive(Debug, Clone, Default)]
pub struct FusedCandidates {
    pub candidates: Vec<Candidate>,
    pub degradations: Vec<Degradation>,
}

/// Weighted linear fusion of lexical and semantic rankings
#[derive(Debug, Clone)]
pub struct ScoreFuser {
    lexical_weight: f32,
    semantic_weight: f32,
    min_score: f32,
}

struct Entry {
    document: Document,
    lexical: Option<f32>,
    semantic: Option<f32>,
}

impl ScoreFuser {
    pub fn new(config: &RetrievalConfig) -> Self {
        Self {
            lexical_weight: config.lexical_weight,
            semantic_weight: config.semantic_weight,
            min_score: config.min_score,
        }
    }

    /// Scale raw BM25 scores into `[0, 1]` by this query's maximum.
    pub fn normalize_lexical(results: Vec<(Document, f32)>) -> Vec<(Document, f32)> {
        let max = results
            .iter()
            .map(|(_, score)| *score)
            .fold(0.0f32, f32::max);
        let divisor = if max > 0.0 { max } else { 1.0 };

        results
            .into_iter()
            .map(|(document, score)| (document, score / divisor))
            .collect()
    }

    /// Fuse both sources into at most `limit` candidates.
    ///
    /// A failed source contributes nothing and is reported as a degradation;
    /// the surviving source is then ranked on its own normalized scores, so
    /// `min_score` applies to the same values as a single-source search.
    /// Fails with `RetrievalUnavailable` only when both sources failed.
    pub fn fuse(
        &self,
        lexical: Result<Vec<(Document, f32)>>,
        semantic: Result<Vec<(Document, f32)>>,
        limit: usize,
    ) -> Result<FusedCandidates> {
        let mut degradations = Vec::new();

        let (lexical, semantic, lexical_weight, semantic_weight) = match (lexical, semantic) {
            (Err(lex_err), Err(sem_err)) => {
                return Err(RetrievalError::RetrievalUnavailable(format!(
                    "lexical: {lex_err}; semantic: {sem_err}"
                )));
            }
            (Ok(lexical), Ok(semantic)) => {
                (lexical, semantic, self.lexical_weight, self.semantic_weight)
            }
            (Err(err), Ok(semantic)) => {
                warn!("Lexical search failed, degrading to semantic-only: {err}");
                degradations.push(Degradation::LexicalUnavailable {
                    reason: err.to_string(),
                });
                (Vec::new(), semantic, 0.0, 1.0)
            }
            (Ok(lexical), Err(err)) => {
                warn!("Semantic search failed, degrading to lexical-only: {err}");
                degradations.push(Degradation::SemanticUnavailable {
                    reason: err.to_string(),
                });
                (lexical, Vec::new(), 1.0, 0.0)
            }
        };

        debug!(
            "Weighted fusion: {} lexical + {} semantic",
            lexical.len(),
            semantic.len()
        );

        // Vec order is first-appearance order, lexical before semantic.
        let mut entries: Vec<Entry> = Vec::with_capacity(lexical.len() + semantic.len());
        let mut positions: HashMap<DocumentId, usize> = HashMap::new();

        for (document, score) in Self::normalize_lexical(lexical) {
            let id = document.id();
            if positions.contains_key(&id) {
                continue;
            }
            positions.insert(id, entries.len());
            entries.push(Entry {
                document,
                lexical: Some(score),
                semantic: None,
            });
        }

        for (document, score) in semantic {
            let id = document.id();
            match positions.get(&id) {
                Some(&position) => {
                    let entry = &mut entries[position];
                    if entry.semantic.is_none() {
                        entry.semantic = Some(score);
                    }
                }
                None => {
                    positions.insert(id, entries.len());
                    entries.push(Entry {
                        document,
                        lexical: None,
                        semantic: Some(score),
                    });
                }
            }
        }

        let mut candidates: Vec<Candidate> = entries
            .into_iter()
            .map(|entry| {
                let score = lexical_weight * entry.lexical.unwrap_or(0.0)
                    + semantic_weight * entry.semantic.unwrap_or(0.0);
                let method = match (entry.lexical, entry.semantic) {
                    (Some(_), Some(_)) => SearchMethod::Hybrid,
                    (Some(_), None) => SearchMethod::Lexical,
                    _ => SearchMethod::Semantic,
                };
                Candidate::new(entry.document, score, method)
            })
            .collect();

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.retain(|c| c.score >= self.min_score);
        candidates.truncate(limit);

        debug!("Fusion produced {} candidates", candidates.len());
        Ok(FusedCandidates {
            candidates,
            degradations,
        })
    }

    /// Rank a single source's results without fusion.
    ///
    /// Lexical scores should be normalized by the caller. Duplicates keep
    /// their first occurrence.
    pub fn rank_single(
        &self,
        results: Vec<(Document, f32)>,
        method: SearchMethod,
        limit: usize,
    ) -> Vec<Candidate> {
        let mut seen = std::collections::HashSet::new();
        let mut candidates: Vec<Candidate> = results
            .into_iter()
            .filter(|(document, _)| seen.insert(document.id()))
            .map(|(document, score)| Candidate::new(document, score, method))
            .collect();

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.retain(|c| c.score >= self.min_score);
        candidates.truncate(limit);
        candidates
    }
}
