use lore_vector_store::Document;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which retrieval path produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    /// BM25 term matching only
    Lexical,
    /// Embedding similarity only
    Semantic,
    /// Weighted fusion of both
    Hybrid,
}

impl SearchMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchMethod::Lexical => "lexical",
            SearchMethod::Semantic => "semantic",
            SearchMethod::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document scored by one retrieval stage of a single query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub document: Document,
    pub score: f32,
    pub method: SearchMethod,
}

impl Candidate {
    pub fn new(document: Document, score: f32, method: SearchMethod) -> Self {
        Self {
            document,
            score,
            method,
        }
    }
}

/// A single entry of the final ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedDocument {
    pub document: Document,

    /// Fused score, or the relevance model's score when reranked
    pub score: f32,

    /// Retrieval path the document came from
    pub method: SearchMethod,

    /// Position in the result list (0 = best)
    pub rank: usize,
}

impl RankedDocument {
    pub fn from_candidate(candidate: Candidate, rank: usize) -> Self {
        Self {
            document: candidate.document,
            score: candidate.score,
            method: candidate.method,
            rank,
        }
    }
}

/// A source that failed without failing the query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Degradation {
    LexicalUnavailable { reason: String },
    SemanticUnavailable { reason: String },
    RerankerUnavailable { reason: String },
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degradation::LexicalUnavailable { reason } => {
                write!(f, "lexical search unavailable, using semantic results only: {reason}")
            }
            Degradation::SemanticUnavailable { reason } => {
                write!(f, "semantic search unavailable, using lexical results only: {reason}")
            }
            Degradation::RerankerUnavailable { reason } => {
                write!(f, "reranker unavailable, returning fused order: {reason}")
            }
        }
    }
}

/// States a query passes through on the way to `Done`.
///
/// A query that fails outright has no stage list: `retrieve` returns the
/// error instead of a `RankedResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalStage {
    Idle,
    Retrieving,
    Fusing,
    /// A source failed and the query continued without it
    Degraded,
    Reranking,
    Done,
}

/// Search performance statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Total search time in milliseconds
    pub total_time_ms: u64,

    /// Time spent in the concurrent lexical + semantic searches
    pub retrieval_time_ms: u64,

    pub fusion_time_ms: u64,

    pub rerank_time_ms: u64,

    /// Candidates requested from each source
    pub retrieve_k: usize,

    /// Number of lexical results
    pub lexical_count: usize,

    /// Number of semantic results
    pub semantic_count: usize,

    /// Candidates left after fusion and thresholding
    pub fused_count: usize,

    /// Whether the relevance model ordered the final list
    pub reranked: bool,
}

/// Outcome of one query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedResult {
    /// Query that produced these results
    pub query: String,

    /// Best first, no duplicate documents
    pub results: Vec<RankedDocument>,

    pub degradations: Vec<Degradation>,

    /// Path taken through the query state machine
    pub stages: Vec<RetrievalStage>,

    pub stats: SearchStats,
}

impl RankedResult {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            results: Vec::new(),
            degradations: Vec::new(),
            stages: vec![RetrievalStage::Idle],
            stats: SearchStats::default(),
        }
    }

    pub fn with_results(mut self, results: Vec<RankedDocument>) -> Self {
        self.results = results;
        self
    }

    pub fn with_stats(mut self, stats: SearchStats) -> Self {
        self.stats = stats;
        self
    }

    /// Record a degradation, entering the `Degraded` stage
    pub fn degrade(&mut self, degradation: Degradation) {
        self.degradations.push(degradation);
        self.enter(RetrievalStage::Degraded);
    }

    pub fn enter(&mut self, stage: RetrievalStage) {
        if self.stages.last() != Some(&stage) {
            self.stages.push(stage);
        }
    }

    /// Get top N results
    pub fn top(&self, n: usize) -> &[RankedDocument] {
        &self.results[..n.min(self.results.len())]
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.results.iter().map(|r| &r.document)
    }

    pub fn into_documents(self) -> Vec<Document> {
        self.results.into_iter().map(|r| r.document).collect()
    }
}
