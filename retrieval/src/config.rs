use crate::error::{Result, RetrievalError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Latency/accuracy trade-off of the pairwise relevance model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RerankerProfile {
    /// Small English model, lowest latency
    #[default]
    Fast,
    /// Larger model, better precision, roughly twice as slow
    Accurate,
    /// Multilingual model for corpora not written in English
    Multilingual,
}

impl RerankerProfile {
    pub fn as_str(self) -> &'static str {
        match self {
            RerankerProfile::Fast => "fast",
            RerankerProfile::Accurate => "accurate",
            RerankerProfile::Multilingual => "multilingual",
        }
    }
}

impl fmt::Display for RerankerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RerankerProfile {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(RerankerProfile::Fast),
            "accurate" => Ok(RerankerProfile::Accurate),
            "multilingual" => Ok(RerankerProfile::Multilingual),
            other => Err(format!(
                "unknown reranker profile '{other}' (expected fast, accurate or multilingual)"
            )),
        }
    }
}

/// Configuration for hybrid retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Relative weight of normalized lexical (BM25) scores
    #[serde(default = "default_lexical_weight")]
    pub lexical_weight: f32,

    /// Relative weight of semantic similarity scores
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,

    /// Over-fetch factor applied before reranking
    #[serde(default = "default_candidate_multiplier")]
    pub candidate_multiplier: usize,

    #[serde(default)]
    pub reranker_model_profile: RerankerProfile,

    /// Fused candidates scoring below this are dropped
    #[serde(default)]
    pub min_score: f32,

    /// Number of (query, document) pairs sent to the relevance model at once
    #[serde(default = "default_rerank_batch_size")]
    pub rerank_batch_size: usize,

    /// BM25 term-frequency saturation
    #[serde(default = "default_bm25_k1")]
    pub bm25_k1: f32,

    /// BM25 length normalization (0 = none, 1 = full)
    #[serde(default = "default_bm25_b")]
    pub bm25_b: f32,
}

fn default_lexical_weight() -> f32 {
    0.4
}

fn default_semantic_weight() -> f32 {
    0.6
}

fn default_candidate_multiplier() -> usize {
    3
}

fn default_rerank_batch_size() -> usize {
    32
}

fn default_bm25_k1() -> f32 {
    1.5
}

fn default_bm25_b() -> f32 {
    0.75
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            lexical_weight: default_lexical_weight(),
            semantic_weight: default_semantic_weight(),
            candidate_multiplier: default_candidate_multiplier(),
            reranker_model_profile: RerankerProfile::default(),
            min_score: 0.0,
            rerank_batch_size: default_rerank_batch_size(),
            bm25_k1: default_bm25_k1(),
            bm25_b: default_bm25_b(),
        }
    }
}

impl RetrievalConfig {
    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (name, weight) in [
            ("lexical_weight", self.lexical_weight),
            ("semantic_weight", self.semantic_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(format!("{name} must be a non-negative number, got {weight}"));
            }
        }

        // Weights are relative and need not sum to 1.
        if self.lexical_weight == 0.0 && self.semantic_weight == 0.0 {
            return Err("lexical_weight and semantic_weight cannot both be 0".to_string());
        }

        if self.candidate_multiplier == 0 {
            return Err("candidate_multiplier must be >= 1".to_string());
        }

        if !self.min_score.is_finite() {
            return Err(format!("min_score must be finite, got {}", self.min_score));
        }

        if self.rerank_batch_size == 0 {
            return Err("rerank_batch_size must be > 0".to_string());
        }

        if !self.bm25_k1.is_finite() || self.bm25_k1 < 0.0 {
            return Err(format!("bm25_k1 must be >= 0, got {}", self.bm25_k1));
        }

        if !(0.0..=1.0).contains(&self.bm25_b) {
            return Err(format!("bm25_b must be in [0.0, 1.0], got {}", self.bm25_b));
        }

        Ok(())
    }

    /// Load a TOML configuration file; absent keys keep their defaults
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RetrievalError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| RetrievalError::InvalidConfig(e.to_string()))?;
        config.validate().map_err(RetrievalError::InvalidConfig)?;
        Ok(config)
    }

    /// Create config optimized for speed
    pub fn fast() -> Self {
        Self {
            candidate_multiplier: 2,
            reranker_model_profile: RerankerProfile::Fast,
            ..Default::default()
        }
    }

    /// Create config optimized for accuracy
    pub fn accurate() -> Self {
        Self {
            candidate_multiplier: 5,
            reranker_model_profile: RerankerProfile::Accurate,
            ..Default::default()
        }
    }

    /// Create config for non-English corpora
    pub fn multilingual() -> Self {
        Self {
            reranker_model_profile: RerankerProfile::Multilingual,
            ..Default::default()
        }
    }
}
