//! Feature-hashing embedder.
//!
//! Projects term frequencies into a fixed number of buckets with FNV-1a and
//! L2-normalizes the result. It carries no model weights, so it is always
//! available and fully deterministic.

use crate::error::EmbeddingError;
use crate::provider::EmbeddingProvider;
use std::collections::HashMap;

/// Default number of hash buckets.
pub const DEFAULT_HASHING_DIM: usize = 256;

/// Deterministic bag-of-words embedder.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self, EmbeddingError> {
        if dimension == 0 {
            return Err(EmbeddingError::InvalidInput(
                "hashing dimension must be > 0".to_string(),
            ));
        }
        Ok(Self { dimension })
    }

    fn bucket(term: &str, dimension: usize) -> usize {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in term.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        (hash % dimension as u64) as usize
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut counts: HashMap<String, f32> = HashMap::new();
        for term in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() >= 2)
        {
            *counts.entry(term.to_lowercase()).or_default() += 1.0;
        }

        let mut vector = vec![0.0f32; self.dimension];
        let total: f32 = counts.values().sum();
        if total == 0.0 {
            return vector;
        }

        for (term, count) in &counts {
            // Longer terms are rarer in prose; weight them up slightly.
            let weight = 1.0 + (term.chars().count() as f32).ln();
            vector[Self::bucket(term, self.dimension)] += (count / total) * weight;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_HASHING_DIM,
        }
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hashing"
    }
}
