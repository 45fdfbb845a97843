use crate::config::RerankerProfile;
use crate::error::{Result, RetrievalError};
use crate::rerank::RelevanceModel;
use fastembed::{RerankInitOptions, RerankerModel, TextRerank};
use log::info;

impl RerankerProfile {
    pub fn fastembed_model(self) -> RerankerModel {
        match self {
            RerankerProfile::Fast => RerankerModel::JINARerankerV1TurboEn,
            RerankerProfile::Accurate => RerankerModel::BGERerankerBase,
            RerankerProfile::Multilingual => RerankerModel::BGERerankerV2M3,
        }
    }

    pub fn model_name(self) -> &'static str {
        match self {
            RerankerProfile::Fast => "jina-reranker-v1-turbo-en",
            RerankerProfile::Accurate => "bge-reranker-base",
            RerankerProfile::Multilingual => "bge-reranker-v2-m3",
        }
    }
}

/// Cross-encoder relevance model backed by fastembed
pub struct CrossEncoderModel {
    model: TextRerank,
    profile: RerankerProfile,
}

impl CrossEncoderModel {
    /// Load (downloading on first use) the model for `profile`
    pub fn new(profile: RerankerProfile) -> Result<Self> {
        Self::with_download_progress(profile, false)
    }

    pub fn with_download_progress(profile: RerankerProfile, show_progress: bool) -> Result<Self> {
        info!("Loading cross-encoder {}", profile.model_name());

        let options = RerankInitOptions::new(profile.fastembed_model())
            .with_show_download_progress(show_progress);
        let model = TextRerank::try_new(options).map_err(|e| {
            RetrievalError::RerankerUnavailable(format!(
                "failed to load {}: {e}",
                profile.model_name()
            ))
        })?;

        Ok(Self { model, profile })
    }

    pub fn profile(&self) -> RerankerProfile {
        self.profile
    }
}

impl RelevanceModel for CrossEncoderModel {
    fn score_batch(&self, query: &str, documents: &[&str]) -> Result<Vec<f32>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let results = self
            .model
            .rerank(query, documents.to_vec(), false, Some(documents.len()))
            .map_err(|e| RetrievalError::RerankerUnavailable(e.to_string()))?;

        // Results come back sorted by score; restore input order.
        let mut scores = vec![f32::NAN; documents.len()];
        for result in results {
            if let Some(slot) = scores.get_mut(result.index) {
                *slot = result.score;
            }
        }

        if scores.iter().any(|s| s.is_nan()) {
            return Err(RetrievalError::RerankerUnavailable(format!(
                "{} did not score every document",
                self.profile.model_name()
            )));
        }

        Ok(scores)
    }

    fn name(&self) -> &str {
        self.profile.model_name()
    }
}
