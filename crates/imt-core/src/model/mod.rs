//! Scoring-model seam.
//!
//! The decoder never looks inside a model: it encodes the source once per
//! sentence and then asks for next-token log-probabilities given a target
//! prefix. Attention weights over source positions come along when the
//! model has them.

mod lexical;

pub use lexical::LexicalModel;

use crate::vocab::TokenId;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model returned {actual} scores, expected {expected}")]
    VocabMismatch { expected: usize, actual: usize },
    #[error("token id {0} is outside the model vocabulary")]
    InvalidToken(TokenId),
    #[error("empty training pair")]
    EmptyPair,
}

/// Next-token distribution for one decoder step.
#[derive(Debug, Clone)]
pub struct StepScores {
    /// Natural-log probabilities, one per target vocabulary id.
    pub log_probs: Vec<f32>,
    /// Weights over encoded source positions for this step.
    pub attention: Option<Vec<f32>>,
}

pub trait ScoringModel {
    /// Encoded source representation, reused for every step of a sentence.
    type Encoded;

    fn vocab_size(&self) -> usize;

    fn encode(&self, source: &[TokenId]) -> Result<Self::Encoded, ModelError>;

    /// Scores for the token following `prefix`.
    fn step(&self, encoded: &Self::Encoded, prefix: &[TokenId]) -> Result<StepScores, ModelError>;

    /// `step` plus the length check every caller wants.
    fn checked_step(
        &self,
        encoded: &Self::Encoded,
        prefix: &[TokenId],
    ) -> Result<StepScores, ModelError> {
        let scores = self.step(encoded, prefix)?;
        if scores.log_probs.len() != self.vocab_size() {
            return Err(ModelError::VocabMismatch {
                expected: self.vocab_size(),
                actual: scores.log_probs.len(),
            });
        }
        Ok(scores)
    }
}

/// A model that can be updated from a validated translation.
pub trait OnlineLearner {
    fn learn(&mut self, source: &[TokenId], target: &[TokenId]) -> Result<(), ModelError>;
}
