//! Shared test fixtures: a table-driven scoring model and the small
//! "the cat sat" vocabularies the scenario tests use.

use std::collections::HashMap;

use crate::model::{ModelError, OnlineLearner, ScoringModel, StepScores};
use crate::vocab::{TokenId, Vocabulary, EOS, EOS_ID, PAD_ID};

/// Bigram table over target ids. Transitions that were not listed get
/// `floor` before normalisation, so every non-pad token stays reachable.
#[derive(Debug, Clone)]
pub struct TableModel {
    vocab_size: usize,
    floor: f32,
    transitions: HashMap<TokenId, HashMap<TokenId, f32>>,
    /// Pairs handed to `learn`, oldest first.
    pub learned: Vec<(Vec<TokenId>, Vec<TokenId>)>,
}

impl TableModel {
    pub fn new(vocab_size: usize) -> Self {
        Self {
            vocab_size,
            floor: 0.01,
            transitions: HashMap::new(),
            learned: Vec::new(),
        }
    }

    /// Weight for `next` after `prev`. `""` as `prev` is the sentence
    /// start, `"</s>"` as `next` closes the sentence.
    pub fn with(mut self, vocab: &Vocabulary, prev: &str, next: &str, weight: f32) -> Self {
        let prev = if prev.is_empty() {
            EOS_ID
        } else {
            vocab.id_or_unk(prev)
        };
        let next = if next == EOS { EOS_ID } else { vocab.id_or_unk(next) };
        self.transitions
            .entry(prev)
            .or_default()
            .insert(next, weight);
        self
    }
}

impl ScoringModel for TableModel {
    type Encoded = usize;

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// Only the source length matters: attention is a one-hot diagonal.
    fn encode(&self, source: &[TokenId]) -> Result<usize, ModelError> {
        Ok(source.len() + 1)
    }

    fn step(&self, encoded: &usize, prefix: &[TokenId]) -> Result<StepScores, ModelError> {
        let prev = prefix.last().copied().unwrap_or(EOS_ID);
        let row = self.transitions.get(&prev);
        let mut probs: Vec<f32> = (0..self.vocab_size as TokenId)
            .map(|t| {
                if t == PAD_ID {
                    0.0
                } else {
                    row.and_then(|r| r.get(&t)).copied().unwrap_or(self.floor)
                }
            })
            .collect();
        let total: f32 = probs.iter().sum();
        probs.iter_mut().for_each(|p| *p /= total);

        let mut attention = vec![0.0; *encoded];
        if let Some(slot) = attention.get_mut(prefix.len().min(encoded.saturating_sub(1))) {
            *slot = 1.0;
        }
        Ok(StepScores {
            log_probs: probs.into_iter().map(f32::ln).collect(),
            attention: Some(attention),
        })
    }
}

impl OnlineLearner for TableModel {
    fn learn(&mut self, source: &[TokenId], target: &[TokenId]) -> Result<(), ModelError> {
        self.learned.push((source.to_vec(), target.to_vec()));
        Ok(())
    }
}

pub fn cat_sat_target_vocab() -> Vocabulary {
    Vocabulary::from_words(["the", "dog", "cat", "car", "cap", "sat", "on", "mat"])
}

pub fn cat_sat_source_vocab() -> Vocabulary {
    Vocabulary::from_words(["le", "chat", "chien", "assis"])
}

/// Prefers "the dog sat" unconstrained; once position 1 is narrowed to
/// words starting with "c" it prefers "the cat sat".
pub fn cat_sat_model(vocab: &Vocabulary) -> TableModel {
    TableModel::new(vocab.len())
        .with(vocab, "", "the", 0.9)
        .with(vocab, "the", "dog", 0.5)
        .with(vocab, "the", "cat", 0.3)
        .with(vocab, "the", "car", 0.1)
        .with(vocab, "the", "cap", 0.05)
        .with(vocab, "dog", "sat", 0.9)
        .with(vocab, "cat", "sat", 0.9)
        .with(vocab, "car", "sat", 0.5)
        .with(vocab, "sat", "</s>", 0.9)
        .with(vocab, "sat", "on", 0.05)
        .with(vocab, "on", "the", 0.9)
        .with(vocab, "mat", "</s>", 0.9)
}
