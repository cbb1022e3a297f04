//! Count-based lexical translation model.
//!
//! A target bigram language model interpolated with a source-conditioned
//! lexical table. The lexical side is mixed through a monotone attention
//! window centred on the source position that matches the current target
//! position, so the model produces the same `(log_probs, attention)` pair
//! an attentional decoder would. Counts only ever grow, which makes the
//! model trivially trainable online from validated corrections.

use std::collections::HashMap;

use tracing::debug;

use super::{ModelError, OnlineLearner, ScoringModel, StepScores};
use crate::settings::ModelSettings;
use crate::vocab::{TokenId, EOS_ID, PAD_ID};

#[derive(Debug, Clone)]
pub struct LexicalModel {
    source_vocab_size: usize,
    target_vocab_size: usize,
    lm_weight: f32,
    lm_smoothing: f32,
    lex_smoothing: f32,
    attention_width: f32,

    unigrams: Vec<f32>,
    unigram_total: f32,
    /// prev → (next → count); sentence start uses `EOS_ID` as prev.
    bigrams: HashMap<TokenId, HashMap<TokenId, f32>>,
    bigram_totals: HashMap<TokenId, f32>,
    /// source word → (target word → fractional co-occurrence count)
    lexical: HashMap<TokenId, HashMap<TokenId, f32>>,
    lexical_totals: HashMap<TokenId, f32>,
    pairs_seen: usize,
}

impl LexicalModel {
    pub fn new(source_vocab_size: usize, target_vocab_size: usize, params: &ModelSettings) -> Self {
        Self {
            source_vocab_size,
            target_vocab_size,
            lm_weight: params.lm_weight,
            lm_smoothing: params.lm_smoothing,
            lex_smoothing: params.lex_smoothing,
            attention_width: params.attention_width,
            unigrams: vec![0.0; target_vocab_size],
            unigram_total: 0.0,
            bigrams: HashMap::new(),
            bigram_totals: HashMap::new(),
            lexical: HashMap::new(),
            lexical_totals: HashMap::new(),
            pairs_seen: 0,
        }
    }

    /// Build a model from an aligned parallel corpus of id sequences.
    pub fn train<'a, I>(
        source_vocab_size: usize,
        target_vocab_size: usize,
        params: &ModelSettings,
        pairs: I,
    ) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = (&'a [TokenId], &'a [TokenId])>,
    {
        let mut model = Self::new(source_vocab_size, target_vocab_size, params);
        for (source, target) in pairs {
            model.learn(source, target)?;
        }
        debug!(pairs = model.pairs_seen, "lexical model trained");
        Ok(model)
    }

    pub fn pairs_seen(&self) -> usize {
        self.pairs_seen
    }

    fn check_ids(&self, ids: &[TokenId], limit: usize) -> Result<(), ModelError> {
        match ids.iter().find(|&&id| id as usize >= limit) {
            Some(&bad) => Err(ModelError::InvalidToken(bad)),
            None => Ok(()),
        }
    }

    fn attention_row(&self, source_len: usize, position: usize) -> Vec<f32> {
        let centre = position.min(source_len.saturating_sub(1)) as f32;
        let mut row: Vec<f32> = (0..source_len)
            .map(|j| (-(j as f32 - centre).abs() / self.attention_width).exp())
            .collect();
        let total: f32 = row.iter().sum();
        if total > 0.0 {
            row.iter_mut().for_each(|w| *w /= total);
        }
        row
    }

    fn unigram_prob(&self, t: TokenId) -> f32 {
        (self.unigrams[t as usize] + 1.0) / (self.unigram_total + self.target_vocab_size as f32)
    }
}

impl ScoringModel for LexicalModel {
    /// Source ids followed by an end-of-source slot.
    type Encoded = Vec<TokenId>;

    fn vocab_size(&self) -> usize {
        self.target_vocab_size
    }

    fn encode(&self, source: &[TokenId]) -> Result<Self::Encoded, ModelError> {
        self.check_ids(source, self.source_vocab_size)?;
        let mut encoded = source.to_vec();
        encoded.push(EOS_ID);
        Ok(encoded)
    }

    fn step(&self, encoded: &Self::Encoded, prefix: &[TokenId]) -> Result<StepScores, ModelError> {
        self.check_ids(prefix, self.target_vocab_size)?;
        let attention = self.attention_row(encoded.len(), prefix.len());
        let prev = prefix.last().copied().unwrap_or(EOS_ID);
        let context = self.bigrams.get(&prev);
        let context_total = self.bigram_totals.get(&prev).copied().unwrap_or(0.0);

        let mut probs = vec![0.0f32; self.target_vocab_size];
        for (t, p) in probs.iter_mut().enumerate() {
            let t = t as TokenId;
            if t == PAD_ID {
                continue;
            }
            let base = self.unigram_prob(t);
            let bigram = context.and_then(|c| c.get(&t)).copied().unwrap_or(0.0);
            let lm = (bigram + self.lm_smoothing * base) / (context_total + self.lm_smoothing);

            let mut lex = 0.0;
            for (&s, &weight) in encoded.iter().zip(&attention) {
                let count = self
                    .lexical
                    .get(&s)
                    .and_then(|row| row.get(&t))
                    .copied()
                    .unwrap_or(0.0);
                let total = self.lexical_totals.get(&s).copied().unwrap_or(0.0);
                lex += weight * (count + self.lex_smoothing * base) / (total + self.lex_smoothing);
            }
            *p = self.lm_weight * lm + (1.0 - self.lm_weight) * lex;
        }

        let total: f32 = probs.iter().sum();
        let log_probs = probs
            .into_iter()
            .map(|p| if p > 0.0 { (p / total).ln() } else { f32::NEG_INFINITY })
            .collect();
        Ok(StepScores {
            log_probs,
            attention: Some(attention),
        })
    }
}

impl OnlineLearner for LexicalModel {
    fn learn(&mut self, source: &[TokenId], target: &[TokenId]) -> Result<(), ModelError> {
        if source.is_empty() && target.is_empty() {
            return Err(ModelError::EmptyPair);
        }
        self.check_ids(source, self.source_vocab_size)?;
        self.check_ids(target, self.target_vocab_size)?;

        let mut prev = EOS_ID;
        for &t in target.iter().chain(std::iter::once(&EOS_ID)) {
            self.unigrams[t as usize] += 1.0;
            self.unigram_total += 1.0;
            *self.bigrams.entry(prev).or_default().entry(t).or_default() += 1.0;
            *self.bigram_totals.entry(prev).or_default() += 1.0;
            prev = t;
        }

        let share = 1.0 / (source.len() + 1) as f32;
        for &s in source.iter().chain(std::iter::once(&EOS_ID)) {
            let row = self.lexical.entry(s).or_default();
            for &t in target.iter().chain(std::iter::once(&EOS_ID)) {
                *row.entry(t).or_default() += share;
            }
            *self.lexical_totals.entry(s).or_default() += share * (target.len() + 1) as f32;
        }
        self.pairs_seen += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::vocab::Vocabulary;

    fn corpus() -> (Vocabulary, Vocabulary, Vec<(Vec<TokenId>, Vec<TokenId>)>) {
        let src = ["el gato", "el perro", "la casa", "el gato come"];
        let tgt = ["the cat", "the dog", "the house", "the cat eats"];
        let sv = Vocabulary::from_corpus(src, 1);
        let tv = Vocabulary::from_corpus(tgt, 1);
        let pairs = src
            .iter()
            .zip(tgt.iter())
            .map(|(s, t)| {
                (
                    sv.encode(s.split_whitespace()),
                    tv.encode(t.split_whitespace()),
                )
            })
            .collect();
        (sv, tv, pairs)
    }

    fn trained() -> (Vocabulary, Vocabulary, LexicalModel) {
        let (sv, tv, pairs) = corpus();
        let params = Settings::default().model;
        let model = LexicalModel::train(
            sv.len(),
            tv.len(),
            &params,
            pairs.iter().map(|(s, t)| (s.as_slice(), t.as_slice())),
        )
        .unwrap();
        (sv, tv, model)
    }

    fn argmax(v: &[f32]) -> TokenId {
        let mut best = 0;
        for (i, x) in v.iter().enumerate() {
            if *x > v[best] {
                best = i;
            }
        }
        best as TokenId
    }

    #[test]
    fn step_is_a_distribution() {
        let (sv, _, model) = trained();
        let enc = model.encode(&sv.encode(["el", "gato"])).unwrap();
        let scores = model.checked_step(&enc, &[]).unwrap();
        let mass: f32 = scores.log_probs.iter().map(|lp| lp.exp()).sum();
        assert!((mass - 1.0).abs() < 1e-4);
        assert_eq!(scores.log_probs[PAD_ID as usize], f32::NEG_INFINITY);
        let att = scores.attention.unwrap();
        assert_eq!(att.len(), 3);
        assert!((att.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn greedy_follows_training_data() {
        let (sv, tv, model) = trained();
        let enc = model.encode(&sv.encode(["el", "perro"])).unwrap();
        let first = argmax(&model.step(&enc, &[]).unwrap().log_probs);
        assert_eq!(tv.word(first), "the");
        let second = argmax(&model.step(&enc, &[first]).unwrap().log_probs);
        assert_eq!(tv.word(second), "dog");
    }

    #[test]
    fn attention_follows_position() {
        let (sv, _, model) = trained();
        let enc = model.encode(&sv.encode(["el", "gato", "come"])).unwrap();
        let att = model.step(&enc, &[3, 4]).unwrap().attention.unwrap();
        let peak = argmax(&att);
        assert_eq!(peak, 2);
    }

    #[test]
    fn learning_raises_probability() {
        let (sv, tv, mut model) = trained();
        let src = sv.encode(["la", "casa"]);
        let tgt = tv.encode(["the", "cat"]);
        let enc = model.encode(&src).unwrap();
        let before = model.step(&enc, &tgt[..1]).unwrap().log_probs[tgt[1] as usize];
        model.learn(&src, &tgt).unwrap();
        model.learn(&src, &tgt).unwrap();
        let after = model.step(&enc, &tgt[..1]).unwrap().log_probs[tgt[1] as usize];
        assert!(after > before);
        assert_eq!(model.pairs_seen(), 6);
    }

    #[test]
    fn rejects_out_of_range_ids() {
        let (_, _, model) = trained();
        let err = model.encode(&[10_000]).unwrap_err();
        assert!(matches!(err, ModelError::InvalidToken(10_000)));
    }

    #[test]
    fn rejects_empty_pair() {
        let (_, _, mut model) = trained();
        assert!(matches!(model.learn(&[], &[]), Err(ModelError::EmptyPair)));
    }
}
