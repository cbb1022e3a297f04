//! Active-learning sentence selection.
//!
//! [`rank`] scores one processed block under a [`SamplingMode`] and keeps
//! the best `n` sentences for human correction. Stateful modes take their
//! accumulator by value and hand the updated one back in the [`Ranking`],
//! so a block's update can be inspected and tested on its own.

mod attention;
mod centroid;
mod committee;
mod ngram;
mod persistence;
mod quality;
mod resources;


use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span};

use crate::settings::SamplingSettings;

pub use attention::{coverage_penalty, excess_kurtosis};
pub use centroid::RunningMean;
pub use committee::vote_score;
pub use ngram::NgramTable;
pub use persistence::{MAGIC, VERSION};
pub use quality::AlignmentTable;
pub use resources::Embeddings;

#[derive(Debug, thiserror::Error)]
pub enum SamplingError {
    #[error("sampling mode {mode} needs {input}")]
    MissingInput {
        mode: SamplingMode,
        input: &'static str,
    },
    #[error("sampling mode {mode} cannot continue from {found} state")]
    StateMismatch {
        mode: SamplingMode,
        found: &'static str,
    },
    #[error("centroid has {found} dimensions, embeddings have {expected}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("unknown sampling mode: {0}")]
    UnknownMode(String),
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplingMode {
    Random,
    NgramCoverage,
    CosineSimilarity,
    QualityEstimation,
    NmtCost,
    AttentionDistraction,
    CoveragePenalty,
    QueryByCommittee,
}

impl SamplingMode {
    pub const ALL: [SamplingMode; 8] = [
        Self::Random,
        Self::NgramCoverage,
        Self::CosineSimilarity,
        Self::QualityEstimation,
        Self::NmtCost,
        Self::AttentionDistraction,
        Self::CoveragePenalty,
        Self::QueryByCommittee,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::NgramCoverage => "ngram-coverage",
            Self::CosineSimilarity => "cosine-similarity",
            Self::QualityEstimation => "quality-estimation",
            Self::NmtCost => "nmt-cost",
            Self::AttentionDistraction => "attention-distraction",
            Self::CoveragePenalty => "coverage-penalty",
            Self::QueryByCommittee => "query-by-committee",
        }
    }

    fn needs_attention(self) -> bool {
        matches!(
            self,
            Self::AttentionDistraction | Self::CoveragePenalty | Self::QueryByCommittee
        )
    }

    fn needs_alignment(self) -> bool {
        matches!(self, Self::QualityEstimation | Self::QueryByCommittee)
    }

    /// Fail fast on anything this mode would trip over while scoring.
    pub fn check(
        self,
        batch: &[BatchItem],
        resources: &SamplingResources<'_>,
        state: &SamplingState,
    ) -> Result<(), SamplingError> {
        if self.needs_attention() {
            for item in batch {
                attention_of(item, self)?;
            }
        }
        if self.needs_alignment() {
            require(resources.alignment, self, "an alignment table")?;
        }
        match (self, state) {
            (Self::NgramCoverage, SamplingState::Stateless | SamplingState::Ngrams(_)) => {}
            (Self::NgramCoverage, other) => {
                return Err(SamplingError::StateMismatch {
                    mode: self,
                    found: other.kind(),
                })
            }
            (Self::CosineSimilarity, _) => {
                let emb = require(resources.embeddings, self, "word embeddings")?;
                match state {
                    SamplingState::Stateless => {}
                    SamplingState::Centroid(mean) => {
                        if !mean.is_empty() && mean.dim() != emb.dim() {
                            return Err(SamplingError::DimensionMismatch {
                                expected: emb.dim(),
                                found: mean.dim(),
                            });
                        }
                    }
                    other => {
                        return Err(SamplingError::StateMismatch {
                            mode: self,
                            found: other.kind(),
                        })
                    }
                }
            }
            (Self::QualityEstimation, SamplingState::Ngrams(_)) => {
                return Err(SamplingError::StateMismatch {
                    mode: self,
                    found: state.kind(),
                })
            }
            _ => {}
        }
        Ok(())
    }
}

impl fmt::Display for SamplingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SamplingMode {
    type Err = SamplingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| SamplingError::UnknownMode(s.to_string()))
    }
}

/// One decoded sentence of a block.
#[derive(Debug, Clone, Default)]
pub struct BatchItem {
    /// Tokenized source words.
    pub source: Vec<String>,
    /// Tokenized first hypothesis.
    pub hypothesis: Vec<String>,
    /// Decoder cost of the hypothesis.
    pub cost: f32,
    /// One row per hypothesis token, one column per encoded source position.
    pub attention: Option<Vec<Vec<f32>>>,
}

/// Side data some modes need.
#[derive(Debug, Clone, Copy, Default)]
pub struct SamplingResources<'a> {
    pub embeddings: Option<&'a Embeddings>,
    pub alignment: Option<&'a AlignmentTable>,
}

/// Accumulator carried from block to block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum SamplingState {
    #[default]
    Stateless,
    Ngrams(NgramTable),
    Centroid(RunningMean),
}

impl SamplingState {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Stateless => "stateless",
            Self::Ngrams(_) => "n-gram",
            Self::Centroid(_) => "centroid",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    /// Batch indices, best first.
    pub selected: Vec<usize>,
    pub state: SamplingState,
}

fn require<'a, T>(
    resource: Option<&'a T>,
    mode: SamplingMode,
    input: &'static str,
) -> Result<&'a T, SamplingError> {
    resource.ok_or(SamplingError::MissingInput { mode, input })
}

fn attention_of(item: &BatchItem, mode: SamplingMode) -> Result<&[Vec<f32>], SamplingError> {
    item.attention
        .as_deref()
        .ok_or(SamplingError::MissingInput {
            mode,
            input: "attention weights",
        })
}

/// Indices of the `n` highest scores; ties keep batch order.
pub fn top_n(scores: &[f64], n: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order.truncate(n);
    order
}

fn random_subset<R: Rng + ?Sized>(len: usize, n: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    order.shuffle(rng);
    order.truncate(n);
    order
}

fn centroid_of(state: SamplingState) -> RunningMean {
    match state {
        SamplingState::Centroid(mean) => mean,
        _ => RunningMean::default(),
    }
}

fn nmt_cost_scores(batch: &[BatchItem]) -> Vec<f64> {
    batch
        .iter()
        .map(|item| f64::from(item.cost) / item.hypothesis.len().max(1) as f64)
        .collect()
}

fn quality_scores(
    batch: &[BatchItem],
    table: &AlignmentTable,
    confidence: f32,
) -> Vec<f64> {
    batch
        .iter()
        .map(|item| quality::estimate(table, &item.source, &item.hypothesis, confidence))
        .collect()
}

fn distraction_scores(
    batch: &[BatchItem],
    mode: SamplingMode,
) -> Result<Vec<f64>, SamplingError> {
    batch
        .iter()
        .map(|item| Ok(attention::distraction(attention_of(item, mode)?)))
        .collect()
}

fn coverage_scores(batch: &[BatchItem], mode: SamplingMode) -> Result<Vec<f64>, SamplingError> {
    batch
        .iter()
        .map(|item| Ok(coverage_penalty(attention_of(item, mode)?)))
        .collect()
}

/// Choose `n` sentences of `batch` under `mode`.
///
/// `n` is clamped to the batch length. Inputs are checked before
/// anything is scored.
pub fn rank<R: Rng + ?Sized>(
    batch: &[BatchItem],
    n: usize,
    mode: SamplingMode,
    state: SamplingState,
    resources: &SamplingResources<'_>,
    settings: &SamplingSettings,
    rng: &mut R,
) -> Result<Ranking, SamplingError> {
    mode.check(batch, resources, &state)?;
    let n = n.min(batch.len());
    let _span = debug_span!("rank", mode = mode.name(), batch = batch.len(), n).entered();

    let ranking = match mode {
        SamplingMode::Random => Ranking {
            selected: random_subset(batch.len(), n, rng),
            state,
        },
        SamplingMode::NgramCoverage => {
            let mut table = match state {
                SamplingState::Ngrams(table) => table,
                _ => NgramTable::new(settings.ngram_order),
            };
            let scores: Vec<f64> = batch
                .iter()
                .map(|item| table.novelty(&item.source, settings.ngram_threshold))
                .collect();
            let selected = top_n(&scores, n);
            for &i in &selected {
                table.add_sentence(&batch[i].source);
            }
            Ranking {
                selected,
                state: SamplingState::Ngrams(table),
            }
        }
        SamplingMode::CosineSimilarity => {
            let emb = require(resources.embeddings, mode, "word embeddings")?;
            let mut mean = centroid_of(state);
            let vectors: Vec<Option<Vec<f64>>> = batch
                .iter()
                .map(|item| emb.sentence_vector(&item.source))
                .collect();
            // Least similar to what was already selected ranks first.
            let scores: Vec<f64> = vectors
                .iter()
                .map(|v| -v.as_deref().map_or(0.0, |v| mean.cosine(v)))
                .collect();
            let selected = top_n(&scores, n);
            mean.fold(selected.iter().filter_map(|&i| vectors[i].as_deref()));
            Ranking {
                selected,
                state: SamplingState::Centroid(mean),
            }
        }
        SamplingMode::QualityEstimation => {
            let table = require(resources.alignment, mode, "an alignment table")?;
            let scores = quality_scores(batch, table, settings.qe_confidence);
            let selected = top_n(&scores, n);
            let mut mean = centroid_of(state);
            let dim = mean.dim().max(1);
            let broadcast: Vec<Vec<f64>> = selected.iter().map(|&i| vec![scores[i]; dim]).collect();
            mean.fold(broadcast.iter().map(Vec::as_slice));
            Ranking {
                selected,
                state: SamplingState::Centroid(mean),
            }
        }
        SamplingMode::NmtCost => Ranking {
            selected: top_n(&nmt_cost_scores(batch), n),
            state,
        },
        SamplingMode::AttentionDistraction => Ranking {
            selected: top_n(&distraction_scores(batch, mode)?, n),
            state,
        },
        // Scored as the negated mean log coverage so the least covered
        // sources rank first like every other mode.
        SamplingMode::CoveragePenalty => Ranking {
            selected: top_n(&coverage_scores(batch, mode)?, n),
            state,
        },
        SamplingMode::QueryByCommittee => {
            let table = require(resources.alignment, mode, "an alignment table")?;
            let ballots = [
                top_n(&quality_scores(batch, table, settings.qe_confidence), n),
                top_n(&coverage_scores(batch, mode)?, n),
                top_n(&distraction_scores(batch, mode)?, n),
                random_subset(batch.len(), n, rng),
            ];
            let scores = committee::tally(batch.len(), &ballots);
            Ranking {
                selected: top_n(&scores, n),
                state,
            }
        }
    };
    debug!(selected = ?ranking.selected, state = ranking.state.kind(), "ranked block");
    Ok(ranking)
}
