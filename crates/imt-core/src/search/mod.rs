//! Constrained beam search.
//!
//! Ordinary beam search over the target vocabulary, except that every step
//! asks [`Plan::slot`] what the current output position admits:
//!
//! - `Forced`: the position starts (or continues) a fixed run. The whole
//!   run is appended in one expansion, each token still paying its model
//!   log-probability.
//! - `Restricted`: the partially typed word. Only the vocabulary
//!   completions of the typed fragment are candidates.
//! - `Free`: any token, with end-of-sentence gated by the constraints.
//!   The position right after a typed separator also drops the tokens
//!   that would hide that separator.
//! - `End`: the extra-word budget is spent and the hypothesis must close.
//!
//! All live hypotheses always share one length, so the slot is a function
//! of the position alone.

use std::collections::BTreeSet;

use tracing::{debug, debug_span, trace};

use crate::constraints::{isles_from_fixed, Constraints, FixedWords, Isle};
use crate::model::{ModelError, ScoringModel, StepScores};
use crate::settings::SearchSettings;
use crate::vocab::{TokenId, EOS_ID, PAD_ID};


#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("isle token {isle} at position {position} contradicts fixed token {fixed}")]
    ConflictingConstraint {
        position: usize,
        fixed: TokenId,
        isle: TokenId,
    },
    #[error("beam search finished without a complete hypothesis")]
    NoHypothesis,
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Everything one decoder call has to honour.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub fixed: FixedWords,
    /// Spans that must appear contiguously. Merged with the runs of `fixed`.
    pub isles: Vec<Isle>,
    /// Candidate set for `restrict_at`. Empty means the position is free.
    pub allowed_next: BTreeSet<TokenId>,
    pub restrict_at: Option<usize>,
    /// End-of-sentence is not allowed before this many tokens.
    pub min_length: usize,
    /// Tokens the decoder may add after the last constrained position.
    pub max_extra_words: usize,
    /// Tokens `exclude_at` may not take.
    pub excluded: BTreeSet<TokenId>,
    pub exclude_at: Option<usize>,
}

impl SearchRequest {
    pub fn unconstrained(max_extra_words: usize) -> Self {
        Self {
            max_extra_words,
            ..Self::default()
        }
    }

    pub fn from_constraints(c: &Constraints, max_extra_words: usize) -> Self {
        let (allowed_next, restrict_at) = match &c.partial {
            Some(p) => (p.allowed.keys().copied().collect(), Some(p.position)),
            None => (BTreeSet::new(), None),
        };
        let (min_length, exclude_at) = if c.require_continuation {
            (c.typed_words() + 1, Some(c.typed_words()))
        } else {
            (0, None)
        };
        Self {
            fixed: c.fixed.clone(),
            isles: Vec::new(),
            allowed_next,
            restrict_at,
            min_length,
            max_extra_words,
            excluded: c.joining.clone(),
            exclude_at,
        }
    }
}

/// Best complete hypothesis of a search. `tokens` never contains the
/// end-of-sentence marker; `attention` has one row per token.
#[derive(Debug, Clone, PartialEq)]
pub struct Hypothesis {
    pub tokens: Vec<TokenId>,
    /// Negative log-probability, end-of-sentence included.
    pub cost: f32,
    pub attention: Option<Vec<Vec<f32>>>,
}

/// What the decoder may emit at one output position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot<'a> {
    Forced(&'a [TokenId]),
    Restricted(&'a BTreeSet<TokenId>),
    Free {
        eos: bool,
        excluded: Option<&'a BTreeSet<TokenId>>,
    },
    End,
}

/// A request compiled into per-position rules.
#[derive(Debug)]
pub struct Plan<'r> {
    runs: Vec<Isle>,
    allowed: &'r BTreeSet<TokenId>,
    restrict_at: Option<usize>,
    excluded: &'r BTreeSet<TokenId>,
    exclude_at: Option<usize>,
    forced_end: usize,
    min_length: usize,
    limit: usize,
}

impl<'r> Plan<'r> {
    pub fn new(request: &'r SearchRequest) -> Result<Self, SearchError> {
        let mut merged = request.fixed.clone();
        for isle in &request.isles {
            for (offset, &tok) in isle.tokens.iter().enumerate() {
                let position = isle.start + offset;
                match merged.get(&position) {
                    Some(&fixed) if fixed != tok => {
                        return Err(SearchError::ConflictingConstraint {
                            position,
                            fixed,
                            isle: tok,
                        });
                    }
                    _ => {
                        merged.insert(position, tok);
                    }
                }
            }
        }
        let forced_end = merged.keys().next_back().map_or(0, |&p| p + 1);
        let restrict_end = request.restrict_at.map_or(0, |p| p + 1);
        let limit = forced_end
            .max(restrict_end)
            .max(request.min_length)
            .saturating_add(request.max_extra_words);
        Ok(Self {
            runs: isles_from_fixed(&merged),
            allowed: &request.allowed_next,
            restrict_at: request.restrict_at,
            excluded: &request.excluded,
            exclude_at: request.exclude_at,
            forced_end,
            min_length: request.min_length,
            limit,
        })
    }

    /// Longest output the plan allows, excluding end-of-sentence.
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn slot(&self, position: usize) -> Slot<'_> {
        if let Some(run) = self
            .runs
            .iter()
            .find(|r| r.start <= position && position < r.end())
        {
            return Slot::Forced(&run.tokens[position - run.start..]);
        }
        if position >= self.limit {
            return Slot::End;
        }
        if self.restrict_at == Some(position) && !self.allowed.is_empty() {
            return Slot::Restricted(self.allowed);
        }
        let eos = position >= self.forced_end
            && position >= self.min_length
            && self.restrict_at != Some(position);
        let excluded = (self.exclude_at == Some(position) && !self.excluded.is_empty())
            .then_some(self.excluded);
        Slot::Free { eos, excluded }
    }
}

#[derive(Debug, Clone)]
struct Beam {
    tokens: Vec<TokenId>,
    cost: f32,
    attention: Option<Vec<Vec<f32>>>,
}

impl Beam {
    fn start() -> Self {
        Self {
            tokens: Vec::new(),
            cost: 0.0,
            attention: Some(Vec::new()),
        }
    }

    fn push(&mut self, token: TokenId, log_prob: f32, row: Option<Vec<f32>>) {
        self.tokens.push(token);
        self.cost -= log_prob;
        match (&mut self.attention, row) {
            (Some(rows), Some(row)) => rows.push(row),
            _ => self.attention = None,
        }
    }
}

struct Candidate {
    beam: Beam,
    finished: bool,
}

#[derive(Debug, Clone)]
pub struct BeamSearch {
    beam_size: usize,
    length_normalization: bool,
}

impl BeamSearch {
    pub fn new(settings: &SearchSettings) -> Self {
        Self {
            beam_size: settings.beam_size.max(1),
            length_normalization: settings.length_normalization,
        }
    }

    pub fn beam_size(&self) -> usize {
        self.beam_size
    }

    pub fn decode<M: ScoringModel>(
        &self,
        model: &M,
        encoded: &M::Encoded,
        request: &SearchRequest,
    ) -> Result<Hypothesis, SearchError> {
        let plan = Plan::new(request)?;
        let beam_size = self.beam_size;
        let _span = debug_span!(
            "beam_search",
            beam_size,
            fixed = request.fixed.len(),
            isles = request.isles.len(),
            limit = plan.limit()
        )
        .entered();

        let mut live = vec![Beam::start()];
        let mut finished: Vec<Beam> = Vec::new();
        while !live.is_empty() && finished.len() < beam_size {
            let budget = beam_size - finished.len();
            let position = live[0].tokens.len();
            let slot = plan.slot(position);

            let mut candidates = Vec::new();
            for beam in &live {
                expand(model, encoded, beam, slot, budget, &mut candidates)?;
            }
            candidates.sort_by(|a, b| a.beam.cost.total_cmp(&b.beam.cost));
            candidates.truncate(budget);

            live = Vec::with_capacity(candidates.len());
            for c in candidates {
                if c.finished {
                    finished.push(c.beam);
                } else {
                    live.push(c.beam);
                }
            }
            trace!(position, live = live.len(), finished = finished.len(), "step");
        }

        let best = finished
            .into_iter()
            .min_by(|a, b| self.score(a).total_cmp(&self.score(b)))
            .ok_or(SearchError::NoHypothesis)?;
        debug!(tokens = best.tokens.len(), cost = best.cost, "best hypothesis");
        Ok(Hypothesis {
            tokens: best.tokens,
            cost: best.cost,
            attention: best.attention,
        })
    }

    fn score(&self, beam: &Beam) -> f32 {
        if self.length_normalization {
            beam.cost / (beam.tokens.len() + 1) as f32
        } else {
            beam.cost
        }
    }
}

fn log_prob(scores: &StepScores, token: TokenId) -> Result<f32, ModelError> {
    scores
        .log_probs
        .get(token as usize)
        .copied()
        .ok_or(ModelError::InvalidToken(token))
}

/// Push up to `budget` expansions of `beam` for `slot`.
fn expand<M: ScoringModel>(
    model: &M,
    encoded: &M::Encoded,
    beam: &Beam,
    slot: Slot<'_>,
    budget: usize,
    out: &mut Vec<Candidate>,
) -> Result<(), SearchError> {
    match slot {
        Slot::Forced(run) => {
            let mut next = beam.clone();
            for &tok in run {
                let scores = model.checked_step(encoded, &next.tokens)?;
                let lp = log_prob(&scores, tok)?;
                next.push(tok, lp, scores.attention);
            }
            out.push(Candidate {
                beam: next,
                finished: false,
            });
        }
        Slot::End => {
            let scores = model.checked_step(encoded, &beam.tokens)?;
            let mut done = beam.clone();
            done.cost -= log_prob(&scores, EOS_ID)?;
            out.push(Candidate {
                beam: done,
                finished: true,
            });
        }
        Slot::Restricted(allowed) => {
            let scores = model.checked_step(encoded, &beam.tokens)?;
            let ranked = allowed
                .iter()
                .map(|&t| Ok((log_prob(&scores, t)?, t)))
                .collect::<Result<Vec<_>, ModelError>>()?;
            push_ranked(beam, scores.attention, ranked, budget, out);
        }
        Slot::Free { eos, excluded } => {
            let scores = model.checked_step(encoded, &beam.tokens)?;
            let ranked = scores
                .log_probs
                .iter()
                .enumerate()
                .map(|(t, &lp)| (lp, t as TokenId))
                .filter(|&(_, t)| t != PAD_ID && (eos || t != EOS_ID))
                .filter(|(_, t)| excluded.map_or(true, |ex| !ex.contains(t)))
                .collect();
            push_ranked(beam, scores.attention, ranked, budget, out);
        }
    }
    Ok(())
}

/// Keep the `budget` most probable single-token continuations.
fn push_ranked(
    beam: &Beam,
    row: Option<Vec<f32>>,
    mut ranked: Vec<(f32, TokenId)>,
    budget: usize,
    out: &mut Vec<Candidate>,
) {
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
    ranked.truncate(budget);
    for (lp, tok) in ranked {
        if tok == EOS_ID {
            let mut done = beam.clone();
            done.cost -= lp;
            out.push(Candidate {
                beam: done,
                finished: true,
            });
        } else {
            let mut next = beam.clone();
            next.push(tok, lp, row.clone());
            out.push(Candidate {
                beam: next,
                finished: false,
            });
        }
    }
}
