//! Prefix-based correction of one sentence.
//!
//! The simulated user reads the hypothesis left to right, accepts the
//! longest correct prefix and types the next reference character. Each
//! such keystroke is one round: the typed text becomes search constraints
//! and the decoder proposes a new hypothesis. The loop ends as soon as the
//! hypothesis contains the whole reference.

use tracing::{debug, debug_span, trace};

use imt_core::assemble::{assemble, UnkReplacement};
use imt_core::constraints::build_prefix_constraints;
use imt_core::model::ScoringModel;
use imt_core::prefix::longest_common_prefix;
use imt_core::search::{BeamSearch, SearchRequest};
use imt_core::text::TextProcessor;
use imt_core::Vocabulary;

use crate::effort::EffortCounters;
use crate::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// First hypothesis, not compared yet.
    Presented,
    Correcting,
    Validated,
}

/// Result of correcting one sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub text: String,
    pub counters: EffortCounters,
    pub rounds: usize,
}

/// Everything a correction round needs, borrowed from the session.
pub struct Interaction<'a, M: ScoringModel> {
    pub model: &'a M,
    pub encoded: &'a M::Encoded,
    pub search: &'a BeamSearch,
    pub vocab: &'a Vocabulary,
    pub text: &'a dyn TextProcessor,
    pub source_words: &'a [String],
    pub unk_replacement: UnkReplacement,
    pub max_extra_words: usize,
}

impl<M: ScoringModel> Interaction<'_, M> {
    /// Drive `first` to `reference`.
    ///
    /// Every round moves the validated prefix forward by at least one
    /// character, so more than `len(reference) + 1` rounds means the
    /// constraints are not being honoured and is reported as a
    /// consistency failure, as is a validated text that differs from the
    /// reference.
    pub fn correct(
        &self,
        index: usize,
        first: &str,
        reference: &str,
    ) -> Result<Correction, SessionError> {
        let _span = debug_span!("correct", index).entered();
        let budget = reference.chars().count() + 1;
        let mut hypothesis = first.to_string();
        let mut counters = EffortCounters::default();
        let mut state = LoopState::Presented;
        let mut cursor = 0usize;
        let mut rounds = 0usize;

        while state != LoopState::Validated {
            let m = longest_common_prefix(&hypothesis, reference);
            let Some(next) = m.next_char() else {
                state = LoopState::Validated;
                continue;
            };
            rounds += 1;
            if rounds > budget {
                return Err(consistency(index, hypothesis, reference));
            }
            counters.errors += 1;
            if m.position > cursor {
                counters.mouse_actions += 1;
            }
            cursor = m.position + 1;

            let constraints = build_prefix_constraints(m.validated, next, self.vocab, self.text);
            let request = SearchRequest::from_constraints(&constraints, self.max_extra_words);
            let best = self.search.decode(self.model, self.encoded, &request)?;
            hypothesis = assemble(
                &best.tokens,
                self.vocab,
                best.attention.as_deref(),
                self.source_words,
                &constraints.unknown,
                self.unk_replacement,
                self.text,
            );
            trace!(round = rounds, position = m.position, %next, hypothesis = %hypothesis);
            state = LoopState::Correcting;
        }

        if hypothesis.len() > reference.len() {
            // The reference is a prefix of the hypothesis here.
            hypothesis.truncate(reference.len());
            counters.errors += 1;
        }
        counters.mouse_actions += 1;
        if hypothesis != reference {
            return Err(consistency(index, hypothesis, reference));
        }
        debug!(
            rounds,
            errors = counters.errors,
            mouse_actions = counters.mouse_actions,
            "validated"
        );
        Ok(Correction {
            text: hypothesis,
            counters,
            rounds,
        })
    }
}

fn consistency(index: usize, hypothesis: String, reference: &str) -> SessionError {
    SessionError::Consistency {
        index,
        hypothesis,
        reference: reference.to_string(),
    }
}
