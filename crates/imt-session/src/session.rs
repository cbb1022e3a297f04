use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, info_span, warn};

use imt_core::assemble::assemble;
use imt_core::constraints::UnknownWords;
use imt_core::model::{OnlineLearner, ScoringModel};
use imt_core::sampling::{
    rank, AlignmentTable, BatchItem, Embeddings, SamplingMode, SamplingResources, SamplingState,
};
use imt_core::search::{BeamSearch, Hypothesis, SearchRequest};
use imt_core::settings::{InteractionMode, Settings};
use imt_core::text::TextProcessor;
use imt_core::{TokenId, Vocabulary};

use crate::effort::SessionTotals;
use crate::interaction::Interaction;
use crate::output::TranslationSink;
use crate::retrain::{RetrainPolicy, RetrainTrigger};
use crate::{ConfigError, SessionError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentencePair {
    pub source: String,
    pub reference: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub block_size: usize,
    /// Sentences per block a human corrects when a sampling mode is set.
    pub validate: usize,
    /// `None` corrects every sentence.
    pub sampling: Option<SamplingMode>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            block_size: 50,
            validate: 50,
            sampling: None,
        }
    }
}

/// A decoded source sentence before any correction.
#[derive(Debug, Clone)]
pub struct FirstPass {
    pub source_words: Vec<String>,
    pub source_ids: Vec<TokenId>,
    pub hypothesis: Hypothesis,
    /// Display text of `hypothesis`.
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct SessionReport {
    pub totals: SessionTotals,
    /// Sentences written to the sink.
    pub processed: usize,
    /// The cancellation flag stopped the run early.
    pub interrupted: bool,
    /// Sampling accumulator after the last ranked block.
    pub state: SamplingState,
}

pub struct TranslationSession<M> {
    model: M,
    source_vocab: Vocabulary,
    target_vocab: Vocabulary,
    text: Box<dyn TextProcessor>,
    settings: Settings,
    search: BeamSearch,
    options: SessionOptions,
    embeddings: Option<Embeddings>,
    alignment: Option<AlignmentTable>,
    state: SamplingState,
    retrain: RetrainTrigger,
    rng: StdRng,
}

impl<M> TranslationSession<M>
where
    M: ScoringModel + OnlineLearner,
{
    pub fn new(
        model: M,
        source_vocab: Vocabulary,
        target_vocab: Vocabulary,
        settings: Settings,
        options: SessionOptions,
    ) -> Result<Self, ConfigError> {
        if settings.interaction.mode == InteractionMode::Segment {
            return Err(ConfigError::NotImplemented("segment-based"));
        }
        if options.block_size == 0 {
            return Err(ConfigError::InvalidOption {
                name: "block size",
                reason: "must be positive".to_string(),
            });
        }
        if options.sampling.is_some() && options.validate == 0 {
            return Err(ConfigError::InvalidOption {
                name: "sentences to validate",
                reason: "must be positive when sampling".to_string(),
            });
        }
        Ok(Self {
            search: BeamSearch::new(&settings.search),
            text: settings.text.tokenizer.processor(),
            retrain: RetrainTrigger::new(RetrainPolicy::from_settings(&settings.training)),
            rng: StdRng::seed_from_u64(settings.sampling.seed),
            model,
            source_vocab,
            target_vocab,
            settings,
            options,
            embeddings: None,
            alignment: None,
            state: SamplingState::Stateless,
        })
    }

    pub fn with_embeddings(mut self, embeddings: Embeddings) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    pub fn with_alignment(mut self, alignment: AlignmentTable) -> Self {
        self.alignment = Some(alignment);
        self
    }

    /// Continue from a saved sampling accumulator.
    pub fn with_state(mut self, state: SamplingState) -> Self {
        self.state = state;
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    pub fn text(&self) -> &dyn TextProcessor {
        self.text.as_ref()
    }

    /// Side data the configured sampling mode cannot run without.
    pub fn preflight(&self) -> Result<(), ConfigError> {
        let Some(mode) = self.options.sampling else {
            return Ok(());
        };
        let missing = |input: &'static str| ConfigError::MissingSideData { mode, input };
        match mode {
            SamplingMode::CosineSimilarity if self.embeddings.is_none() => {
                Err(missing("word embeddings"))
            }
            SamplingMode::QualityEstimation | SamplingMode::QueryByCommittee
                if self.alignment.is_none() =>
            {
                Err(missing("an alignment table"))
            }
            _ => Ok(()),
        }
    }

    /// Decode the unconstrained first hypothesis for `source`.
    pub fn translate(&self, source: &str) -> Result<FirstPass, SessionError> {
        let tokenized = self.text.tokenize(source);
        let source_words: Vec<String> = tokenized.split_whitespace().map(String::from).collect();
        let source_ids = self
            .source_vocab
            .encode(source_words.iter().map(String::as_str));
        let encoded = self.model.encode(&source_ids)?;
        let request =
            SearchRequest::unconstrained(source_words.len() + self.settings.search.max_extra_words);
        let hypothesis = self.search.decode(&self.model, &encoded, &request)?;
        let text = assemble(
            &hypothesis.tokens,
            &self.target_vocab,
            hypothesis.attention.as_deref(),
            &source_words,
            &UnknownWords::new(),
            self.settings.interaction.unk_replacement,
            self.text.as_ref(),
        );
        Ok(FirstPass {
            source_words,
            source_ids,
            hypothesis,
            text,
        })
    }

    /// Correct `first` into `reference` through the interaction loop.
    pub fn correct(
        &self,
        index: usize,
        first: &FirstPass,
        reference: &str,
    ) -> Result<crate::Correction, SessionError> {
        let encoded = self.model.encode(&first.source_ids)?;
        let interaction = Interaction {
            model: &self.model,
            encoded: &encoded,
            search: &self.search,
            vocab: &self.target_vocab,
            text: self.text.as_ref(),
            source_words: &first.source_words,
            unk_replacement: self.settings.interaction.unk_replacement,
            max_extra_words: self.settings.search.max_extra_words,
        };
        interaction.correct(index, &first.text, reference)
    }

    /// Process `pairs` in blocks, writing every finished sentence to `sink`.
    ///
    /// `cancel` is checked before every sentence. Effort is committed per
    /// validated sentence, so an interrupted run reports exactly what was
    /// written. Pairs still buffered for a block update are learned before
    /// returning.
    pub fn run<S: TranslationSink>(
        &mut self,
        pairs: &[SentencePair],
        sink: &mut S,
        cancel: &AtomicBool,
    ) -> Result<SessionReport, SessionError> {
        self.preflight()?;
        let mut totals = SessionTotals::default();
        let mut processed = 0usize;
        let mut interrupted = false;

        'blocks: for (block_index, block) in pairs.chunks(self.options.block_size).enumerate() {
            let _span = info_span!("block", block = block_index).entered();
            let start = block_index * self.options.block_size;

            let (mut firsts, selected) = match self.options.sampling {
                None => (vec![None; block.len()], None),
                Some(mode) => {
                    let firsts = block
                        .iter()
                        .map(|p| self.translate(&p.source))
                        .collect::<Result<Vec<_>, _>>()?;
                    let selected = self.select(mode, &firsts)?;
                    (firsts.into_iter().map(Some).collect(), Some(selected))
                }
            };

            let mut interactive = 0usize;
            for (offset, pair) in block.iter().enumerate() {
                if cancel.load(Ordering::Relaxed) {
                    interrupted = true;
                    break 'blocks;
                }
                let index = start + offset;
                let first = match firsts[offset].take() {
                    Some(first) => first,
                    None => self.translate(&pair.source)?,
                };
                let line = if selected.as_ref().map_or(true, |s| s.contains(&offset)) {
                    let reference = self.normalize_reference(index, &pair.reference);
                    let correction = self.correct(index, &first, &reference)?;
                    totals.fold(&correction.counters, &reference);
                    interactive += 1;
                    let target_ids = self
                        .target_vocab
                        .encode(self.text.tokenize(&reference).split_whitespace());
                    self.retrain
                        .on_sentence(&mut self.model, first.source_ids.clone(), target_ids)?;
                    correction.text
                } else {
                    totals.accept();
                    first.text.clone()
                };
                sink.write(index, &first.text, &line)?;
                processed += 1;
            }
            self.retrain.on_block(&mut self.model)?;
            info!(sentences = block.len(), interactive, processed, "block done");
        }

        if interrupted {
            let flushed = self.retrain.on_block(&mut self.model)?;
            warn!(processed, flushed, "session interrupted");
        }
        Ok(SessionReport {
            totals,
            processed,
            interrupted,
            state: self.state.clone(),
        })
    }

    fn select(
        &mut self,
        mode: SamplingMode,
        firsts: &[FirstPass],
    ) -> Result<BTreeSet<usize>, SessionError> {
        let batch: Vec<BatchItem> = firsts
            .iter()
            .map(|f| BatchItem {
                source: f.source_words.clone(),
                hypothesis: self.target_vocab.decode(&f.hypothesis.tokens),
                cost: f.hypothesis.cost,
                attention: f.hypothesis.attention.clone(),
            })
            .collect();
        let resources = SamplingResources {
            embeddings: self.embeddings.as_ref(),
            alignment: self.alignment.as_ref(),
        };
        let ranking = rank(
            &batch,
            self.options.validate,
            mode,
            std::mem::take(&mut self.state),
            &resources,
            &self.settings.sampling,
            &mut self.rng,
        )?;
        debug!(selected = ?ranking.selected, "block ranked");
        self.state = ranking.state;
        Ok(ranking.selected.into_iter().collect())
    }

    fn normalize_reference(&self, index: usize, reference: &str) -> String {
        let normalized = self.text.normalize(reference);
        if normalized != reference {
            warn!(index, "reference normalized before correction");
        }
        normalized
    }
}
