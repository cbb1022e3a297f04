//! Interactive post-editing sessions.
//!
//! `TranslationSession` walks a parallel stream block by block: it decodes
//! first hypotheses, lets the sampling ranker pick the sentences a human
//! corrects, drives each picked sentence through the prefix interaction
//! loop, and feeds validated corrections back to the model.

mod effort;
mod interaction;
mod output;
mod retrain;
mod session;

#[cfg(test)]
mod tests;

use imt_core::model::ModelError;
use imt_core::sampling::{SamplingError, SamplingMode};
use imt_core::search::SearchError;

pub use effort::{format_rate, EffortCounters, SessionTotals};
pub use interaction::{Correction, Interaction, LoopState};
pub use output::{MemorySink, TranslationSink, TranslationWriter};
pub use retrain::{RetrainPolicy, RetrainTrigger};
pub use session::{FirstPass, SentencePair, SessionOptions, SessionReport, TranslationSession};

/// Rejected before any sentence is processed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} interaction is not implemented")]
    NotImplemented(&'static str),
    #[error("sampling mode {mode} needs {input}")]
    MissingSideData {
        mode: SamplingMode,
        input: &'static str,
    },
    #[error("invalid {name}: {reason}")]
    InvalidOption { name: &'static str, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(
        "sentence {index}: validated hypothesis {hypothesis:?} does not match reference {reference:?}"
    )]
    Consistency {
        index: usize,
        hypothesis: String,
        reference: String,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Sampling(#[from] SamplingError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("writing output: {0}")]
    Io(#[from] std::io::Error),
}
