mod proptest_fsm;

use imt_core::settings::Settings;
use imt_core::testutil::{cat_sat_model, cat_sat_source_vocab, cat_sat_target_vocab, TableModel};
use imt_core::text::TokenizerKind;
use imt_core::Vocabulary;

use crate::{SentencePair, SessionOptions, TranslationSession};

pub(super) fn make_settings() -> Settings {
    Settings::default()
}

pub(super) fn make_session(
    settings: Settings,
    options: SessionOptions,
) -> TranslationSession<TableModel> {
    let target = cat_sat_target_vocab();
    let model = cat_sat_model(&target);
    TranslationSession::new(model, cat_sat_source_vocab(), target, settings, options)
        .expect("fixture session")
}

pub(super) fn interactive_session() -> TranslationSession<TableModel> {
    make_session(make_settings(), SessionOptions::default())
}

pub(super) fn punctuation_target_vocab() -> Vocabulary {
    Vocabulary::from_words(["the", "dog", "cat", "car", "cap", "sat", "on", "mat", ".", ","])
}

/// Prefers "the cat." and closes any sentence with a full stop.
pub(super) fn punctuation_session() -> TranslationSession<TableModel> {
    let target = punctuation_target_vocab();
    let model = TableModel::new(target.len())
        .with(&target, "", "the", 0.9)
        .with(&target, "the", "cat", 0.9)
        .with(&target, "cat", ".", 0.9)
        .with(&target, "cat", "sat", 0.05)
        .with(&target, "sat", ".", 0.9)
        .with(&target, ".", "</s>", 0.9);
    let mut settings = make_settings();
    settings.text.tokenizer = TokenizerKind::Punctuation;
    TranslationSession::new(
        model,
        cat_sat_source_vocab(),
        target,
        settings,
        SessionOptions::default(),
    )
    .expect("fixture session")
}

pub(super) fn pair(source: &str, reference: &str) -> SentencePair {
    SentencePair {
        source: source.to_string(),
        reference: reference.to_string(),
    }
}

/// Four pairs whose first hypothesis is always "the dog sat".
pub(super) fn make_corpus() -> Vec<SentencePair> {
    vec![
        pair("le chat assis", "the cat sat"),
        pair("le chien assis", "the dog sat"),
        pair("le chat assis", "the cat sat"),
        pair("le chien", "the dog"),
    ]
}
