use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use imt_core::model::LexicalModel;
use imt_core::sampling::{AlignmentTable, Embeddings, SamplingMode, SamplingState};
use imt_core::settings::{InteractionMode, Settings};
use imt_session::{
    format_rate, SessionOptions, SessionReport, SessionTotals, TranslationSession,
    TranslationWriter,
};

use crate::corpus::{read_parallel, sentence_pairs, TrainingSide};
use crate::die;

/// Everything `imtool translate` takes besides the settings.
#[derive(Debug, Clone)]
pub struct TranslateArgs {
    pub train_source: PathBuf,
    pub train_target: PathBuf,
    pub source: PathBuf,
    pub reference: PathBuf,
    pub output: PathBuf,
    pub original_output: Option<PathBuf>,
    pub sampling: Option<SamplingMode>,
    pub validate: usize,
    pub block_size: usize,
    pub ngram_table: Option<PathBuf>,
    pub embeddings: Option<PathBuf>,
    pub centroid: Option<PathBuf>,
    pub alignment_table: Option<PathBuf>,
    pub interaction: Option<InteractionMode>,
    pub online: bool,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct Summary {
    sentences: u64,
    interactive_sentences: u64,
    processed: usize,
    interrupted: bool,
    errors: u64,
    mouse_actions: u64,
    words: u64,
    chars: u64,
    ksr: Option<f64>,
    mar: Option<f64>,
    ksmr: Option<f64>,
    wsr: Option<f64>,
}

impl Summary {
    fn new(report: &SessionReport) -> Self {
        let t = &report.totals;
        Self {
            sentences: t.sentences,
            interactive_sentences: t.interactive_sentences,
            processed: report.processed,
            interrupted: report.interrupted,
            errors: t.errors,
            mouse_actions: t.mouse_actions,
            words: t.words,
            chars: t.chars,
            ksr: t.ksr(),
            mar: t.mar(),
            ksmr: t.ksmr(),
            wsr: t.wsr(),
        }
    }
}

/// Which file carries the accumulator for `mode`, if any.
fn state_path(args: &TranslateArgs) -> Option<&Path> {
    match args.sampling? {
        SamplingMode::NgramCoverage => args.ngram_table.as_deref(),
        SamplingMode::CosineSimilarity | SamplingMode::QualityEstimation => {
            args.centroid.as_deref()
        }
        _ => None,
    }
}

/// Side files are checked up front so a bad path fails before training.
fn require_file(path: &Path, what: &str) {
    if !path.is_file() {
        eprintln!("Error: {what} file {} does not exist", path.display());
        std::process::exit(1);
    }
}

pub fn translate(mut settings: Settings, args: &TranslateArgs) {
    if let Some(mode) = args.interaction {
        settings.interaction.mode = mode;
    }
    if args.online {
        settings.training.online = true;
    }
    for (path, what) in [
        (&args.train_source, "training source"),
        (&args.train_target, "training target"),
        (&args.source, "source"),
        (&args.reference, "reference"),
    ] {
        require_file(path, what);
    }
    for (path, what) in [
        (&args.embeddings, "embeddings"),
        (&args.alignment_table, "alignment table"),
    ] {
        if let Some(path) = path {
            require_file(path, what);
        }
    }

    let text = settings.text.tokenizer.processor();
    let training = die!(
        read_parallel(&args.train_source, &args.train_target),
        "Error reading training corpus: {}"
    );
    let source_side = TrainingSide::build(
        training.iter().map(|(s, _)| s.as_str()),
        text.as_ref(),
        settings.model.min_count,
    );
    let target_side = TrainingSide::build(
        training.iter().map(|(_, t)| t.as_str()),
        text.as_ref(),
        settings.model.min_count,
    );
    let model = die!(
        LexicalModel::train(
            source_side.vocab.len(),
            target_side.vocab.len(),
            &settings.model,
            source_side
                .ids
                .iter()
                .zip(&target_side.ids)
                .map(|(s, t)| (s.as_slice(), t.as_slice())),
        ),
        "Error training model: {}"
    );
    info!(
        pairs = training.len(),
        source_vocab = source_side.vocab.len(),
        target_vocab = target_side.vocab.len(),
        "model trained"
    );

    let pairs = sentence_pairs(die!(
        read_parallel(&args.source, &args.reference),
        "Error reading test corpus: {}"
    ));
    let options = SessionOptions {
        block_size: args.block_size,
        validate: args.validate,
        sampling: args.sampling,
    };
    let mut session = die!(
        TranslationSession::new(
            model,
            source_side.vocab,
            target_side.vocab,
            settings,
            options
        ),
        "Error: {}"
    );
    if let Some(path) = &args.embeddings {
        session = session.with_embeddings(die!(
            Embeddings::open(path),
            "Error reading embeddings: {}"
        ));
    }
    if let Some(path) = &args.alignment_table {
        let file = die!(File::open(path), "Error opening alignment table: {}");
        session = session.with_alignment(die!(
            AlignmentTable::from_reader(BufReader::new(file)),
            "Error reading alignment table: {}"
        ));
    }
    let state_file = state_path(args);
    if let Some(path) = state_file {
        let state = die!(SamplingState::open(path), "Error reading sampling state: {}");
        info!(kind = state.kind(), "sampling state loaded");
        session = session.with_state(state);
    }
    die!(session.preflight(), "Error: {}");

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    die!(
        ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)),
        "Error installing interrupt handler: {}"
    );

    let mut writer = die!(
        TranslationWriter::create(&args.output, args.original_output.as_deref()),
        "Error creating output: {}"
    );
    let report = die!(session.run(&pairs, &mut writer, &cancel), "Error: {}");

    if let Some(path) = state_file {
        if report.state != SamplingState::Stateless {
            die!(report.state.save(path), "Error writing sampling state: {}");
        }
    }
    if report.interrupted {
        warn!(processed = report.processed, "stopped by interrupt");
    }
    print_summary(&report, args.json);
}

fn print_summary(report: &SessionReport, json: bool) {
    if json {
        let summary = Summary::new(report);
        println!("{}", die!(serde_json::to_string_pretty(&summary), "Error: {}"));
        return;
    }
    print!("{}", render_summary(&report.totals, report.processed, report.interrupted));
}

fn render_summary(t: &SessionTotals, processed: usize, interrupted: bool) -> String {
    let mut out = String::new();
    if interrupted {
        out.push_str(&format!("interrupted after {processed} sentences\n"));
    }
    out.push_str(&format!(
        "sentences: {} ({} corrected)\n",
        t.sentences, t.interactive_sentences
    ));
    out.push_str(&format!(
        "errors: {}  mouse actions: {}  words: {}  chars: {}\n",
        t.errors, t.mouse_actions, t.words, t.chars
    ));
    out.push_str(&format!(
        "KSR: {}  MAR: {}  KSMR: {}  WSR: {}\n",
        format_rate(t.ksr()),
        format_rate(t.mar()),
        format_rate(t.ksmr()),
        format_rate(t.wsr())
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use imt_session::EffortCounters;

    #[test]
    fn summary_prints_na_without_corrections() {
        let mut t = SessionTotals::default();
        t.accept();
        let out = render_summary(&t, 1, false);
        assert!(out.contains("sentences: 1 (0 corrected)"));
        assert!(out.contains("KSR: n/a"));
    }

    #[test]
    fn summary_reports_rates_and_interrupts() {
        let mut t = SessionTotals::default();
        t.fold(
            &EffortCounters {
                errors: 1,
                mouse_actions: 2,
            },
            "the cat sat",
        );
        let out = render_summary(&t, 1, true);
        assert!(out.starts_with("interrupted after 1 sentences"));
        assert!(out.contains("KSR: 9.09%"));
        assert!(out.contains("WSR: 33.33%"));
    }

    #[test]
    fn state_file_follows_the_mode() {
        let mut args = TranslateArgs {
            train_source: PathBuf::new(),
            train_target: PathBuf::new(),
            source: PathBuf::new(),
            reference: PathBuf::new(),
            output: PathBuf::new(),
            original_output: None,
            sampling: Some(SamplingMode::NgramCoverage),
            validate: 1,
            block_size: 1,
            ngram_table: Some(PathBuf::from("ngrams.imss")),
            embeddings: None,
            centroid: Some(PathBuf::from("centroid.imss")),
            alignment_table: None,
            interaction: None,
            online: false,
            json: false,
        };
        assert_eq!(state_path(&args), Some(Path::new("ngrams.imss")));
        args.sampling = Some(SamplingMode::QualityEstimation);
        assert_eq!(state_path(&args), Some(Path::new("centroid.imss")));
        args.sampling = Some(SamplingMode::Random);
        assert_eq!(state_path(&args), None);
    }
}
