use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use imt_cli::commands::translate_ops::TranslateArgs;
use imt_cli::commands::{config_ops, state_ops, translate_ops};
use imt_cli::die;
use imt_cli::trace_init::init_tracing;
use imt_core::sampling::SamplingMode;
use imt_core::settings::InteractionMode;

#[derive(Parser)]
#[command(name = "imtool", about = "Interactive post-editing simulator")]
struct Cli {
    /// Write JSON trace lines to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

/// Settings sources shared by every engine command.
#[derive(clap::Args)]
struct SettingsArgs {
    /// Settings TOML replacing the built-in defaults
    #[arg(long)]
    config: Option<String>,
    /// Override a setting, e.g. `--set search.beam_size=4`
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Interaction {
    Prefix,
    Segment,
}

impl From<Interaction> for InteractionMode {
    fn from(i: Interaction) -> Self {
        match i {
            Interaction::Prefix => Self::Prefix,
            Interaction::Segment => Self::Segment,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Simulate post-editing of a test set against its references
    Translate {
        /// Training corpus, source side
        #[arg(long)]
        train_source: PathBuf,
        /// Training corpus, target side
        #[arg(long)]
        train_target: PathBuf,
        /// Sentences to translate
        #[arg(long)]
        source: PathBuf,
        /// What the simulated user wants, one line per source sentence
        #[arg(long)]
        reference: PathBuf,
        /// Final translations
        #[arg(long)]
        output: PathBuf,
        /// First hypotheses before any correction
        #[arg(long)]
        original_output: Option<PathBuf>,
        /// Active-learning mode; every sentence is corrected without one
        #[arg(long)]
        sampling: Option<SamplingMode>,
        /// Sentences per block sent to the user when sampling
        #[arg(long, default_value = "50")]
        validate: usize,
        /// Sentences per block
        #[arg(long, default_value = "50")]
        block_size: usize,
        /// N-gram table state file (ngram-coverage)
        #[arg(long)]
        ngram_table: Option<PathBuf>,
        /// Word vectors in word2vec text format
        #[arg(long)]
        embeddings: Option<PathBuf>,
        /// Centroid state file (cosine-similarity, quality-estimation)
        #[arg(long)]
        centroid: Option<PathBuf>,
        /// Lines of `source target probability`
        #[arg(long)]
        alignment_table: Option<PathBuf>,
        /// Interaction protocol
        #[arg(long, value_enum)]
        interaction: Option<Interaction>,
        /// Learn from every validated sentence
        #[arg(long)]
        online: bool,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Build a sampling state file from a corpus
    InitState {
        #[command(subcommand)]
        kind: StateKind,
    },
    /// Inspect engine settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum StateKind {
    /// N-gram counts for ngram-coverage
    Ngrams {
        #[arg(long)]
        corpus: String,
        #[arg(long)]
        output: String,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Sentence-vector centroid for cosine-similarity
    Centroid {
        #[arg(long)]
        corpus: String,
        #[arg(long)]
        embeddings: String,
        #[arg(long)]
        output: String,
        #[command(flatten)]
        settings: SettingsArgs,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the default settings TOML
    Export,
    /// Check a settings TOML file
    Validate {
        /// Path to the TOML file
        file: String,
    },
}

fn load(args: &SettingsArgs) -> imt_core::settings::Settings {
    die!(
        config_ops::load(args.config.as_deref(), &args.overrides),
        "Error in settings: {}"
    )
}

fn main() {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref(), cli.verbose);

    match cli.command {
        Command::Translate {
            train_source,
            train_target,
            source,
            reference,
            output,
            original_output,
            sampling,
            validate,
            block_size,
            ngram_table,
            embeddings,
            centroid,
            alignment_table,
            interaction,
            online,
            json,
            settings,
        } => {
            let args = TranslateArgs {
                train_source,
                train_target,
                source,
                reference,
                output,
                original_output,
                sampling,
                validate,
                block_size,
                ngram_table,
                embeddings,
                centroid,
                alignment_table,
                interaction: interaction.map(InteractionMode::from),
                online,
                json,
            };
            translate_ops::translate(load(&settings), &args);
        }
        Command::InitState { kind } => match kind {
            StateKind::Ngrams {
                corpus,
                output,
                settings,
            } => state_ops::init_ngrams(&load(&settings), &corpus, &output),
            StateKind::Centroid {
                corpus,
                embeddings,
                output,
                settings,
            } => state_ops::init_centroid(&load(&settings), &corpus, &embeddings, &output),
        },
        Command::Settings { action } => match action {
            SettingsAction::Export => config_ops::settings_export(),
            SettingsAction::Validate { file } => config_ops::settings_validate(&file),
        },
    }
}
