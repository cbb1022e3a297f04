use std::path::Path;

use tracing::info;

use imt_core::sampling::{Embeddings, NgramTable, RunningMean, SamplingState};
use imt_core::settings::Settings;

use crate::corpus::read_lines;
use crate::die;

/// Count the n-grams of an already-translated corpus.
pub fn init_ngrams(settings: &Settings, corpus: &str, output: &str) {
    let state = ngram_state(settings, &die!(read_lines(Path::new(corpus)), "Error reading {corpus}: {}"));
    if let SamplingState::Ngrams(table) = &state {
        info!(ngrams = table.len(), order = table.order(), "n-gram table built");
        println!("{} distinct {}-grams", table.len(), table.order());
    }
    die!(state.save(Path::new(output)), "Error writing {output}: {}");
}

/// Average the sentence vectors of a corpus.
pub fn init_centroid(settings: &Settings, corpus: &str, embeddings: &str, output: &str) {
    let lines = die!(read_lines(Path::new(corpus)), "Error reading {corpus}: {}");
    let embeddings = die!(
        Embeddings::open(Path::new(embeddings)),
        "Error reading {embeddings}: {}"
    );
    let state = centroid_state(settings, &lines, &embeddings);
    if let SamplingState::Centroid(mean) = &state {
        info!(sentences = mean.count(), dim = mean.dim(), "centroid built");
        println!("centroid over {} sentences, dimension {}", mean.count(), mean.dim());
    }
    die!(state.save(Path::new(output)), "Error writing {output}: {}");
}

fn ngram_state(settings: &Settings, lines: &[String]) -> SamplingState {
    let text = settings.text.tokenizer.processor();
    let tokenized = lines.iter().map(|l| text.tokenize(l));
    SamplingState::Ngrams(NgramTable::from_corpus(settings.sampling.ngram_order, tokenized))
}

fn centroid_state(settings: &Settings, lines: &[String], embeddings: &Embeddings) -> SamplingState {
    let text = settings.text.tokenizer.processor();
    let vectors: Vec<Vec<f64>> = lines
        .iter()
        .filter_map(|l| {
            let tokenized = text.tokenize(l);
            let words: Vec<&str> = tokenized.split_whitespace().collect();
            embeddings.sentence_vector(&words)
        })
        .collect();
    let mut mean = RunningMean::default();
    mean.fold(vectors.iter().map(Vec::as_slice));
    SamplingState::Centroid(mean)
}
