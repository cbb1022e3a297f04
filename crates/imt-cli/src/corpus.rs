//! Line-aligned corpus files.

use std::fs;
use std::io;
use std::path::Path;

use imt_core::text::TextProcessor;
use imt_core::Vocabulary;
use imt_session::SentencePair;

pub fn read_lines(path: &Path) -> io::Result<Vec<String>> {
    Ok(fs::read_to_string(path)?
        .lines()
        .map(|l| l.trim_end_matches('\r').to_string())
        .collect())
}

/// Two files that must have the same number of lines.
pub fn read_parallel(source: &Path, target: &Path) -> io::Result<Vec<(String, String)>> {
    let src = read_lines(source)?;
    let tgt = read_lines(target)?;
    if src.len() != tgt.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "{} has {} lines but {} has {}",
                source.display(),
                src.len(),
                target.display(),
                tgt.len()
            ),
        ));
    }
    Ok(src.into_iter().zip(tgt).collect())
}

pub fn sentence_pairs(lines: Vec<(String, String)>) -> Vec<SentencePair> {
    lines
        .into_iter()
        .map(|(source, reference)| SentencePair { source, reference })
        .collect()
}

/// Tokenized training side plus the vocabulary built from it.
pub struct TrainingSide {
    pub vocab: Vocabulary,
    pub ids: Vec<Vec<imt_core::TokenId>>,
}

impl TrainingSide {
    pub fn build<'a, I>(lines: I, text: &dyn TextProcessor, min_count: u32) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let tokenized: Vec<String> = lines.into_iter().map(|l| text.tokenize(l)).collect();
        let vocab = Vocabulary::from_corpus(tokenized.iter().map(String::as_str), min_count);
        let ids = tokenized
            .iter()
            .map(|l| vocab.encode(l.split_whitespace()))
            .collect();
        Self { vocab, ids }
    }
}
