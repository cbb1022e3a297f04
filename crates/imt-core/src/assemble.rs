//! Token ids back to display text.

use serde::Deserialize;

use crate::constraints::UnknownWords;
use crate::text::TextProcessor;
use crate::vocab::{TokenId, Vocabulary, UNK, UNK_ID};

/// What to show for a generated `<unk>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnkReplacement {
    /// Keep the `<unk>` marker.
    #[serde(rename = "none")]
    Marker,
    /// Copy the most attended source word.
    Attention,
}

/// Surface string for `tokens`.
///
/// Generated `<unk>` tokens go through `policy` first. Then every literal
/// the user typed for an out-of-vocabulary word is written back over
/// whatever the model produced, and the result is detokenized.
pub fn assemble<S: AsRef<str>>(
    tokens: &[TokenId],
    vocab: &Vocabulary,
    attention: Option<&[Vec<f32>]>,
    source_words: &[S],
    unknown: &UnknownWords,
    policy: UnkReplacement,
    text: &dyn TextProcessor,
) -> String {
    let mut words: Vec<String> = tokens
        .iter()
        .enumerate()
        .map(|(i, &id)| {
            if id != UNK_ID || policy == UnkReplacement::Marker {
                return vocab.word(id).to_string();
            }
            attention
                .and_then(|rows| rows.get(i))
                .and_then(|row| argmax(row))
                .and_then(|j| source_words.get(j))
                .map_or_else(|| UNK.to_string(), |w| w.as_ref().to_string())
        })
        .collect();
    overwrite_unknown(&mut words, unknown);
    text.detokenize(&words.join(" "))
}

/// Write the user's literals into `words`.
///
/// When there are fewer words than literals, the literals fill the words
/// in order and the rest are appended. Otherwise each literal lands on its
/// own position, or is appended when that position is past the end.
pub fn overwrite_unknown(words: &mut Vec<String>, unknown: &UnknownWords) {
    if words.len() < unknown.len() {
        for (i, literal) in unknown.values().enumerate() {
            match words.get_mut(i) {
                Some(w) => literal.clone_into(w),
                None => words.push(literal.clone()),
            }
        }
        return;
    }
    for (&position, literal) in unknown {
        match words.get_mut(position) {
            Some(w) => literal.clone_into(w),
            None => words.push(literal.clone()),
        }
    }
}

fn argmax(row: &[f32]) -> Option<usize> {
    row.iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (j, &w)| match best {
            Some((_, bw)) if bw >= w => best,
            _ => Some((j, w)),
        })
        .map(|(j, _)| j)
}
