//! Turns a validated prefix plus the user's next keystroke into decoder
//! constraints.
//!
//! Every complete word of the typed text becomes a fixed position. A word
//! the user is still typing is not fixed: it becomes a vocabulary-prefix
//! restriction on its position, so the decoder can finish the word itself.
//! Only when nothing in the vocabulary starts with the typed fragment is
//! the fragment pinned verbatim (as `<unk>` plus a literal).

use std::collections::{BTreeMap, BTreeSet};

use crate::text::TextProcessor;
use crate::vocab::{TokenId, Vocabulary, UNK_ID};

/// Output position → forced token id.
pub type FixedWords = BTreeMap<usize, TokenId>;
/// Output position → literal the user typed for an out-of-vocabulary word.
pub type UnknownWords = BTreeMap<usize, String>;

/// A contiguous run of already validated tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Isle {
    pub start: usize,
    pub tokens: Vec<TokenId>,
}

impl Isle {
    pub fn end(&self) -> usize {
        self.start + self.tokens.len()
    }
}

/// The word under the cursor, restricted to vocabulary completions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialWord {
    pub position: usize,
    pub prefix: String,
    pub allowed: BTreeMap<TokenId, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraints {
    pub fixed: FixedWords,
    pub unknown: UnknownWords,
    pub partial: Option<PartialWord>,
    /// The user just typed a separator: at least one more word must follow
    /// the fixed ones.
    pub require_continuation: bool,
    /// Tokens that would not display the typed separator if they came
    /// right after the fixed words. Only filled with `require_continuation`.
    pub joining: BTreeSet<TokenId>,
}

impl Constraints {
    /// Contiguous runs of fixed positions.
    pub fn isles(&self) -> Vec<Isle> {
        isles_from_fixed(&self.fixed)
    }

    /// Number of output words the typed text accounts for.
    pub fn typed_words(&self) -> usize {
        let fixed_end = self.fixed.keys().next_back().map_or(0, |&p| p + 1);
        let partial_end = self.partial.as_ref().map_or(0, |p| p.position + 1);
        fixed_end.max(partial_end)
    }
}

pub fn isles_from_fixed(fixed: &FixedWords) -> Vec<Isle> {
    let mut isles: Vec<Isle> = Vec::new();
    for (&pos, &id) in fixed {
        match isles.last_mut() {
            Some(isle) if isle.end() == pos => isle.tokens.push(id),
            _ => isles.push(Isle {
                start: pos,
                tokens: vec![id],
            }),
        }
    }
    isles
}

/// Build constraints for the next search from `validated + next_char`.
pub fn build_prefix_constraints(
    validated: &str,
    next_char: char,
    vocab: &Vocabulary,
    text: &dyn TextProcessor,
) -> Constraints {
    let mut typed = String::with_capacity(validated.len() + next_char.len_utf8());
    typed.push_str(validated);
    typed.push(next_char);
    let tokenized = text.tokenize(&typed);
    let words: Vec<&str> = tokenized.split_whitespace().collect();

    let mut c = Constraints {
        require_continuation: next_char.is_whitespace(),
        ..Constraints::default()
    };
    for (pos, word) in words.iter().enumerate() {
        let id = vocab.id_or_unk(word);
        if id == UNK_ID {
            c.unknown.insert(pos, word.to_string());
        }
        c.fixed.insert(pos, id);
    }

    if !next_char.is_whitespace() {
        if let Some((last_pos, last)) = words.iter().enumerate().next_back() {
            let allowed = vocab.with_prefix(last);
            if !allowed.is_empty() {
                c.fixed.remove(&last_pos);
                c.unknown.remove(&last_pos);
                c.partial = Some(PartialWord {
                    position: last_pos,
                    prefix: last.to_string(),
                    allowed,
                });
            }
        }
    } else {
        // A generated <unk> shows as a source word, which may itself join.
        c.joining = vocab
            .iter()
            .filter(|&(_, w)| text.joins_previous(w))
            .map(|(id, _)| id)
            .chain([UNK_ID])
            .collect();
    }
    c
}
