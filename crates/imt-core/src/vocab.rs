//! Bidirectional word ↔ id tables for the source and target sides.
//!
//! Ids 0..3 are reserved: `<pad>`, `<unk>` and the end-of-sentence marker
//! `</s>`. Everything after that is ordered by descending corpus
//! frequency (ties broken lexicographically) so that builds are
//! deterministic.

use std::collections::{BTreeMap, HashMap};

pub type TokenId = u32;

pub const PAD_ID: TokenId = 0;
pub const UNK_ID: TokenId = 1;
pub const EOS_ID: TokenId = 2;

pub const PAD: &str = "<pad>";
pub const UNK: &str = "<unk>";
pub const EOS: &str = "</s>";

const RESERVED: [&str; 3] = [PAD, UNK, EOS];

#[derive(Debug, Clone)]
pub struct Vocabulary {
    words: Vec<String>,
    index: HashMap<String, TokenId>,
    /// Same entries as `index`, ordered by surface for prefix range scans.
    ordered: BTreeMap<String, TokenId>,
}

impl Vocabulary {
    /// Build from a word list. Reserved markers are prepended; duplicates
    /// and reserved markers inside `words` are skipped.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocab = Self {
            words: Vec::new(),
            index: HashMap::new(),
            ordered: BTreeMap::new(),
        };
        for w in RESERVED {
            vocab.push(w.to_string());
        }
        for w in words {
            let w = w.into();
            if !vocab.index.contains_key(&w) {
                vocab.push(w);
            }
        }
        vocab
    }

    /// Build from whitespace-tokenized lines, keeping words seen at least
    /// `min_count` times.
    pub fn from_corpus<'a, I>(lines: I, min_count: u32) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts: HashMap<&'a str, u32> = HashMap::new();
        for line in lines {
            for word in line.split_whitespace() {
                *counts.entry(word).or_default() += 1;
            }
        }
        let mut ranked: Vec<(&str, u32)> = counts
            .into_iter()
            .filter(|&(_, c)| c >= min_count.max(1))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        Self::from_words(ranked.into_iter().map(|(w, _)| w))
    }

    fn push(&mut self, word: String) {
        let id = self.words.len() as TokenId;
        self.index.insert(word.clone(), id);
        if !RESERVED.contains(&word.as_str()) {
            self.ordered.insert(word.clone(), id);
        }
        self.words.push(word);
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.len() <= RESERVED.len()
    }

    pub fn id(&self, word: &str) -> Option<TokenId> {
        self.index.get(word).copied()
    }

    pub fn id_or_unk(&self, word: &str) -> TokenId {
        self.id(word).unwrap_or(UNK_ID)
    }

    /// Surface form of `id`; out-of-range ids render as `<unk>`.
    pub fn word(&self, id: TokenId) -> &str {
        self.words.get(id as usize).map_or(UNK, |w| w.as_str())
    }

    pub fn is_reserved(id: TokenId) -> bool {
        (id as usize) < RESERVED.len()
    }

    pub fn encode<'a, I>(&self, words: I) -> Vec<TokenId>
    where
        I: IntoIterator<Item = &'a str>,
    {
        words.into_iter().map(|w| self.id_or_unk(w)).collect()
    }

    pub fn decode(&self, ids: &[TokenId]) -> Vec<String> {
        ids.iter().map(|&id| self.word(id).to_string()).collect()
    }

    /// Non-reserved entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (TokenId, &str)> + '_ {
        self.words
            .iter()
            .enumerate()
            .skip(RESERVED.len())
            .map(|(id, w)| (id as TokenId, w.as_str()))
    }

    /// Every non-reserved word whose surface starts with `prefix`.
    ///
    /// Case-sensitive. An empty prefix matches nothing: callers use this to
    /// narrow a partially typed word, and an empty word is not a constraint.
    pub fn with_prefix(&self, prefix: &str) -> BTreeMap<TokenId, String> {
        if prefix.is_empty() {
            return BTreeMap::new();
        }
        self.ordered
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .take_while(|(w, _)| w.starts_with(prefix))
            .map(|(w, &id)| (id, w.clone()))
            .collect()
    }
}
