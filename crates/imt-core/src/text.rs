//! Tokenization seam.
//!
//! The core only ever sees space-separated token strings. How raw text is
//! split and how tokens are glued back for display is up to the injected
//! `TextProcessor`. Both directions must be pure: the interaction loop
//! relies on `detokenize(tokenize(x))` being stable across calls.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

pub trait TextProcessor: Send + Sync {
    /// Raw text → space-separated tokens.
    fn tokenize(&self, text: &str) -> String;
    /// Space-separated tokens → display text.
    fn detokenize(&self, tokens: &str) -> String;

    /// Canonical display form of `text`.
    fn normalize(&self, text: &str) -> String {
        self.detokenize(&self.tokenize(text))
    }

    /// `detokenize` glues `token` onto the previous one with no separator.
    fn joins_previous(&self, _token: &str) -> bool {
        false
    }
}

/// Collapses runs of whitespace; tokens are whitespace-delimited words.
#[derive(Debug, Default, Clone, Copy)]
pub struct Whitespace;

impl TextProcessor for Whitespace {
    fn tokenize(&self, text: &str) -> String {
        join_words(text.split_whitespace())
    }

    fn detokenize(&self, tokens: &str) -> String {
        join_words(tokens.split_whitespace())
    }
}

/// Splits sentence punctuation off words and re-attaches it on output.
#[derive(Debug, Default, Clone, Copy)]
pub struct Punctuation;

const DETACHED: &[char] = &['.', ',', ';', ':', '!', '?'];

fn is_detached(token: &str) -> bool {
    let mut chars = token.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if DETACHED.contains(&c))
}

impl TextProcessor for Punctuation {
    fn tokenize(&self, text: &str) -> String {
        let mut out: Vec<String> = Vec::new();
        for word in text.split_whitespace() {
            let mut current = String::new();
            for c in word.chars() {
                if DETACHED.contains(&c) {
                    if !current.is_empty() {
                        out.push(std::mem::take(&mut current));
                    }
                    out.push(c.to_string());
                } else {
                    current.push(c);
                }
            }
            if !current.is_empty() {
                out.push(current);
            }
        }
        out.join(" ")
    }

    fn detokenize(&self, tokens: &str) -> String {
        let mut out = String::new();
        for token in tokens.split_whitespace() {
            if !out.is_empty() && !is_detached(token) {
                out.push(' ');
            }
            out.push_str(token);
        }
        out
    }

    fn joins_previous(&self, token: &str) -> bool {
        is_detached(token)
    }
}

fn join_words<'a>(words: impl Iterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for w in words {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(w);
    }
    out
}

/// Configuration name of a `TextProcessor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerKind {
    Whitespace,
    Punctuation,
}

impl TokenizerKind {
    pub fn processor(self) -> Box<dyn TextProcessor> {
        match self {
            Self::Whitespace => Box::new(Whitespace),
            Self::Punctuation => Box::new(Punctuation),
        }
    }
}

impl fmt::Display for TokenizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Whitespace => "whitespace",
            Self::Punctuation => "punctuation",
        })
    }
}

impl FromStr for TokenizerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "whitespace" => Ok(Self::Whitespace),
            "punctuation" => Ok(Self::Punctuation),
            other => Err(format!("unknown tokenizer: {other}")),
        }
    }
}
