use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Occurrence counts of word n-grams of orders `1..=order`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NgramTable {
    order: usize,
    counts: BTreeMap<String, u64>,
}

impl NgramTable {
    pub fn new(order: usize) -> Self {
        Self {
            order: order.max(1),
            counts: BTreeMap::new(),
        }
    }

    /// Count every n-gram of a training corpus.
    pub fn from_corpus<I, S>(order: usize, sentences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self::new(order);
        for sentence in sentences {
            let words: Vec<&str> = sentence.as_ref().split_whitespace().collect();
            table.add_sentence(&words);
        }
        table
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn count(&self, ngram: &str) -> u64 {
        self.counts.get(ngram).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn add_sentence<S: AsRef<str>>(&mut self, words: &[S]) {
        for gram in ngrams(words, self.order) {
            *self.counts.entry(gram).or_default() += 1;
        }
    }

    /// Fraction of the sentence's n-grams seen fewer than `threshold`
    /// times. A sentence without n-grams scores 0.
    pub fn novelty<S: AsRef<str>>(&self, words: &[S], threshold: u64) -> f64 {
        let grams = ngrams(words, self.order);
        if grams.is_empty() {
            return 0.0;
        }
        let rare = grams.iter().filter(|g| self.count(g) < threshold).count();
        rare as f64 / grams.len() as f64
    }
}

/// Space-joined n-grams of orders `1..=order`, with repetitions.
pub fn ngrams<S: AsRef<str>>(words: &[S], order: usize) -> Vec<String> {
    let mut out = Vec::new();
    for n in 1..=order.min(words.len()) {
        for window in words.windows(n) {
            let mut gram = String::new();
            for (i, w) in window.iter().enumerate() {
                if i > 0 {
                    gram.push(' ');
                }
                gram.push_str(w.as_ref());
            }
            out.push(gram);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_up_to_n() {
        let grams = ngrams(&["a", "b", "c"], 2);
        assert_eq!(grams, ["a", "b", "c", "a b", "b c"]);
        assert_eq!(ngrams(&["a"], 3), ["a"]);
        assert!(ngrams::<&str>(&[], 3).is_empty());
    }

    #[test]
    fn novelty_counts_rare_grams() {
        let table = NgramTable::from_corpus(2, ["a b", "a c"]);
        assert_eq!(table.count("a"), 2);
        assert_eq!(table.count("a b"), 1);
        // a, b, a b are seen once; with threshold 2 only "a" is common.
        let score = table.novelty(&["a", "b"], 2);
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(table.novelty(&["a", "b"], 1), 0.0);
        assert_eq!(table.novelty(&["z"], 1), 1.0);
        assert_eq!(table.novelty::<&str>(&[], 1), 0.0);
    }
}
