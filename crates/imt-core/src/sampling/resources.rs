use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::SamplingError;

/// Word vectors in the word2vec text format.
#[derive(Debug, Clone, Default)]
pub struct Embeddings {
    dim: usize,
    vectors: HashMap<String, Vec<f64>>,
}

impl Embeddings {
    pub fn open(path: &Path) -> Result<Self, SamplingError> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// One `word v1 v2 ...` line per word. An optional `count dim` header
    /// line fixes the dimension up front; otherwise the first vector does.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, SamplingError> {
        let mut emb = Self::default();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else {
                continue;
            };
            let parse_err = |reason: String| SamplingError::Parse { line: i + 1, reason };
            let values: Vec<&str> = fields.collect();
            if i == 0 && values.len() == 1 && word.parse::<usize>().is_ok() {
                emb.dim = values[0]
                    .parse()
                    .map_err(|_| parse_err("bad dimension in header".to_string()))?;
                continue;
            }
            let vector = values
                .iter()
                .map(|v| v.parse::<f64>())
                .collect::<Result<Vec<f64>, _>>()
                .map_err(|e| parse_err(format!("bad component: {e}")))?;
            if vector.is_empty() {
                return Err(parse_err(format!("no vector for {word:?}")));
            }
            if emb.dim == 0 {
                emb.dim = vector.len();
            } else if vector.len() != emb.dim {
                return Err(parse_err(format!(
                    "expected {} components, found {}",
                    emb.dim,
                    vector.len()
                )));
            }
            emb.vectors.insert(word.to_string(), vector);
        }
        Ok(emb)
    }

    pub fn insert(&mut self, word: &str, vector: Vec<f64>) {
        if self.dim == 0 {
            self.dim = vector.len();
        }
        self.vectors.insert(word.to_string(), vector);
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn get(&self, word: &str) -> Option<&[f64]> {
        self.vectors.get(word).map(Vec::as_slice)
    }

    /// Mean vector of the words that have one, `None` if none do.
    pub fn sentence_vector<S: AsRef<str>>(&self, words: &[S]) -> Option<Vec<f64>> {
        let mut sum = vec![0.0; self.dim];
        let mut found = 0usize;
        for v in words.iter().filter_map(|w| self.get(w.as_ref())) {
            for (s, x) in sum.iter_mut().zip(v) {
                *s += x;
            }
            found += 1;
        }
        if found == 0 {
            return None;
        }
        sum.iter_mut().for_each(|s| *s /= found as f64);
        Some(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_header_and_vectors() {
        let text = "2 3\ncat 1 0 0\ndog 0 1 0.5\n";
        let emb = Embeddings::from_reader(text.as_bytes()).unwrap();
        assert_eq!(emb.dim(), 3);
        assert_eq!(emb.len(), 2);
        assert_eq!(emb.get("dog"), Some([0.0, 1.0, 0.5].as_slice()));
    }

    #[test]
    fn headerless_file_takes_first_dimension() {
        let emb = Embeddings::from_reader("cat 1 2\n".as_bytes()).unwrap();
        assert_eq!(emb.dim(), 2);
    }

    #[test]
    fn ragged_vector_is_rejected() {
        let err = Embeddings::from_reader("cat 1 2\ndog 1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, SamplingError::Parse { line: 2, .. }));
    }

    #[test]
    fn sentence_vector_averages_known_words() {
        let mut emb = Embeddings::default();
        emb.insert("a", vec![1.0, 0.0]);
        emb.insert("b", vec![0.0, 1.0]);
        assert_eq!(emb.sentence_vector(&["a", "b", "zzz"]), Some(vec![0.5, 0.5]));
        assert_eq!(emb.sentence_vector(&["zzz"]), None);
    }
}
