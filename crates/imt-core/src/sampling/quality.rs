use std::collections::HashMap;
use std::io::BufRead;

use super::SamplingError;

/// Lexical translation probabilities, `p(target | source)`.
#[derive(Debug, Clone, Default)]
pub struct AlignmentTable {
    probs: HashMap<String, HashMap<String, f32>>,
}

impl AlignmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: &str, target: &str, prob: f32) {
        self.probs
            .entry(source.to_string())
            .or_default()
            .insert(target.to_string(), prob);
    }

    /// Parse `source target prob` lines. Blank lines and `#` comments are
    /// skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, SamplingError> {
        let mut table = Self::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parse_err = |reason: &str| SamplingError::Parse {
                line: i + 1,
                reason: reason.to_string(),
            };
            let mut fields = line.split_whitespace();
            let (Some(src), Some(tgt), Some(prob), None) =
                (fields.next(), fields.next(), fields.next(), fields.next())
            else {
                return Err(parse_err("expected `source target prob`"));
            };
            let prob: f32 = prob.parse().map_err(|_| parse_err("probability is not a number"))?;
            table.insert(src, tgt, prob);
        }
        Ok(table)
    }

    pub fn prob(&self, source: &str, target: &str) -> f32 {
        self.probs
            .get(source)
            .and_then(|row| row.get(target))
            .copied()
            .unwrap_or(0.0)
    }

    /// Best translation probability of `target` from any of `sources`.
    pub fn max_prob<S: AsRef<str>>(&self, sources: &[S], target: &str) -> f32 {
        sources
            .iter()
            .map(|s| self.prob(s.as_ref(), target))
            .fold(0.0, f32::max)
    }

    pub fn len(&self) -> usize {
        self.probs.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }
}

/// Share of hypothesis words with no confident translation from the
/// source. An empty hypothesis scores 1.
pub fn estimate<S: AsRef<str>, T: AsRef<str>>(
    table: &AlignmentTable,
    source: &[S],
    hypothesis: &[T],
    confidence: f32,
) -> f64 {
    if hypothesis.is_empty() {
        return 1.0;
    }
    let confident = hypothesis
        .iter()
        .filter(|t| table.max_prob(source, t.as_ref()) > confidence)
        .count();
    1.0 - confident as f64 / hypothesis.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lines_and_skips_comments() {
        let text = "# table\nchat cat 0.9\n\nchien dog 0.8\n";
        let table = AlignmentTable::from_reader(text.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.prob("chat", "cat"), 0.9);
        assert_eq!(table.prob("chat", "dog"), 0.0);
    }

    #[test]
    fn bad_line_reports_its_number() {
        let err = AlignmentTable::from_reader("a b 0.5\na b\n".as_bytes()).unwrap_err();
        assert!(matches!(err, SamplingError::Parse { line: 2, .. }));
        let err = AlignmentTable::from_reader("a b x\n".as_bytes()).unwrap_err();
        assert!(matches!(err, SamplingError::Parse { line: 1, .. }));
    }

    #[test]
    fn estimate_counts_confident_words() {
        let mut table = AlignmentTable::new();
        table.insert("le", "the", 0.7);
        table.insert("chat", "cat", 0.9);
        table.insert("chat", "sat", 0.2);
        let score = estimate(&table, &["le", "chat"], &["the", "cat", "sat"], 0.5);
        assert!((score - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(estimate::<&str, &str>(&table, &["le"], &[], 0.5), 1.0);
    }
}
