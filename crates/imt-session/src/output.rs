//! Incremental session output.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Receives each finished sentence in input order.
pub trait TranslationSink {
    /// `original` is the first hypothesis, `corrected` the final line.
    fn write(&mut self, index: usize, original: &str, corrected: &str) -> io::Result<()>;
}

/// One line per sentence, flushed as soon as it is written so that an
/// aborted run leaves every finished sentence on disk.
pub struct TranslationWriter<W: Write> {
    output: W,
    originals: Option<W>,
}

impl TranslationWriter<BufWriter<File>> {
    pub fn create(output: &Path, originals: Option<&Path>) -> io::Result<Self> {
        let output = BufWriter::new(File::create(output)?);
        let originals = originals
            .map(|p| File::create(p).map(BufWriter::new))
            .transpose()?;
        Ok(Self::new(output, originals))
    }
}

impl<W: Write> TranslationWriter<W> {
    pub fn new(output: W, originals: Option<W>) -> Self {
        Self { output, originals }
    }

    pub fn into_inner(self) -> (W, Option<W>) {
        (self.output, self.originals)
    }
}

impl<W: Write> TranslationSink for TranslationWriter<W> {
    fn write(&mut self, _index: usize, original: &str, corrected: &str) -> io::Result<()> {
        writeln!(self.output, "{corrected}")?;
        self.output.flush()?;
        if let Some(originals) = &mut self.originals {
            writeln!(originals, "{original}")?;
            originals.flush()?;
        }
        Ok(())
    }
}

/// Keeps everything in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub originals: Vec<String>,
    pub lines: Vec<String>,
}

impl TranslationSink for MemorySink {
    fn write(&mut self, _index: usize, original: &str, corrected: &str) -> io::Result<()> {
        self.originals.push(original.to_string());
        self.lines.push(corrected.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_both_files_line_by_line() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let orig = dir.path().join("orig.txt");
        let mut w = TranslationWriter::create(&out, Some(&orig)).unwrap();
        w.write(0, "the dog sat", "the cat sat").unwrap();
        // Visible before the writer is dropped.
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "the cat sat\n");
        w.write(1, "hi", "hello").unwrap();
        drop(w);
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "the cat sat\nhello\n");
        assert_eq!(std::fs::read_to_string(&orig).unwrap(), "the dog sat\nhi\n");
    }

    #[test]
    fn originals_are_optional() {
        let mut w = TranslationWriter::new(Vec::new(), None);
        w.write(0, "a", "b").unwrap();
        let (out, orig) = w.into_inner();
        assert_eq!(out, b"b\n");
        assert!(orig.is_none());
    }
}
