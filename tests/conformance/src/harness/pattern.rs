//! PatternStream - captures report output and matches it against a baseline
//!
//! The stream owns a [`SharedBuffer`] that a runner writes into. Each call to
//! [`PatternStream::match_pattern`] takes what was written since the last
//! call, masks its volatile fields and compares it with the next slice of the
//! baseline. In save mode the masked output is recorded instead, and
//! [`PatternStream::finish`] writes the new baseline.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use unitkit::SharedBuffer;

use super::baseline::{Baseline, BaselineResult};
use super::comparison::{CompareResult, OutputComparator};
use super::masking::mask_volatile;

/// Environment variable that switches pattern streams to save mode.
pub const SAVE_PATTERN_VAR: &str = "UNITKIT_SAVE_PATTERN";

/// Directory holding baselines, relative to this crate.
pub const BASELINE_DIR: &str = "baseline-outputs";

/// Output capture matched piecewise against a stored baseline
#[derive(Debug)]
pub struct PatternStream {
    buffer: SharedBuffer,
    baseline: Baseline,
    position: usize,
    save: bool,
    comparator: OutputComparator,
}

impl PatternStream {
    /// Create a stream for the baseline at `path`.
    ///
    /// In compare mode the baseline must exist. In save mode it is created
    /// or overwritten by [`PatternStream::finish`].
    pub fn new(path: impl Into<PathBuf>, save: bool) -> BaselineResult<Self> {
        let path = path.into();
        let baseline = if save {
            Baseline::empty(path)
        } else {
            Baseline::load(&path)?
        };
        Ok(Self {
            buffer: SharedBuffer::new(),
            baseline,
            position: 0,
            save,
            comparator: OutputComparator::new(),
        })
    }

    /// Open `baseline-outputs/{name}`, saving when `UNITKIT_SAVE_PATTERN` is set.
    pub fn open(name: &str) -> BaselineResult<Self> {
        let save = std::env::var(SAVE_PATTERN_VAR)
            .map(|v| matches!(v.trim(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);
        Self::new(baseline_path(name), save)
    }

    /// Buffer to hand to [`unitkit::UnitLog::set_target`]
    pub fn buffer(&self) -> SharedBuffer {
        self.buffer.clone()
    }

    /// Whether the stream records instead of comparing
    pub fn is_saving(&self) -> bool {
        self.save
    }

    /// Match everything written since the previous call.
    ///
    /// The baseline cursor advances by the length of the masked output
    /// whether or not it matched.
    pub fn match_pattern(&mut self) -> CompareResult {
        let actual = mask_volatile(&self.buffer.take());
        if self.save {
            let mut text = self.baseline.text().to_string();
            text.push_str(&actual);
            self.baseline.set_text(text);
            return CompareResult::Equal;
        }

        let stored = self.baseline.text();
        let start = self.position.min(stored.len());
        let end = (start + actual.len()).min(stored.len());
        let expected = stored
            .get(start..end)
            .or_else(|| stored.get(start..))
            .unwrap_or_default();
        let result = self.comparator.compare_str(expected, &actual);
        self.position = start + actual.len();
        result
    }

    /// Whether the whole baseline has been matched
    pub fn is_exhausted(&self) -> bool {
        self.save || self.position >= self.baseline.text().len()
    }

    /// Write the recorded baseline in save mode; nothing to do otherwise.
    pub fn finish(self) -> BaselineResult<()> {
        if self.save {
            self.baseline.save()?;
        }
        Ok(())
    }
}

impl Write for PatternStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.buffer.flush()
    }
}

/// Location of a named baseline file.
pub fn baseline_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join(BASELINE_DIR)
        .join(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_compare_mode_walks_the_baseline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("walk.pattern");
        std::fs::write(&path, "first\nsecond\n").unwrap();

        let mut stream = PatternStream::new(&path, false).unwrap();
        write!(stream, "first\n").unwrap();
        assert!(stream.match_pattern().is_pass());
        assert!(!stream.is_exhausted());
        write!(stream, "second\n").unwrap();
        assert!(stream.match_pattern().is_pass());
        assert!(stream.is_exhausted());
        stream.finish().unwrap();
    }

    #[test]
    fn test_mismatch_reports_a_diff() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("diff.pattern");
        std::fs::write(&path, "*** No errors detected\n").unwrap();

        let mut stream = PatternStream::new(&path, false).unwrap();
        write!(stream, "*** 1 failure detected\n").unwrap();
        let result = stream.match_pattern();
        assert!(result.is_fail());
        assert!(result.diff().unwrap().unified_diff.contains("+*** 1 failure detected"));
    }

    #[test]
    fn test_output_is_masked_before_matching() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mask.pattern");
        std::fs::write(&path, "Leaving test case \"c\"; testing time: XXX\n").unwrap();

        let mut stream = PatternStream::new(&path, false).unwrap();
        let buffer = stream.buffer();
        let mut writer = buffer.clone();
        write!(writer, "Leaving test case \"c\"; testing time: 816us\n").unwrap();
        assert!(stream.match_pattern().is_pass());
    }

    #[test]
    fn test_save_mode_records_masked_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("saved.pattern");

        let mut stream = PatternStream::new(&path, true).unwrap();
        assert!(stream.is_saving());
        write!(stream, "a.rs(12): error: x\n").unwrap();
        assert!(stream.match_pattern().is_pass());
        write!(stream, "done\n").unwrap();
        assert!(stream.match_pattern().is_pass());
        stream.finish().unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "a.rs(?): error: x\ndone\n"
        );
    }

    #[test]
    fn test_output_longer_than_baseline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.pattern");
        std::fs::write(&path, "ab").unwrap();

        let mut stream = PatternStream::new(&path, false).unwrap();
        write!(stream, "abc").unwrap();
        assert!(stream.match_pattern().is_fail());
        assert!(stream.is_exhausted());
    }
}
