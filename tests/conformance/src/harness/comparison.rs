//! OutputComparator - Diff generation for comparing expected vs actual outputs
//!
//! Provides utilities for comparing captured reports with:
//! - Whitespace normalization (trailing, newlines)
//! - Optional masking of volatile fields before comparison
//! - Detailed diff generation for mismatches

use similar::TextDiff;

use super::masking::mask_volatile;

/// Type of difference detected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffType {
    /// Strings differ in individual characters
    CharacterDiff,
    /// Multi-line strings differ in lines
    LineDiff,
    /// Strings have different lengths
    LengthDiff,
}

/// Detailed diff information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff {
    /// The expected value, after normalization
    pub expected: String,
    /// The actual value, after normalization
    pub actual: String,
    /// Position of first difference (char offset)
    pub first_diff_pos: Option<usize>,
    /// Line number of first difference (1-indexed)
    pub first_diff_line: Option<usize>,
    /// Unified diff format for multi-line content
    pub unified_diff: String,
    /// Type of difference
    pub diff_type: DiffType,
}

impl Diff {
    /// Get a human-readable description of the difference
    pub fn describe(&self) -> String {
        match self.diff_type {
            DiffType::CharacterDiff => match self.first_diff_pos {
                Some(pos) => format!("Character difference at position {pos}"),
                None => "Character difference detected".to_string(),
            },
            DiffType::LineDiff => match self.first_diff_line {
                Some(line) => format!("Line difference at line {line}"),
                None => "Line difference detected".to_string(),
            },
            DiffType::LengthDiff => format!(
                "Length difference: expected {} bytes, got {} bytes",
                self.expected.len(),
                self.actual.len()
            ),
        }
    }

    /// Format for plain text output
    pub fn format_plain(&self) -> String {
        let mut output = String::new();
        output.push_str(&self.describe());
        output.push('\n');
        output.push_str(&self.unified_diff);
        output
    }
}

/// Result of comparing two outputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompareResult {
    /// Outputs are equal after normalization
    Equal,
    /// Outputs differ, with detailed diff
    Different(Diff),
}

impl CompareResult {
    /// Returns true if the comparison passed
    pub fn is_pass(&self) -> bool {
        matches!(self, CompareResult::Equal)
    }

    /// Returns true if the comparison failed
    pub fn is_fail(&self) -> bool {
        matches!(self, CompareResult::Different(_))
    }

    /// Get the diff if this is a Different result
    pub fn diff(&self) -> Option<&Diff> {
        match self {
            CompareResult::Different(diff) => Some(diff),
            CompareResult::Equal => None,
        }
    }
}

/// Options for whitespace normalization
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceOptions {
    /// Remove trailing whitespace from each line
    pub trim_trailing: bool,
    /// Convert \r\n to \n
    pub normalize_newlines: bool,
    /// Remove final trailing newline
    pub trim_final_newline: bool,
}

/// Options for comparison
#[derive(Debug, Clone, Copy, Default)]
pub struct CompareOptions {
    /// Replace testing times, timestamps and source paths with placeholders
    pub mask_volatile: bool,
    /// Whitespace normalization options
    pub whitespace_options: WhitespaceOptions,
    /// Enable whitespace normalization
    pub whitespace_normalize: bool,
}

/// Comparator for captured reports
#[derive(Debug, Clone, Default)]
pub struct OutputComparator {
    options: CompareOptions,
}

impl OutputComparator {
    /// Create a new comparator with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a comparator with custom options
    pub fn with_options(options: CompareOptions) -> Self {
        Self { options }
    }

    /// Mask volatile fields on both sides before comparing
    pub fn mask_volatile(mut self, enabled: bool) -> Self {
        self.options.mask_volatile = enabled;
        self
    }

    /// Enable whitespace normalization
    pub fn whitespace_normalize(mut self, enabled: bool) -> Self {
        self.options.whitespace_normalize = enabled;
        if enabled {
            self.options.whitespace_options = WhitespaceOptions {
                trim_trailing: true,
                normalize_newlines: true,
                trim_final_newline: true,
            };
        }
        self
    }

    /// Normalize a string according to configured options
    pub fn normalize(&self, s: &str) -> String {
        let mut result = s.to_string();

        if self.options.mask_volatile {
            result = mask_volatile(&result);
        }

        if self.options.whitespace_normalize {
            let opts = &self.options.whitespace_options;

            if opts.normalize_newlines {
                result = result.replace("\r\n", "\n").replace('\r', "\n");
            }

            if opts.trim_trailing {
                result = result
                    .lines()
                    .map(str::trim_end)
                    .collect::<Vec<_>>()
                    .join("\n");
            }

            if opts.trim_final_newline {
                while result.ends_with('\n') {
                    result.pop();
                }
            }
        }

        result
    }

    /// Find the position of the first difference between two strings
    fn find_first_diff(expected: &str, actual: &str) -> Option<usize> {
        expected
            .chars()
            .zip(actual.chars())
            .position(|(e, a)| e != a)
            .or_else(|| {
                let (e, a) = (expected.chars().count(), actual.chars().count());
                (e != a).then(|| e.min(a))
            })
    }

    /// Find the line number of the first difference
    fn find_first_diff_line(expected: &str, actual: &str) -> Option<usize> {
        let expected_lines: Vec<&str> = expected.lines().collect();
        let actual_lines: Vec<&str> = actual.lines().collect();

        for (i, (e, a)) in expected_lines.iter().zip(actual_lines.iter()).enumerate() {
            if e != a {
                return Some(i + 1);
            }
        }

        if expected_lines.len() != actual_lines.len() {
            return Some(expected_lines.len().min(actual_lines.len()) + 1);
        }

        None
    }

    /// Generate unified diff format
    fn generate_unified_diff(expected: &str, actual: &str) -> String {
        let diff = TextDiff::from_lines(expected, actual);
        let mut result = String::new();

        result.push_str("--- expected\n");
        result.push_str("+++ actual\n");

        for hunk in diff.unified_diff().iter_hunks() {
            result.push_str(&format!("{hunk}"));
        }

        result
    }

    fn create_diff(expected: &str, actual: &str, diff_type: DiffType) -> Diff {
        Diff {
            expected: expected.to_string(),
            actual: actual.to_string(),
            first_diff_pos: Self::find_first_diff(expected, actual),
            first_diff_line: Self::find_first_diff_line(expected, actual),
            unified_diff: Self::generate_unified_diff(expected, actual),
            diff_type,
        }
    }

    fn determine_diff_type(expected: &str, actual: &str) -> DiffType {
        if expected.contains('\n') || actual.contains('\n') {
            DiffType::LineDiff
        } else if expected.len() != actual.len() {
            DiffType::LengthDiff
        } else {
            DiffType::CharacterDiff
        }
    }

    /// Compare two strings with all configured normalizations
    pub fn compare_str(&self, expected: &str, actual: &str) -> CompareResult {
        let norm_expected = self.normalize(expected);
        let norm_actual = self.normalize(actual);

        if norm_expected == norm_actual {
            return CompareResult::Equal;
        }

        let diff_type = Self::determine_diff_type(&norm_expected, &norm_actual);
        CompareResult::Different(Self::create_diff(&norm_expected, &norm_actual, diff_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_strings() {
        let comparator = OutputComparator::new();
        assert!(comparator.compare_str("abc", "abc").is_pass());
    }

    #[test]
    fn test_character_diff() {
        let result = OutputComparator::new().compare_str("abc", "abd");
        let diff = result.diff().unwrap();
        assert_eq!(diff.diff_type, DiffType::CharacterDiff);
        assert_eq!(diff.first_diff_pos, Some(2));
    }

    #[test]
    fn test_line_diff() {
        let result = OutputComparator::new().compare_str("a\nb\nc\n", "a\nx\nc\n");
        let diff = result.diff().unwrap();
        assert_eq!(diff.diff_type, DiffType::LineDiff);
        assert_eq!(diff.first_diff_line, Some(2));
        assert!(diff.unified_diff.contains("-b"));
        assert!(diff.unified_diff.contains("+x"));
        assert!(diff.format_plain().starts_with("Line difference at line 2"));
    }

    #[test]
    fn test_whitespace_normalize() {
        let comparator = OutputComparator::new().whitespace_normalize(true);
        assert!(comparator.compare_str("a  \r\nb\n\n", "a\nb").is_pass());
    }

    #[test]
    fn test_masked_comparison() {
        let comparator = OutputComparator::new().mask_volatile(true);
        let expected = "Leaving test case \"c\"; testing time: 12us\n";
        let actual = "Leaving test case \"c\"; testing time: 3400us\n";
        assert!(comparator.compare_str(expected, actual).is_pass());
        assert!(OutputComparator::new().compare_str(expected, actual).is_fail());
    }
}
