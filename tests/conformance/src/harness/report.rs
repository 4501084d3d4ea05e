//! Colored rendering of pattern mismatches.

use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use super::comparison::{CompareResult, Diff};

fn line_color(line: &str) -> Option<Color> {
    if line.starts_with("---") || line.starts_with("+++") {
        Some(Color::White)
    } else if line.starts_with('-') {
        Some(Color::Red)
    } else if line.starts_with('+') {
        Some(Color::Green)
    } else if line.starts_with("@@") {
        Some(Color::Cyan)
    } else {
        None
    }
}

/// Write a diff with removed lines in red and added lines in green.
pub fn write_diff<W: WriteColor>(out: &mut W, label: &str, diff: &Diff) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
    writeln!(out, "pattern mismatch in {label}: {}", diff.describe())?;
    out.reset()?;

    for line in diff.unified_diff.lines() {
        match line_color(line) {
            Some(color) => {
                out.set_color(ColorSpec::new().set_fg(Some(color)))?;
                writeln!(out, "{line}")?;
                out.reset()?;
            }
            None => writeln!(out, "{line}")?,
        }
    }
    Ok(())
}

/// Print a failed comparison to stderr. Returns whether `result` passed.
pub fn report_mismatch(label: &str, result: &CompareResult) -> bool {
    let Some(diff) = result.diff() else {
        return true;
    };
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    if let Err(err) = write_diff(&mut stderr, label, diff) {
        eprintln!("failed to print diff for {label}: {err}");
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::OutputComparator;
    use termcolor::Buffer;

    #[test]
    fn test_plain_diff_output() {
        let result = OutputComparator::new().compare_str("a\nb\n", "a\nc\n");
        let mut buffer = Buffer::no_color();
        write_diff(&mut buffer, "message", result.diff().unwrap()).unwrap();
        let text = String::from_utf8(buffer.into_inner()).unwrap();
        assert!(text.starts_with("pattern mismatch in message: Line difference at line 2\n"));
        assert!(text.contains("\n-b\n"));
        assert!(text.contains("\n+c\n"));
    }

    #[test]
    fn test_colored_diff_output() {
        let result = OutputComparator::new().compare_str("x\n", "y\n");
        let mut buffer = Buffer::ansi();
        write_diff(&mut buffer, "run", result.diff().unwrap()).unwrap();
        let text = String::from_utf8(buffer.into_inner()).unwrap();
        assert!(text.contains("\x1b["));
        assert!(text.contains("-x"));
    }

    #[test]
    fn test_equal_result_is_not_reported() {
        assert!(report_mismatch("same", &CompareResult::Equal));
    }
}
