//! Report formatters.
//!
//! - **CLF**: compiler-style lines, one per event (default)
//! - **XML**: a `<TestLog>` document streamed as events arrive
//! - **JUnit**: a `<testsuites>` document buffered until the run ends
//!
//! All three render the same event stream. Volatile values (testing times,
//! timestamps, source paths) always appear in the same fixed positions so a
//! comparison layer can mask them.

mod clf;
mod junit;
mod xml;

pub use clf::ClfFormatter;
pub use junit::JUnitFormatter;
pub use xml::XmlFormatter;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::{EntryKind, LogEvent, RunStart, SourceLocation};
use crate::error::ParseError;
use crate::report::RunSummary;

/// Renders the event stream of a run into text.
pub trait LogFormatter: Send {
    /// Header, rendered once before any event.
    fn render_run_start(&mut self, start: &RunStart, out: &mut String);

    /// One event.
    fn render_event(&mut self, event: &LogEvent, out: &mut String);

    /// Trailer, rendered once after the last event.
    fn render_run_end(&mut self, summary: &RunSummary, out: &mut String);

    /// Whether unit start, finish and skip events must reach this formatter
    /// regardless of the sink threshold.
    fn is_structural(&self) -> bool {
        false
    }
}

/// Built-in formatter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    /// Plain compiler-log lines.
    #[default]
    Clf,
    /// Streaming XML log.
    Xml,
    /// JUnit XML report.
    JUnit,
}

impl OutputFormat {
    /// Returns the canonical name of the format.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clf => "clf",
            Self::Xml => "xml",
            Self::JUnit => "junit",
        }
    }

    /// Builds a fresh formatter of this kind.
    #[must_use]
    pub fn formatter(self) -> Box<dyn LogFormatter> {
        match self {
            Self::Clf => Box::new(ClfFormatter::new()),
            Self::Xml => Box::new(XmlFormatter::new()),
            Self::JUnit => Box::new(JUnitFormatter::new()),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "clf" | "hrf" | "plain" | "text" => Ok(Self::Clf),
            "xml" => Ok(Self::Xml),
            "junit" => Ok(Self::JUnit),
            _ => Err(ParseError::new("output format", s)),
        }
    }
}

/// Microseconds, the unit of every testing time in the text formats.
pub(crate) fn micros(elapsed: Duration) -> u128 {
    elapsed.as_micros()
}

/// Seconds with microsecond precision, as JUnit expects.
pub(crate) fn seconds(elapsed: Duration) -> String {
    format!("{:.6}", elapsed.as_secs_f64())
}

/// Lowercase label of an entry kind.
pub(crate) fn entry_label(entry: EntryKind) -> &'static str {
    match entry {
        EntryKind::Passed => "info",
        EntryKind::Message => "message",
        EntryKind::Warning => "warning",
        EntryKind::Error => "error",
        EntryKind::FatalError | EntryKind::Exception => "fatal error",
    }
}

/// `file(line): ` prefix; panics without a location read `unknown location(0): `.
pub(crate) fn location_prefix(entry: EntryKind, location: Option<&SourceLocation>) -> String {
    match location {
        Some(loc) => format!("{}({}): ", loc.file, loc.line),
        None if entry == EntryKind::Exception => "unknown location(0): ".to_string(),
        None => String::new(),
    }
}

/// Escapes text for use inside an XML attribute value.
pub(crate) fn escape_attr(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            '\n' => result.push_str("&#10;"),
            '\r' => result.push_str("&#13;"),
            '\t' => result.push_str("&#9;"),
            c if c.is_control() => {}
            c => result.push(c),
        }
    }
    result
}

/// Wraps text in a CDATA section, splitting any embedded terminator.
///
/// Control characters other than tab, newline and carriage return are not
/// allowed anywhere in an XML document and are dropped.
pub(crate) fn cdata(s: &str) -> String {
    let text: String = s
        .chars()
        .filter(|c| matches!(c, '\t' | '\n' | '\r') || !c.is_control())
        .collect();
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}
