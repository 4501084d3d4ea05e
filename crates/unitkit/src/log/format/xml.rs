//! Streaming XML log formatter.

use super::{LogFormatter, cdata, escape_attr, micros};
use crate::log::{EntryKind, EventKind, LogEvent, RunStart};
use crate::report::RunSummary;
use crate::tree::UnitKind;

/// Writes a `<TestLog>` document as events arrive, without line breaks.
#[derive(Debug, Clone, Default)]
pub struct XmlFormatter;

impl XmlFormatter {
    /// Creates the formatter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn element(kind: UnitKind) -> &'static str {
    match kind {
        UnitKind::Case => "TestCase",
        UnitKind::Suite => "TestSuite",
    }
}

fn entry_tag(entry: EntryKind) -> &'static str {
    match entry {
        EntryKind::Passed => "Info",
        EntryKind::Message => "Message",
        EntryKind::Warning => "Warning",
        EntryKind::Error => "Error",
        EntryKind::FatalError => "FatalError",
        EntryKind::Exception => "Exception",
    }
}

impl LogFormatter for XmlFormatter {
    fn render_run_start(&mut self, _start: &RunStart, out: &mut String) {
        out.push_str("<TestLog>");
    }

    fn render_event(&mut self, event: &LogEvent, out: &mut String) {
        match (&event.kind, &event.unit) {
            (EventKind::UnitStart, Some(unit)) => {
                out.push_str(&format!(
                    "<{} name=\"{}\">",
                    element(unit.kind),
                    escape_attr(&unit.name)
                ));
            }
            (
                EventKind::UnitFinish {
                    outcome, elapsed, ..
                },
                Some(unit),
            ) => {
                if unit.kind == UnitKind::Case {
                    out.push_str(&format!("<TestingTime>{}</TestingTime>", micros(*elapsed)));
                }
                out.push_str(&format!("<Result>{outcome}</Result></{}>", element(unit.kind)));
            }
            (EventKind::UnitSkipped { reason }, Some(unit)) => {
                out.push_str(&format!(
                    "<{} name=\"{}\" skipped=\"yes\" reason=\"{}\"/>",
                    element(unit.kind),
                    escape_attr(&unit.name),
                    escape_attr(reason)
                ));
            }
            (
                EventKind::Entry {
                    entry,
                    text,
                    location,
                },
                _,
            ) => {
                let tag = entry_tag(*entry);
                out.push('<');
                out.push_str(tag);
                if let Some(loc) = location {
                    out.push_str(&format!(
                        " file=\"{}\" line=\"{}\"",
                        escape_attr(&loc.file),
                        loc.line
                    ));
                }
                out.push('>');
                out.push_str(&cdata(text));
                out.push_str(&format!("</{tag}>"));
            }
            _ => {}
        }
    }

    fn render_run_end(&mut self, _summary: &RunSummary, out: &mut String) {
        out.push_str("</TestLog>");
    }

    fn is_structural(&self) -> bool {
        true
    }
}
