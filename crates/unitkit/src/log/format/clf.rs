//! Compiler-log formatter: one human-readable line per event.

use super::{LogFormatter, entry_label, location_prefix, micros};
use crate::log::{EntryKind, EventKind, LogEvent, RunStart};
use crate::report::RunSummary;
use crate::status::Outcome;

/// Line-oriented formatter modeled on compiler diagnostics.
///
/// ```text
/// Running 1 test case...
/// Entering test suite "fake root"
/// Entering test case "simple_check"
/// src/checks.rs(10): error: in "fake root/simple_check": check x == 1 has failed
/// Leaving test case "simple_check" (failed); testing time: 12us
/// Leaving test suite "fake root" (failed); testing time: 40us
///
/// *** 1 failure is detected in the test suite "fake root"
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClfFormatter;

impl ClfFormatter {
    /// Creates the formatter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl LogFormatter for ClfFormatter {
    fn render_run_start(&mut self, start: &RunStart, out: &mut String) {
        let plural = if start.case_count == 1 { "" } else { "s" };
        out.push_str(&format!("Running {} test case{plural}...\n", start.case_count));
    }

    fn render_event(&mut self, event: &LogEvent, out: &mut String) {
        match (&event.kind, &event.unit) {
            (EventKind::UnitStart, Some(unit)) => {
                out.push_str(&format!("Entering test {} \"{}\"\n", unit.kind, unit.name));
            }
            (
                EventKind::UnitFinish {
                    outcome, elapsed, ..
                },
                Some(unit),
            ) => {
                let status = if *outcome == Outcome::Passed {
                    String::new()
                } else {
                    format!(" ({outcome})")
                };
                out.push_str(&format!(
                    "Leaving test {} \"{}\"{status}; testing time: {}us\n",
                    unit.kind,
                    unit.name,
                    micros(*elapsed)
                ));
            }
            (EventKind::UnitSkipped { reason }, Some(unit)) => {
                out.push_str(&format!(
                    "Test {} \"{}\" is skipped because {reason}\n",
                    unit.kind, unit.path
                ));
            }
            (
                EventKind::Entry {
                    entry,
                    text,
                    location,
                },
                unit,
            ) => {
                if *entry == EntryKind::Message {
                    out.push_str(text);
                    out.push('\n');
                    return;
                }
                out.push_str(&location_prefix(*entry, location.as_ref()));
                out.push_str(entry_label(*entry));
                out.push_str(": ");
                if let Some(unit) = unit {
                    out.push_str(&format!("in \"{}\": ", unit.path));
                }
                out.push_str(text);
                out.push('\n');
            }
            // Unit events always carry their unit.
            _ => {}
        }
    }

    fn render_run_end(&mut self, summary: &RunSummary, out: &mut String) {
        out.push('\n');
        if summary.setup_failed {
            out.push_str("*** The test setup failed; no test case was run\n");
            return;
        }
        match summary.failures() {
            0 => out.push_str("*** No errors detected\n"),
            1 => out.push_str(&format!(
                "*** 1 failure is detected in the test suite \"{}\"\n",
                summary.root
            )),
            n => out.push_str(&format!(
                "*** {n} failures are detected in the test suite \"{}\"\n",
                summary.root
            )),
        }
    }
}
