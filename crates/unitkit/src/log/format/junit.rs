//! JUnit XML report formatter.
//!
//! JUnit reports are trees with per-suite totals in attributes, so nothing
//! can be written until the run ends. The formatter rebuilds the unit tree
//! from start and finish events and renders it in `render_run_end`.

use chrono::{DateTime, Utc};
use std::time::Duration;

use super::{LogFormatter, cdata, entry_label, escape_attr, location_prefix, seconds};
use crate::log::{EntryKind, EventKind, LogEvent, RunStart, SourceLocation, UnitInfo};
use crate::report::RunSummary;
use crate::status::{AssertionCounts, Outcome};
use crate::tree::{UnitId, UnitKind};

#[derive(Debug, Clone)]
struct CaseRecord {
    id: UnitId,
    name: String,
    classname: String,
    outcome: Outcome,
    elapsed: Duration,
    assertions: AssertionCounts,
    failures: Vec<String>,
    fatals: Vec<String>,
    output: Vec<String>,
    skipped: Option<String>,
}

impl CaseRecord {
    fn new(unit: &UnitInfo) -> Self {
        let classname = unit
            .path
            .rsplit_once('/')
            .map_or_else(String::new, |(parent, _)| parent.to_string());
        Self {
            id: unit.id,
            name: unit.name.clone(),
            classname,
            outcome: Outcome::Skipped,
            elapsed: Duration::ZERO,
            assertions: AssertionCounts::default(),
            failures: Vec::new(),
            fatals: Vec::new(),
            output: Vec::new(),
            skipped: None,
        }
    }
}

#[derive(Debug, Clone)]
struct SuiteRecord {
    name: String,
    elapsed: Duration,
    children: Vec<Record>,
    skipped: Option<String>,
}

impl SuiteRecord {
    fn new(unit: &UnitInfo) -> Self {
        Self {
            name: unit.name.clone(),
            elapsed: Duration::ZERO,
            children: Vec::new(),
            skipped: None,
        }
    }
}

#[derive(Debug, Clone)]
enum Record {
    Case(CaseRecord),
    Suite(SuiteRecord),
}

#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    tests: usize,
    failures: usize,
    errors: usize,
    skipped: usize,
}

impl Totals {
    fn of(records: &[Record]) -> Self {
        let mut totals = Self::default();
        for record in records {
            match record {
                Record::Case(case) => {
                    totals.tests += 1;
                    match case.outcome {
                        Outcome::Passed => {}
                        Outcome::Failed => totals.failures += 1,
                        Outcome::Aborted => totals.errors += 1,
                        Outcome::Skipped => totals.skipped += 1,
                    }
                }
                Record::Suite(suite) => {
                    let inner = Self::of(&suite.children);
                    totals.tests += inner.tests;
                    totals.failures += inner.failures;
                    totals.errors += inner.errors;
                    totals.skipped += inner.skipped;
                }
            }
        }
        totals
    }

    fn attributes(self) -> String {
        format!(
            "tests=\"{}\" failures=\"{}\" errors=\"{}\" skipped=\"{}\"",
            self.tests, self.failures, self.errors, self.skipped
        )
    }
}

/// Buffers the run and writes a JUnit `<testsuites>` document at its end.
#[derive(Debug, Clone, Default)]
pub struct JUnitFormatter {
    started_at: Option<DateTime<Utc>>,
    open_suites: Vec<SuiteRecord>,
    current_case: Option<CaseRecord>,
    roots: Vec<Record>,
    global_out: Vec<String>,
    global_err: Vec<String>,
}

impl JUnitFormatter {
    /// Creates the formatter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn attach(&mut self, record: Record) {
        match self.open_suites.last_mut() {
            Some(parent) => parent.children.push(record),
            None => self.roots.push(record),
        }
    }

    fn record_entry(
        &mut self,
        unit: Option<&UnitInfo>,
        entry: EntryKind,
        text: &str,
        location: Option<&SourceLocation>,
    ) {
        let line = if entry == EntryKind::Message {
            text.to_string()
        } else {
            format!(
                "{}{}: {text}",
                location_prefix(entry, location),
                entry_label(entry)
            )
        };

        let case = self
            .current_case
            .as_mut()
            .filter(|case| unit.is_some_and(|u| u.id == case.id));
        if let Some(case) = case {
            match entry {
                EntryKind::Error => case.failures.push(line),
                EntryKind::FatalError | EntryKind::Exception => case.fatals.push(line),
                EntryKind::Passed | EntryKind::Message | EntryKind::Warning => {
                    case.output.push(line);
                }
            }
            return;
        }

        match entry {
            EntryKind::Error | EntryKind::FatalError | EntryKind::Exception => {
                self.global_err.push(line);
            }
            EntryKind::Passed | EntryKind::Message | EntryKind::Warning => {
                self.global_out.push(line);
            }
        }
    }

    fn render_record(&self, record: &Record, depth: usize, out: &mut String) {
        match record {
            Record::Case(case) => render_case(case, depth, out),
            Record::Suite(suite) => self.render_suite(suite, depth, out),
        }
    }

    fn render_suite(&self, suite: &SuiteRecord, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        let totals = Totals::of(&suite.children);
        out.push_str(&format!(
            "{indent}<testsuite name=\"{}\" {} time=\"{}\"",
            escape_attr(&suite.name),
            totals.attributes(),
            seconds(suite.elapsed)
        ));
        if depth == 1 {
            if let Some(started_at) = self.started_at {
                out.push_str(&format!(
                    " timestamp=\"{}\"",
                    started_at.format("%Y-%m-%dT%H:%M:%S")
                ));
            }
        }
        if suite.children.is_empty() && suite.skipped.is_none() {
            out.push_str("/>\n");
            return;
        }
        out.push_str(">\n");
        for child in &suite.children {
            self.render_record(child, depth + 1, out);
        }
        if let Some(reason) = &suite.skipped {
            out.push_str(&format!(
                "{indent}  <system-out>{}</system-out>\n",
                cdata(&format!("skipped because {reason}"))
            ));
        }
        out.push_str(&format!("{indent}</testsuite>\n"));
    }
}

fn render_case(case: &CaseRecord, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    out.push_str(&format!(
        "{indent}<testcase name=\"{}\" classname=\"{}\" assertions=\"{}\" time=\"{}\"",
        escape_attr(&case.name),
        escape_attr(&case.classname),
        case.assertions.total(),
        seconds(case.elapsed)
    ));

    let mut body = String::new();
    if !case.failures.is_empty() || case.outcome == Outcome::Failed {
        let message = case
            .failures
            .first()
            .map_or("test case failed", String::as_str);
        body.push_str(&format!(
            "{indent}  <failure message=\"{}\" type=\"assertion\">{}</failure>\n",
            escape_attr(message),
            cdata(&case.failures.join("\n"))
        ));
    }
    if case.outcome == Outcome::Aborted {
        let message = case
            .fatals
            .first()
            .map_or("test case aborted", String::as_str);
        body.push_str(&format!(
            "{indent}  <error message=\"{}\" type=\"fatal\">{}</error>\n",
            escape_attr(message),
            cdata(&case.fatals.join("\n"))
        ));
    }
    if let Some(reason) = &case.skipped {
        body.push_str(&format!(
            "{indent}  <skipped message=\"{}\"/>\n",
            escape_attr(reason)
        ));
    }
    if !case.output.is_empty() {
        body.push_str(&format!(
            "{indent}  <system-out>{}</system-out>\n",
            cdata(&case.output.join("\n"))
        ));
    }

    if body.is_empty() {
        out.push_str("/>\n");
    } else {
        out.push_str(">\n");
        out.push_str(&body);
        out.push_str(&format!("{indent}</testcase>\n"));
    }
}

impl LogFormatter for JUnitFormatter {
    fn render_run_start(&mut self, start: &RunStart, _out: &mut String) {
        *self = Self::new();
        self.started_at = Some(start.started_at);
    }

    fn render_event(&mut self, event: &LogEvent, _out: &mut String) {
        match (&event.kind, &event.unit) {
            (EventKind::UnitStart, Some(unit)) => match unit.kind {
                UnitKind::Suite => self.open_suites.push(SuiteRecord::new(unit)),
                UnitKind::Case => self.current_case = Some(CaseRecord::new(unit)),
            },
            (
                EventKind::UnitFinish {
                    outcome,
                    elapsed,
                    assertions,
                },
                Some(unit),
            ) => match unit.kind {
                UnitKind::Case => {
                    let mut case = self
                        .current_case
                        .take()
                        .filter(|case| case.id == unit.id)
                        .unwrap_or_else(|| CaseRecord::new(unit));
                    case.outcome = *outcome;
                    case.elapsed = *elapsed;
                    case.assertions = *assertions;
                    self.attach(Record::Case(case));
                }
                UnitKind::Suite => {
                    let mut suite = self
                        .open_suites
                        .pop()
                        .unwrap_or_else(|| SuiteRecord::new(unit));
                    suite.elapsed = *elapsed;
                    self.attach(Record::Suite(suite));
                }
            },
            (EventKind::UnitSkipped { reason }, Some(unit)) => match unit.kind {
                UnitKind::Case => {
                    let mut case = CaseRecord::new(unit);
                    case.skipped = Some(reason.clone());
                    self.attach(Record::Case(case));
                }
                UnitKind::Suite => {
                    let mut suite = SuiteRecord::new(unit);
                    suite.skipped = Some(reason.clone());
                    self.attach(Record::Suite(suite));
                }
            },
            (
                EventKind::Entry {
                    entry,
                    text,
                    location,
                },
                unit,
            ) => self.record_entry(unit.as_ref(), *entry, text, location.as_ref()),
            _ => {}
        }
    }

    fn render_run_end(&mut self, summary: &RunSummary, out: &mut String) {
        // A run interrupted mid-suite still produces a well-formed document.
        while let Some(suite) = self.open_suites.pop() {
            self.attach(Record::Suite(suite));
        }

        let totals = Totals::of(&self.roots);
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str(&format!(
            "<testsuites name=\"{}\" {} time=\"{}\">\n",
            escape_attr(&summary.root),
            totals.attributes(),
            seconds(summary.elapsed)
        ));
        for record in &self.roots {
            match record {
                Record::Suite(_) => self.render_record(record, 1, out),
                Record::Case(case) => {
                    // A run rooted at a single case still needs an enclosing suite.
                    let wrapper = SuiteRecord {
                        name: case.name.clone(),
                        elapsed: case.elapsed,
                        children: vec![record.clone()],
                        skipped: None,
                    };
                    self.render_suite(&wrapper, 1, out);
                }
            }
        }
        if !self.global_out.is_empty() {
            out.push_str(&format!(
                "  <system-out>{}</system-out>\n",
                cdata(&self.global_out.join("\n"))
            ));
        }
        if !self.global_err.is_empty() {
            out.push_str(&format!(
                "  <system-err>{}</system-err>\n",
                cdata(&self.global_err.join("\n"))
            ));
        }
        out.push_str("</testsuites>\n");
    }

    fn is_structural(&self) -> bool {
        true
    }
}
