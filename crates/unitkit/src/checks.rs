//! The check context handed to test case bodies and fixture hooks.

use std::fmt::Debug;
use std::panic::Location;
use thiserror::Error;

use crate::log::{EntryKind, LogEvent, SourceLocation, UnitInfo, UnitLog};
use crate::status::{AssertionCounts, CheckLevel, Verdict};

/// Marker returned by a fatal failure.
///
/// Only [`Checks`] can produce it, so a body that returns `Err(Aborted)` has
/// always logged the failure that stopped it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("test unit aborted by a fatal failure")]
pub struct Aborted(());

/// Result of a case body or fixture hook.
pub type CaseResult = Result<(), Aborted>;

/// Records checks, messages and failures for the running unit.
///
/// Outside any unit (global fixture hooks) events are attributed to no unit.
///
/// # Example
///
/// ```rust
/// use unitkit::{TestTree, Runner, SharedBuffer, Level};
///
/// let mut tree = TestTree::new("root");
/// tree.add_case(tree.root(), "arith", |t| {
///     t.check(2 + 2 == 4, "2 + 2 == 4");
///     t.require(1 < 2, "1 < 2")?;
///     t.message("still here");
///     Ok(())
/// })
/// .unwrap();
/// tree.finalize().unwrap();
///
/// let mut runner = Runner::new();
/// let buffer = SharedBuffer::new();
/// runner.log().set_target(buffer.clone());
/// runner.log().set_threshold(Level::Messages);
/// let report = runner.run(&tree, tree.root(), true).unwrap();
/// assert!(report.summary.is_success());
/// assert!(buffer.contents().contains("still here"));
/// ```
#[derive(Debug)]
pub struct Checks<'a> {
    log: &'a UnitLog,
    unit: Option<&'a UnitInfo>,
    counts: AssertionCounts,
    last_fatal: Option<String>,
}

impl<'a> Checks<'a> {
    pub(crate) fn new(log: &'a UnitLog, unit: Option<&'a UnitInfo>) -> Self {
        Self {
            log,
            unit,
            counts: AssertionCounts::default(),
            last_fatal: None,
        }
    }

    fn emit(&mut self, entry: EntryKind, text: String, location: Option<&Location<'_>>) {
        if matches!(entry, EntryKind::FatalError | EntryKind::Exception) {
            self.last_fatal = Some(text.clone());
        }
        self.log.emit(LogEvent::entry(
            self.unit.cloned(),
            entry,
            text,
            location.map(SourceLocation::from),
        ));
    }

    fn record(&mut self, passed: bool, level: CheckLevel, what: &str, location: &Location<'_>) -> Verdict {
        let verdict = self.counts.record(passed, level);
        let (entry, text) = match (verdict, level) {
            (Verdict::Passed, CheckLevel::Warn) if !passed => {
                (EntryKind::Warning, format!("condition {what} is not satisfied"))
            }
            (Verdict::Passed, CheckLevel::Warn) => {
                (EntryKind::Passed, format!("condition {what} is satisfied"))
            }
            (Verdict::Passed, _) => (EntryKind::Passed, format!("check {what} has passed")),
            (Verdict::Failed, _) => (EntryKind::Error, format!("check {what} has failed")),
            (Verdict::Abort, _) => (EntryKind::FatalError, format!("critical check {what} has failed")),
        };
        self.emit(entry, text, Some(location));
        verdict
    }

    /// Non-fatal check. Returns whether the condition held.
    #[track_caller]
    pub fn check(&mut self, condition: bool, what: &str) -> bool {
        self.record(condition, CheckLevel::Check, what, Location::caller()) == Verdict::Passed
    }

    /// Fatal check: a failure stops the unit when propagated with `?`.
    #[track_caller]
    pub fn require(&mut self, condition: bool, what: &str) -> CaseResult {
        match self.record(condition, CheckLevel::Require, what, Location::caller()) {
            Verdict::Abort => Err(Aborted(())),
            Verdict::Passed | Verdict::Failed => Ok(()),
        }
    }

    /// Check whose failure is only a warning.
    #[track_caller]
    pub fn warn(&mut self, condition: bool, what: &str) -> bool {
        self.record(condition, CheckLevel::Warn, what, Location::caller());
        condition
    }

    /// Non-fatal equality check.
    #[track_caller]
    pub fn check_eq<T: PartialEq + Debug>(&mut self, left: &T, right: &T) -> bool {
        let location = Location::caller();
        let what = if left == right {
            format!("{left:?} == {right:?}")
        } else {
            format!("{left:?} == {right:?} [{left:?} != {right:?}]")
        };
        self.record(left == right, CheckLevel::Check, &what, location) == Verdict::Passed
    }

    /// Logs a free-form message.
    #[track_caller]
    pub fn message(&mut self, text: impl Into<String>) {
        self.emit(EntryKind::Message, text.into(), Some(Location::caller()));
    }

    /// Logs a warning.
    #[track_caller]
    pub fn warning(&mut self, text: impl Into<String>) {
        self.counts.warnings += 1;
        self.emit(EntryKind::Warning, text.into(), Some(Location::caller()));
    }

    /// Records a non-fatal failure.
    #[track_caller]
    pub fn error(&mut self, text: impl Into<String>) {
        self.counts.failed += 1;
        self.emit(EntryKind::Error, text.into(), Some(Location::caller()));
    }

    /// Records a fatal failure. Return the result from the body to stop it.
    #[track_caller]
    pub fn fail(&mut self, text: impl Into<String>) -> CaseResult {
        self.counts.failed += 1;
        self.emit(EntryKind::FatalError, text.into(), Some(Location::caller()));
        Err(Aborted(()))
    }

    /// Records a caught panic.
    pub(crate) fn record_exception(&mut self, text: &str) {
        self.counts.failed += 1;
        self.emit(EntryKind::Exception, text.to_string(), None);
    }

    /// Text of the last fatal failure or panic, if any.
    pub(crate) fn last_fatal(&self) -> Option<&str> {
        self.last_fatal.as_deref()
    }

    /// Counters recorded so far.
    #[must_use]
    pub fn counts(&self) -> AssertionCounts {
        self.counts
    }

    /// The running unit, `None` inside global fixture hooks.
    #[must_use]
    pub fn unit(&self) -> Option<&UnitInfo> {
        self.unit
    }

    /// The sink this context reports to.
    #[must_use]
    pub fn log(&self) -> &UnitLog {
        self.log
    }
}

/// Extracts the text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
