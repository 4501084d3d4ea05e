//! Status model: check levels, assertion counters and unit outcomes.

use serde::Serialize;
use std::fmt;

/// How a failed check affects the running test unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckLevel {
    /// A failure is only a warning.
    Warn,
    /// A failure is recorded and the unit keeps going.
    Check,
    /// A failure is recorded and the rest of the unit is abandoned.
    Require,
}

impl CheckLevel {
    /// Returns true if a failure at this level aborts the current unit.
    #[must_use]
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::Require)
    }
}

/// Result of recording a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The condition held.
    Passed,
    /// The condition failed; execution continues.
    Failed,
    /// The condition failed fatally; the current unit must stop.
    Abort,
}

/// Per-unit assertion counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssertionCounts {
    /// Checks whose condition held.
    pub passed: u32,
    /// Checks and explicit errors that failed.
    pub failed: u32,
    /// Failed `Warn` checks and explicit warnings.
    pub warnings: u32,
}

impl AssertionCounts {
    /// Records the result of a check and returns what the caller must do next.
    pub fn record(&mut self, passed: bool, level: CheckLevel) -> Verdict {
        if passed {
            self.passed += 1;
            return Verdict::Passed;
        }
        match level {
            CheckLevel::Warn => {
                self.warnings += 1;
                Verdict::Passed
            }
            CheckLevel::Check => {
                self.failed += 1;
                Verdict::Failed
            }
            CheckLevel::Require => {
                self.failed += 1;
                Verdict::Abort
            }
        }
    }

    /// Total number of assertions, warnings included.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.passed + self.failed + self.warnings
    }

    /// Adds another set of counters into this one.
    pub fn merge(&mut self, other: &Self) {
        self.passed += other.passed;
        self.failed += other.failed;
        self.warnings += other.warnings;
    }
}

/// Final state of a test unit after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Every check held.
    Passed,
    /// At least one non-fatal failure.
    Failed,
    /// A fatal failure or a panic stopped the unit.
    Aborted,
    /// The unit was not executed.
    Skipped,
}

impl Outcome {
    /// Returns the lowercase name used in reports.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
            Self::Skipped => "skipped",
        }
    }

    /// Returns true for `Failed` and `Aborted`.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Aborted)
    }

    /// Combines child outcomes into a suite outcome.
    ///
    /// A suite fails if any child failed or aborted. A suite none of whose
    /// children executed is skipped.
    ///
    /// ```rust
    /// use unitkit::Outcome;
    ///
    /// let suite = Outcome::aggregate([Outcome::Passed, Outcome::Aborted, Outcome::Skipped]);
    /// assert_eq!(suite, Outcome::Failed);
    /// assert_eq!(Outcome::aggregate([]), Outcome::Skipped);
    /// ```
    pub fn aggregate(children: impl IntoIterator<Item = Self>) -> Self {
        let mut executed = false;
        let mut failed = false;
        for child in children {
            match child {
                Self::Skipped => {}
                Self::Passed => executed = true,
                Self::Failed | Self::Aborted => {
                    executed = true;
                    failed = true;
                }
            }
        }
        match (executed, failed) {
            (_, true) => Self::Failed,
            (true, false) => Self::Passed,
            (false, false) => Self::Skipped,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
