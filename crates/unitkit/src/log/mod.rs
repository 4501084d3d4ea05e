//! Log events, levels and the log sink.
//!
//! Everything a run reports flows through [`UnitLog`] as a stream of
//! [`LogEvent`]s. The sink drops events below its threshold and hands the
//! rest to the active [`LogFormatter`](format::LogFormatter).

pub mod format;
mod sink;

use chrono::{DateTime, Utc};
use std::fmt;
use std::panic::Location;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ParseError;
use crate::status::{AssertionCounts, Outcome};
use crate::tree::{UnitId, UnitKind};

pub use sink::{SharedBuffer, SinkGuard, Target, UnitLog};

/// Log threshold, from most to least verbose.
///
/// An event is rendered when its level is at or above the sink threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Level {
    /// Passed checks.
    Successes,
    /// Entering and leaving test units.
    TestUnits,
    /// Free-form messages.
    Messages,
    /// Warnings.
    Warnings,
    /// Non-fatal and fatal errors.
    #[default]
    Errors,
    /// Fatal errors and panics only.
    FatalErrors,
    /// Nothing but the run header and summary.
    Nothing,
}

impl Level {
    /// Returns the canonical name of the level.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Successes => "success",
            Self::TestUnits => "test_suite",
            Self::Messages => "message",
            Self::Warnings => "warning",
            Self::Errors => "error",
            Self::FatalErrors => "fatal_error",
            Self::Nothing => "nothing",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "success" | "successes" => Ok(Self::Successes),
            "test_suite" | "test_units" | "units" | "unit_scope" => Ok(Self::TestUnits),
            "message" | "messages" => Ok(Self::Messages),
            "warning" | "warnings" => Ok(Self::Warnings),
            "error" | "errors" | "all_errors" => Ok(Self::Errors),
            "fatal" | "fatal_error" | "fatal_errors" => Ok(Self::FatalErrors),
            "nothing" | "none" => Ok(Self::Nothing),
            _ => Err(ParseError::new("log level", s)),
        }
    }
}

/// Test unit as seen by formatters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitInfo {
    /// Unit id in its tree.
    pub id: UnitId,
    /// Case or suite.
    pub kind: UnitKind,
    /// Display name.
    pub name: String,
    /// `/`-joined names from the tree root.
    pub path: String,
}

/// Source position of a check or message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Source file as reported by the compiler.
    pub file: String,
    /// 1-based line.
    pub line: u32,
}

impl From<&Location<'_>> for SourceLocation {
    fn from(location: &Location<'_>) -> Self {
        Self {
            file: location.file().to_string(),
            line: location.line(),
        }
    }
}

/// Kind of a free-text log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A check that held.
    Passed,
    /// A message.
    Message,
    /// A warning.
    Warning,
    /// A non-fatal failure.
    Error,
    /// A fatal failure.
    FatalError,
    /// A caught panic.
    Exception,
}

impl EntryKind {
    /// Threshold level of entries of this kind.
    #[must_use]
    pub fn level(self) -> Level {
        match self {
            Self::Passed => Level::Successes,
            Self::Message => Level::Messages,
            Self::Warning => Level::Warnings,
            Self::Error => Level::Errors,
            Self::FatalError | Self::Exception => Level::FatalErrors,
        }
    }
}

/// What happened.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// A unit started.
    UnitStart,
    /// A unit finished.
    UnitFinish {
        /// Final outcome.
        outcome: Outcome,
        /// Wall time spent in the unit.
        elapsed: Duration,
        /// Checks recorded by the unit and its descendants.
        assertions: AssertionCounts,
    },
    /// A unit was not run.
    UnitSkipped {
        /// Why it was not run.
        reason: String,
    },
    /// A check result, message, warning or failure.
    Entry {
        /// Entry kind.
        entry: EntryKind,
        /// Free text.
        text: String,
        /// Where it was recorded, if known.
        location: Option<SourceLocation>,
    },
}

/// A single record of the event stream.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    /// Position in the sink's stream, assigned on emission.
    pub seq: u64,
    /// Originating unit; `None` outside any unit.
    pub unit: Option<UnitInfo>,
    /// Payload.
    pub kind: EventKind,
}

impl LogEvent {
    /// A unit started.
    #[must_use]
    pub fn unit_start(unit: UnitInfo) -> Self {
        Self {
            seq: 0,
            unit: Some(unit),
            kind: EventKind::UnitStart,
        }
    }

    /// A unit finished.
    #[must_use]
    pub fn unit_finish(
        unit: UnitInfo,
        outcome: Outcome,
        elapsed: Duration,
        assertions: AssertionCounts,
    ) -> Self {
        Self {
            seq: 0,
            unit: Some(unit),
            kind: EventKind::UnitFinish {
                outcome,
                elapsed,
                assertions,
            },
        }
    }

    /// A unit was skipped.
    #[must_use]
    pub fn unit_skipped(unit: UnitInfo, reason: impl Into<String>) -> Self {
        Self {
            seq: 0,
            unit: Some(unit),
            kind: EventKind::UnitSkipped {
                reason: reason.into(),
            },
        }
    }

    /// A free-text entry.
    #[must_use]
    pub fn entry(
        unit: Option<UnitInfo>,
        entry: EntryKind,
        text: impl Into<String>,
        location: Option<SourceLocation>,
    ) -> Self {
        Self {
            seq: 0,
            unit,
            kind: EventKind::Entry {
                entry,
                text: text.into(),
                location,
            },
        }
    }

    /// Threshold level of this event.
    #[must_use]
    pub fn level(&self) -> Level {
        match &self.kind {
            EventKind::UnitStart | EventKind::UnitFinish { .. } | EventKind::UnitSkipped { .. } => {
                Level::TestUnits
            }
            EventKind::Entry { entry, .. } => entry.level(),
        }
    }

    /// Id of the originating unit, [`UnitId::INVALID`] outside any unit.
    #[must_use]
    pub fn unit_id(&self) -> UnitId {
        self.unit.as_ref().map_or(UnitId::INVALID, |u| u.id)
    }

    /// Returns true for unit start, finish and skip events.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        !matches!(self.kind, EventKind::Entry { .. })
    }
}

/// Header of a run, rendered before any event.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStart {
    /// The unit the run starts from.
    pub root: UnitInfo,
    /// Enabled cases under the root.
    pub case_count: usize,
    /// Wall-clock start.
    pub started_at: DateTime<Utc>,
}
