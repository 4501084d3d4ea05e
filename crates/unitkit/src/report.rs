//! Run summaries and per-unit results.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::status::{AssertionCounts, Outcome};
use crate::tree::{UnitId, UnitKind};

fn as_micros<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX))
}

/// Totals of a run, rendered by formatters at run end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Name of the unit the run started from.
    pub root: String,
    /// Enabled cases under the root.
    pub cases_total: usize,
    /// Cases that passed.
    pub cases_passed: usize,
    /// Cases with non-fatal failures.
    pub cases_failed: usize,
    /// Cases stopped by a fatal failure or a panic.
    pub cases_aborted: usize,
    /// Cases not run because a sibling aborted.
    pub cases_skipped: usize,
    /// Checks recorded by every case plus the global fixtures.
    pub assertions: AssertionCounts,
    /// Global fixtures whose teardown panicked or failed fatally.
    pub teardown_failures: usize,
    /// A global fixture failed during setup, so no case ran.
    pub setup_failed: bool,
    /// The traversal reached every enabled unit.
    pub completed: bool,
    /// Wall time of the whole run.
    #[serde(rename = "elapsed_us", serialize_with = "as_micros")]
    pub elapsed: Duration,
}

impl RunSummary {
    /// Number of failures shown in the report trailer.
    #[must_use]
    pub fn failures(&self) -> u32 {
        self.assertions.failed
    }

    /// True when nothing failed, aborted or broke during setup or teardown.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.setup_failed
            && self.failures() == 0
            && self.cases_failed == 0
            && self.cases_aborted == 0
            && self.teardown_failures == 0
    }
}

/// Result of one executed or skipped unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitResult {
    /// Display name.
    pub name: String,
    /// Path from the tree root.
    pub path: String,
    /// Case or suite.
    pub kind: UnitKind,
    /// Final outcome.
    pub outcome: Outcome,
    /// Checks recorded by the unit and its descendants.
    pub assertions: AssertionCounts,
    /// Wall time in microseconds.
    #[serde(rename = "elapsed_us", serialize_with = "as_micros")]
    pub elapsed: Duration,
}

/// Everything a run produced besides its log output.
///
/// Disabled units never appear in `units`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Run totals.
    pub summary: RunSummary,
    /// Results keyed by unit id.
    pub units: BTreeMap<UnitId, UnitResult>,
}

impl RunReport {
    /// Outcome of a unit, `None` if it did not take part in the run.
    #[must_use]
    pub fn outcome(&self, id: UnitId) -> Option<Outcome> {
        self.units.get(&id).map(|unit| unit.outcome)
    }

    /// Serializes the report as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
