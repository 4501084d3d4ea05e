//! Execution engine.
//!
//! A run constructs the global fixtures, walks the tree depth-first from
//! the requested unit, destroys the fixtures and reports a summary:
//!
//! ```text
//! run start -> fixture setup -> units -> fixture teardown -> run end
//! ```
//!
//! Disabled units are invisible: they produce no events and no result.

use chrono::Utc;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use crate::checks::{Checks, panic_message};
use crate::config::RunConfig;
use crate::error::{SetupError, SetupResult};
use crate::fixture::{GlobalFixture, GlobalFixtures};
use crate::log::{EntryKind, LogEvent, RunStart, UnitInfo, UnitLog};
use crate::report::{RunReport, RunSummary, UnitResult};
use crate::status::{AssertionCounts, Outcome};
use crate::tree::{TestTree, UnitId, UnitKind};

/// Reason given for siblings left out after an abort.
pub const SKIPPED_AFTER_ABORT: &str = "a previous test unit aborted";

/// Warning attached to a passing case that recorded nothing.
pub const NO_ASSERTIONS: &str = "test case did not check any assertions";

/// Runs test trees against a log sink and a set of global fixtures.
///
/// # Example
///
/// ```rust
/// use unitkit::{FnFixture, Outcome, Runner, SharedBuffer, TestTree};
///
/// let mut tree = TestTree::new("root");
/// let case = tree
///     .add_case(tree.root(), "answer", |t| {
///         t.check_eq(&(6 * 7), &42);
///         Ok(())
///     })
///     .unwrap();
/// tree.finalize().unwrap();
///
/// let mut runner = Runner::new();
/// runner.log().set_target(SharedBuffer::new());
/// runner.register_fixture(FnFixture::new("env", |t| {
///     t.message("environment ready");
///     Ok(())
/// }));
///
/// let report = runner.run(&tree, tree.root(), true).unwrap();
/// assert_eq!(report.outcome(case), Some(Outcome::Passed));
/// assert!(report.summary.completed);
/// ```
#[derive(Debug)]
pub struct Runner {
    log: UnitLog,
    fixtures: GlobalFixtures,
    config: RunConfig,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    /// Creates a runner with the default configuration and a fresh sink.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RunConfig::default())
    }

    /// Creates a runner and applies `config` to its sink.
    #[must_use]
    pub fn with_config(config: RunConfig) -> Self {
        let log = UnitLog::new();
        log.set_threshold(config.log_level);
        log.set_formatter(config.log_format);
        Self {
            log,
            fixtures: GlobalFixtures::new(),
            config,
        }
    }

    /// The sink every run reports to.
    #[must_use]
    pub fn log(&self) -> &UnitLog {
        &self.log
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Registered global fixtures.
    #[must_use]
    pub fn fixtures(&self) -> &GlobalFixtures {
        &self.fixtures
    }

    /// Mutable access to the global fixtures.
    pub fn fixtures_mut(&mut self) -> &mut GlobalFixtures {
        &mut self.fixtures
    }

    /// Appends a global fixture.
    pub fn register_fixture(&mut self, fixture: impl GlobalFixture + 'static) {
        self.fixtures.register(fixture);
    }

    /// Runs the whole tree with the configured continuation policy.
    pub fn run_all(&mut self, tree: &TestTree) -> SetupResult<RunReport> {
        let continue_on_failure = self.config.continue_on_failure;
        self.run(tree, tree.root(), continue_on_failure)
    }

    /// Runs the subtree rooted at `root`.
    ///
    /// Each call is a complete run with its own fixture setup and teardown.
    /// Test failures never surface as errors; only an unfinalized tree, an
    /// unknown root or a global fixture setup failure do. On setup failure
    /// no unit runs, the constructed fixtures are destroyed and the run end
    /// is still rendered.
    ///
    /// Panics in case bodies and fixture hooks are caught and reported, but
    /// the process panic hook still runs first. With the default hook every
    /// caught panic also prints a banner to stderr; install a quieter hook
    /// with [`std::panic::set_hook`] to suppress it.
    pub fn run(
        &mut self,
        tree: &TestTree,
        root: UnitId,
        continue_on_failure: bool,
    ) -> SetupResult<RunReport> {
        if !tree.is_finalized() {
            return Err(SetupError::NotFinalized);
        }
        let root_info = tree.unit_info(root)?;
        let policy = self.config.teardown_policy;
        let started = Instant::now();
        self.fixtures.reset();

        let start = RunStart {
            root: root_info.clone(),
            case_count: tree.case_count(root),
            started_at: Utc::now(),
        };
        tracing::info!(root = %root_info.path, cases = start.case_count, "test run started");
        self.log.run_start(&start);

        let mut summary = RunSummary {
            root: root_info.name.clone(),
            cases_total: start.case_count,
            ..RunSummary::default()
        };

        if let Err(err) = self.fixtures.construct_all(&self.log) {
            summary.teardown_failures = self.fixtures.destroy_constructed(&self.log, policy);
            summary.setup_failed = true;
            summary.assertions = self.fixtures.counts();
            summary.elapsed = started.elapsed();
            self.log.run_end(&summary);
            tracing::warn!(error = %err, "test run stopped during global fixture setup");
            return Err(err);
        }

        let mut walk = Walk {
            log: &self.log,
            tree,
            continue_on_failure,
            summary,
            units: BTreeMap::new(),
        };
        let visited = walk.visit(root);
        let Walk { summary, units, .. } = walk;
        let summary = self.finish(visited, summary, started)?;
        Ok(RunReport { summary, units })
    }

    /// Destroys the fixtures and renders the run end, whatever the walk
    /// returned. A walk error is propagated after both.
    fn finish(
        &mut self,
        visited: SetupResult<Option<Visit>>,
        mut summary: RunSummary,
        started: Instant,
    ) -> SetupResult<RunSummary> {
        summary.teardown_failures = self
            .fixtures
            .destroy_all(&self.log, self.config.teardown_policy);
        let mut assertions = self.fixtures.counts();
        let visited = match visited {
            Ok(visited) => visited,
            Err(err) => {
                summary.assertions = assertions;
                summary.elapsed = started.elapsed();
                self.log.run_end(&summary);
                tracing::warn!(error = %err, "test run stopped while walking the tree");
                return Err(err);
            }
        };

        let mut stopped = false;
        if let Some(visit) = visited {
            assertions.merge(&visit.assertions);
            stopped = visit.stopped;
        }
        summary.completed = !stopped;
        summary.assertions = assertions;
        summary.elapsed = started.elapsed();
        self.log.run_end(&summary);
        tracing::info!(
            passed = summary.cases_passed,
            failed = summary.cases_failed,
            aborted = summary.cases_aborted,
            skipped = summary.cases_skipped,
            "test run finished"
        );
        Ok(summary)
    }
}

#[derive(Debug, Clone, Copy)]
struct Visit {
    outcome: Outcome,
    assertions: AssertionCounts,
    /// The unit aborted and the traversal must not continue past it.
    stopped: bool,
}

struct Walk<'r> {
    log: &'r UnitLog,
    tree: &'r TestTree,
    continue_on_failure: bool,
    summary: RunSummary,
    units: BTreeMap<UnitId, UnitResult>,
}

impl Walk<'_> {
    /// Runs one unit; `None` if it is disabled.
    fn visit(&mut self, id: UnitId) -> SetupResult<Option<Visit>> {
        let unit = self.tree.resolve(id)?;
        if !unit.effective_status().is_enabled() {
            return Ok(None);
        }
        let info = self.tree.unit_info(id)?;
        let started = Instant::now();
        self.log.emit(LogEvent::unit_start(info.clone()));

        let (outcome, assertions, stopped) = match unit.kind() {
            UnitKind::Case => {
                let (outcome, assertions) = self.run_case(id, &info)?;
                let stopped = outcome == Outcome::Aborted && !self.continue_on_failure;
                (outcome, assertions, stopped)
            }
            UnitKind::Suite => self.run_suite(id)?,
        };

        let elapsed = started.elapsed();
        self.log
            .emit(LogEvent::unit_finish(info.clone(), outcome, elapsed, assertions));
        self.units.insert(
            id,
            UnitResult {
                name: info.name,
                path: info.path,
                kind: info.kind,
                outcome,
                assertions,
                elapsed,
            },
        );
        Ok(Some(Visit {
            outcome,
            assertions,
            stopped,
        }))
    }

    fn run_case(&mut self, id: UnitId, info: &UnitInfo) -> SetupResult<(Outcome, AssertionCounts)> {
        let Some(body) = self.tree.resolve(id)?.body() else {
            return Err(SetupError::NotFound(id));
        };
        let mut checks = Checks::new(self.log, Some(info));
        let result = catch_unwind(AssertUnwindSafe(|| body(&mut checks)));
        let outcome = match result {
            Ok(Ok(())) if checks.counts().failed > 0 => Outcome::Failed,
            Ok(Ok(())) => Outcome::Passed,
            Ok(Err(_)) => Outcome::Aborted,
            Err(payload) => {
                checks.record_exception(&panic_message(payload.as_ref()));
                Outcome::Aborted
            }
        };
        let assertions = checks.counts();
        if outcome == Outcome::Passed && assertions.total() == 0 {
            self.log.emit(LogEvent::entry(
                Some(info.clone()),
                EntryKind::Warning,
                NO_ASSERTIONS,
                None,
            ));
        }

        match outcome {
            Outcome::Passed => self.summary.cases_passed += 1,
            Outcome::Failed => self.summary.cases_failed += 1,
            Outcome::Aborted => self.summary.cases_aborted += 1,
            Outcome::Skipped => self.summary.cases_skipped += 1,
        }
        Ok((outcome, assertions))
    }

    fn run_suite(&mut self, id: UnitId) -> SetupResult<(Outcome, AssertionCounts, bool)> {
        let children = self.tree.resolve(id)?.children().to_vec();
        let mut outcomes = Vec::with_capacity(children.len());
        let mut assertions = AssertionCounts::default();
        let mut stopped = false;

        for child in children {
            if stopped {
                if let Some(outcome) = self.skip(child)? {
                    outcomes.push(outcome);
                }
                continue;
            }
            if let Some(visit) = self.visit(child)? {
                outcomes.push(visit.outcome);
                assertions.merge(&visit.assertions);
                stopped = visit.stopped;
            }
        }

        let outcome = if stopped {
            Outcome::Aborted
        } else {
            Outcome::aggregate(outcomes)
        };
        Ok((outcome, assertions, stopped))
    }

    /// Reports an enabled unit left out after an abort.
    fn skip(&mut self, id: UnitId) -> SetupResult<Option<Outcome>> {
        if !self.tree.resolve(id)?.effective_status().is_enabled() {
            return Ok(None);
        }
        let info = self.tree.unit_info(id)?;
        self.log
            .emit(LogEvent::unit_skipped(info.clone(), SKIPPED_AFTER_ABORT));
        self.summary.cases_skipped += self.tree.case_count(id);
        self.units.insert(
            id,
            UnitResult {
                name: info.name,
                path: info.path,
                kind: info.kind,
                outcome: Outcome::Skipped,
                assertions: AssertionCounts::default(),
                elapsed: std::time::Duration::ZERO,
            },
        );
        Ok(Some(Outcome::Skipped))
    }
}
