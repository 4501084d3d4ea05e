//! Global fixtures: process-wide setup and teardown hooks that run outside
//! any test unit.
//!
//! Setup hooks run in registration order before the first unit; teardown
//! hooks run in reverse order after the last one. Everything a hook logs is
//! attributed to no unit.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::checks::{CaseResult, Checks, panic_message};
use crate::config::TeardownPolicy;
use crate::error::{SetupError, SetupResult};
use crate::log::UnitLog;
use crate::status::AssertionCounts;

/// A global fixture.
///
/// # Example
///
/// ```rust
/// use unitkit::{CaseResult, Checks, GlobalFixture};
///
/// struct Database;
///
/// impl GlobalFixture for Database {
///     fn setup(&mut self, t: &mut Checks<'_>) -> CaseResult {
///         t.message("database ready");
///         Ok(())
///     }
/// }
///
/// assert_eq!(Database.name(), "Database");
/// ```
pub trait GlobalFixture: Send {
    /// Name used in setup errors and diagnostics.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Runs before the first test unit. `Err` or a panic fails the setup.
    fn setup(&mut self, t: &mut Checks<'_>) -> CaseResult;

    /// Runs after the last test unit.
    fn teardown(&mut self, _t: &mut Checks<'_>) -> CaseResult {
        Ok(())
    }
}

fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

type Hook = Box<dyn FnMut(&mut Checks<'_>) -> CaseResult + Send>;

/// A global fixture built from closures.
pub struct FnFixture {
    name: String,
    setup: Hook,
    teardown: Option<Hook>,
}

impl FnFixture {
    /// Creates a fixture with a setup hook and no teardown.
    pub fn new<F>(name: impl Into<String>, setup: F) -> Self
    where
        F: FnMut(&mut Checks<'_>) -> CaseResult + Send + 'static,
    {
        Self {
            name: name.into(),
            setup: Box::new(setup),
            teardown: None,
        }
    }

    /// Adds a teardown hook.
    #[must_use]
    pub fn with_teardown<F>(mut self, teardown: F) -> Self
    where
        F: FnMut(&mut Checks<'_>) -> CaseResult + Send + 'static,
    {
        self.teardown = Some(Box::new(teardown));
        self
    }
}

impl fmt::Debug for FnFixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFixture")
            .field("name", &self.name)
            .field("has_teardown", &self.teardown.is_some())
            .finish()
    }
}

impl GlobalFixture for FnFixture {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, t: &mut Checks<'_>) -> CaseResult {
        (self.setup)(t)
    }

    fn teardown(&mut self, t: &mut Checks<'_>) -> CaseResult {
        match &mut self.teardown {
            Some(teardown) => teardown(t),
            None => Ok(()),
        }
    }
}

/// Lifecycle of a registered fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixtureState {
    /// Setup has not run in the current cycle.
    Unconstructed,
    /// Setup is running.
    Constructing,
    /// Setup succeeded.
    Constructed,
    /// Setup panicked or failed fatally. Terminal until reset.
    ConstructionFailed,
    /// Teardown is running.
    Destructing,
    /// Teardown ran.
    Destroyed,
}

struct Registered {
    fixture: Box<dyn GlobalFixture>,
    state: FixtureState,
}

impl Registered {
    fn transition(&mut self, state: FixtureState) {
        tracing::debug!(
            fixture = self.fixture.name(),
            from = ?self.state,
            to = ?state,
            "global fixture transition"
        );
        self.state = state;
    }
}

enum HookResult {
    Ok,
    Failed(String),
}

fn invoke(
    log: &UnitLog,
    fixture: &mut dyn GlobalFixture,
    teardown: bool,
    counts: &mut AssertionCounts,
) -> HookResult {
    let mut checks = Checks::new(log, None);
    let result = catch_unwind(AssertUnwindSafe(|| {
        if teardown {
            fixture.teardown(&mut checks)
        } else {
            fixture.setup(&mut checks)
        }
    }));
    let outcome = match result {
        Ok(Ok(())) => HookResult::Ok,
        Ok(Err(_)) => HookResult::Failed(
            checks
                .last_fatal()
                .unwrap_or("fatal failure")
                .to_string(),
        ),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            checks.record_exception(&message);
            HookResult::Failed(message)
        }
    };
    counts.merge(&checks.counts());
    outcome
}

/// Ordered registry of global fixtures.
#[derive(Default)]
pub struct GlobalFixtures {
    entries: Vec<Registered>,
    counts: AssertionCounts,
}

impl fmt::Debug for GlobalFixtures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| (e.fixture.name(), e.state)))
            .finish()
    }
}

impl GlobalFixtures {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a fixture.
    pub fn register(&mut self, fixture: impl GlobalFixture + 'static) {
        self.entries.push(Registered {
            fixture: Box::new(fixture),
            state: FixtureState::Unconstructed,
        });
    }

    /// Number of registered fixtures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no fixture is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name and state of every fixture, in registration order.
    #[must_use]
    pub fn states(&self) -> Vec<(String, FixtureState)> {
        self.entries
            .iter()
            .map(|e| (e.fixture.name().to_string(), e.state))
            .collect()
    }

    /// Checks recorded by fixture hooks since the last reset.
    #[must_use]
    pub fn counts(&self) -> AssertionCounts {
        self.counts
    }

    /// Returns every fixture to [`FixtureState::Unconstructed`].
    pub fn reset(&mut self) {
        for entry in &mut self.entries {
            entry.state = FixtureState::Unconstructed;
        }
        self.counts = AssertionCounts::default();
    }

    /// Runs setup hooks in registration order.
    ///
    /// Stops at the first fixture that panics or fails fatally and returns
    /// [`SetupError::FixtureSetup`]. Fixtures after it stay unconstructed;
    /// the ones before it must still be destroyed by the caller.
    pub fn construct_all(&mut self, log: &UnitLog) -> SetupResult<()> {
        for entry in &mut self.entries {
            if entry.state != FixtureState::Unconstructed {
                continue;
            }
            entry.transition(FixtureState::Constructing);
            match invoke(log, entry.fixture.as_mut(), false, &mut self.counts) {
                HookResult::Ok => entry.transition(FixtureState::Constructed),
                HookResult::Failed(reason) => {
                    entry.transition(FixtureState::ConstructionFailed);
                    let fixture = entry.fixture.name().to_string();
                    tracing::error!(%fixture, %reason, "global fixture setup failed");
                    return Err(SetupError::FixtureSetup { fixture, reason });
                }
            }
        }
        Ok(())
    }

    /// Runs teardown hooks in reverse order for every constructed fixture.
    ///
    /// Non-fatal failures are only logged. A panic or a fatal failure is a
    /// catastrophic teardown failure: it is logged as fatal and then handled
    /// per `policy`. Returns the number of catastrophic failures.
    pub fn destroy_constructed(&mut self, log: &UnitLog, policy: TeardownPolicy) -> usize {
        let mut catastrophic = 0;
        for entry in self.entries.iter_mut().rev() {
            if entry.state != FixtureState::Constructed {
                continue;
            }
            entry.transition(FixtureState::Destructing);
            let result = invoke(log, entry.fixture.as_mut(), true, &mut self.counts);
            entry.transition(FixtureState::Destroyed);
            if let HookResult::Failed(reason) = result {
                tracing::error!(
                    fixture = entry.fixture.name(),
                    %reason,
                    ?policy,
                    "global fixture teardown failed"
                );
                if policy == TeardownPolicy::Abort {
                    log.flush();
                    std::process::abort();
                }
                catastrophic += 1;
            }
        }
        catastrophic
    }

    /// Destroys every constructed fixture at the end of a run.
    ///
    /// Same as [`GlobalFixtures::destroy_constructed`]; fixtures that never
    /// got constructed have nothing to tear down.
    pub fn destroy_all(&mut self, log: &UnitLog, policy: TeardownPolicy) -> usize {
        let failures = self.destroy_constructed(log, policy);
        tracing::debug!(failures, "global fixtures destroyed");
        failures
    }
}
