#![forbid(unsafe_code)]
// Allow pedantic lints for early-stage API ergonomics.
#![allow(clippy::nursery)]
#![allow(clippy::pedantic)]

//! # unitkit
//!
//! A test-unit execution engine with global fixtures and pluggable report
//! formatters.
//!
//! - A [`TestTree`] of suites and cases, addressed by [`UnitId`]
//! - [`GlobalFixture`]s set up before and torn down after every run
//! - A [`Runner`] that walks the tree and turns failures and panics into
//!   [`Outcome`]s
//! - A [`UnitLog`] sink rendering the event stream as CLF, XML or JUnit
//!
//! ## Example
//!
//! ```rust
//! use unitkit::{Level, OutputFormat, Runner, SharedBuffer, TestTree};
//!
//! let mut tree = TestTree::new("root");
//! tree.add_case(tree.root(), "math", |t| {
//!     t.check(1 + 1 == 2, "1 + 1 == 2");
//!     Ok(())
//! })
//! .unwrap();
//! tree.finalize().unwrap();
//!
//! let mut runner = Runner::new();
//! let output = SharedBuffer::new();
//! runner.log().set_target(output.clone());
//! runner.log().set_threshold(Level::TestUnits);
//! runner.log().set_formatter(OutputFormat::Clf);
//!
//! let report = runner.run(&tree, tree.root(), true).unwrap();
//! assert!(report.summary.is_success());
//! assert!(output.contents().contains("Entering test case \"math\""));
//! ```
//!
//! ## Formatters
//!
//! - **CLF**: compiler-style text lines (default)
//! - **XML**: a streamed `<TestLog>` document
//! - **JUnit**: a `<testsuites>` report written when the run ends

pub mod checks;
pub mod config;
pub mod engine;
pub mod error;
pub mod fixture;
pub mod log;
pub mod report;
pub mod status;
pub mod tree;

pub use checks::{Aborted, CaseResult, Checks};
pub use config::{RunConfig, TeardownPolicy};
pub use engine::Runner;
pub use error::{ParseError, SetupError, SetupResult};
pub use fixture::{FixtureState, FnFixture, GlobalFixture, GlobalFixtures};
pub use log::format::{LogFormatter, OutputFormat};
pub use log::{
    EntryKind, EventKind, Level, LogEvent, RunStart, SharedBuffer, SinkGuard, SourceLocation,
    Target, UnitInfo, UnitLog,
};
pub use report::{RunReport, RunSummary, UnitResult};
pub use status::{AssertionCounts, CheckLevel, Outcome, Verdict};
pub use tree::{CaseBody, EffectiveStatus, RunStatus, TestTree, TestUnit, UnitId, UnitKind};

/// Everything needed to build and run a test tree.
pub mod prelude {
    pub use crate::{
        CaseResult, Checks, FnFixture, GlobalFixture, Level, OutputFormat, Outcome, RunConfig,
        RunStatus, Runner, SharedBuffer, TestTree, UnitId,
    };
}
