//! Error types for structural failures.
//!
//! Ordinary test failures never surface as errors: they are recorded as
//! [`Outcome`](crate::Outcome)s and log events. Only misuse of the test tree
//! and global fixture setup failures reach the caller of
//! [`Runner::run`](crate::Runner::run).

use thiserror::Error;

use crate::tree::UnitId;

/// A structural problem with the test tree or the global fixtures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// No test unit has this id.
    #[error("test unit {0} not found")]
    NotFound(UnitId),

    /// Children can only be added to test suites.
    #[error("test unit {0} is not a test suite")]
    NotASuite(UnitId),

    /// The tree was already finalized and can no longer change.
    #[error("test tree is already finalized")]
    Finalized,

    /// The tree must be finalized before it can run.
    #[error("test tree is not finalized")]
    NotFinalized,

    /// A global fixture panicked or failed fatally while being set up.
    #[error("global fixture \"{fixture}\" failed during setup: {reason}")]
    FixtureSetup {
        /// Name of the failing fixture.
        fixture: String,
        /// Panic payload or failure text.
        reason: String,
    },
}

/// Error returned when a configuration value cannot be parsed.
///
/// # Example
///
/// ```rust
/// use unitkit::Level;
///
/// let err = "loud".parse::<Level>().unwrap_err();
/// assert_eq!(err.to_string(), "invalid log level: \"loud\"");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseError {
    kind: &'static str,
    value: String,
}

impl ParseError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }

    /// What was being parsed ("log level", "output format", ...).
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// The rejected input.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// A specialized [`Result`] type for setup operations.
pub type SetupResult<T> = std::result::Result<T, SetupError>;
