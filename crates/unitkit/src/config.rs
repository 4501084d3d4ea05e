//! Run configuration.
//!
//! Values come from code through the builder methods or from the
//! environment:
//!
//! | Variable | Values |
//! |---|---|
//! | `UNITKIT_LOG_LEVEL` | `all`, `test_suite`, `message`, `warning`, `error`, `fatal_error`, `nothing` |
//! | `UNITKIT_LOG_FORMAT` | `clf` (`hrf`), `xml`, `junit` |
//! | `UNITKIT_CONTINUE_ON_FAILURE` | `true`/`false`, `yes`/`no`, `1`/`0` |
//! | `UNITKIT_TEARDOWN_POLICY` | `report`, `abort` |

use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;
use crate::log::Level;
use crate::log::format::OutputFormat;

/// What happens when a global fixture panics or fails fatally during
/// teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TeardownPolicy {
    /// Log a fatal error, count it in the summary and keep destroying the
    /// remaining fixtures.
    #[default]
    Report,
    /// Log a fatal error, flush the sink and abort the process.
    Abort,
}

impl TeardownPolicy {
    /// Returns the canonical name of the policy.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::Abort => "abort",
        }
    }
}

impl fmt::Display for TeardownPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeardownPolicy {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "report" | "log" | "continue" => Ok(Self::Report),
            "abort" | "crash" => Ok(Self::Abort),
            _ => Err(ParseError::new("teardown policy", s)),
        }
    }
}

fn parse_bool(s: &str) -> Result<bool, ParseError> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ParseError::new("boolean", s)),
    }
}

/// Settings applied to a [`Runner`](crate::Runner).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    /// Sink threshold.
    pub log_level: Level,
    /// Built-in formatter.
    pub log_format: OutputFormat,
    /// Whether siblings of an aborted unit still run.
    pub continue_on_failure: bool,
    /// Handling of catastrophic teardown failures.
    pub teardown_policy: TeardownPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            log_level: Level::default(),
            log_format: OutputFormat::default(),
            continue_on_failure: true,
            teardown_policy: TeardownPolicy::default(),
        }
    }
}

impl RunConfig {
    /// Environment variable holding the log level.
    pub const LOG_LEVEL_VAR: &'static str = "UNITKIT_LOG_LEVEL";
    /// Environment variable holding the output format.
    pub const LOG_FORMAT_VAR: &'static str = "UNITKIT_LOG_FORMAT";
    /// Environment variable holding the continuation policy.
    pub const CONTINUE_VAR: &'static str = "UNITKIT_CONTINUE_ON_FAILURE";
    /// Environment variable holding the teardown policy.
    pub const TEARDOWN_VAR: &'static str = "UNITKIT_TEARDOWN_POLICY";

    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log level.
    #[must_use]
    pub fn log_level(mut self, level: Level) -> Self {
        self.log_level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn log_format(mut self, format: OutputFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Sets the continuation policy.
    #[must_use]
    pub fn continue_on_failure(mut self, continue_on_failure: bool) -> Self {
        self.continue_on_failure = continue_on_failure;
        self
    }

    /// Sets the teardown policy.
    #[must_use]
    pub fn teardown_policy(mut self, policy: TeardownPolicy) -> Self {
        self.teardown_policy = policy;
        self
    }

    /// Builds a configuration from a variable lookup, keeping defaults for
    /// unset variables.
    ///
    /// ```rust
    /// use unitkit::{Level, RunConfig};
    ///
    /// let config = RunConfig::from_lookup(|name| match name {
    ///     "UNITKIT_LOG_LEVEL" => Some("test_suite".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(config.log_level, Level::TestUnits);
    /// ```
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ParseError> {
        let mut config = Self::default();
        if let Some(value) = lookup(Self::LOG_LEVEL_VAR) {
            config.log_level = value.parse()?;
        }
        if let Some(value) = lookup(Self::LOG_FORMAT_VAR) {
            config.log_format = value.parse()?;
        }
        if let Some(value) = lookup(Self::CONTINUE_VAR) {
            config.continue_on_failure = parse_bool(&value)?;
        }
        if let Some(value) = lookup(Self::TEARDOWN_VAR) {
            config.teardown_policy = value.parse()?;
        }
        Ok(config)
    }

    /// Builds a configuration from the process environment.
    pub fn from_env() -> Result<Self, ParseError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}
