#![allow(clippy::nursery)]
#![allow(clippy::pedantic)]
//! Golden-output conformance harness for unitkit
//!
//! Report formats are part of unitkit's contract: CI systems parse the XML
//! and JUnit documents and people read the CLF log. This crate runs fixed
//! scenarios through a [`unitkit::Runner`] and matches the captured output
//! against stored baselines.
//!
//! ## Architecture
//!
//! - **PatternStream**: captures output and walks a baseline file
//! - **OutputComparator**: diff generation for expected vs actual
//! - **mask_volatile**: replaces testing times and source paths
//!
//! ## Usage
//!
//! ```rust,no_run
//! use unitkit_conformance::unitkit::prelude::*;
//! use unitkit_conformance::prelude::*;
//!
//! let mut stream = PatternStream::open("my-scenario.pattern").unwrap();
//! let mut runner = Runner::new();
//! runner.log().set_target(stream.buffer());
//!
//! let mut tree = TestTree::new("root");
//! tree.add_case(tree.root(), "c", |t| {
//!     t.check(true, "true");
//!     Ok(())
//! })
//! .unwrap();
//! tree.finalize().unwrap();
//! runner.run_all(&tree).unwrap();
//!
//! assert!(report_mismatch("my-scenario", &stream.match_pattern()));
//! stream.finish().unwrap();
//! ```
//!
//! Set `UNITKIT_SAVE_PATTERN=1` to record new baselines instead of comparing.

#![forbid(unsafe_code)]


// Re-export the crate under test for convenience
pub use unitkit;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::harness::{
        Baseline, BaselineError, CompareOptions, CompareResult, Diff, DiffType, OutputComparator,
        PatternStream, WhitespaceOptions, mask_volatile, report_mismatch, write_diff,
    };
}
