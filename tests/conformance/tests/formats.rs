//! Golden output of one tree with passing, failing, aborting and skipped
//! cases, rendered by every built-in formatter.

#![allow(clippy::uninlined_format_args)]

use std::io::Write;
use unitkit::prelude::*;
use unitkit::RunReport;
use unitkit_conformance::prelude::*;

const FORMATS: [(&str, OutputFormat); 3] = [
    ("clf", OutputFormat::Clf),
    ("xml", OutputFormat::Xml),
    ("junit", OutputFormat::JUnit),
];

fn mixed_tree() -> TestTree {
    let mut tree = TestTree::new("mixed");
    let root = tree.root();
    tree.add_case(root, "passes", |t| {
        t.check(true, "true");
        Ok(())
    })
    .unwrap();
    tree.add_case(root, "fails", |t| {
        t.check(false, "1 == 2");
        Ok(())
    })
    .unwrap();
    tree.add_case(root, "aborts", |t| {
        t.require(false, "ptr != null")?;
        t.check(true, "unreachable");
        Ok(())
    })
    .unwrap();
    tree.add_case(root, "never", |t| {
        t.check(true, "true");
        Ok(())
    })
    .unwrap();
    tree.finalize().unwrap();
    tree
}

fn run_in(runner: &mut Runner, tree: &TestTree, format: OutputFormat) -> RunReport {
    runner.log().set_formatter(format);
    runner.run(tree, tree.root(), false).unwrap()
}

// ===========================================================================
// Golden patterns
// ===========================================================================

#[test]
fn mixed_tree_in_every_format() {
    let mut stream = PatternStream::open("mixed-tree.pattern").unwrap();
    let tree = mixed_tree();
    let mut runner = Runner::new();
    runner.log().set_target(stream.buffer());
    runner.log().set_threshold(Level::TestUnits);

    let mut mismatches = Vec::new();
    for (name, format) in FORMATS {
        writeln!(stream, "* {name} output {}", "*".repeat(40)).unwrap();
        let report = run_in(&mut runner, &tree, format);
        writeln!(stream).unwrap();

        assert_eq!(report.summary.cases_passed, 1);
        assert_eq!(report.summary.cases_failed, 1);
        assert_eq!(report.summary.cases_aborted, 1);
        assert_eq!(report.summary.cases_skipped, 1);
        assert!(!report.summary.completed);

        let label = format!("mixed-tree.pattern ({name})");
        if !report_mismatch(&label, &stream.match_pattern()) {
            mismatches.push(label);
        }
    }

    assert!(stream.is_exhausted());
    stream.finish().unwrap();
    assert!(mismatches.is_empty(), "mismatched formats: {:?}", mismatches);
}

// ===========================================================================
// Cross-format agreement
// ===========================================================================

/// Offsets of each case name in a rendered report.
///
/// The skipped case has no opening quote to match: CLF names it by its full
/// path, `"mixed/never"`, while XML and JUnit use `"never"`.
fn case_offsets(text: &str) -> Vec<usize> {
    ["\"passes\"", "\"fails\"", "\"aborts\"", "never\""]
        .iter()
        .map(|name| text.find(name).unwrap_or_else(|| panic!("{name} missing in:\n{text}")))
        .collect()
}

#[test]
fn formats_name_the_same_units_in_the_same_order() {
    let tree = mixed_tree();
    let mut runner = Runner::new();
    let buffer = SharedBuffer::new();
    runner.log().set_target(buffer.clone());
    runner.log().set_threshold(Level::TestUnits);

    for (name, format) in FORMATS {
        run_in(&mut runner, &tree, format);
        let offsets = case_offsets(&buffer.take());
        assert!(
            offsets.windows(2).all(|w| w[0] < w[1]),
            "{name} reports cases out of order: {:?}",
            offsets
        );
    }
}

#[test]
fn continuing_after_an_abort_runs_the_rest() {
    let tree = mixed_tree();
    let mut runner = Runner::new();
    let buffer = SharedBuffer::new();
    runner.log().set_target(buffer.clone());
    runner.log().set_threshold(Level::TestUnits);

    let report = runner.run(&tree, tree.root(), true).unwrap();
    assert_eq!(report.summary.cases_passed, 2);
    assert_eq!(report.summary.cases_skipped, 0);
    assert!(report.summary.completed);
    let out = buffer.contents();
    assert!(out.contains("Leaving test case \"never\"; testing time: "));
    assert!(out.contains("Leaving test suite \"mixed\" (failed); testing time: "));
}
