//! Tests for suite registration and execution.
//!
//! Uses an in-process runtime so that no container runtime is needed.

use oct::manager::{CaseState, SuiteState};
use oct::{
    BundleBuilder, Error, Manager, Outcome, Result, RuntimeAdaptor, TestContext, TestSuite,
    Verdict,
};
use std::path::Path;
use tempfile::TempDir;

/// Runtime that answers every start with the same output.
struct EchoRuntime(&'static str);

impl RuntimeAdaptor for EchoRuntime {
    fn name(&self) -> &str {
        "echo"
    }

    fn start(&self, _bundle: &Path) -> Result<String> {
        Ok(self.0.to_string())
    }
}

fn suite_with_error_in_middle() -> TestSuite {
    let mut suite = TestSuite::new("Sample");
    suite
        .add_case("first", |_| Ok(Outcome::passed()))
        .add_case("second", |_| {
            Err(Error::Serialization("cannot encode".to_string()))
        })
        .add_case("third", |_| Ok(Outcome::failed("mismatch")));
    suite
}

// =============================================================================
// Registration Tests
// =============================================================================

#[test]
fn test_register_preserves_order() {
    let mut manager = Manager::new();
    assert!(manager.register(TestSuite::new("B")));
    assert!(manager.register(TestSuite::new("A")));

    let names: Vec<_> = manager.suites().iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["B", "A"]);
}

#[test]
fn test_register_is_idempotent_by_name() {
    let mut manager = Manager::new();
    manager.register(suite_with_error_in_middle());

    let registered = manager.register(TestSuite::new("Sample"));

    assert!(!registered, "duplicate suite should be rejected");
    assert_eq!(manager.suites().len(), 1);
    assert_eq!(manager.suite("Sample").unwrap().len(), 3);
}

#[test]
fn test_duplicate_case_name_ignored() {
    let mut suite = TestSuite::new("Dup");
    suite
        .add_case("same", |_| Ok(Outcome::passed()))
        .add_case("same", |_| Ok(Outcome::failed("second")));

    assert_eq!(suite.len(), 1);
}

#[test]
fn test_builtin_suites_registered() {
    let mut manager = Manager::new();
    oct::suites::register_all(&mut manager);

    assert!(manager.suite("LinuxSpec.Linux.Rlimits").is_some());
}

// =============================================================================
// Execution Tests
// =============================================================================

#[test]
fn test_case_error_does_not_abort_suite() {
    let temp_dir = TempDir::new().unwrap();
    let builder = BundleBuilder::with_path(temp_dir.path().to_path_buf()).unwrap();
    let runtime = EchoRuntime("");
    let ctx = TestContext::new(&runtime, &builder);
    let mut manager = Manager::new();
    manager.register(suite_with_error_in_middle());

    let report = manager.run_all(&ctx);
    let verdicts: Vec<_> = report.results().map(|r| r.verdict).collect();

    assert_eq!(verdicts, vec![Verdict::Passed, Verdict::Error, Verdict::Failed]);
    let second = report.results().nth(1).unwrap();
    assert!(second.message.as_deref().unwrap().contains("cannot encode"));
}

#[test]
fn test_case_panic_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let builder = BundleBuilder::with_path(temp_dir.path().to_path_buf()).unwrap();
    let runtime = EchoRuntime("");
    let ctx = TestContext::new(&runtime, &builder);

    let mut suite = TestSuite::new("Panics");
    suite
        .add_case("boom", |_| panic!("kaboom"))
        .add_case("after", |_| Ok(Outcome::passed()));
    let mut manager = Manager::new();
    manager.register(suite);

    let report = manager.run_all(&ctx);
    let results: Vec<_> = report.results().collect();

    assert_eq!(results.len(), 2, "suite must continue after a panic");
    assert_eq!(results[0].verdict, Verdict::Error);
    assert!(results[0].message.as_deref().unwrap().contains("kaboom"));
    assert_eq!(results[1].verdict, Verdict::Passed);
}

#[test]
fn test_report_states_and_runtime_name() {
    let temp_dir = TempDir::new().unwrap();
    let builder = BundleBuilder::with_path(temp_dir.path().to_path_buf()).unwrap();
    let runtime = EchoRuntime("");
    let ctx = TestContext::new(&runtime, &builder);
    let mut manager = Manager::new();
    manager.register(suite_with_error_in_middle());

    let report = manager.run_all(&ctx);

    assert_eq!(report.runtime, "echo");
    assert_eq!(report.suites[0].state, SuiteState::Completed);
    assert!(report.results().all(|r| r.state == CaseState::Resulted));
    assert!(report.results().all(|r| r.suite == "Sample"));
}

#[test]
fn test_run_suite_unknown() {
    let temp_dir = TempDir::new().unwrap();
    let builder = BundleBuilder::with_path(temp_dir.path().to_path_buf()).unwrap();
    let runtime = EchoRuntime("");
    let ctx = TestContext::new(&runtime, &builder);
    let manager = Manager::new();

    let result = manager.run_suite("Missing", &ctx);

    assert!(matches!(result, Err(Error::SuiteNotFound(name)) if name == "Missing"));
}

#[test]
fn test_run_single_case() {
    let temp_dir = TempDir::new().unwrap();
    let builder = BundleBuilder::with_path(temp_dir.path().to_path_buf()).unwrap();
    let runtime = EchoRuntime("");
    let ctx = TestContext::new(&runtime, &builder);
    let mut manager = Manager::new();
    manager.register(suite_with_error_in_middle());

    let result = manager.run_case("Sample", "third", &ctx).unwrap();
    assert_eq!(result.verdict, Verdict::Failed);
    assert_eq!(result.message.as_deref(), Some("mismatch"));

    let missing = manager.run_case("Sample", "fourth", &ctx);
    assert!(matches!(missing, Err(Error::CaseNotFound { .. })));
}

#[test]
fn test_execute_builds_runs_and_cleans_up() {
    let temp_dir = TempDir::new().unwrap();
    let builder = BundleBuilder::with_path(temp_dir.path().to_path_buf()).unwrap();
    let runtime = EchoRuntime("Hello\n");
    let ctx = TestContext::new(&runtime, &builder);

    let outcome = ctx.execute(&oct::SpecDocument::new(), "hello").unwrap();

    assert_eq!(outcome, Outcome::passed());
    assert_eq!(
        std::fs::read_dir(temp_dir.path()).unwrap().count(),
        0,
        "bundle should be removed after the case"
    );
}

#[test]
fn test_execute_keeps_bundles_on_request() {
    let temp_dir = TempDir::new().unwrap();
    let builder = BundleBuilder::with_path(temp_dir.path().to_path_buf()).unwrap();
    let runtime = EchoRuntime("x");
    let ctx = TestContext::new(&runtime, &builder).keep_bundles(true);

    ctx.execute(&oct::SpecDocument::new(), "x").unwrap();

    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
}

#[test]
fn test_execute_error_leaves_no_bundle() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().join("bundles");
    let builder = BundleBuilder::with_path(base.clone())
        .unwrap()
        .with_rootfs(temp_dir.path().join("missing"));
    let runtime = EchoRuntime("");
    let ctx = TestContext::new(&runtime, &builder);

    let mut suite = TestSuite::new("Broken");
    for name in ["one", "two", "three"] {
        suite.add_case(name, |ctx| ctx.execute(&oct::SpecDocument::new(), ""));
    }
    let mut manager = Manager::new();
    manager.register(suite);

    let report = manager.run_all(&ctx);

    assert!(report.results().all(|r| r.verdict == Verdict::Error));
    assert_eq!(
        std::fs::read_dir(&base).unwrap().count(),
        0,
        "erroring cases must not leave bundles behind"
    );
}

// =============================================================================
// Report Tests
// =============================================================================

#[test]
fn test_summary_and_display() {
    let temp_dir = TempDir::new().unwrap();
    let builder = BundleBuilder::with_path(temp_dir.path().to_path_buf()).unwrap();
    let runtime = EchoRuntime("");
    let ctx = TestContext::new(&runtime, &builder);
    let mut manager = Manager::new();
    manager.register(suite_with_error_in_middle());

    let report = manager.run_all(&ctx);
    let summary = report.summary();

    assert_eq!(
        (summary.passed, summary.failed, summary.unsupported, summary.error),
        (1, 1, 0, 1)
    );
    assert_eq!(summary.total(), report.len());
    assert!(!report.all_passed());

    let text = report.to_string();
    assert!(text.contains("Sample.first"));
    assert!(text.contains("ERROR"));
    assert!(text.ends_with("3 cases: 1 passed, 1 failed, 0 unsupported, 1 error"));
}

#[test]
fn test_report_serializes_verdicts_uppercase() {
    let temp_dir = TempDir::new().unwrap();
    let builder = BundleBuilder::with_path(temp_dir.path().to_path_buf()).unwrap();
    let runtime = EchoRuntime("");
    let ctx = TestContext::new(&runtime, &builder);
    let mut manager = Manager::new();
    manager.register(suite_with_error_in_middle());

    let report = manager.run_all(&ctx);
    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(value["suites"][0]["cases"][0]["verdict"], "PASSED");
    assert_eq!(value["runtime"], "echo");
}
