//! Suite registry and sequential execution.
//!
//! The [`Manager`] is built once at startup: every suite is registered
//! with an explicit [`Manager::register`] call, after which the registry is
//! only read. Runs are strictly sequential because each case owns its
//! bundle directory and the runtime invocation while it runs.
//!
//! # Run State Machine
//!
//! ```text
//! suite: Pending ──► Running ──► Completed
//! case:  Pending ──► Running ──► Resulted
//! ```
//!
//! No state is ever revisited. A case that returns an error or panics is
//! `ERROR` and the suite carries on with the next case.
//!
//! # Ordering
//!
//! Suites run in registration order and cases in the order they were
//! added. Reports preserve that order; report formatting relies on it.

use crate::error::{Error, Result};
use crate::testcase::{Outcome, TestCase, TestContext, TestSuite, Verdict};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, info, warn};

// =============================================================================
// States
// =============================================================================

/// Lifecycle of a suite within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuiteState {
    Pending,
    Running,
    Completed,
}

/// Lifecycle of a case within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseState {
    Pending,
    Running,
    Resulted,
}

// =============================================================================
// Reports
// =============================================================================

/// Result of one case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseReport {
    pub suite: String,
    pub case: String,
    pub state: CaseState,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub duration_ms: u64,
}

/// Results of one suite, in case registration order.
///
/// A report is created when its suite starts running, so a returned
/// report is always `Completed`; `Pending` describes suites not yet run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteReport {
    pub name: String,
    pub state: SuiteState,
    pub cases: Vec<CaseReport>,
}

/// Results of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub runtime: String,
    pub started_at: DateTime<Utc>,
    pub suites: Vec<SuiteReport>,
}

/// Verdict counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub unsupported: usize,
    pub error: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.unsupported + self.error
    }
}

impl RunReport {
    fn new(runtime: &str) -> Self {
        Self {
            runtime: runtime.to_string(),
            started_at: Utc::now(),
            suites: Vec::new(),
        }
    }

    /// Every case result, flattened in execution order.
    pub fn results(&self) -> impl Iterator<Item = &CaseReport> {
        self.suites.iter().flat_map(|s| s.cases.iter())
    }

    pub fn len(&self) -> usize {
        self.suites.iter().map(|s| s.cases.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counts results per verdict.
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for result in self.results() {
            match result.verdict {
                Verdict::Passed => summary.passed += 1,
                Verdict::Failed => summary.failed += 1,
                Verdict::Unsupported => summary.unsupported += 1,
                Verdict::Error => summary.error += 1,
            }
        }
        summary
    }

    /// True when every case passed.
    pub fn all_passed(&self) -> bool {
        self.results().all(|r| r.verdict == Verdict::Passed)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "runtime: {} (started {})",
            self.runtime,
            self.started_at.to_rfc3339()
        )?;

        let width = self
            .results()
            .map(|r| r.suite.len() + r.case.len() + 1)
            .max()
            .unwrap_or(0);

        for result in self.results() {
            let name = format!("{}.{}", result.suite, result.case);
            write!(f, "{:<width$}  {:<11}", name, result.verdict, width = width)?;
            if let Some(message) = &result.message {
                // Runtime output can span lines; keep one result per line.
                write!(f, "  {}", message.trim().replace('\n', " | "))?;
            }
            writeln!(f)?;
        }

        let summary = self.summary();
        write!(
            f,
            "{} cases: {} passed, {} failed, {} unsupported, {} error",
            summary.total(),
            summary.passed,
            summary.failed,
            summary.unsupported,
            summary.error
        )
    }
}

// =============================================================================
// Manager
// =============================================================================

/// Registry of test suites, keyed by suite name.
#[derive(Debug, Default)]
pub struct Manager {
    suites: Vec<TestSuite>,
}

impl Manager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a suite.
    ///
    /// Registration is idempotent by name: a suite whose name is already
    /// registered is dropped and `false` is returned.
    pub fn register(&mut self, suite: TestSuite) -> bool {
        if self.suite(suite.name()).is_some() {
            warn!("Test suite {} already registered", suite.name());
            return false;
        }
        debug!(
            "Registered test suite {} ({} cases)",
            suite.name(),
            suite.len()
        );
        self.suites.push(suite);
        true
    }

    /// Suites in registration order.
    pub fn suites(&self) -> &[TestSuite] {
        &self.suites
    }

    /// Looks a suite up by name.
    pub fn suite(&self, name: &str) -> Option<&TestSuite> {
        self.suites.iter().find(|s| s.name() == name)
    }

    /// Runs every suite.
    pub fn run_all(&self, ctx: &TestContext<'_>) -> RunReport {
        let mut report = RunReport::new(ctx.runtime().name());
        for suite in &self.suites {
            report.suites.push(run_suite(suite, ctx));
        }
        log_summary(&report);
        report
    }

    /// Runs the suite called `name`.
    pub fn run_suite(&self, name: &str, ctx: &TestContext<'_>) -> Result<RunReport> {
        let suite = self
            .suite(name)
            .ok_or_else(|| Error::SuiteNotFound(name.to_string()))?;
        let mut report = RunReport::new(ctx.runtime().name());
        report.suites.push(run_suite(suite, ctx));
        log_summary(&report);
        Ok(report)
    }

    /// Runs a single case of a suite.
    pub fn run_case(&self, suite: &str, case: &str, ctx: &TestContext<'_>) -> Result<CaseReport> {
        let found = self
            .suite(suite)
            .ok_or_else(|| Error::SuiteNotFound(suite.to_string()))?;
        let test = found.case(case).ok_or_else(|| Error::CaseNotFound {
            suite: suite.to_string(),
            case: case.to_string(),
        })?;
        Ok(run_case(found.name(), test, ctx))
    }
}

fn run_suite(suite: &TestSuite, ctx: &TestContext<'_>) -> SuiteReport {
    let mut report = SuiteReport {
        name: suite.name().to_string(),
        state: SuiteState::Running,
        cases: Vec::with_capacity(suite.len()),
    };
    info!("Running test suite {}", suite.name());

    for case in suite.cases() {
        report.cases.push(run_case(suite.name(), case, ctx));
    }

    report.state = SuiteState::Completed;
    debug!("Test suite {} completed", suite.name());
    report
}

fn run_case(suite: &str, case: &TestCase, ctx: &TestContext<'_>) -> CaseReport {
    debug!("{}.{}: {:?}", suite, case.name(), CaseState::Running);
    let start = Instant::now();

    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| case.run(ctx))) {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => Outcome::error(e.to_string()),
        Err(payload) => Outcome::error(
            Error::CasePanicked {
                case: case.name().to_string(),
                message: panic_message(payload.as_ref()),
            }
            .to_string(),
        ),
    };

    info!("{}.{}: {}", suite, case.name(), outcome.verdict);

    CaseReport {
        suite: suite.to_string(),
        case: case.name().to_string(),
        state: CaseState::Resulted,
        verdict: outcome.verdict,
        message: outcome.message,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn log_summary(report: &RunReport) {
    let summary = report.summary();
    info!(
        "{} cases: {} passed, {} failed, {} unsupported, {} error",
        summary.total(),
        summary.passed,
        summary.failed,
        summary.unsupported,
        summary.error
    );
}
