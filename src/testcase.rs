//! Test cases, suites and verdicts.
//!
//! A [`TestCase`] is a named function from a [`TestContext`] to an
//! [`Outcome`]. Cases build their own [`SpecDocument`], hand it to
//! [`TestContext::execute`] and get back a classified outcome:
//!
//! | Situation                                   | Verdict       |
//! |---------------------------------------------|---------------|
//! | Runtime ran, trimmed output matched         | `PASSED`      |
//! | Runtime ran, output differed                | `FAILED`      |
//! | Runtime failed to launch or exited non-zero | `UNSUPPORTED` |
//! | Harness fault (bundle, serialization, panic)| `ERROR`       |
//!
//! A non-zero exit may mean the runtime rejected the requested facet or
//! that the workload itself failed inside the container. The two cannot
//! be told apart from the outside, so both are `UNSUPPORTED`.
//!
//! [`SpecDocument`]: crate::spec::SpecDocument

use crate::bundle::{Bundle, BundleBuilder};
use crate::error::Result;
use crate::runtime::RuntimeAdaptor;
use crate::spec::SpecDocument;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

// =============================================================================
// Verdicts
// =============================================================================

/// Classification of one test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    /// The runtime honored the facet.
    Passed,
    /// The runtime ran but produced the wrong result.
    Failed,
    /// The runtime could not run the configuration at all.
    Unsupported,
    /// The harness itself failed.
    Error,
}

impl Verdict {
    /// All verdicts, in report order.
    pub const ALL: [Verdict; 4] = [
        Verdict::Passed,
        Verdict::Failed,
        Verdict::Unsupported,
        Verdict::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Unsupported => "UNSUPPORTED",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A verdict with an optional diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub verdict: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Outcome {
    pub fn passed() -> Self {
        Self {
            verdict: Verdict::Passed,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::with_message(Verdict::Failed, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::with_message(Verdict::Unsupported, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_message(Verdict::Error, message)
    }

    fn with_message(verdict: Verdict, message: impl Into<String>) -> Self {
        Self {
            verdict,
            message: Some(message.into()),
        }
    }
}

/// Classifies a runtime invocation against the expected output.
///
/// Output is trimmed and compared case-insensitively. Any runtime error
/// is `UNSUPPORTED` and keeps the runtime's output in the message.
pub fn classify_output(result: Result<String>, expected: &str) -> Outcome {
    match result {
        Ok(output) => {
            let actual = output.trim();
            if actual.eq_ignore_ascii_case(expected.trim()) {
                Outcome::passed()
            } else {
                Outcome::failed(format!("expected '{}', got '{}'", expected.trim(), actual))
            }
        }
        Err(e) => Outcome::unsupported(e.to_string()),
    }
}

// =============================================================================
// Test Context
// =============================================================================

/// What a running test case may use: the runtime under test and a
/// builder for fresh bundles.
pub struct TestContext<'a> {
    runtime: &'a dyn RuntimeAdaptor,
    builder: &'a BundleBuilder,
    keep_bundles: bool,
}

impl<'a> TestContext<'a> {
    pub fn new(runtime: &'a dyn RuntimeAdaptor, builder: &'a BundleBuilder) -> Self {
        Self {
            runtime,
            builder,
            keep_bundles: false,
        }
    }

    /// Leaves bundles on disk after each case for inspection.
    pub fn keep_bundles(mut self, keep: bool) -> Self {
        self.keep_bundles = keep;
        self
    }

    /// Returns the runtime under test.
    pub fn runtime(&self) -> &dyn RuntimeAdaptor {
        self.runtime
    }

    /// Writes `spec` into a fresh bundle.
    pub fn prepare_bundle(&self, spec: &SpecDocument) -> Result<Bundle> {
        self.builder.build(spec)
    }

    /// Runs `spec` on the runtime under test and compares its output to
    /// `expected`.
    ///
    /// Errors are harness faults (the bundle could not be built); runtime
    /// failures are reported through the returned outcome.
    pub fn execute(&self, spec: &SpecDocument, expected: &str) -> Result<Outcome> {
        let bundle = self.prepare_bundle(spec)?;
        let result = self.runtime.start(bundle.path());
        self.release(bundle);
        Ok(classify_output(result, expected))
    }

    fn release(&self, bundle: Bundle) {
        if self.keep_bundles {
            debug!("Keeping bundle {}", bundle.path().display());
            return;
        }
        let path = bundle.path().to_path_buf();
        if let Err(e) = bundle.remove() {
            warn!("Failed to remove bundle {}: {}", path.display(), e);
        }
    }
}

// =============================================================================
// Test Cases & Suites
// =============================================================================

/// Body of a test case.
pub type CaseFn = dyn Fn(&TestContext<'_>) -> Result<Outcome> + Send + Sync;

/// A named, immutable test case.
pub struct TestCase {
    name: String,
    run: Box<CaseFn>,
}

impl TestCase {
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(&TestContext<'_>) -> Result<Outcome> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            run: Box::new(run),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the case body.
    pub fn run(&self, ctx: &TestContext<'_>) -> Result<Outcome> {
        (self.run)(ctx)
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase").field("name", &self.name).finish()
    }
}

/// An ordered, named collection of test cases.
#[derive(Debug)]
pub struct TestSuite {
    name: String,
    cases: Vec<TestCase>,
}

impl TestSuite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cases: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a case. A second case with an existing name is ignored.
    pub fn add_case<F>(&mut self, name: impl Into<String>, run: F) -> &mut Self
    where
        F: Fn(&TestContext<'_>) -> Result<Outcome> + Send + Sync + 'static,
    {
        let case = TestCase::new(name, run);
        if self.case(case.name()).is_some() {
            warn!(
                "Test case {} already registered in suite {}",
                case.name(),
                self.name
            );
        } else {
            self.cases.push(case);
        }
        self
    }

    /// Cases in registration order.
    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    /// Looks a case up by name.
    pub fn case(&self, name: &str) -> Option<&TestCase> {
        self.cases.iter().find(|c| c.name() == name)
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}
