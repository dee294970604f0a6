//! `LinuxSpec.Linux.Rlimits` suite.
//!
//! Each case sets a single rlimit on a fresh document, runs a shell
//! `ulimit` probe inside the container and expects the configured bound
//! back on stdout.

use crate::error::Result;
use crate::spec::{Rlimit, SpecDocument};
use crate::testcase::{Outcome, TestContext, TestSuite};

/// Suite name.
pub const SUITE_NAME: &str = "LinuxSpec.Linux.Rlimits";

/// Shell that runs the probe inside the container.
const PROBE_SHELL: &str = "/bin/bash";

const NPROC_SOFT: u64 = 10;
const NPROC_HARD: u64 = 20;
const NOFILE_SOFT: u64 = 1024;
const NOFILE_HARD: u64 = 2048;

/// Which bound of an rlimit a probe reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Soft,
    Hard,
}

impl Bound {
    /// `ulimit` flag selecting this bound.
    pub fn flag(&self) -> &'static str {
        match self {
            Self::Soft => "-S",
            Self::Hard => "-H",
        }
    }

    /// The value of this bound in `rlimit`.
    pub fn value(&self, rlimit: &Rlimit) -> u64 {
        match self {
            Self::Soft => rlimit.soft,
            Self::Hard => rlimit.hard,
        }
    }
}

/// Builds the document for a probe: only `rlimit` set, the process running
/// `ulimit <item> <bound>`.
pub fn probe_spec(rlimit: &Rlimit, ulimit_item: &str, bound: Bound) -> SpecDocument {
    let script = format!("ulimit {} {}", ulimit_item, bound.flag());
    let mut spec = SpecDocument::new();
    spec.set_rlimits(rlimit.clone())
        .set_args([PROBE_SHELL, "-c", script.as_str()]);
    spec
}

/// Runs a probe and expects the selected bound of `rlimit` as output.
pub fn probe_rlimit(
    ctx: &TestContext<'_>,
    rlimit: Rlimit,
    ulimit_item: &str,
    bound: Bound,
) -> Result<Outcome> {
    let spec = probe_spec(&rlimit, ulimit_item, bound);
    ctx.execute(&spec, &bound.value(&rlimit).to_string())
}

/// Builds the suite.
pub fn suite() -> TestSuite {
    let mut suite = TestSuite::new(SUITE_NAME);
    suite
        .add_case("TestRlimitNPROCSoft", |ctx| {
            probe_rlimit(ctx, Rlimit::new("NPROC", NPROC_SOFT, NPROC_HARD), "-u", Bound::Soft)
        })
        .add_case("TestRlimitNPROCHard", |ctx| {
            probe_rlimit(ctx, Rlimit::new("NPROC", NPROC_SOFT, NPROC_HARD), "-u", Bound::Hard)
        })
        .add_case("TestRlimitNOFILESoft", |ctx| {
            probe_rlimit(
                ctx,
                Rlimit::new("NOFILE", NOFILE_SOFT, NOFILE_HARD),
                "-n",
                Bound::Soft,
            )
        })
        .add_case("TestRlimitNOFILEHard", |ctx| {
            probe_rlimit(
                ctx,
                Rlimit::new("NOFILE", NOFILE_SOFT, NOFILE_HARD),
                "-n",
                Bound::Hard,
            )
        });
    suite
}
