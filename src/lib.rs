//! # oct
//!
//! **Conformance Test Harness for OCI Container Runtimes**
//!
//! This crate checks whether a container runtime honors individual facets
//! of the runtime bundle specification (resource limits, namespaces,
//! mounts). For every facet it writes a minimal bundle, runs the runtime
//! under test against it and compares what the container printed with
//! what the bundle asked for. A separate static validator checks bundles
//! for well-formedness without running anything.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                              oct                                    │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────────┐    │
//! │  │                         Manager                             │    │
//! │  │   register(suite) → run_all / run_suite → RunReport         │    │
//! │  └──────────────────────────┬──────────────────────────────────┘    │
//! │                             │ per case                              │
//! │  ┌──────────────────────────▼──────────────────────────────────┐    │
//! │  │  TestCase: fresh SpecDocument → Bundle → RuntimeAdaptor     │    │
//! │  │            output vs expected → Verdict                     │    │
//! │  └──────────────────────────┬──────────────────────────────────┘    │
//! │                             │                                       │
//! │  ┌──────────────┐  ┌────────▼────────┐  ┌───────────────────────┐   │
//! │  │ SpecDocument │  │  BundleBuilder  │  │ RuntimeAdaptor        │   │
//! │  │ config.json  │  │ config.json     │  │ runc │ crun │ youki   │   │
//! │  │ runtime.json │  │ runtime.json    │  │ stdout+stderr capture │   │
//! │  └──────────────┘  │ rootfs/         │  └───────────────────────┘   │
//! │                    └─────────────────┘                              │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  Validator (static): bundle_valid │ config_valid │ runtime_valid    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Verdicts
//!
//! | Verdict       | Meaning                                            |
//! |---------------|----------------------------------------------------|
//! | `PASSED`      | runtime ran and printed the expected value         |
//! | `FAILED`      | runtime ran and printed something else             |
//! | `UNSUPPORTED` | runtime failed to launch or exited non-zero        |
//! | `ERROR`       | the harness itself failed (bundle, serialization)  |
//!
//! # Execution Model
//!
//! Runs are single-threaded and sequential. Each case owns its bundle and
//! the runtime invocation until the runtime exits; there is no timeout, so
//! a hung runtime blocks the run.
//!
//! # Example
//!
//! ```rust,ignore
//! use oct::{BundleBuilder, HarnessConfig, Manager, RuntimeRegistry, TestContext};
//!
//! fn main() -> oct::Result<()> {
//!     let config = HarnessConfig::from_env()?;
//!     let runtime = RuntimeRegistry::new().resolve(&config)?;
//!     let builder = config.bundle_builder()?;
//!
//!     let mut manager = Manager::new();
//!     oct::suites::register_all(&mut manager);
//!
//!     let ctx = TestContext::new(runtime.as_ref(), &builder);
//!     println!("{}", manager.run_all(&ctx));
//!     Ok(())
//! }
//! ```

pub mod bundle;
pub mod config;
pub mod constants;
pub mod error;
pub mod manager;
pub mod platform;
pub mod runtime;
pub mod spec;
pub mod suites;
pub mod testcase;
pub mod validator;

pub mod runtimes;

// Re-exports
pub use bundle::{Bundle, BundleBuilder};
pub use config::HarnessConfig;
pub use error::{Error, Result};
pub use manager::{CaseReport, Manager, RunReport, SuiteReport, Summary};
pub use platform::{Arch, Os, Platform};
pub use runtime::RuntimeAdaptor;
pub use runtimes::{ProcessRuntime, RuntimeRegistry};
pub use spec::{Mount, Namespace, NamespaceType, Rlimit, SpecDocument};
pub use testcase::{Outcome, TestCase, TestContext, TestSuite, Verdict};
pub use validator::{Validation, bundle_valid, config_valid, runtime_valid};
