//! Runtime adaptor trait.
//!
//! A runtime adaptor launches the runtime under test against a bundle and
//! hands back everything it printed. It is deliberately narrow:
//!
//! - `start`: run the bundle to completion and capture combined output
//! - `stop`: terminate a tracked instance (no instances are tracked yet)
//!
//! # Failure Semantics
//!
//! A runtime that cannot be spawned and a workload that exits non-zero
//! inside the container both surface as [`Error::RuntimeFailed`]. The
//! adaptor has no way to tell them apart; the calling test case decides
//! what the failure means.
//!
//! # Blocking
//!
//! `start` blocks until the runtime exits. There is no timeout, so a hung
//! runtime blocks the whole run.
//!
//! [`Error::RuntimeFailed`]: crate::error::Error::RuntimeFailed

use crate::error::Result;
use std::path::Path;

/// Runtime under test.
///
/// # Implementations
///
/// - `ProcessRuntime`: any runtime driven through its command-line
///   interface (`runc`, `crun`, `youki`, or a custom command)
pub trait RuntimeAdaptor: Send + Sync {
    /// Returns the runtime name.
    fn name(&self) -> &str;

    /// Runs the bundle at `bundle` and returns combined stdout and stderr.
    ///
    /// The runtime is started with `bundle` as its working directory and
    /// inherits the harness's stdin. On spawn failure or non-zero exit the
    /// error carries the captured output followed by the OS error text.
    fn start(&self, bundle: &Path) -> Result<String>;

    /// Stops a running instance.
    ///
    /// No long-lived instances are tracked, so this does nothing.
    fn stop(&self, id: &str) -> Result<()> {
        let _ = id;
        Ok(())
    }
}
