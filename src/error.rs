//! Error types for the conformance harness.

use std::path::PathBuf;

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building bundles, invoking runtimes or
/// driving test suites.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Bundle Errors
    // =========================================================================
    /// Invalid bundle (missing config.json, runtime.json or rootfs).
    #[error("invalid bundle at {path}: {reason}")]
    InvalidBundle { path: PathBuf, reason: String },

    /// Failed to build bundle.
    #[error("failed to build bundle: {0}")]
    BundleBuildFailed(String),

    /// Spec document could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    // =========================================================================
    // Runtime Errors
    // =========================================================================
    /// The runtime under test failed to launch or exited non-zero.
    ///
    /// Displays as the captured output immediately followed by the
    /// underlying OS error text, so callers can match on either.
    #[error("{output}{reason}")]
    RuntimeFailed {
        runtime: String,
        output: String,
        reason: String,
    },

    /// No runtime registered under the requested name.
    #[error("runtime not found: {0}")]
    RuntimeNotFound(String),

    // =========================================================================
    // Suite Errors
    // =========================================================================
    /// No suite registered under the requested name.
    #[error("test suite not found: {0}")]
    SuiteNotFound(String),

    /// No case registered under the requested name within a suite.
    #[error("test case '{case}' not found in suite '{suite}'")]
    CaseNotFound { suite: String, case: String },

    /// A test case panicked instead of returning.
    #[error("test case '{case}' panicked: {message}")]
    CasePanicked { case: String, message: String },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Harness configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the output captured from the runtime, if this error carries any.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::RuntimeFailed { output, .. } => Some(output),
            _ => None,
        }
    }

    /// Returns true if this error came from invoking the runtime under test.
    pub fn is_runtime_failure(&self) -> bool {
        matches!(self, Self::RuntimeFailed { .. })
    }
}
