//! # Harness Constants
//!
//! File names, document defaults and configuration keys shared by the spec
//! model, the bundle builder, the validator and the runtime adaptors.
//!
//! ## Cross-References
//!
//! - [`crate::spec`]: Uses the spec version and swappiness sentinel
//! - [`crate::bundle`]: Uses the bundle file names
//! - [`crate::validator`]: Uses the file names and namespace enumeration
//! - [`crate::config`]: Uses the environment variable names

// =============================================================================
// Bundle Layout
// =============================================================================

/// Name of the process/platform/root/mounts document inside a bundle.
pub const CONFIG_FILE: &str = "config.json";

/// Name of the namespaces/resources/rlimits document inside a bundle.
pub const RUNTIME_FILE: &str = "runtime.json";

/// Default root filesystem directory, relative to the bundle.
pub const DEFAULT_ROOTFS: &str = "rootfs";

// =============================================================================
// Spec Defaults
// =============================================================================

/// Spec version written into freshly constructed documents.
pub const SPEC_VERSION: &str = "0.2.0";

/// Pre-release version string accepted by the validator.
pub const PRE_DRAFT_VERSION: &str = "pre-draft";

/// Swappiness value meaning "leave the kernel default alone".
pub const SWAPPINESS_UNSET: i64 = -1;

/// Highest swappiness the kernel accepts.
pub const MAX_SWAPPINESS: i64 = 100;

/// Prefix every rlimit type name carries.
pub const RLIMIT_PREFIX: &str = "RLIMIT_";

/// Namespace type names accepted in `linux.namespaces`.
///
/// `net` is accepted as an alias of `network`.
pub const NAMESPACE_TYPES: &[&str] = &["mount", "pid", "network", "net", "ipc", "uts", "user"];

/// Target OS assumed when runtime validation is given none.
pub const DEFAULT_TARGET_OS: &str = "linux";

// =============================================================================
// Runtime Defaults
// =============================================================================

/// Runtime selected when configuration names none.
pub const DEFAULT_RUNTIME: &str = "runc";

/// Prefix of generated container ids.
pub const CONTAINER_ID_PREFIX: &str = "oct";

/// Subdirectory of the system temp dir used as the default work dir.
pub const DEFAULT_WORK_SUBDIR: &str = "oct";

// =============================================================================
// Configuration Keys
// =============================================================================

/// Environment variable selecting the runtime by name.
pub const ENV_RUNTIME: &str = "OCT_RUNTIME";

/// Environment variable overriding the runtime executable path.
pub const ENV_RUNTIME_PATH: &str = "OCT_RUNTIME_PATH";

/// Environment variable naming a prepared root filesystem.
pub const ENV_ROOTFS: &str = "OCT_ROOTFS";

/// Environment variable overriding the bundle work directory.
pub const ENV_WORK_DIR: &str = "OCT_WORK_DIR";

/// Environment variable keeping bundles on disk after each case.
pub const ENV_KEEP_BUNDLES: &str = "OCT_KEEP_BUNDLES";
