//! Harness configuration.
//!
//! Settings are layered: built-in defaults, then an optional JSON file,
//! then `OCT_*` environment variables. The binaries apply command-line
//! flags last.

use crate::bundle::BundleBuilder;
use crate::constants::{
    DEFAULT_RUNTIME, ENV_KEEP_BUNDLES, ENV_ROOTFS, ENV_RUNTIME, ENV_RUNTIME_PATH, ENV_WORK_DIR,
};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration of a conformance run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Name of the runtime under test.
    pub runtime: String,
    /// Executable to use instead of the runtime's default.
    pub runtime_path: Option<PathBuf>,
    /// Prepared root filesystem placed in every bundle.
    pub rootfs: Option<PathBuf>,
    /// Directory fresh bundles are created under.
    pub work_dir: PathBuf,
    /// Keep bundles on disk after each case.
    pub keep_bundles: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            runtime: DEFAULT_RUNTIME.to_string(),
            runtime_path: None,
            rootfs: None,
            work_dir: BundleBuilder::default_path(),
            keep_bundles: false,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a JSON file; missing keys take defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config JSON: {}", e)))
    }

    /// Defaults overlaid with the environment.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    /// Overlays values returned by `lookup` for the `OCT_*` keys.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(runtime) = lookup(ENV_RUNTIME).filter(|v| !v.is_empty()) {
            self.runtime = runtime;
        }
        if let Some(path) = lookup(ENV_RUNTIME_PATH).filter(|v| !v.is_empty()) {
            self.runtime_path = Some(PathBuf::from(path));
        }
        if let Some(rootfs) = lookup(ENV_ROOTFS).filter(|v| !v.is_empty()) {
            self.rootfs = Some(PathBuf::from(rootfs));
        }
        if let Some(dir) = lookup(ENV_WORK_DIR).filter(|v| !v.is_empty()) {
            self.work_dir = PathBuf::from(dir);
        }
        if let Some(keep) = lookup(ENV_KEEP_BUNDLES) {
            self.keep_bundles = parse_bool(&keep).ok_or_else(|| {
                Error::Config(format!("{} must be a boolean, got '{}'", ENV_KEEP_BUNDLES, keep))
            })?;
        }
        Ok(self)
    }

    /// Returns a bundle builder for this configuration.
    pub fn bundle_builder(&self) -> Result<BundleBuilder> {
        let builder = BundleBuilder::with_path(self.work_dir.clone())?;
        Ok(match &self.rootfs {
            Some(rootfs) => builder.with_rootfs(rootfs),
            None => builder,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
