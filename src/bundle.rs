//! Bundle building.
//!
//! Materializes a [`SpecDocument`] as an on-disk bundle (`config.json`,
//! `runtime.json`, rootfs) that a runtime under test can be pointed at.
//! Every build gets a fresh, uniquely named directory under the builder's
//! base directory; bundles are never reused between test cases.

use crate::constants::{CONFIG_FILE, DEFAULT_WORK_SUBDIR, RUNTIME_FILE};
use crate::error::{Error, Result};
use crate::spec::SpecDocument;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A built bundle ready for execution.
#[derive(Debug, Clone)]
pub struct Bundle {
    /// Path to bundle directory.
    path: PathBuf,
    /// Path to rootfs (inside the bundle unless a shared rootfs was used).
    rootfs: PathBuf,
}

impl Bundle {
    /// Returns the bundle path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the rootfs path.
    pub fn rootfs(&self) -> &Path {
        &self.rootfs
    }

    /// Returns the path of `config.json`.
    pub fn config_path(&self) -> PathBuf {
        self.path.join(CONFIG_FILE)
    }

    /// Returns the path of `runtime.json`.
    pub fn runtime_path(&self) -> PathBuf {
        self.path.join(RUNTIME_FILE)
    }

    /// Removes the bundle directory.
    ///
    /// A shared rootfs outside the bundle is left alone.
    pub fn remove(self) -> Result<()> {
        fs::remove_dir_all(&self.path)?;
        debug!("Removed bundle: {}", self.path.display());
        Ok(())
    }
}

/// Resolves `root_path` against `bundle_dir`. Absolute paths are kept.
pub fn resolve_rootfs(bundle_dir: &Path, root_path: &str) -> PathBuf {
    bundle_dir.join(root_path)
}

// =============================================================================
// Bundle Builder
// =============================================================================

/// Builder for test bundles.
#[derive(Debug, Clone)]
pub struct BundleBuilder {
    /// Base directory for bundles.
    base_dir: PathBuf,
    /// Prepared root filesystem shared by every bundle.
    rootfs_source: Option<PathBuf>,
}

impl BundleBuilder {
    /// Creates a bundle builder under the default work directory.
    pub fn new() -> Result<Self> {
        Self::with_path(Self::default_path())
    }

    /// Creates a bundle builder with a specific base path.
    pub fn with_path(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir).map_err(|e| Error::BundleBuildFailed(e.to_string()))?;
        Ok(Self {
            base_dir,
            rootfs_source: None,
        })
    }

    /// Uses a prepared root filesystem for every bundle instead of an
    /// empty per-bundle directory.
    pub fn with_rootfs(mut self, source: impl Into<PathBuf>) -> Self {
        self.rootfs_source = Some(source.into());
        self
    }

    /// Returns the default work directory.
    pub fn default_path() -> PathBuf {
        std::env::temp_dir().join(DEFAULT_WORK_SUBDIR)
    }

    /// Returns the base directory bundles are created under.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Builds a fresh bundle for `spec`.
    ///
    /// With a shared rootfs the written `root.path` is rewritten to its
    /// absolute location; otherwise the root path named by the document is
    /// created (empty) inside the bundle. The rootfs is checked to exist
    /// before anything is handed to a runtime. A failed build leaves
    /// nothing behind under the base directory.
    pub fn build(&self, spec: &SpecDocument) -> Result<Bundle> {
        if spec.config.process.terminal {
            return Err(Error::BundleBuildFailed(
                "process.terminal must be false when output is captured".to_string(),
            ));
        }

        let bundle_dir = self.bundle_path_unique();
        fs::create_dir_all(&bundle_dir)
            .map_err(|e| Error::BundleBuildFailed(format!("failed to create bundle: {}", e)))?;

        let rootfs = self.populate(spec, &bundle_dir).inspect_err(|_| {
            if let Err(e) = fs::remove_dir_all(&bundle_dir) {
                warn!(
                    "Failed to remove incomplete bundle {}: {}",
                    bundle_dir.display(),
                    e
                );
            }
        })?;

        info!("Built bundle: {}", bundle_dir.display());

        Ok(Bundle {
            path: bundle_dir,
            rootfs,
        })
    }

    /// Places the rootfs and writes both documents into `bundle_dir`.
    fn populate(&self, spec: &SpecDocument, bundle_dir: &Path) -> Result<PathBuf> {
        let mut spec = spec.clone();
        let rootfs = match &self.rootfs_source {
            Some(source) => {
                let source = fs::canonicalize(source).map_err(|e| Error::InvalidBundle {
                    path: source.clone(),
                    reason: format!("rootfs not accessible: {}", e),
                })?;
                spec.set_root_path(source.to_string_lossy());
                source
            }
            None => {
                let rootfs = resolve_rootfs(bundle_dir, &spec.config.root.path);
                if !Path::new(&spec.config.root.path).is_absolute() {
                    fs::create_dir_all(&rootfs).map_err(|e| {
                        Error::BundleBuildFailed(format!("failed to create rootfs: {}", e))
                    })?;
                }
                rootfs
            }
        };

        if !rootfs.is_dir() {
            return Err(Error::InvalidBundle {
                path: bundle_dir.to_path_buf(),
                reason: format!("rootfs {} is not a directory", rootfs.display()),
            });
        }

        spec.write_to(bundle_dir)?;
        Ok(rootfs)
    }

    /// Returns a unique bundle path.
    fn bundle_path_unique(&self) -> PathBuf {
        let unique_id = uuid::Uuid::now_v7();
        self.base_dir.join(format!("bundle-{}", unique_id))
    }
}
