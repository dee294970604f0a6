//! Tests for bundle building.
//!
//! Validates BundleBuilder directory handling, the files written for a
//! spec document, and rootfs resolution.

use oct::{BundleBuilder, Error, Rlimit, SpecDocument, bundle_valid};
use std::path::PathBuf;
use tempfile::TempDir;

// =============================================================================
// BundleBuilder Creation Tests
// =============================================================================

#[test]
fn test_bundle_builder_with_custom_path() {
    let temp_dir = TempDir::new().unwrap();
    let builder = BundleBuilder::with_path(temp_dir.path().join("bundles"));
    assert!(builder.is_ok(), "BundleBuilder::with_path() should succeed");
}

#[test]
fn test_bundle_builder_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().join("nested").join("deeply").join("bundles");

    let builder = BundleBuilder::with_path(base.clone()).unwrap();

    assert!(base.is_dir(), "base directory should be created");
    assert_eq!(builder.base_dir(), base.as_path());
}

#[test]
fn test_default_path_under_temp_dir() {
    let path = BundleBuilder::default_path();
    assert!(path.starts_with(std::env::temp_dir()));
    assert!(path.ends_with("oct"));
}

// =============================================================================
// Build Tests
// =============================================================================

#[test]
fn test_build_writes_both_documents() {
    let temp_dir = TempDir::new().unwrap();
    let builder = BundleBuilder::with_path(temp_dir.path().to_path_buf()).unwrap();
    let mut spec = SpecDocument::new();
    spec.set_rlimits(Rlimit::new("NPROC", 10, 20));

    let bundle = builder.build(&spec).unwrap();

    assert!(bundle.config_path().is_file(), "config.json should exist");
    assert!(bundle.runtime_path().is_file(), "runtime.json should exist");
    assert!(bundle.rootfs().is_dir(), "rootfs should exist");
    assert_eq!(bundle.rootfs(), bundle.path().join("rootfs"));
    assert_eq!(SpecDocument::load(bundle.path()).unwrap(), spec);
}

#[test]
fn test_build_creates_fresh_directory_each_time() {
    let temp_dir = TempDir::new().unwrap();
    let builder = BundleBuilder::with_path(temp_dir.path().to_path_buf()).unwrap();
    let spec = SpecDocument::new();

    let first = builder.build(&spec).unwrap();
    let second = builder.build(&spec).unwrap();

    assert_ne!(first.path(), second.path(), "bundles must not be reused");
    assert!(first.path().starts_with(temp_dir.path()));
    assert!(
        first
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("bundle-")
    );
}

#[test]
fn test_built_bundle_passes_validation() {
    let temp_dir = TempDir::new().unwrap();
    let builder = BundleBuilder::with_path(temp_dir.path().to_path_buf()).unwrap();

    let bundle = builder.build(&SpecDocument::new()).unwrap();
    let validation = bundle_valid(bundle.path());

    assert!(validation.is_valid(), "{:?}", validation.diagnostics());
}

#[test]
fn test_build_custom_root_path() {
    let temp_dir = TempDir::new().unwrap();
    let builder = BundleBuilder::with_path(temp_dir.path().to_path_buf()).unwrap();
    let mut spec = SpecDocument::new();
    spec.set_root_path("rootfs_rootconfig");

    let bundle = builder.build(&spec).unwrap();

    assert_eq!(bundle.rootfs(), bundle.path().join("rootfs_rootconfig"));
    assert!(bundle.rootfs().is_dir());
}

#[test]
fn test_build_with_shared_rootfs_uses_absolute_path() {
    let temp_dir = TempDir::new().unwrap();
    let shared = temp_dir.path().join("shared-rootfs");
    std::fs::create_dir_all(shared.join("bin")).unwrap();
    let builder = BundleBuilder::with_path(temp_dir.path().join("bundles"))
        .unwrap()
        .with_rootfs(&shared);

    let bundle = builder.build(&SpecDocument::new()).unwrap();
    let written = SpecDocument::load(bundle.path()).unwrap();

    let root = PathBuf::from(&written.config.root.path);
    assert!(root.is_absolute(), "shared rootfs should be absolute");
    assert_eq!(root, std::fs::canonicalize(&shared).unwrap());
    assert!(
        !bundle.path().join("rootfs").exists(),
        "no per-bundle rootfs should be created"
    );
}

#[test]
fn test_build_does_not_mutate_caller_spec() {
    let temp_dir = TempDir::new().unwrap();
    let shared = temp_dir.path().join("shared-rootfs");
    std::fs::create_dir_all(&shared).unwrap();
    let builder = BundleBuilder::with_path(temp_dir.path().join("bundles"))
        .unwrap()
        .with_rootfs(&shared);
    let spec = SpecDocument::new();

    builder.build(&spec).unwrap();

    assert_eq!(spec.config.root.path, "rootfs");
}

// =============================================================================
// Build Failure Tests
// =============================================================================

#[test]
fn test_build_missing_shared_rootfs_fails() {
    let temp_dir = TempDir::new().unwrap();
    let builder = BundleBuilder::with_path(temp_dir.path().to_path_buf())
        .unwrap()
        .with_rootfs(temp_dir.path().join("missing"));

    let result = builder.build(&SpecDocument::new());

    assert!(
        matches!(result, Err(Error::InvalidBundle { .. })),
        "missing rootfs should be rejected before any runtime runs"
    );
}

#[test]
fn test_build_absolute_root_path_must_exist() {
    let temp_dir = TempDir::new().unwrap();
    let builder = BundleBuilder::with_path(temp_dir.path().join("bundles")).unwrap();
    let mut spec = SpecDocument::new();
    spec.set_root_path(temp_dir.path().join("nowhere").to_string_lossy());

    let result = builder.build(&spec);

    assert!(matches!(result, Err(Error::InvalidBundle { .. })));
}

#[test]
fn test_failed_build_leaves_base_dir_empty() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().join("bundles");
    let builder = BundleBuilder::with_path(base.clone())
        .unwrap()
        .with_rootfs(temp_dir.path().join("missing"));

    for _ in 0..3 {
        assert!(builder.build(&SpecDocument::new()).is_err());
    }

    assert_eq!(
        std::fs::read_dir(&base).unwrap().count(),
        0,
        "failed builds must not leave bundle directories behind"
    );
}

#[test]
fn test_failed_build_with_absolute_root_cleans_up() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().join("bundles");
    let builder = BundleBuilder::with_path(base.clone()).unwrap();
    let mut spec = SpecDocument::new();
    spec.set_root_path(temp_dir.path().join("nowhere").to_string_lossy());

    assert!(builder.build(&spec).is_err());
    assert_eq!(std::fs::read_dir(&base).unwrap().count(), 0);
}

#[test]
fn test_build_rejects_terminal() {
    let temp_dir = TempDir::new().unwrap();
    let builder = BundleBuilder::with_path(temp_dir.path().to_path_buf()).unwrap();
    let mut spec = SpecDocument::new();
    spec.config.process.terminal = true;

    let result = builder.build(&spec);

    assert!(matches!(result, Err(Error::BundleBuildFailed(_))));
}

// =============================================================================
// Removal Tests
// =============================================================================

#[test]
fn test_remove_deletes_bundle_but_not_shared_rootfs() {
    let temp_dir = TempDir::new().unwrap();
    let shared = temp_dir.path().join("shared-rootfs");
    std::fs::create_dir_all(&shared).unwrap();
    let builder = BundleBuilder::with_path(temp_dir.path().join("bundles"))
        .unwrap()
        .with_rootfs(&shared);

    let bundle = builder.build(&SpecDocument::new()).unwrap();
    let path = bundle.path().to_path_buf();
    bundle.remove().unwrap();

    assert!(!path.exists(), "bundle directory should be removed");
    assert!(shared.is_dir(), "shared rootfs must survive");
}
