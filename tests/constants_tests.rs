//! Tests for constants module.
//!
//! Validates that the advertised names and bounds agree with the types
//! that consume them.

use oct::constants::*;
use oct::spec::NamespaceType;

// =============================================================================
// Spec Constant Tests
// =============================================================================

#[test]
fn test_every_namespace_type_parses() {
    for name in NAMESPACE_TYPES {
        assert!(
            NamespaceType::parse(name).is_some(),
            "{} should be a known namespace type",
            name
        );
    }
}

#[test]
fn test_swappiness_bounds() {
    assert_eq!(SWAPPINESS_UNSET, -1, "-1 means leave the kernel default");
    assert!(MAX_SWAPPINESS > SWAPPINESS_UNSET);
}

#[test]
fn test_document_file_names() {
    assert_eq!(CONFIG_FILE, "config.json");
    assert_eq!(RUNTIME_FILE, "runtime.json");
    assert_eq!(DEFAULT_ROOTFS, "rootfs");
}

// =============================================================================
// Environment Tests
// =============================================================================

#[test]
fn test_env_names_share_prefix() {
    for name in [
        ENV_RUNTIME,
        ENV_RUNTIME_PATH,
        ENV_ROOTFS,
        ENV_WORK_DIR,
        ENV_KEEP_BUNDLES,
    ] {
        assert!(name.starts_with("OCT_"), "{} should use the OCT_ prefix", name);
    }
}
