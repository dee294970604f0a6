//! Structural bundle validation.
//!
//! Three static checks, none of which ever invoke a runtime:
//!
//! - [`bundle_valid`]: `config.json`, `runtime.json` and the rootfs are
//!   present and readable
//! - [`config_valid`]: required `config.json` fields exist and are well typed
//! - [`runtime_valid`]: `runtime.json` is well formed for a target OS
//!
//! Documents are inspected as untyped JSON so that every problem becomes
//! its own diagnostic instead of stopping at the first decode error, and
//! unknown fields are ignored. All checks run to completion; the returned
//! [`Validation`] holds every finding in the order it was made.

use crate::bundle::resolve_rootfs;
use crate::constants::{
    CONFIG_FILE, DEFAULT_ROOTFS, DEFAULT_TARGET_OS, MAX_SWAPPINESS, NAMESPACE_TYPES,
    PRE_DRAFT_VERSION, RLIMIT_PREFIX, RUNTIME_FILE, SWAPPINESS_UNSET,
};
use crate::platform::Os;
use crate::spec::NamespaceType;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

type Object = Map<String, Value>;

/// Outcome of a validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    diagnostics: Vec<String>,
}

impl Validation {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when nothing was found.
    pub fn is_valid(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Findings in the order they were made.
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// Splits into the verdict and the findings.
    pub fn into_parts(self) -> (bool, Vec<String>) {
        (self.is_valid(), self.diagnostics)
    }

    /// True when any finding contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.diagnostics.iter().any(|d| d.contains(needle))
    }

    fn add(&mut self, diagnostic: impl Into<String>) {
        let diagnostic = diagnostic.into();
        debug!("validation: {}", diagnostic);
        self.diagnostics.push(diagnostic);
    }
}

// =============================================================================
// Entry Points
// =============================================================================

/// Checks that the bundle at `path` holds readable `config.json` and
/// `runtime.json` documents and a rootfs directory.
///
/// The rootfs is looked up at `root.path` from `config.json` when that can
/// be read, and at `rootfs` otherwise.
pub fn bundle_valid(path: &Path) -> Validation {
    let mut v = Validation::new();

    if !path.is_dir() {
        v.add(format!("bundle {} is not a directory", path.display()));
        return v;
    }

    let config = read_document(&mut v, &path.join(CONFIG_FILE), CONFIG_FILE);
    read_document(&mut v, &path.join(RUNTIME_FILE), RUNTIME_FILE);

    let root_path = config
        .as_ref()
        .and_then(|c| c.get("root"))
        .and_then(|r| r.get("path"))
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_ROOTFS)
        .to_string();

    let rootfs = resolve_rootfs(path, &root_path);
    if !rootfs.exists() {
        v.add(format!("rootfs '{}' not found in bundle", root_path));
    } else if !rootfs.is_dir() {
        v.add(format!("rootfs '{}' is not a directory", root_path));
    }

    v
}

/// Checks a `config.json` document. `path` may name the file or a bundle.
pub fn config_valid(path: &Path) -> Validation {
    let mut v = Validation::new();
    let path = document_path(path, CONFIG_FILE);

    if let Some(doc) = read_document(&mut v, &path, CONFIG_FILE) {
        check_config(&mut v, &doc);
    }
    v
}

/// Checks a `runtime.json` document for `target_os`. `path` may name the
/// file or a bundle; an empty `target_os` means `linux`.
///
/// Linux targets require a `linux` block declaring a mount namespace.
/// Other targets only get the generic structural checks.
pub fn runtime_valid(path: &Path, target_os: &str) -> Validation {
    let mut v = Validation::new();
    let path = document_path(path, RUNTIME_FILE);
    let target_os = if target_os.trim().is_empty() {
        DEFAULT_TARGET_OS
    } else {
        target_os
    };

    if let Some(doc) = read_document(&mut v, &path, RUNTIME_FILE) {
        check_runtime_mounts(&mut v, &doc);
        if Os::parse(target_os) == Os::Linux {
            check_linux(&mut v, &doc);
        } else {
            debug!("Skipping Linux checks for target OS {}", target_os);
        }
    }
    v
}

// =============================================================================
// Document Loading
// =============================================================================

fn document_path(path: &Path, file: &str) -> PathBuf {
    if path.is_dir() {
        path.join(file)
    } else {
        path.to_path_buf()
    }
}

/// Reads `path` as a JSON object, recording why it could not be.
fn read_document(v: &mut Validation, path: &Path, label: &str) -> Option<Object> {
    if !path.exists() {
        v.add(format!("{} not found at {}", label, path.display()));
        return None;
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            v.add(format!("{} is not readable: {}", label, e));
            return None;
        }
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(doc)) => Some(doc),
        Ok(_) => {
            v.add(format!("{} must contain a JSON object", label));
            None
        }
        Err(e) => {
            v.add(format!("{} is not valid JSON: {}", label, e));
            None
        }
    }
}

// =============================================================================
// config.json
// =============================================================================

fn check_config(v: &mut Validation, doc: &Object) {
    if let Some(version) = require_string(v, doc, "version", "version") {
        if !is_spec_version(version) {
            v.add(format!("version '{}' is not a valid spec version", version));
        }
    }

    if let Some(platform) = require_object(v, doc, "platform", "platform") {
        require_string(v, platform, "os", "platform.os");
        require_string(v, platform, "arch", "platform.arch");
    }

    if let Some(root) = require_object(v, doc, "root", "root") {
        require_string(v, root, "path", "root.path");
        require_bool(v, root, "readonly", "root.readonly");
    }

    if let Some(process) = require_object(v, doc, "process", "process") {
        require_bool(v, process, "terminal", "process.terminal");

        if let Some(user) = require_object(v, process, "user", "process.user") {
            require_uint(v, user, "uid", "process.user.uid");
            require_uint(v, user, "gid", "process.user.gid");
            if let Some(gids) = user.get("additionalGids") {
                match gids {
                    Value::Array(items) => {
                        for (i, gid) in items.iter().enumerate() {
                            if gid.as_u64().is_none() {
                                v.add(format!(
                                    "process.user.additionalGids[{}] must be an unsigned integer",
                                    i
                                ));
                            }
                        }
                    }
                    Value::Null => {}
                    _ => v.add("process.user.additionalGids must be an array"),
                }
            }
        }

        check_args(v, process);
    }

    check_config_mounts(v, doc);
}

fn check_args(v: &mut Validation, process: &Object) {
    match process.get("args") {
        None | Some(Value::Null) => v.add("process.args is required"),
        Some(Value::Array(args)) => {
            if args.is_empty() {
                v.add("process.args must not be empty");
            }
            for (i, arg) in args.iter().enumerate() {
                if !arg.is_string() {
                    v.add(format!("process.args[{}] must be a string", i));
                }
            }
        }
        Some(_) => v.add("process.args must be an array of strings"),
    }
}

/// Mounts are either named points `{name, path}` resolved through
/// `runtime.json`, or full `{type, source, destination}` entries.
fn check_config_mounts(v: &mut Validation, doc: &Object) {
    let mounts = match doc.get("mounts") {
        None | Some(Value::Null) => return,
        Some(Value::Array(mounts)) => mounts,
        Some(_) => {
            v.add("mounts must be an array");
            return;
        }
    };

    for (i, mount) in mounts.iter().enumerate() {
        let label = format!("mounts[{}]", i);
        let Some(mount) = mount.as_object() else {
            v.add(format!("{} must be an object", label));
            continue;
        };

        if mount.contains_key("name") {
            require_string(v, mount, "name", &format!("{}.name", label));
            require_string(v, mount, "path", &format!("{}.path", label));
        } else {
            require_string(v, mount, "type", &format!("{}.type", label));
            require_string(v, mount, "source", &format!("{}.source", label));
            require_string(v, mount, "destination", &format!("{}.destination", label));
        }
    }
}

/// Accepts `pre-draft` and `MAJOR.MINOR.PATCH` with an optional `-suffix`.
fn is_spec_version(version: &str) -> bool {
    if version == PRE_DRAFT_VERSION {
        return true;
    }
    let core = version.split_once('-').map_or(version, |(core, _)| core);
    let parts: Vec<&str> = core.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

// =============================================================================
// runtime.json
// =============================================================================

fn check_runtime_mounts(v: &mut Validation, doc: &Object) {
    let mounts = match doc.get("mounts") {
        None | Some(Value::Null) => return,
        Some(Value::Object(mounts)) => mounts,
        Some(_) => {
            v.add("mounts must be an object keyed by mount name");
            return;
        }
    };

    for (name, mount) in mounts {
        let label = format!("mounts.{}", name);
        let Some(mount) = mount.as_object() else {
            v.add(format!("{} must be an object", label));
            continue;
        };
        require_string(v, mount, "type", &format!("{}.type", label));
        require_string(v, mount, "source", &format!("{}.source", label));
        match mount.get("options") {
            None | Some(Value::Null) => {}
            Some(Value::Array(options)) if options.iter().all(Value::is_string) => {}
            Some(_) => v.add(format!("{}.options must be an array of strings", label)),
        }
    }
}

fn check_linux(v: &mut Validation, doc: &Object) {
    let Some(linux) = require_object(v, doc, "linux", "linux") else {
        return;
    };

    check_namespaces(v, linux);

    if let Some(resources) = optional_object(v, linux, "resources", "linux.resources") {
        if let Some(memory) = optional_object(v, resources, "memory", "linux.resources.memory") {
            if let Some(swappiness) = memory.get("swappiness") {
                match swappiness.as_i64() {
                    Some(s) if (SWAPPINESS_UNSET..=MAX_SWAPPINESS).contains(&s) => {}
                    Some(s) => v.add(format!(
                        "linux.resources.memory.swappiness {} is outside {}..={}",
                        s, SWAPPINESS_UNSET, MAX_SWAPPINESS
                    )),
                    None => v.add("linux.resources.memory.swappiness must be an integer"),
                }
            }
        }
    }

    check_rlimits(v, linux);
}

fn check_namespaces(v: &mut Validation, linux: &Object) {
    let namespaces = match linux.get("namespaces") {
        None | Some(Value::Null) => {
            v.add("linux.namespaces is required");
            return;
        }
        Some(Value::Array(namespaces)) => namespaces,
        Some(_) => {
            v.add("linux.namespaces must be an array");
            return;
        }
    };

    let mut seen = HashSet::new();
    for (i, ns) in namespaces.iter().enumerate() {
        let label = format!("linux.namespaces[{}]", i);
        let Some(ns) = ns.as_object() else {
            v.add(format!("{} must be an object", label));
            continue;
        };

        if let Some(ns_type) = require_string(v, ns, "type", &format!("{}.type", label)) {
            match NamespaceType::parse(ns_type) {
                Some(parsed) => {
                    if !seen.insert(parsed) {
                        v.add(format!(
                            "linux.namespaces declares '{}' more than once",
                            parsed
                        ));
                    }
                }
                None => v.add(format!(
                    "{}.type '{}' is not one of {}",
                    label,
                    ns_type,
                    NAMESPACE_TYPES.join(", ")
                )),
            }
        }

        if ns.get("path").is_some_and(|p| !p.is_string() && !p.is_null()) {
            v.add(format!("{}.path must be a string", label));
        }
    }

    if !seen.contains(&NamespaceType::Mount) {
        v.add("linux.namespaces must include a mount namespace");
    }
}

fn check_rlimits(v: &mut Validation, linux: &Object) {
    let rlimits = match linux.get("rlimits") {
        None | Some(Value::Null) => return,
        Some(Value::Array(rlimits)) => rlimits,
        Some(_) => {
            v.add("linux.rlimits must be an array");
            return;
        }
    };

    for (i, rlimit) in rlimits.iter().enumerate() {
        let label = format!("linux.rlimits[{}]", i);
        let Some(rlimit) = rlimit.as_object() else {
            v.add(format!("{} must be an object", label));
            continue;
        };

        if let Some(rlimit_type) = require_string(v, rlimit, "type", &format!("{}.type", label)) {
            if !rlimit_type.starts_with(RLIMIT_PREFIX) {
                v.add(format!(
                    "{}.type '{}' must start with {}",
                    label, rlimit_type, RLIMIT_PREFIX
                ));
            }
        }

        let soft = require_uint(v, rlimit, "soft", &format!("{}.soft", label));
        let hard = require_uint(v, rlimit, "hard", &format!("{}.hard", label));
        if let (Some(soft), Some(hard)) = (soft, hard) {
            if soft > hard {
                v.add(format!(
                    "{} soft limit {} exceeds hard limit {}",
                    label, soft, hard
                ));
            }
        }
    }
}

// =============================================================================
// Field Helpers
// =============================================================================

fn require_object<'a>(
    v: &mut Validation,
    parent: &'a Object,
    key: &str,
    label: &str,
) -> Option<&'a Object> {
    match parent.get(key) {
        None | Some(Value::Null) => {
            v.add(format!("{} is required", label));
            None
        }
        Some(Value::Object(obj)) => Some(obj),
        Some(_) => {
            v.add(format!("{} must be an object", label));
            None
        }
    }
}

fn optional_object<'a>(
    v: &mut Validation,
    parent: &'a Object,
    key: &str,
    label: &str,
) -> Option<&'a Object> {
    match parent.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Object(obj)) => Some(obj),
        Some(_) => {
            v.add(format!("{} must be an object", label));
            None
        }
    }
}

/// A required, non-empty string.
fn require_string<'a>(
    v: &mut Validation,
    parent: &'a Object,
    key: &str,
    label: &str,
) -> Option<&'a str> {
    match parent.get(key) {
        None | Some(Value::Null) => {
            v.add(format!("{} is required", label));
            None
        }
        Some(Value::String(s)) if s.is_empty() => {
            v.add(format!("{} must not be empty", label));
            None
        }
        Some(Value::String(s)) => Some(s.as_str()),
        Some(_) => {
            v.add(format!("{} must be a string", label));
            None
        }
    }
}

/// A required boolean.
fn require_bool(v: &mut Validation, parent: &Object, key: &str, label: &str) {
    match parent.get(key) {
        None | Some(Value::Null) => v.add(format!("{} is required", label)),
        Some(Value::Bool(_)) => {}
        Some(_) => v.add(format!("{} must be a boolean", label)),
    }
}

/// A required unsigned integer.
fn require_uint(v: &mut Validation, parent: &Object, key: &str, label: &str) -> Option<u64> {
    match parent.get(key) {
        None | Some(Value::Null) => {
            v.add(format!("{} is required", label));
            None
        }
        Some(n) => {
            let value = n.as_u64();
            if value.is_none() {
                v.add(format!("{} must be an unsigned integer", label));
            }
            value
        }
    }
}
