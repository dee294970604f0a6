//! Spec document model.
//!
//! A bundle is described by two documents:
//!
//! - `config.json` ([`ConfigSpec`]): version, platform, root, process and
//!   the ordered mount points.
//! - `runtime.json` ([`RuntimeSpec`]): mount definitions keyed by name and
//!   the Linux block (namespaces, resources, rlimits).
//!
//! [`SpecDocument`] pairs the two and offers a minimal valid default plus
//! destructive mutators. Every test case starts from its own
//! [`SpecDocument::new`]; documents are plain values and never shared.
//!
//! ```text
//! config.json                          runtime.json
//! ┌────────────────────────────┐       ┌──────────────────────────────────┐
//! │ mounts: [{name, path}] ────┼─name─►│ mounts: {name: {type, source}}   │
//! │ root:   {path, readonly}   │       │ linux:  {namespaces, resources,  │
//! │ process:{terminal,user,args}│      │          rlimits}                │
//! └────────────────────────────┘       └──────────────────────────────────┘
//! ```
//!
//! Serialization is deterministic: struct fields serialize in declaration
//! order and the named-mount map is a `BTreeMap`.

use crate::constants::{
    CONFIG_FILE, DEFAULT_ROOTFS, RLIMIT_PREFIX, RUNTIME_FILE, SPEC_VERSION, SWAPPINESS_UNSET,
};
use crate::error::{Error, Result};
use crate::platform::Platform;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

// =============================================================================
// config.json
// =============================================================================

/// Contents of `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSpec {
    pub version: String,
    pub platform: PlatformSpec,
    pub root: Root,
    pub process: Process,
    #[serde(default)]
    pub mounts: Vec<MountPoint>,
}

/// Platform the bundle targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformSpec {
    pub os: String,
    pub arch: String,
}

impl From<Platform> for PlatformSpec {
    fn from(platform: Platform) -> Self {
        Self {
            os: platform.os.as_str().to_string(),
            arch: platform.arch.as_str().to_string(),
        }
    }
}

/// Root filesystem, relative to the bundle unless absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Root {
    pub path: String,
    #[serde(default)]
    pub readonly: bool,
}

/// Container process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    #[serde(default)]
    pub terminal: bool,
    #[serde(default)]
    pub user: User,
    pub args: Vec<String>,
}

/// User the process runs as.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: u32,
    pub gid: u32,
    #[serde(
        rename = "additionalGids",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub additional_gids: Vec<u32>,
}

/// A named mount point. The definition lives in `runtime.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountPoint {
    pub name: String,
    pub path: String,
}

// =============================================================================
// runtime.json
// =============================================================================

/// Contents of `runtime.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSpec {
    #[serde(default)]
    pub mounts: BTreeMap<String, MountSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linux: Option<LinuxRuntime>,
}

/// Mount definition referenced by a [`MountPoint`] name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountSource {
    #[serde(rename = "type")]
    pub mount_type: String,
    pub source: String,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Linux-specific runtime settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinuxRuntime {
    #[serde(default)]
    pub namespaces: Vec<Namespace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Resources>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rlimits: Vec<Rlimit>,
}

/// Namespace the container is placed in.
///
/// An empty `path` creates a new namespace; otherwise the container joins
/// the namespace at that path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    #[serde(rename = "type")]
    pub ns_type: NamespaceType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
}

impl Namespace {
    /// A new, anonymous namespace of the given type.
    pub fn new(ns_type: NamespaceType) -> Self {
        Self {
            ns_type,
            path: String::new(),
        }
    }

    /// Joins the existing namespace at `path`.
    pub fn join(ns_type: NamespaceType, path: impl Into<String>) -> Self {
        Self {
            ns_type,
            path: path.into(),
        }
    }
}

/// Namespace type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceType {
    Mount,
    Pid,
    #[serde(alias = "net")]
    Network,
    Ipc,
    Uts,
    User,
}

impl NamespaceType {
    /// Parses a namespace type name; `net` is an alias of `network`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mount" => Some(Self::Mount),
            "pid" => Some(Self::Pid),
            "network" | "net" => Some(Self::Network),
            "ipc" => Some(Self::Ipc),
            "uts" => Some(Self::Uts),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

impl fmt::Display for NamespaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mount => "mount",
            Self::Pid => "pid",
            Self::Network => "network",
            Self::Ipc => "ipc",
            Self::Uts => "uts",
            Self::User => "user",
        };
        f.write_str(name)
    }
}

/// Resource controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    pub memory: Memory,
}

/// Memory controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation: Option<i64>,
    /// `-1` leaves the kernel default untouched.
    pub swappiness: i64,
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            limit: None,
            reservation: None,
            swappiness: SWAPPINESS_UNSET,
        }
    }
}

/// A process resource limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rlimit {
    /// Limit name, e.g. `RLIMIT_NPROC`.
    #[serde(rename = "type")]
    pub rlimit_type: String,
    pub soft: u64,
    pub hard: u64,
}

impl Rlimit {
    /// Creates an rlimit; a bare name such as `NPROC` gets the `RLIMIT_` prefix.
    pub fn new(rlimit_type: &str, soft: u64, hard: u64) -> Self {
        let rlimit_type = if rlimit_type.starts_with(RLIMIT_PREFIX) {
            rlimit_type.to_string()
        } else {
            format!("{}{}", RLIMIT_PREFIX, rlimit_type)
        };
        Self {
            rlimit_type,
            soft,
            hard,
        }
    }
}

/// A mount with its point and definition joined together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub mount_type: String,
    pub source: String,
    pub destination: String,
    pub options: Vec<String>,
}

// =============================================================================
// SpecDocument
// =============================================================================

/// The pair of documents describing one bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecDocument {
    pub config: ConfigSpec,
    pub runtime: RuntimeSpec,
}

impl SpecDocument {
    /// Creates a minimal valid document for the host platform.
    pub fn new() -> Self {
        Self::for_platform(Platform::detect())
    }

    /// Creates a minimal valid document for `platform`.
    ///
    /// Root is `rootfs` and read-only, the process has no terminal and runs
    /// as uid/gid 0, `proc` is mounted at `/proc`, swappiness is unset and
    /// a single new mount namespace is requested.
    pub fn for_platform(platform: Platform) -> Self {
        let config = ConfigSpec {
            version: SPEC_VERSION.to_string(),
            platform: platform.into(),
            root: Root {
                path: DEFAULT_ROOTFS.to_string(),
                readonly: true,
            },
            process: Process {
                terminal: false,
                user: User::default(),
                args: vec!["sh".to_string()],
            },
            mounts: vec![MountPoint {
                name: "proc".to_string(),
                path: "/proc".to_string(),
            }],
        };

        let mut mounts = BTreeMap::new();
        mounts.insert(
            "proc".to_string(),
            MountSource {
                mount_type: "proc".to_string(),
                source: "proc".to_string(),
                options: Vec::new(),
            },
        );

        let runtime = RuntimeSpec {
            mounts,
            linux: Some(LinuxRuntime {
                namespaces: vec![Namespace::new(NamespaceType::Mount)],
                resources: Some(Resources {
                    memory: Memory::default(),
                }),
                rlimits: Vec::new(),
            }),
        };

        Self { config, runtime }
    }

    // =========================================================================
    // Mutators
    // =========================================================================

    /// Replaces the rlimits with exactly `rlimit`.
    pub fn set_rlimits(&mut self, rlimit: Rlimit) -> &mut Self {
        self.linux_mut().rlimits = vec![rlimit];
        self
    }

    /// Replaces the process arguments.
    pub fn set_args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.process.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Points the root at `path` (relative to the bundle unless absolute).
    pub fn set_root_path(&mut self, path: impl Into<String>) -> &mut Self {
        self.config.root.path = path.into();
        self
    }

    /// Sets the process user.
    pub fn set_user(&mut self, uid: u32, gid: u32, additional_gids: Vec<u32>) -> &mut Self {
        self.config.process.user = User {
            uid,
            gid,
            additional_gids,
        };
        self
    }

    /// Sets memory swappiness; [`SWAPPINESS_UNSET`] clears it.
    pub fn set_swappiness(&mut self, swappiness: i64) -> &mut Self {
        self.linux_mut()
            .resources
            .get_or_insert_with(|| Resources {
                memory: Memory::default(),
            })
            .memory
            .swappiness = swappiness;
        self
    }

    /// Adds a namespace, replacing any existing entry of the same type.
    pub fn add_namespace(&mut self, namespace: Namespace) -> &mut Self {
        let namespaces = &mut self.linux_mut().namespaces;
        match namespaces.iter_mut().find(|ns| ns.ns_type == namespace.ns_type) {
            Some(existing) => *existing = namespace,
            None => namespaces.push(namespace),
        }
        self
    }

    /// Adds a named mount after the existing ones.
    ///
    /// A mount with the same name is replaced in place, keeping its
    /// position in the mount order.
    pub fn add_mount(&mut self, name: impl Into<String>, mount: Mount) -> &mut Self {
        let name = name.into();
        match self.config.mounts.iter_mut().find(|mp| mp.name == name) {
            Some(point) => point.path = mount.destination.clone(),
            None => self.config.mounts.push(MountPoint {
                name: name.clone(),
                path: mount.destination.clone(),
            }),
        }
        self.runtime.mounts.insert(
            name,
            MountSource {
                mount_type: mount.mount_type,
                source: mount.source,
                options: mount.options,
            },
        );
        self
    }

    fn linux_mut(&mut self) -> &mut LinuxRuntime {
        self.runtime.linux.get_or_insert_with(LinuxRuntime::default)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the mounts in application order.
    ///
    /// Mount points without a definition in `runtime.json` are skipped.
    pub fn mounts(&self) -> Vec<Mount> {
        self.config
            .mounts
            .iter()
            .filter_map(|point| {
                self.runtime.mounts.get(&point.name).map(|source| Mount {
                    mount_type: source.mount_type.clone(),
                    source: source.source.clone(),
                    destination: point.path.clone(),
                    options: source.options.clone(),
                })
            })
            .collect()
    }

    /// Returns the namespaces, empty when there is no Linux block.
    pub fn namespaces(&self) -> &[Namespace] {
        self.runtime
            .linux
            .as_ref()
            .map(|linux| linux.namespaces.as_slice())
            .unwrap_or(&[])
    }

    /// Returns the rlimits as they will be serialized.
    ///
    /// When a type appears more than once the last entry wins and takes
    /// the position of that last occurrence.
    pub fn rlimits(&self) -> Vec<Rlimit> {
        let entries = self
            .runtime
            .linux
            .as_ref()
            .map(|linux| linux.rlimits.as_slice())
            .unwrap_or(&[]);
        let mut out: Vec<Rlimit> = Vec::with_capacity(entries.len());
        for entry in entries {
            out.retain(|r| r.rlimit_type != entry.rlimit_type);
            out.push(entry.clone());
        }
        out
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    /// Serializes `config.json`.
    pub fn config_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.config)
            .map_err(|e| Error::Serialization(format!("{}: {}", CONFIG_FILE, e)))
    }

    /// Serializes `runtime.json` with duplicate rlimits collapsed.
    pub fn runtime_json(&self) -> Result<String> {
        let mut runtime = self.runtime.clone();
        if let Some(linux) = runtime.linux.as_mut() {
            linux.rlimits = self.rlimits();
        }
        serde_json::to_string_pretty(&runtime)
            .map_err(|e| Error::Serialization(format!("{}: {}", RUNTIME_FILE, e)))
    }

    /// Parses a document from the contents of both files.
    pub fn from_json(config: &str, runtime: &str) -> Result<Self> {
        Ok(Self {
            config: serde_json::from_str(config)?,
            runtime: serde_json::from_str(runtime)?,
        })
    }

    /// Writes `config.json` and `runtime.json` into `dir`, replacing any
    /// existing files.
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        let config = self.config_json()?;
        let runtime = self.runtime_json()?;

        fs::write(dir.join(CONFIG_FILE), config).map_err(|e| {
            Error::BundleBuildFailed(format!("failed to write {}: {}", CONFIG_FILE, e))
        })?;
        fs::write(dir.join(RUNTIME_FILE), runtime).map_err(|e| {
            Error::BundleBuildFailed(format!("failed to write {}: {}", RUNTIME_FILE, e))
        })?;

        debug!("Wrote spec documents to {}", dir.display());
        Ok(())
    }

    /// Loads both documents from `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let config = fs::read_to_string(dir.join(CONFIG_FILE))?;
        let runtime = fs::read_to_string(dir.join(RUNTIME_FILE))?;
        Self::from_json(&config, &runtime)
    }
}

impl Default for SpecDocument {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rlimit_prefix() {
        assert_eq!(Rlimit::new("NPROC", 10, 20).rlimit_type, "RLIMIT_NPROC");
        assert_eq!(Rlimit::new("RLIMIT_NOFILE", 1, 2).rlimit_type, "RLIMIT_NOFILE");
    }

    #[test]
    fn test_namespace_net_alias() {
        let ns: Namespace = serde_json::from_str(r#"{"type":"net"}"#).unwrap();
        assert_eq!(ns.ns_type, NamespaceType::Network);
        assert!(ns.path.is_empty());
    }

    #[test]
    fn test_rlimits_last_wins() {
        let mut doc = SpecDocument::new();
        doc.linux_mut().rlimits = vec![
            Rlimit::new("NPROC", 1, 1),
            Rlimit::new("NOFILE", 5, 5),
            Rlimit::new("NPROC", 2, 2),
        ];

        let rlimits = doc.rlimits();
        assert_eq!(rlimits.len(), 2);
        assert_eq!(rlimits[0].rlimit_type, "RLIMIT_NOFILE");
        assert_eq!(rlimits[1], Rlimit::new("NPROC", 2, 2));
    }
}
