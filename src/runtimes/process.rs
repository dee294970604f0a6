//! # Process Runtime - Command-Line Driven Runtimes
//!
//! Implements [`RuntimeAdaptor`] by spawning a runtime executable, the way
//! an operator would from a shell, with the bundle as working directory.
//!
//! ## Variants
//!
//! | Runtime | Invocation                  |
//! |---------|-----------------------------|
//! | runc    | `runc start`                |
//! | crun    | `crun run <container-id>`   |
//! | youki   | `youki run <container-id>`  |
//!
//! Arguments are a template: `{id}` is replaced with a freshly generated
//! container id for every start. Any other command can be wrapped with
//! [`ProcessRuntime::new`].
//!
//! ## Output Capture
//!
//! Stdout and stderr share one pipe so the captured text keeps the order
//! the runtime wrote it in. Stdin is inherited so interactive probes in
//! the container can still be driven.
//!
//! [`RuntimeAdaptor`]: crate::runtime::RuntimeAdaptor

use crate::constants::CONTAINER_ID_PREFIX;
use crate::error::{Error, Result};
use crate::runtime::RuntimeAdaptor;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use tracing::{debug, info};

/// Placeholder replaced by the generated container id.
const ID_PLACEHOLDER: &str = "{id}";

/// A runtime driven through its command-line interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRuntime {
    name: String,
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessRuntime {
    /// Creates a runtime that runs `program` with `args`.
    pub fn new<I, S>(name: impl Into<String>, program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `runc start`, with the bundle as working directory.
    pub fn runc() -> Self {
        Self::new("runc", "runc", ["start"])
    }

    /// `crun run <id>`.
    pub fn crun() -> Self {
        Self::new("crun", "crun", ["run", ID_PLACEHOLDER])
    }

    /// `youki run <id>`.
    pub fn youki() -> Self {
        Self::new("youki", "youki", ["run", ID_PLACEHOLDER])
    }

    /// Returns the built-in variant called `name`.
    pub fn known(name: &str) -> Option<Self> {
        match name {
            "runc" => Some(Self::runc()),
            "crun" => Some(Self::crun()),
            "youki" => Some(Self::youki()),
            _ => None,
        }
    }

    /// Replaces the executable, keeping name and arguments.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Returns the executable.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Returns the arguments with `{id}` substituted.
    pub fn render_args(&self, id: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(ID_PLACEHOLDER, id))
            .collect()
    }

    fn failure(&self, output: String, reason: String) -> Error {
        Error::RuntimeFailed {
            runtime: self.name.clone(),
            output,
            reason,
        }
    }
}

impl RuntimeAdaptor for ProcessRuntime {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self, bundle: &Path) -> Result<String> {
        let id = container_id();
        let args = self.render_args(&id);

        debug!(
            "Launching runtime {} ({} {:?}) in {}",
            self.name,
            self.program.display(),
            args,
            bundle.display()
        );

        let result = run_combined(&self.program, &args, bundle);

        debug!("Command done");

        match result {
            Ok((output, status)) if status.success() => {
                info!("Runtime {} exited successfully", self.name);
                Ok(output)
            }
            Ok((output, status)) => Err(self.failure(output, status.to_string())),
            Err(e) => Err(self.failure(String::new(), e.to_string())),
        }
    }
}

/// Generates a container id unique to this start.
fn container_id() -> String {
    format!("{}-{}", CONTAINER_ID_PREFIX, uuid::Uuid::now_v7().simple())
}

/// Runs `program` in `dir` with stdout and stderr on one pipe.
fn run_combined(
    program: &Path,
    args: &[String],
    dir: &Path,
) -> std::io::Result<(String, ExitStatus)> {
    let (mut reader, writer) = std::io::pipe()?;
    let stderr = writer.try_clone()?;

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::inherit())
        .stdout(writer)
        .stderr(stderr);

    let spawned = command.spawn();
    // The command holds the write ends; they must close for EOF to arrive.
    drop(command);
    let mut child = spawned?;

    let mut buf = Vec::new();
    let read = reader.read_to_end(&mut buf);
    let status = child.wait()?;
    read?;

    Ok((String::from_utf8_lossy(&buf).into_owned(), status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_variants() {
        assert_eq!(ProcessRuntime::known("runc"), Some(ProcessRuntime::runc()));
        assert_eq!(ProcessRuntime::known("crun").unwrap().name(), "crun");
        assert_eq!(ProcessRuntime::known("youki").unwrap().name(), "youki");
        assert!(ProcessRuntime::known("docker").is_none());
    }

    #[test]
    fn test_render_args_substitutes_id() {
        let rt = ProcessRuntime::youki();
        assert_eq!(rt.render_args("abc"), vec!["run", "abc"]);
        assert_eq!(ProcessRuntime::runc().render_args("abc"), vec!["start"]);
    }

    #[test]
    fn test_container_ids_unique() {
        let a = container_id();
        let b = container_id();
        assert_ne!(a, b);
        assert!(a.starts_with("oct-"));
    }
}
