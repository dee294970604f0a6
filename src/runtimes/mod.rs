//! Runtime adaptor implementations.
//!
//! Every supported runtime is a variant registered by name; which one a
//! run targets is chosen by configuration, never hardcoded.

pub mod process;

pub use self::process::ProcessRuntime;

use crate::config::HarnessConfig;
use crate::error::{Error, Result};
use crate::runtime::RuntimeAdaptor;
use std::sync::Arc;
use tracing::debug;

/// Registry of runtime adaptors, keyed by name.
pub struct RuntimeRegistry {
    runtimes: Vec<Arc<dyn RuntimeAdaptor>>,
}

impl RuntimeRegistry {
    /// Creates a registry holding the built-in runtimes.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(ProcessRuntime::runc()));
        registry.register(Arc::new(ProcessRuntime::crun()));
        registry.register(Arc::new(ProcessRuntime::youki()));
        registry
    }

    /// Creates a registry with no runtimes.
    pub fn empty() -> Self {
        Self {
            runtimes: Vec::new(),
        }
    }

    /// Registers a runtime, replacing any runtime with the same name.
    pub fn register(&mut self, runtime: Arc<dyn RuntimeAdaptor>) {
        self.runtimes.retain(|r| r.name() != runtime.name());
        self.runtimes.push(runtime);
    }

    /// Returns the names of all registered runtimes.
    pub fn names(&self) -> Vec<&str> {
        self.runtimes.iter().map(|r| r.name()).collect()
    }

    /// Gets a runtime by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn RuntimeAdaptor>> {
        self.runtimes.iter().find(|r| r.name() == name).cloned()
    }

    /// Returns the runtime selected by `config`.
    ///
    /// When `runtime_path` is set the built-in variant of that name is
    /// used with its executable replaced.
    pub fn resolve(&self, config: &HarnessConfig) -> Result<Arc<dyn RuntimeAdaptor>> {
        if let Some(path) = &config.runtime_path {
            let runtime = ProcessRuntime::known(&config.runtime)
                .ok_or_else(|| Error::RuntimeNotFound(config.runtime.clone()))?
                .with_program(path);
            debug!(
                "Using runtime {} at {}",
                config.runtime,
                runtime.program().display()
            );
            return Ok(Arc::new(runtime));
        }

        self.get(&config.runtime)
            .ok_or_else(|| Error::RuntimeNotFound(config.runtime.clone()))
    }
}

impl Default for RuntimeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
