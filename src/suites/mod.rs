//! Built-in test suites.
//!
//! Binaries call [`register_all`] once while composing the [`Manager`];
//! nothing registers itself implicitly.

pub mod rlimits;

use crate::manager::Manager;

/// Registers every built-in suite.
pub fn register_all(manager: &mut Manager) {
    manager.register(rlimits::suite());
}
