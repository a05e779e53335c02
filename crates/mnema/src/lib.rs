//! Public SDK surface for Mnema.
//!
//! This crate re-exports the core building blocks and provides small
//! initialization helpers to keep consumer setup consistent.

use directories::UserDirs;
use std::path::PathBuf;

/// Re-export for convenience.
pub use mnema_config as config;
pub use mnema_core as core;
/// Re-export for convenience.
pub use mnema_memory as memory;
/// Re-export for convenience.
pub use mnema_protocol as protocol;
/// Re-export for convenience.
pub use mnema_tools as tools;

/// Directory under the home directory holding persisted stores.
const DEFAULT_DATA_DIR: &str = ".mnema";

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
///
/// This is a no-op if the feature is not enabled. Binaries are still expected
/// to call this early in startup to ensure log output is wired up.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::try_init();
    }
}

/// Default data directory for file-backed stores (`~/.mnema`).
///
/// Falls back to a relative `.mnema` when no home directory is known.
pub fn default_data_dir() -> PathBuf {
    UserDirs::new()
        .map(|dirs| dirs.home_dir().join(DEFAULT_DATA_DIR))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

#[cfg(test)]
mod tests {
    use super::{default_data_dir, init_logging};

    #[test]
    fn init_logging_can_run_twice() {
        init_logging();
        init_logging();
    }

    #[test]
    fn data_dir_ends_with_mnema() {
        assert!(default_data_dir().ends_with(".mnema"));
    }
}
