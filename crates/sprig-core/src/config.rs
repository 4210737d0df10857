use std::path::{Path, PathBuf};

use crate::pkg::lockfile::LOCKFILE_NAME;
use crate::pkg::manifest::MANIFEST_NAME;

/// Directory holding the installed package tree.
pub const MODULES_DIR: &str = "node_modules";

/// Directory holding cached tarballs.
pub const CACHE_DIR: &str = ".cache";

/// Runtime configuration for the sprig CLI.
#[derive(Debug, Clone)]
pub struct Config {
    /// Project root (the directory holding `package.json`).
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    /// Path to the project manifest (`package.json`).
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.cwd.join(MANIFEST_NAME)
    }

    /// Path to the lock file (`package-lock.json`).
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.cwd.join(LOCKFILE_NAME)
    }

    /// Path to the installed package tree (`node_modules/`).
    #[must_use]
    pub fn modules_dir(&self) -> PathBuf {
        self.cwd.join(MODULES_DIR)
    }

    /// Path to the tarball cache (`.cache/`).
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.cwd.join(CACHE_DIR)
    }

    /// Project root as a path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.cwd
    }
}
