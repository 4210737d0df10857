//! Lock file persistence.
//!
//! The lock file is the dependency graph from the last successful install,
//! serialized as pretty-printed JSON (2-space indent). The top-level shape
//! is the graph's flat identifier map; key order is the map's sorted order,
//! so repeated writes of the same graph are byte-identical.

use std::fs;
use std::io;
use std::path::Path;

use super::error::PkgError;
use super::graph::DependencyGraph;

/// Lock file name.
pub const LOCKFILE_NAME: &str = "package-lock.json";

/// Read the lock file; a missing file reports absence, not an error.
///
/// # Errors
/// Returns a lock error if the file exists but does not parse.
pub fn read(path: &Path) -> Result<Option<DependencyGraph>, PkgError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PkgError::fs(format!("Failed to read lock file: {e}"))),
    };

    let graph = serde_json::from_str(&content)
        .map_err(|e| PkgError::lock_invalid(format!("Invalid lock file JSON: {e}")))?;

    Ok(Some(graph))
}

/// Write the graph as the lock file, atomically.
pub fn write(path: &Path, graph: &DependencyGraph) -> Result<(), PkgError> {
    let mut content = serde_json::to_string_pretty(graph)
        .map_err(|e| PkgError::lock_invalid(format!("Failed to serialize lock file: {e}")))?;
    content.push('\n');

    sprig_util::fs::atomic_write(path, content.as_bytes())
        .map_err(|e| PkgError::fs(format!("Failed to write lock file: {e}")))?;

    Ok(())
}
