use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static STAGE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write bytes to `path` so that readers never observe a partial file.
///
/// The lock file, the manifest, and cached tarballs all go through here:
/// the bytes are staged as a `.part` file in the destination's directory
/// (staging elsewhere could put the final rename across filesystems) and
/// renamed into place only after a full flush. Interrupting the process
/// leaves either the old file or the new one under the final name.
///
/// # Errors
/// Returns an error if staging, flushing, or the rename fails.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let staged = stage_path(path);

    if let Err(e) = write_flushed(&staged, bytes) {
        let _ = fs::remove_file(&staged);
        return Err(e);
    }

    match fs::rename(&staged, path) {
        Ok(()) => Ok(()),
        Err(e) => {
            // Windows refuses to rename over an existing destination;
            // retry once with it out of the way.
            let retried = cfg!(windows)
                && fs::remove_file(path).is_ok()
                && fs::rename(&staged, path).is_ok();
            if retried {
                Ok(())
            } else {
                let _ = fs::remove_file(&staged);
                Err(e)
            }
        }
    }
}

/// Staging name beside the destination: `<file>.<pid>.<seq>.part`.
///
/// The pid+sequence pair keeps concurrent writers of *different* files in
/// one directory (e.g. tarballs landing in the cache) from colliding.
fn stage_path(path: &Path) -> PathBuf {
    let seq = STAGE_COUNTER.fetch_add(1, Ordering::Relaxed);
    let pid = std::process::id();
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("staged");
    path.with_file_name(format!("{file_name}.{pid}.{seq}.part"))
}

fn write_flushed(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}
