//! Tarball download and extraction.
//!
//! Registry tarballs are gzipped tar archives with a single leading path
//! component (canonically `package/`). Extraction strips that component and
//! lands the contents in the destination directory via a temp-dir swap, so
//! a half-extracted package is never visible under the final path.

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use flate2::read::GzDecoder;
use reqwest::Client;
use tar::Archive;

use super::error::PkgError;

/// Maximum tarball size (200 MB).
pub const MAX_TARBALL_SIZE: u64 = 200 * 1024 * 1024;

/// Download timeout in seconds.
const DOWNLOAD_TIMEOUT_SECS: u64 = 30;

static TMP_EXTRACT_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Download a tarball as raw bytes.
///
/// # Errors
/// Returns a download error if the request fails, returns a non-success
/// status, or the body exceeds the size limit.
pub async fn download_tarball(client: &Client, url: &str) -> Result<Vec<u8>, PkgError> {
    let response = client
        .get(url)
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .send()
        .await
        .map_err(|e| PkgError::download_failed(format!("Failed to download '{url}': {e}")))?;

    if !response.status().is_success() {
        return Err(PkgError::download_failed(format!(
            "Download failed with status {} for '{url}'",
            response.status()
        )));
    }

    if let Some(len) = response.content_length() {
        if len > MAX_TARBALL_SIZE {
            return Err(PkgError::download_failed(format!(
                "Tarball too large: {len} bytes (max: {MAX_TARBALL_SIZE})"
            )));
        }
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| PkgError::download_failed(format!("Failed to read response body: {e}")))?;

    if bytes.len() as u64 > MAX_TARBALL_SIZE {
        return Err(PkgError::download_failed(format!(
            "Tarball too large: {} bytes (max: {MAX_TARBALL_SIZE})",
            bytes.len()
        )));
    }

    Ok(bytes.to_vec())
}

/// Extract a gzipped tarball into `dest`, stripping one leading path
/// component from every entry.
///
/// An existing `dest` is replaced wholesale, so upgraded packages never
/// keep stale files from the previous version.
///
/// # Errors
/// Returns an extraction error if the archive is malformed or contains
/// unsafe paths.
pub fn extract_tgz(bytes: &[u8], dest: &Path) -> Result<(), PkgError> {
    let parent = dest
        .parent()
        .ok_or_else(|| PkgError::extract_failed("Destination has no parent"))?;
    fs::create_dir_all(parent)?;

    let n = TMP_EXTRACT_COUNTER.fetch_add(1, Ordering::Relaxed);
    let temp_dir = parent.join(format!(".tmp-{}-{n}", std::process::id()));
    if temp_dir.exists() {
        let _ = fs::remove_dir_all(&temp_dir);
    }
    fs::create_dir_all(&temp_dir)?;

    if let Err(e) = unpack_stripped(bytes, &temp_dir) {
        let _ = fs::remove_dir_all(&temp_dir);
        return Err(e);
    }

    if dest.exists() {
        fs::remove_dir_all(dest)
            .map_err(|e| PkgError::extract_failed(format!("Failed to replace {dest:?}: {e}")))?;
    }

    match fs::rename(&temp_dir, dest) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            // Cross-filesystem fallback
            if let Err(copy_err) = copy_dir_all(&temp_dir, dest) {
                let _ = fs::remove_dir_all(&temp_dir);
                return Err(PkgError::extract_failed(format!(
                    "Failed to move or copy extracted package: rename={rename_err}, copy={copy_err}"
                )));
            }
            let _ = fs::remove_dir_all(&temp_dir);
            Ok(())
        }
    }
}

fn unpack_stripped(bytes: &[u8], dest: &Path) -> Result<(), PkgError> {
    let gz = GzDecoder::new(bytes);
    let mut archive = Archive::new(gz);

    for entry in archive
        .entries()
        .map_err(|e| PkgError::extract_failed(format!("Failed to read tarball entries: {e}")))?
    {
        let mut entry = entry
            .map_err(|e| PkgError::extract_failed(format!("Failed to read tarball entry: {e}")))?;

        let path = entry
            .path()
            .map_err(|e| PkgError::extract_failed(format!("Failed to read entry path: {e}")))?
            .into_owned();

        let stripped = strip_first_component(&path)?;
        let Some(rel) = stripped else {
            // The leading directory itself
            continue;
        };

        let dest_path = dest.join(&rel);
        if !dest_path.starts_with(dest) {
            return Err(PkgError::extract_failed(format!(
                "Tarball entry escapes destination: {}",
                path.display()
            )));
        }

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }

        if entry.header().entry_type().is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else if entry.header().entry_type().is_file() {
            let mut file = File::create(&dest_path)?;
            io::copy(&mut entry, &mut file)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Ok(mode) = entry.header().mode() {
                    let perms = fs::Permissions::from_mode(mode);
                    let _ = fs::set_permissions(&dest_path, perms);
                }
            }
        }
        // Symlinks and other special entries are skipped
    }

    Ok(())
}

/// Drop the first normal component of an entry path, rejecting absolute
/// paths and `..` traversal. Returns `None` for the leading directory
/// entry itself.
fn strip_first_component(path: &Path) -> Result<Option<PathBuf>, PkgError> {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => components.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(PkgError::extract_failed(format!(
                    "Tarball contains path traversal: {}",
                    path.display()
                )));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(PkgError::extract_failed(format!(
                    "Tarball contains absolute path: {}",
                    path.display()
                )));
            }
        }
    }

    if components.len() <= 1 {
        return Ok(None);
    }

    Ok(Some(components[1..].iter().collect()))
}

fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let ty = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if ty.is_dir() {
            copy_dir_all(&src_path, &dst_path)?;
        } else if ty.is_file() {
            fs::copy(&src_path, &dst_path)?;
        }
        // Skip symlinks
    }

    Ok(())
}
