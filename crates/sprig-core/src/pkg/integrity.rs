//! Subresource integrity verification.
//!
//! Integrity strings have the form `<algo>-<base64(digest)>`, the digest
//! taken over the raw tarball bytes. Verification happens before any write
//! to the cache or the package tree.

use sprig_util::hash::{sha256_base64, sha384_base64, sha512_base64};

use super::error::PkgError;

/// Split an integrity string on the first `-` into `(algo, base64digest)`.
///
/// # Errors
/// Returns an error if the string has no `-` separator.
pub fn split_integrity(integrity: &str) -> Result<(&str, &str), PkgError> {
    integrity.split_once('-').ok_or_else(|| {
        PkgError::spec_invalid(format!("Malformed integrity string '{integrity}'"))
    })
}

/// Verify raw tarball bytes against an integrity string.
///
/// # Errors
/// Returns an integrity error naming `ident` on digest mismatch, unknown
/// algorithm, or malformed integrity string.
pub fn verify(bytes: &[u8], integrity: &str, ident: &str) -> Result<(), PkgError> {
    let (algo, expected) = split_integrity(integrity)
        .map_err(|e| PkgError::integrity_mismatch(ident, e.message().to_string()))?;

    let actual = match algo {
        "sha512" => sha512_base64(bytes),
        "sha384" => sha384_base64(bytes),
        "sha256" => sha256_base64(bytes),
        other => {
            return Err(PkgError::integrity_mismatch(
                ident,
                format!("unsupported hash algorithm '{other}'"),
            ));
        }
    };

    if !constant_time_eq(actual.as_bytes(), expected.as_bytes()) {
        return Err(PkgError::integrity_mismatch(
            ident,
            format!("{algo} digest differs from registry value"),
        ));
    }

    Ok(())
}

/// Compare two byte strings without short-circuiting on the first
/// difference.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}
