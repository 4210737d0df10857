//! Lock reconciliation.
//!
//! Decides whether a locked graph still satisfies the manifest's direct
//! dependencies. Only the direct surface is checked; transitive nodes are
//! trusted because they came from a prior successful build. Any direct
//! change rebuilds the whole graph.

use std::collections::BTreeMap;

use semver::Version;

use super::error::PkgError;
use super::graph::DependencyGraph;
use super::version::range_matches;

/// Returns true when the locked graph's direct surface still matches the
/// manifest exactly: same names, every locked version inside its range.
///
/// Ranges that are not semver (dist-tags like `latest`) never match, so
/// they always take the rebuild path.
///
/// # Errors
/// Returns an error if the lock contains malformed identifiers.
pub fn lock_satisfies_manifest(
    manifest: &BTreeMap<String, String>,
    lock: &DependencyGraph,
) -> Result<bool, PkgError> {
    let direct = lock.direct_versions()?;

    for (name, range) in manifest {
        let Some(locked) = direct.get(name.as_str()) else {
            return Ok(false);
        };
        let Ok(version) = Version::parse(locked) else {
            return Ok(false);
        };
        if !range_matches(range, &version) {
            return Ok(false);
        }
    }

    for name in direct.keys() {
        if !manifest.contains_key(*name) {
            return Ok(false);
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkg::graph::PackageNode;

    fn node(version: &str, direct: bool, deps: &[&str]) -> PackageNode {
        PackageNode {
            version: version.to_string(),
            tarball_url: format!("https://example.com/{version}.tgz"),
            integrity: "sha512-x".to_string(),
            is_direct_dependency: direct,
            dependencies: deps.iter().map(|d| (*d).to_string()).collect(),
        }
    }

    fn manifest(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(n, r)| ((*n).to_string(), (*r).to_string()))
            .collect()
    }

    #[test]
    fn test_unchanged() {
        let mut lock = DependencyGraph::new();
        lock.insert(
            "semver@7.5.2".to_string(),
            node("7.5.2", true, &["yallist@4.0.0"]),
        );
        lock.insert("yallist@4.0.0".to_string(), node("4.0.0", false, &[]));

        let m = manifest(&[("semver", "^7.5.0")]);
        assert!(lock_satisfies_manifest(&m, &lock).unwrap());
    }

    #[test]
    fn test_new_manifest_entry_changes() {
        let mut lock = DependencyGraph::new();
        lock.insert("semver@7.5.2".to_string(), node("7.5.2", true, &[]));

        let m = manifest(&[("semver", "^7.5.0"), ("left-pad", "^1.0.0")]);
        assert!(!lock_satisfies_manifest(&m, &lock).unwrap());
    }

    #[test]
    fn test_locked_version_outside_range_changes() {
        let mut lock = DependencyGraph::new();
        lock.insert("semver@7.5.2".to_string(), node("7.5.2", true, &[]));

        let m = manifest(&[("semver", "^8.0.0")]);
        assert!(!lock_satisfies_manifest(&m, &lock).unwrap());
    }

    #[test]
    fn test_removed_manifest_entry_changes() {
        let mut lock = DependencyGraph::new();
        lock.insert("semver@7.5.2".to_string(), node("7.5.2", true, &[]));
        lock.insert("left-pad@1.3.0".to_string(), node("1.3.0", true, &[]));

        let m = manifest(&[("semver", "^7.5.0")]);
        assert!(!lock_satisfies_manifest(&m, &lock).unwrap());
    }

    #[test]
    fn test_transitive_nodes_are_not_revalidated() {
        // The transitive node has an absurd version; only the direct
        // surface is checked.
        let mut lock = DependencyGraph::new();
        lock.insert(
            "semver@7.5.2".to_string(),
            node("7.5.2", true, &["yallist@0.0.0"]),
        );
        lock.insert("yallist@0.0.0".to_string(), node("0.0.0", false, &[]));

        let m = manifest(&[("semver", "^7.5.0")]);
        assert!(lock_satisfies_manifest(&m, &lock).unwrap());
    }

    #[test]
    fn test_latest_tag_always_rebuilds() {
        let mut lock = DependencyGraph::new();
        lock.insert("left-pad@1.3.0".to_string(), node("1.3.0", true, &[]));

        let m = manifest(&[("left-pad", "latest")]);
        assert!(!lock_satisfies_manifest(&m, &lock).unwrap());
    }

    #[test]
    fn test_exact_range_must_match_exactly() {
        let mut lock = DependencyGraph::new();
        lock.insert("semver@7.6.2".to_string(), node("7.6.2", true, &[]));

        assert!(lock_satisfies_manifest(&manifest(&[("semver", "7.6.2")]), &lock).unwrap());
        assert!(!lock_satisfies_manifest(&manifest(&[("semver", "7.5.2")]), &lock).unwrap());
    }

    #[test]
    fn test_empty_manifest_and_lock() {
        let lock = DependencyGraph::new();
        assert!(lock_satisfies_manifest(&BTreeMap::new(), &lock).unwrap());
    }

    #[test]
    fn test_scoped_direct_dependency() {
        let mut lock = DependencyGraph::new();
        lock.insert("@scope/x@1.0.0".to_string(), node("1.0.0", true, &[]));

        let m = manifest(&[("@scope/x", "^1.0.0")]);
        assert!(lock_satisfies_manifest(&m, &lock).unwrap());
    }
}
