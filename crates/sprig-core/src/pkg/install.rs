//! Package installation.
//!
//! The installer walks a closed dependency graph in dependency-first order
//! and materializes every node into the flat `node_modules/` layout:
//! acquire the tarball (cache before network), verify its integrity,
//! persist it to the cache, extract it. Cleanup then removes top-level
//! entries that no longer correspond to any graph node, and the orchestrator
//! ties the whole sequence to the lock file.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::cache::TarballCache;
use super::error::PkgError;
use super::graph::{DependencyGraph, GraphBuilder};
use super::integrity;
use super::lockfile;
use super::manifest;
use super::reconcile::lock_satisfies_manifest;
use super::registry::RegistryClient;
use super::resolve::Resolver;
use super::spec::split_ident;
use super::tarball::{download_tarball, extract_tgz};
use crate::config::Config;

/// Outcome counters for one install run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct InstallReport {
    /// Number of packages in the installed graph.
    pub packages: usize,
    /// Tarballs fetched over the network.
    pub downloaded: usize,
    /// Tarballs served from the content cache.
    pub reused_cache: usize,
    /// Packages whose extracted tree was already current.
    pub up_to_date: usize,
    /// Top-level entries removed by cleanup.
    pub removed: Vec<String>,
    /// Whether the locked graph was reused without rebuilding.
    pub from_lock: bool,
}

/// Extracts a dependency graph into the package directory.
#[derive(Debug)]
pub struct Installer<'a> {
    http: &'a Client,
    cache: &'a TarballCache,
    modules_dir: &'a Path,
}

impl<'a> Installer<'a> {
    /// Create an installer writing under `modules_dir`.
    #[must_use]
    pub fn new(http: &'a Client, cache: &'a TarballCache, modules_dir: &'a Path) -> Self {
        Self {
            http,
            cache,
            modules_dir,
        }
    }

    /// Install every node of the graph, dependencies before dependents.
    ///
    /// Failure is terminal: no rollback of already-extracted packages.
    pub async fn install(
        &self,
        graph: &DependencyGraph,
        report: &mut InstallReport,
    ) -> Result<(), PkgError> {
        for ident in install_order(graph) {
            self.install_package(ident, graph, report).await?;
        }
        report.packages = graph.len();
        Ok(())
    }

    async fn install_package(
        &self,
        ident: &str,
        graph: &DependencyGraph,
        report: &mut InstallReport,
    ) -> Result<(), PkgError> {
        let (name, version) = split_ident(ident)?;
        let node = graph.node(ident).ok_or_else(|| {
            PkgError::lock_invalid(format!("Graph references unknown identifier '{ident}'"))
        })?;

        // Acquire: cache before network
        let (bytes, cached) = match self.cache.read(name, version)? {
            Some(bytes) => (bytes, true),
            None => (download_tarball(self.http, &node.tarball_url).await?, false),
        };

        // Verify before any write reaches the cache or the tree
        if let Err(e) = integrity::verify(&bytes, &node.integrity, ident) {
            if cached {
                self.cache.remove(name, version)?;
                warn!(ident, "removed corrupt cached tarball");
            }
            return Err(e);
        }

        if cached {
            report.reused_cache += 1;
        } else {
            self.cache.write(name, version, &bytes)?;
            report.downloaded += 1;
        }

        let dir = package_dir(self.modules_dir, name);
        if installed_version_matches(&dir, version) {
            report.up_to_date += 1;
            debug!(ident, "already extracted");
            return Ok(());
        }

        extract_tgz(&bytes, &dir)?;
        debug!(ident, "extracted");
        Ok(())
    }
}

/// Dependency-first (post-order) traversal of the graph.
///
/// Identifiers are marked visited on entry, so cyclically dependent
/// packages terminate; within a cycle one member is necessarily extracted
/// before its partner.
fn install_order(graph: &DependencyGraph) -> Vec<&str> {
    let mut order = Vec::with_capacity(graph.len());
    let mut visited: HashSet<&str> = HashSet::new();

    for root in graph.idents() {
        if visited.contains(root) {
            continue;
        }

        let mut stack = vec![(root, false)];
        while let Some((ident, children_done)) = stack.pop() {
            if children_done {
                order.push(ident);
                continue;
            }
            if !visited.insert(ident) {
                continue;
            }
            stack.push((ident, true));
            if let Some(node) = graph.node(ident) {
                for child in node.dependencies.iter().rev() {
                    if !visited.contains(child.as_str()) {
                        stack.push((child.as_str(), false));
                    }
                }
            }
        }
    }

    order
}

/// Directory a package extracts into: `foo` or `@scope/foo` under the
/// module root.
fn package_dir(modules_dir: &Path, name: &str) -> PathBuf {
    name.split('/').fold(modules_dir.to_path_buf(), |dir, part| {
        dir.join(part)
    })
}

/// Whether the extracted tree at `dir` already carries this exact version.
fn installed_version_matches(dir: &Path, version: &str) -> bool {
    let Ok(content) = fs::read_to_string(dir.join("package.json")) else {
        return false;
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&content) else {
        return false;
    };
    value.get("version").and_then(|v| v.as_str()) == Some(version)
}

/// Remove top-level entries of the package directory that no graph node
/// accounts for. Returns the removed entry names, sorted.
pub fn cleanup(modules_dir: &Path, graph: &DependencyGraph) -> Result<Vec<String>, PkgError> {
    let mut expected: HashSet<String> = HashSet::new();
    for ident in graph.idents() {
        let (name, _) = split_ident(ident)?;
        if let Some((scope, _)) = name.split_once('/') {
            expected.insert(scope.to_string());
            expected.insert(name.to_string());
        } else {
            expected.insert(name.to_string());
        }
    }

    let mut removed = Vec::new();
    for entry in fs::read_dir(modules_dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();
        if expected.contains(name.as_ref()) {
            continue;
        }

        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        removed.push(name.into_owned());
    }

    removed.sort();
    Ok(removed)
}

/// The install use case: reconcile, (re)build, extract, clean, lock.
pub async fn run_install(config: &Config) -> Result<InstallReport, PkgError> {
    let modules_dir = config.modules_dir();
    fs::create_dir_all(&modules_dir)?;
    let cache = TarballCache::new(config.cache_dir());
    cache.ensure_dir()?;

    let deps = manifest::read_dependencies(&config.manifest_path())?;

    let client = RegistryClient::from_env()?;
    let installer = Installer::new(client.http(), &cache, &modules_dir);

    let lock_path = config.lock_path();
    let locked = match lockfile::read(&lock_path) {
        Ok(locked) => locked,
        Err(e) => {
            warn!(error = %e, "ignoring unreadable lock file");
            None
        }
    };

    if let Some(lock) = locked {
        if lock_satisfies_manifest(&deps, &lock)? {
            info!(packages = lock.len(), "lock file satisfied, installing from lock");
            let mut report = InstallReport {
                from_lock: true,
                ..InstallReport::default()
            };
            installer.install(&lock, &mut report).await?;
            report.removed = cleanup(&modules_dir, &lock)?;
            return Ok(report);
        }
        debug!("manifest changed since lock was written, rebuilding graph");
    }

    let resolver = Resolver::new(client.clone());
    let graph = GraphBuilder::new(&resolver)
        .build_from_manifest(&deps)
        .await?;
    info!(packages = graph.len(), "resolved dependency graph");

    let mut report = InstallReport::default();
    installer.install(&graph, &mut report).await?;
    report.removed = cleanup(&modules_dir, &graph)?;
    lockfile::write(&lock_path, &graph)?;

    Ok(report)
}
