//! Dependency graph model and construction.
//!
//! The graph is a flat adjacency map keyed by package identifier
//! (`name@version`). Nodes hold child *identifiers*, not owning references,
//! so shared subgraphs and cycles are representable without back-edges.
//! Every child identifier is itself a key of the map (closure).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::PkgError;
use super::resolve::MetadataSource;
use super::spec::{package_ident, split_ident};

/// A node in the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageNode {
    /// Exact version string (authoritative, from registry metadata).
    pub version: String,
    /// Absolute URL of the gzipped tar archive.
    pub tarball_url: String,
    /// Subresource integrity string, `<algo>-<base64(digest)>`.
    pub integrity: String,
    /// Whether this package is named directly in the manifest.
    pub is_direct_dependency: bool,
    /// Child package identifiers, already resolved to exact versions.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl PackageNode {
    /// Merge the direct flag: once true it never becomes false.
    pub fn mark_direct(&mut self, direct: bool) {
        self.is_direct_dependency |= direct;
    }
}

/// Flat adjacency map from package identifier to node.
///
/// Serializes as the bare map; this is exactly the lock file's top-level
/// shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyGraph {
    packages: BTreeMap<String, PackageNode>,
}

impl DependencyGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an identifier is present.
    #[must_use]
    pub fn contains(&self, ident: &str) -> bool {
        self.packages.contains_key(ident)
    }

    /// Look up a node by identifier.
    #[must_use]
    pub fn node(&self, ident: &str) -> Option<&PackageNode> {
        self.packages.get(ident)
    }

    /// Look up a node mutably by identifier.
    pub fn node_mut(&mut self, ident: &str) -> Option<&mut PackageNode> {
        self.packages.get_mut(ident)
    }

    /// Insert a node under its identifier.
    pub fn insert(&mut self, ident: String, node: PackageNode) {
        self.packages.insert(ident, node);
    }

    /// Iterate identifiers in sorted order.
    pub fn idents(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }

    /// Iterate `(identifier, node)` pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PackageNode)> {
        self.packages.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Project the graph to its direct surface: name -> exact version.
    ///
    /// # Errors
    /// Returns an error if a key is not a valid package identifier.
    pub fn direct_versions(&self) -> Result<BTreeMap<&str, &str>, PkgError> {
        let mut direct = BTreeMap::new();
        for (ident, node) in &self.packages {
            if node.is_direct_dependency {
                let (name, version) = split_ident(ident)?;
                direct.insert(name, version);
            }
        }
        Ok(direct)
    }
}

/// Builds the transitive closure of a manifest's dependencies.
#[derive(Debug)]
pub struct GraphBuilder<'a, S> {
    source: &'a S,
}

impl<'a, S: MetadataSource> GraphBuilder<'a, S> {
    /// Create a builder over a metadata source.
    #[must_use]
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Resolve and close over every entry of the manifest.
    pub async fn build_from_manifest(
        &self,
        dependencies: &BTreeMap<String, String>,
    ) -> Result<DependencyGraph, PkgError> {
        let mut graph = DependencyGraph::new();
        for (name, range) in dependencies {
            let version = self.source.resolve(name, range).await?;
            self.build(name, &version, true, &mut graph).await?;
        }
        Ok(graph)
    }

    /// Add `name@version` and its transitive closure to `graph`.
    ///
    /// Revisiting an identifier only merges the direct flag, which both
    /// deduplicates shared subgraphs and terminates cycles.
    pub async fn build(
        &self,
        name: &str,
        version: &str,
        direct: bool,
        graph: &mut DependencyGraph,
    ) -> Result<(), PkgError> {
        let mut pending = vec![(name.to_string(), version.to_string(), direct)];

        while let Some((name, version, direct)) = pending.pop() {
            let ident = package_ident(&name, &version);
            if let Some(node) = graph.node_mut(&ident) {
                node.mark_direct(direct);
                continue;
            }

            let meta = self.source.metadata(&name, &version).await?;

            let mut children = Vec::with_capacity(meta.dependencies.len());
            for (child_name, child_range) in &meta.dependencies {
                let child_version = self.source.resolve(child_name, child_range).await?;
                children.push((child_name.clone(), child_version));
            }

            graph.insert(
                ident,
                PackageNode {
                    version: meta.version,
                    tarball_url: meta.tarball_url,
                    integrity: meta.integrity,
                    is_direct_dependency: direct,
                    dependencies: children
                        .iter()
                        .map(|(n, v)| package_ident(n, v))
                        .collect(),
                },
            );

            for (child_name, child_version) in children {
                pending.push((child_name, child_version, false));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkg::registry::PackageMetadata;
    use std::collections::HashMap;

    /// In-memory metadata table standing in for the registry.
    #[derive(Default)]
    struct FakeSource {
        versions: HashMap<(String, String), String>,
        metadata: HashMap<String, PackageMetadata>,
    }

    impl FakeSource {
        fn package(&mut self, name: &str, version: &str, deps: &[(&str, &str, &str)]) {
            // deps: (name, range, resolved version)
            let mut dependencies = BTreeMap::new();
            for (dep_name, dep_range, dep_version) in deps {
                dependencies.insert((*dep_name).to_string(), (*dep_range).to_string());
                self.versions.insert(
                    ((*dep_name).to_string(), (*dep_range).to_string()),
                    (*dep_version).to_string(),
                );
            }
            self.metadata.insert(
                package_ident(name, version),
                PackageMetadata {
                    version: version.to_string(),
                    tarball_url: format!("https://example.com/{name}-{version}.tgz"),
                    integrity: format!("sha512-{name}"),
                    dependencies,
                },
            );
        }

        fn range(&mut self, name: &str, range: &str, version: &str) {
            self.versions
                .insert((name.to_string(), range.to_string()), version.to_string());
        }
    }

    impl MetadataSource for FakeSource {
        async fn resolve(&self, name: &str, range: &str) -> Result<String, PkgError> {
            self.versions
                .get(&(name.to_string(), range.to_string()))
                .cloned()
                .ok_or_else(|| PkgError::version_not_found(name, range))
        }

        async fn metadata(&self, name: &str, version: &str) -> Result<PackageMetadata, PkgError> {
            self.metadata
                .get(&package_ident(name, version))
                .cloned()
                .ok_or_else(|| PkgError::registry(format!("no metadata for {name}@{version}")))
        }
    }

    fn assert_closed(graph: &DependencyGraph) {
        for (ident, node) in graph.iter() {
            for child in &node.dependencies {
                assert!(
                    graph.contains(child),
                    "{ident} references {child}, which is not a graph key"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_single_package_no_deps() {
        let mut source = FakeSource::default();
        source.package("is-thirteen", "2.0.0", &[]);
        source.range("is-thirteen", "^2.0.0", "2.0.0");

        let mut manifest = BTreeMap::new();
        manifest.insert("is-thirteen".to_string(), "^2.0.0".to_string());

        let graph = GraphBuilder::new(&source)
            .build_from_manifest(&manifest)
            .await
            .unwrap();

        assert_eq!(graph.len(), 1);
        let node = graph.node("is-thirteen@2.0.0").unwrap();
        assert!(node.is_direct_dependency);
        assert!(node.dependencies.is_empty());
        assert_closed(&graph);
    }

    #[tokio::test]
    async fn test_transitive_closure() {
        let mut source = FakeSource::default();
        source.package("semver", "7.5.2", &[("yallist", "^4.0.0", "4.0.0")]);
        source.package("yallist", "4.0.0", &[]);
        source.range("semver", "^7.5.0", "7.5.2");

        let mut manifest = BTreeMap::new();
        manifest.insert("semver".to_string(), "^7.5.0".to_string());

        let graph = GraphBuilder::new(&source)
            .build_from_manifest(&manifest)
            .await
            .unwrap();

        assert_eq!(graph.len(), 2);
        assert!(graph.node("semver@7.5.2").unwrap().is_direct_dependency);
        assert!(!graph.node("yallist@4.0.0").unwrap().is_direct_dependency);
        assert_eq!(
            graph.node("semver@7.5.2").unwrap().dependencies,
            vec!["yallist@4.0.0"]
        );
        assert_closed(&graph);
    }

    #[tokio::test]
    async fn test_cycle_terminates_with_two_nodes() {
        let mut source = FakeSource::default();
        source.package("a", "1.0.0", &[("b", "^1.0.0", "1.0.0")]);
        source.package("b", "1.0.0", &[("a", "^1.0.0", "1.0.0")]);
        source.range("a", "^1.0.0", "1.0.0");

        let mut manifest = BTreeMap::new();
        manifest.insert("a".to_string(), "^1.0.0".to_string());

        let graph = GraphBuilder::new(&source)
            .build_from_manifest(&manifest)
            .await
            .unwrap();

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.node("a@1.0.0").unwrap().dependencies, vec!["b@1.0.0"]);
        assert_eq!(graph.node("b@1.0.0").unwrap().dependencies, vec!["a@1.0.0"]);
        assert_closed(&graph);
    }

    #[tokio::test]
    async fn test_direct_flag_is_sticky() {
        // "b" is both a direct dependency and a transitive of "a"
        let mut source = FakeSource::default();
        source.package("a", "1.0.0", &[("b", "^1.0.0", "1.0.0")]);
        source.package("b", "1.0.0", &[]);
        source.range("a", "^1.0.0", "1.0.0");
        source.range("b", "^1.0.0", "1.0.0");

        let mut manifest = BTreeMap::new();
        manifest.insert("a".to_string(), "^1.0.0".to_string());
        manifest.insert("b".to_string(), "^1.0.0".to_string());

        let graph = GraphBuilder::new(&source)
            .build_from_manifest(&manifest)
            .await
            .unwrap();

        // Visited first as direct (manifest order a, b: a's build reaches b
        // transitively first), then marked again as direct
        assert!(graph.node("b@1.0.0").unwrap().is_direct_dependency);

        let direct = graph.direct_versions().unwrap();
        assert_eq!(direct.len(), 2);
        assert_eq!(direct["a"], "1.0.0");
        assert_eq!(direct["b"], "1.0.0");
    }

    #[tokio::test]
    async fn test_version_conflict_keeps_both_nodes() {
        let mut source = FakeSource::default();
        source.package("a", "1.0.0", &[("shared", "^1.0.0", "1.2.0")]);
        source.package("b", "1.0.0", &[("shared", "2.0.0", "2.0.0")]);
        source.package("shared", "1.2.0", &[]);
        source.package("shared", "2.0.0", &[]);
        source.range("a", "*", "1.0.0");
        source.range("b", "*", "1.0.0");

        let mut manifest = BTreeMap::new();
        manifest.insert("a".to_string(), "*".to_string());
        manifest.insert("b".to_string(), "*".to_string());

        let graph = GraphBuilder::new(&source)
            .build_from_manifest(&manifest)
            .await
            .unwrap();

        assert_eq!(graph.len(), 4);
        assert!(graph.contains("shared@1.2.0"));
        assert!(graph.contains("shared@2.0.0"));
        assert_closed(&graph);
    }

    #[tokio::test]
    async fn test_resolution_failure_propagates() {
        let mut source = FakeSource::default();
        source.package("a", "1.0.0", &[("ghost", "^9.0.0", "9.0.0")]);
        source.range("a", "^1.0.0", "1.0.0");
        // "ghost" resolves but has no metadata published

        let mut manifest = BTreeMap::new();
        manifest.insert("a".to_string(), "^1.0.0".to_string());

        let result = GraphBuilder::new(&source)
            .build_from_manifest(&manifest)
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_graph_serializes_as_flat_map() {
        let mut graph = DependencyGraph::new();
        graph.insert(
            "is-thirteen@2.0.0".to_string(),
            PackageNode {
                version: "2.0.0".to_string(),
                tarball_url: "https://example.com/t.tgz".to_string(),
                integrity: "sha512-x".to_string(),
                is_direct_dependency: true,
                dependencies: Vec::new(),
            },
        );

        let json = serde_json::to_value(&graph).unwrap();
        let node = &json["is-thirteen@2.0.0"];
        assert_eq!(node["version"], "2.0.0");
        assert_eq!(node["tarballUrl"], "https://example.com/t.tgz");
        assert_eq!(node["integrity"], "sha512-x");
        assert_eq!(node["isDirectDependency"], true);
        assert_eq!(node["dependencies"], serde_json::json!([]));
    }

    #[test]
    fn test_mark_direct_never_clears() {
        let mut node = PackageNode {
            version: "1.0.0".to_string(),
            tarball_url: String::new(),
            integrity: String::new(),
            is_direct_dependency: true,
            dependencies: Vec::new(),
        };
        node.mark_direct(false);
        assert!(node.is_direct_dependency);
    }
}
