//! The install pipeline.
//!
//! Provides:
//! - Parsing package specs and identifiers (name@version)
//! - Fetching package metadata from the npm registry
//! - Resolving version ranges using semver
//! - Building the transitive dependency graph
//! - Reconciling the manifest against the lock file
//! - Downloading, verifying, and extracting tarballs
//! - The flat `node_modules` layout and its cleanup

pub mod cache;
pub mod error;
pub mod graph;
pub mod install;
pub mod integrity;
pub mod lockfile;
pub mod manifest;
pub mod reconcile;
pub mod registry;
pub mod resolve;
pub mod spec;
pub mod tarball;
pub mod version;

pub use cache::{LruCache, MetadataCaches, TarballCache, DEFAULT_CACHE_CAPACITY};
pub use error::{codes as pkg_codes, PkgError};
pub use graph::{DependencyGraph, GraphBuilder, PackageNode};
pub use install::{cleanup, run_install, InstallReport, Installer};
pub use lockfile::LOCKFILE_NAME;
pub use manifest::MANIFEST_NAME;
pub use registry::{PackageMetadata, RegistryClient, DEFAULT_REGISTRY, REGISTRY_ENV};
pub use resolve::{MetadataSource, Resolver, LATEST_TAG};
pub use spec::{package_ident, split_ident, PackageSpec};
pub use tarball::{download_tarball, extract_tgz, MAX_TARBALL_SIZE};
