//! Version resolution against the registry.
//!
//! Resolution is memoized by the *input* `(name, range)` pair, so repeated
//! requests for e.g. `semver@^7.6.0` across a graph build hit one registry
//! fetch.

use super::cache::MetadataCaches;
use super::error::PkgError;
use super::registry::{get_latest_version, get_versions, PackageMetadata, RegistryClient};
use super::version::select_highest;

/// The one dist-tag resolved through the registry's `dist-tags` map.
pub const LATEST_TAG: &str = "latest";

/// Source of version resolutions and per-version metadata.
///
/// The production implementation is [`Resolver`]; tests substitute an
/// in-memory table.
#[allow(async_fn_in_trait)]
pub trait MetadataSource {
    /// Resolve a range or tag to an exact version.
    async fn resolve(&self, name: &str, range_or_tag: &str) -> Result<String, PkgError>;

    /// Fetch metadata for one exact version.
    async fn metadata(&self, name: &str, version: &str) -> Result<PackageMetadata, PkgError>;
}

/// Registry-backed resolver with LRU memoization.
#[derive(Debug)]
pub struct Resolver {
    client: RegistryClient,
    caches: MetadataCaches,
}

impl Resolver {
    /// Create a resolver with default cache capacities.
    #[must_use]
    pub fn new(client: RegistryClient) -> Self {
        Self {
            client,
            caches: MetadataCaches::default(),
        }
    }

    /// Create a resolver over explicit caches.
    #[must_use]
    pub fn with_caches(client: RegistryClient, caches: MetadataCaches) -> Self {
        Self { client, caches }
    }
}

impl MetadataSource for Resolver {
    async fn resolve(&self, name: &str, range_or_tag: &str) -> Result<String, PkgError> {
        if let Some(hit) = self.caches.version(name, range_or_tag) {
            return Ok(hit);
        }

        let packument = self.client.fetch_packument(name).await?;
        let version = select_version(name, &packument, range_or_tag)?;

        self.caches.record_version(name, range_or_tag, &version);
        Ok(version)
    }

    async fn metadata(&self, name: &str, version: &str) -> Result<PackageMetadata, PkgError> {
        if let Some(hit) = self.caches.metadata(name, version) {
            return Ok(hit);
        }

        let meta = self.client.fetch_version_metadata(name, version).await?;

        self.caches.record_metadata(name, version, meta.clone());
        Ok(meta)
    }
}

/// Pick the version a packument offers for a range or the `latest` tag.
///
/// # Errors
/// Returns a resolution error naming the requested identifier if nothing
/// satisfies the range, or a spec error if the range is malformed.
pub fn select_version(
    name: &str,
    packument: &serde_json::Value,
    range_or_tag: &str,
) -> Result<String, PkgError> {
    if range_or_tag == LATEST_TAG {
        return get_latest_version(packument)
            .map(String::from)
            .ok_or_else(|| PkgError::version_not_found(name, "latest (no dist-tags.latest)"));
    }

    let versions = get_versions(packument);
    select_highest(&versions, range_or_tag)?
        .ok_or_else(|| PkgError::version_not_found(name, range_or_tag))
}
