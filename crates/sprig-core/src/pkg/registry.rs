//! npm registry client.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::error::PkgError;

/// Default npm registry URL.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

/// Environment variable to override the registry URL (testing/mirrors).
pub const REGISTRY_ENV: &str = "SPRIG_NPM_REGISTRY";

/// Per-version metadata obtained from the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    /// Exact version string, as published (authoritative).
    pub version: String,
    /// Absolute URL of the gzipped tar archive.
    pub tarball_url: String,
    /// Subresource integrity string, `<algo>-<base64(digest)>`.
    pub integrity: String,
    /// Declared dependencies: child name -> version range.
    pub dependencies: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct VersionDocument {
    version: String,
    dist: DistInfo,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct DistInfo {
    tarball: String,
    integrity: Option<String>,
}

/// Registry client for fetching package metadata.
///
/// Performs no caching of its own and no retries; a failed request is fatal
/// to the run.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: Url,
    http: Client,
}

impl RegistryClient {
    /// Create a new registry client with the given base URL.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be
    /// created.
    pub fn new(base_url: &str) -> Result<Self, PkgError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| PkgError::registry(format!("Invalid registry URL '{base_url}': {e}")))?;

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("sprig/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PkgError::registry(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { base_url, http })
    }

    /// Create a client using the registry URL from environment or default.
    pub fn from_env() -> Result<Self, PkgError> {
        let url = std::env::var(REGISTRY_ENV).unwrap_or_else(|_| DEFAULT_REGISTRY.to_string());
        Self::new(&url)
    }

    /// Get the HTTP client (for reuse in tarball downloads).
    #[must_use]
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Fetch the packument (full package index) for a package.
    ///
    /// The relevant fields are `dist-tags.latest` and the keys of `versions`.
    pub async fn fetch_packument(&self, name: &str) -> Result<serde_json::Value, PkgError> {
        let url = self.endpoint(&encode_name(name))?;
        let body = self.get_json(&url).await?;
        Ok(body)
    }

    /// Fetch the metadata for one exact version of a package.
    pub async fn fetch_version_metadata(
        &self,
        name: &str,
        version: &str,
    ) -> Result<PackageMetadata, PkgError> {
        let url = self.endpoint(&format!("{}/{version}", encode_name(name)))?;
        let body = self.get_json(&url).await?;

        let doc: VersionDocument = serde_json::from_value(body).map_err(|e| {
            PkgError::registry(format!("Malformed metadata for {name}@{version}: {e}"))
        })?;

        let Some(integrity) = doc.dist.integrity else {
            return Err(PkgError::registry(format!(
                "Registry metadata for {name}@{version} carries no integrity hash"
            )));
        };

        Ok(PackageMetadata {
            version: doc.version,
            tarball_url: doc.dist.tarball,
            integrity,
            dependencies: doc.dependencies,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, PkgError> {
        self.base_url
            .join(path)
            .map_err(|e| PkgError::registry(format!("Failed to build URL for '{path}': {e}")))
    }

    async fn get_json(&self, url: &Url) -> Result<serde_json::Value, PkgError> {
        let response = self.http.get(url.as_str()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PkgError::registry(format!(
                "GET {url} failed: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown status")
            )));
        }

        let json: serde_json::Value = response.json().await?;
        Ok(json)
    }
}

/// URL-encode a package name: scoped names encode `/` as `%2F`.
fn encode_name(name: &str) -> String {
    if name.starts_with('@') {
        name.replace('/', "%2F")
    } else {
        name.to_string()
    }
}

/// Extract the `latest` dist-tag from a packument.
#[must_use]
pub fn get_latest_version(packument: &serde_json::Value) -> Option<&str> {
    packument.get("dist-tags")?.get("latest")?.as_str()
}

/// Get all published version strings from a packument.
#[must_use]
pub fn get_versions(packument: &serde_json::Value) -> Vec<&str> {
    packument
        .get("versions")
        .and_then(|v| v.as_object())
        .map(|obj| obj.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_latest_version() {
        let packument = serde_json::json!({
            "name": "react",
            "dist-tags": {
                "latest": "18.2.0",
                "next": "19.0.0-rc.0"
            }
        });

        assert_eq!(get_latest_version(&packument), Some("18.2.0"));
    }

    #[test]
    fn test_get_versions() {
        let packument = serde_json::json!({
            "name": "react",
            "versions": {
                "18.2.0": {},
                "18.1.0": {},
                "17.0.2": {}
            }
        });

        let versions = get_versions(&packument);
        assert_eq!(versions.len(), 3);
        assert!(versions.contains(&"18.2.0"));
    }

    #[test]
    fn test_encode_name() {
        assert_eq!(encode_name("react"), "react");
        assert_eq!(encode_name("@types/node"), "@types%2Fnode");
    }

    #[test]
    fn test_metadata_from_version_document() {
        let body = serde_json::json!({
            "name": "left-pad",
            "version": "1.3.0",
            "dist": {
                "tarball": "https://registry.npmjs.org/left-pad/-/left-pad-1.3.0.tgz",
                "integrity": "sha512-abc"
            },
            "dependencies": { "wcwidth": "^1.0.0" }
        });

        let doc: VersionDocument = serde_json::from_value(body).unwrap();
        assert_eq!(doc.version, "1.3.0");
        assert_eq!(doc.dist.integrity.as_deref(), Some("sha512-abc"));
        assert_eq!(doc.dependencies.get("wcwidth").unwrap(), "^1.0.0");
    }

    #[test]
    fn test_metadata_dependencies_default_empty() {
        let body = serde_json::json!({
            "version": "2.0.0",
            "dist": { "tarball": "https://example.com/t.tgz", "integrity": "sha512-x" }
        });

        let doc: VersionDocument = serde_json::from_value(body).unwrap();
        assert!(doc.dependencies.is_empty());
    }

    #[test]
    fn test_client_creation() {
        assert!(RegistryClient::new(DEFAULT_REGISTRY).is_ok());
    }

    #[test]
    fn test_client_invalid_url() {
        assert!(RegistryClient::new("not-a-url").is_err());
    }
}
