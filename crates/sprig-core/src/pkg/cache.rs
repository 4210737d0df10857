//! Metadata and tarball caches.
//!
//! Two in-memory LRU maps front the registry during a run:
//! `(name, range) -> exact version` and `(name, version) -> metadata`.
//! Registry version manifests are immutable, so entries are evicted by
//! recency only, never invalidated.
//!
//! The tarball cache is a flat on-disk directory of
//! `{name-with-slash-to-dash}-{version}.tgz` files, read before the network
//! and written only after integrity verification.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::error::PkgError;
use super::registry::PackageMetadata;
use super::spec::package_ident;

/// Default capacity for each in-memory metadata cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 500;

/// A bounded map with least-recently-used eviction.
///
/// Keys are strings; both reads and writes refresh recency.
#[derive(Debug)]
pub struct LruCache<V> {
    capacity: usize,
    entries: HashMap<String, V>,
    recency: VecDeque<String>,
}

impl<V: Clone> LruCache<V> {
    /// Create a cache bounded at `capacity` entries (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            recency: VecDeque::new(),
        }
    }

    /// Look up a key, refreshing its recency on a hit.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let value = self.entries.get(key).cloned()?;
        self.touch(key);
        Some(value)
    }

    /// Insert a key, evicting the least recently used entry when over
    /// capacity.
    pub fn put(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        if self.entries.insert(key.clone(), value).is_some() {
            self.touch(&key);
            return;
        }

        self.recency.push_back(key);
        if self.entries.len() > self.capacity {
            if let Some(evicted) = self.recency.pop_front() {
                self.entries.remove(&evicted);
            }
        }
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            if let Some(k) = self.recency.remove(pos) {
                self.recency.push_back(k);
            }
        }
    }
}

/// The pair of in-memory LRU caches shared across one run.
#[derive(Debug)]
pub struct MetadataCaches {
    versions: Mutex<LruCache<String>>,
    metadata: Mutex<LruCache<PackageMetadata>>,
}

impl Default for MetadataCaches {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl MetadataCaches {
    /// Create caches bounded at `capacity` entries each.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            versions: Mutex::new(LruCache::new(capacity)),
            metadata: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Cached resolution for `(name, range)`, if any.
    pub fn version(&self, name: &str, range: &str) -> Option<String> {
        lock(&self.versions).get(&version_key(name, range))
    }

    /// Record a resolution for `(name, range)`.
    pub fn record_version(&self, name: &str, range: &str, version: &str) {
        lock(&self.versions).put(version_key(name, range), version.to_string());
    }

    /// Cached metadata for `name@version`, if any.
    pub fn metadata(&self, name: &str, version: &str) -> Option<PackageMetadata> {
        lock(&self.metadata).get(&package_ident(name, version))
    }

    /// Record metadata for `name@version`.
    pub fn record_metadata(&self, name: &str, version: &str, meta: PackageMetadata) {
        lock(&self.metadata).put(package_ident(name, version), meta);
    }
}

fn version_key(name: &str, range: &str) -> String {
    format!("{name}@{range}")
}

fn lock<V>(mutex: &Mutex<LruCache<V>>) -> MutexGuard<'_, LruCache<V>> {
    // A poisoned cache is still a valid cache; recover the guard.
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// On-disk store of verified tarballs.
#[derive(Debug, Clone)]
pub struct TarballCache {
    root: PathBuf,
}

impl TarballCache {
    /// Create a cache rooted at `root`.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensure the cache directory exists.
    pub fn ensure_dir(&self) -> Result<(), PkgError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Cache file name for a package version: scope `/` flattens to `-`.
    #[must_use]
    pub fn file_name(name: &str, version: &str) -> String {
        format!("{}-{version}.tgz", name.replace('/', "-"))
    }

    /// Full path of the cached tarball for a package version.
    #[must_use]
    pub fn tarball_path(&self, name: &str, version: &str) -> PathBuf {
        self.root.join(Self::file_name(name, version))
    }

    /// Read a cached tarball; absent entries return `None`.
    pub fn read(&self, name: &str, version: &str) -> Result<Option<Vec<u8>>, PkgError> {
        match fs::read(self.tarball_path(name, version)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write a verified tarball; the write is atomic so a partial file is
    /// never observable under the final name.
    pub fn write(&self, name: &str, version: &str, bytes: &[u8]) -> Result<(), PkgError> {
        sprig_util::fs::atomic_write(&self.tarball_path(name, version), bytes)?;
        Ok(())
    }

    /// Remove a cached tarball (corrupt entry self-healing). Missing files
    /// are fine.
    pub fn remove(&self, name: &str, version: &str) -> Result<(), PkgError> {
        match fs::remove_file(self.tarball_path(name, version)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
