//! Cache storage module
//!
//! This module provides persistent caching functionality using the system's
//! standard cache directory, plus a small in-memory cache for the lifetime of
//! a session. Persistent data is serialized to JSON and stamped with the time
//! it was stored so stale entries can be ignored.

use crate::temp::create_temp_file_in;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// Failed to determine cache directory location
    #[error("Failed to determine cache directory location")]
    CacheDirectoryNotFound,

    /// Failed to create or access cache directory
    #[error("Failed to create cache directory at {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read cached data
    #[error("Failed to read cache file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write cached data
    #[error("Failed to write cache file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to deserialize cached data
    #[error("Failed to deserialize cache file {path}: {source}")]
    DeserializationFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Failed to serialize data for caching
    #[error("Failed to serialize data: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Returns the root cache directory of the application.
pub fn cache_root() -> Result<PathBuf, CacheError> {
    let proj_dirs = directories::ProjectDirs::from("ch", "wenner", "arteplus7")
        .ok_or(CacheError::CacheDirectoryNotFound)?;
    Ok(proj_dirs.cache_dir().to_path_buf())
}

/// On-disk wrapper recording when an entry was stored.
#[derive(Serialize, Deserialize)]
struct CacheEntry<T> {
    stored_at: DateTime<Utc>,
    data: T,
}

/// A generic cache storage for serializable data
///
/// This structure provides persistent caching of data that implements
/// `Serialize` and `Deserialize`. Data is stored as JSON files in a
/// subdirectory of the cache root, and entries older than the configured
/// time-to-live are treated as missing.
pub(crate) struct CacheStorage<T> {
    /// The directory where cached data is stored
    cache_dir: PathBuf,
    /// Maximum age of an entry, `None` keeps entries forever
    ttl: Option<Duration>,
    /// Phantom data for the generic type
    _phantom: PhantomData<T>,
}

impl<T> CacheStorage<T>
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    /// Opens or creates a cache storage with the given name
    ///
    /// The cache will be stored in the system's standard cache directory
    /// under a subdirectory named after the application and the provided name.
    ///
    /// # Arguments
    ///
    /// * `name` - The name for this cache storage
    /// * `ttl` - Maximum age of cached entries, `None` for no expiry
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let cache: CacheStorage<CatalogPage> =
    ///     CacheStorage::open("listings", Some(Duration::from_secs(3600)))?;
    /// ```
    pub fn open(name: &str, ttl: Option<Duration>) -> Result<Self, CacheError> {
        Self::open_in(&cache_root()?, name, ttl)
    }

    /// Opens or creates a cache storage below an explicit root directory.
    pub fn open_in(root: &Path, name: &str, ttl: Option<Duration>) -> Result<Self, CacheError> {
        let cache_dir = root.join(sanitize_name(name));

        fs::create_dir_all(&cache_dir).map_err(|e| CacheError::DirectoryCreationFailed {
            path: cache_dir.clone(),
            source: e,
        })?;

        Ok(Self {
            cache_dir,
            ttl,
            _phantom: PhantomData,
        })
    }

    /// Loads cached data for the given identifier
    ///
    /// Returns `None` if the data doesn't exist or is older than the TTL.
    /// Returns an error if the data exists but cannot be read or deserialized.
    pub fn load(&self, identifier: &str) -> Result<Option<T>, CacheError> {
        self.load_at(identifier, Utc::now())
    }

    /// Like [`load`](Self::load), judging freshness against `now`.
    pub(crate) fn load_at(
        &self,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<T>, CacheError> {
        let file_path = self.entry_path(identifier);

        if !file_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&file_path).map_err(|e| CacheError::ReadFailed {
            path: file_path.clone(),
            source: e,
        })?;

        let entry: CacheEntry<T> =
            serde_json::from_str(&content).map_err(|e| CacheError::DeserializationFailed {
                path: file_path.clone(),
                source: e,
            })?;

        if let Some(ttl) = self.ttl {
            let age = now
                .signed_duration_since(entry.stored_at)
                .to_std()
                .unwrap_or(Duration::ZERO);
            if age >= ttl {
                tracing::debug!(path = %file_path.display(), "cache entry expired");
                let _ = fs::remove_file(&file_path);
                return Ok(None);
            }
        }

        Ok(Some(entry.data))
    }

    /// Stores data in the cache with the given identifier
    ///
    /// The entry is written to a temporary file first and renamed into place.
    pub fn store(&self, identifier: &str, data: &T) -> Result<(), CacheError> {
        let file_path = self.entry_path(identifier);

        let entry = CacheEntry {
            stored_at: Utc::now(),
            data,
        };
        let content = serde_json::to_string_pretty(&entry)?;

        let write_failed = |e: std::io::Error| CacheError::WriteFailed {
            path: file_path.clone(),
            source: e,
        };
        let temp = create_temp_file_in(&self.cache_dir, "entry", "part").map_err(write_failed)?;
        fs::write(temp.path(), content).map_err(write_failed)?;
        temp.persist(&file_path).map_err(write_failed)?;

        Ok(())
    }

    /// Removes the entry for the given identifier, if present.
    pub fn remove(&self, identifier: &str) -> Result<(), CacheError> {
        let file_path = self.entry_path(identifier);
        match fs::remove_file(&file_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::WriteFailed {
                path: file_path,
                source: e,
            }),
        }
    }

    /// Removes every entry whose identifier starts with `prefix`.
    ///
    /// Returns the number of entries removed.
    pub fn remove_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        let prefix = sanitize_name(prefix);
        let entries = fs::read_dir(&self.cache_dir).map_err(|e| CacheError::ReadFailed {
            path: self.cache_dir.clone(),
            source: e,
        })?;

        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if stem.starts_with(&prefix) {
                self.remove(stem)?;
                removed += 1;
            }
        }

        Ok(removed)
    }

    /// Removes every entry of this storage, returning the number of files removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        clear_dir(&self.cache_dir)
    }

    /// Bytes used by this storage on disk.
    pub fn size_on_disk(&self) -> u64 {
        size_on_disk(&self.cache_dir)
    }

    /// Returns the path to the cache directory
    pub fn cache_dir(&self) -> &PathBuf {
        &self.cache_dir
    }

    fn entry_path(&self, identifier: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.json", sanitize_name(identifier)))
    }
}

/// Removes every file below `dir`, returning the number of files removed.
pub fn clear_dir(dir: &Path) -> Result<usize, CacheError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => {
            return Err(CacheError::ReadFailed {
                path: dir.to_path_buf(),
                source: e,
            });
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            removed += clear_dir(&path)?;
        } else {
            fs::remove_file(&path).map_err(|e| CacheError::WriteFailed {
                path: path.clone(),
                source: e,
            })?;
            removed += 1;
        }
    }

    Ok(removed)
}

/// Total size in bytes of the files below `dir`.
pub fn size_on_disk(dir: &Path) -> u64 {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };

    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                size_on_disk(&path)
            } else {
                entry.metadata().map(|m| m.len()).unwrap_or(0)
            }
        })
        .sum()
}

/// In-memory cache for the lifetime of a session.
///
/// Entries expire `ttl` after insertion.
pub(crate) struct SessionCache<T> {
    entries: Mutex<HashMap<String, (Instant, T)>>,
    ttl: Duration,
}

impl<T: Clone> SessionCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Returns a fresh entry for `key`, evicting it if it has expired.
    pub fn get(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.lock().ok()?;
        let (inserted, value) = entries.get(key)?;
        if inserted.elapsed() < self.ttl {
            return Some(value.clone());
        }
        entries.remove(key);
        None
    }

    pub fn insert(&self, key: &str, value: T) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), (Instant::now(), value));
        }
    }

    pub fn invalidate(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }

    /// Drops every entry whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|key, _| !key.starts_with(prefix));
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    /// Number of entries held, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }
}

/// Sanitizes a name for use in file paths
///
/// Converts to lowercase and replaces all characters that are not
/// a-z, 0-9, or hyphen with underscores.
fn sanitize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        title: String,
    }

    fn sample(title: &str) -> Sample {
        Sample {
            title: title.to_string(),
        }
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Simple"), "simple");
        assert_eq!(sanitize_name("With Spaces"), "with_spaces");
        assert_eq!(sanitize_name("074526-000-A"), "074526-000-a");
        assert_eq!(sanitize_name("Special!@#$%"), "special_____");
    }

    #[test]
    fn test_store_and_load() {
        let root = tempfile::tempdir().unwrap();
        let cache = CacheStorage::<Sample>::open_in(root.path(), "listings", None).unwrap();

        assert_eq!(cache.load("page_1").unwrap(), None);
        cache.store("page_1", &sample("Arte")).unwrap();
        assert_eq!(cache.load("page_1").unwrap(), Some(sample("Arte")));

        // No temporary files are left behind
        let files: Vec<_> = fs::read_dir(cache.cache_dir()).unwrap().flatten().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_expired_entries_are_ignored() {
        let root = tempfile::tempdir().unwrap();
        let cache = CacheStorage::<Sample>::open_in(
            root.path(),
            "listings",
            Some(Duration::from_secs(60)),
        )
        .unwrap();

        cache.store("page_1", &sample("Arte")).unwrap();
        let fresh = Utc::now() + chrono::Duration::seconds(30);
        assert!(cache.load_at("page_1", fresh).unwrap().is_some());

        let stale = Utc::now() + chrono::Duration::seconds(120);
        assert_eq!(cache.load_at("page_1", stale).unwrap(), None);
        // The stale file is removed
        assert_eq!(cache.load("page_1").unwrap(), None);
    }

    #[test]
    fn test_corrupt_entry_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let cache = CacheStorage::<Sample>::open_in(root.path(), "listings", None).unwrap();
        fs::write(cache.cache_dir().join("broken.json"), "{not json").unwrap();

        assert!(matches!(
            cache.load("broken"),
            Err(CacheError::DeserializationFailed { .. })
        ));
    }

    #[test]
    fn test_remove_and_clear() {
        let root = tempfile::tempdir().unwrap();
        let cache = CacheStorage::<Sample>::open_in(root.path(), "listings", None).unwrap();
        cache.store("a", &sample("A")).unwrap();
        cache.store("b", &sample("B")).unwrap();

        cache.remove("a").unwrap();
        cache.remove("missing").unwrap();
        assert_eq!(cache.load("a").unwrap(), None);

        assert!(size_on_disk(root.path()) > 0);
        assert_eq!(cache.size_on_disk(), size_on_disk(root.path()));
        assert_eq!(clear_dir(root.path()).unwrap(), 1);
        assert_eq!(size_on_disk(root.path()), 0);
        assert_eq!(cache.size_on_disk(), 0);
    }

    #[test]
    fn test_remove_prefix_and_clear_storage() {
        let root = tempfile::tempdir().unwrap();
        let cache = CacheStorage::<Sample>::open_in(root.path(), "listings", None).unwrap();
        let other = CacheStorage::<Sample>::open_in(root.path(), "streams", None).unwrap();
        cache.store("listing_fr_CIN_p1_l50", &sample("1")).unwrap();
        cache.store("listing_fr_CIN_p12_l50", &sample("12")).unwrap();
        cache.store("listing_fr_all_p1_l50", &sample("all")).unwrap();
        other.store("listing_fr_CIN_p1_l50", &sample("elsewhere")).unwrap();

        assert_eq!(cache.remove_prefix("listing_fr_CIN_").unwrap(), 2);
        assert_eq!(cache.load("listing_fr_CIN_p12_l50").unwrap(), None);
        assert!(cache.load("listing_fr_all_p1_l50").unwrap().is_some());

        assert_eq!(cache.clear().unwrap(), 1);
        assert_eq!(cache.load("listing_fr_all_p1_l50").unwrap(), None);
        assert!(other.load("listing_fr_CIN_p1_l50").unwrap().is_some());
    }

    #[test]
    fn test_session_cache_expiry() {
        let session = SessionCache::new(Duration::from_secs(60));
        session.insert("k", 1);
        assert_eq!(session.get("k"), Some(1));
        session.invalidate("k");
        assert_eq!(session.get("k"), None);

        let expired = SessionCache::new(Duration::ZERO);
        expired.insert("k", 1);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired.get("k"), None);
        assert_eq!(expired.len(), 0);
    }

    #[test]
    fn test_session_cache_prefix_and_clear() {
        let session = SessionCache::new(Duration::from_secs(60));
        session.insert("listing_fr_all_p1", 1);
        session.insert("listing_fr_all_p12", 12);
        session.insert("listing_de_all_p1", 2);

        session.invalidate_prefix("listing_fr_");
        assert_eq!(session.len(), 1);
        assert_eq!(session.get("listing_de_all_p1"), Some(2));

        session.clear();
        assert_eq!(session.len(), 0);
    }
}
