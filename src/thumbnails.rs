//! Thumbnail cache
//!
//! Downloads video preview images once and keeps them in the cache
//! directory, named after the BLAKE3 hash of their URL.

use crate::fetcher::{FetchError, HttpFetcher, SharedFetcher};
use crate::temp::create_temp_file_in;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;

/// Errors that can occur while caching thumbnails
#[derive(Debug, Error)]
pub enum ThumbnailError {
    /// Failed to create or access the thumbnail directory
    #[error("Failed to create thumbnail directory at {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to download the image
    #[error("Failed to download thumbnail: {0}")]
    Download(#[from] FetchError),

    /// The server sent an empty body
    #[error("Empty thumbnail received from {0}")]
    EmptyImage(String),

    /// Failed to write the image file
    #[error("Failed to write thumbnail {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// On-disk cache of preview images.
pub struct ThumbnailCache {
    dir: PathBuf,
    fetcher: SharedFetcher,
}

impl ThumbnailCache {
    /// Opens the thumbnail cache in `dir`, creating it if needed.
    pub fn open_in(dir: &Path, fetcher: SharedFetcher) -> Result<Self, ThumbnailError> {
        fs::create_dir_all(dir).map_err(|e| ThumbnailError::DirectoryCreationFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

        Ok(Self {
            dir: dir.to_path_buf(),
            fetcher,
        })
    }

    /// The file a thumbnail URL is cached in.
    pub fn path_for(&self, url: &str) -> PathBuf {
        let hash = blake3::hash(url.as_bytes());
        self.dir.join(format!("{}.jpg", hash.to_hex()))
    }

    /// Returns the local path of the image at `url`, downloading it on first use.
    pub fn fetch(&self, url: &str) -> Result<PathBuf, ThumbnailError> {
        let path = self.path_for(url);
        if path.is_file() {
            return Ok(path);
        }

        let bytes = self.fetcher.get_bytes(url)?;
        if bytes.is_empty() {
            return Err(ThumbnailError::EmptyImage(url.to_string()));
        }

        let write_failed = |e: std::io::Error| ThumbnailError::WriteFailed {
            path: path.clone(),
            source: e,
        };
        let temp = create_temp_file_in(&self.dir, "thumb", "part").map_err(write_failed)?;
        fs::write(temp.path(), &bytes).map_err(write_failed)?;
        temp.persist(&path).map_err(write_failed)?;

        tracing::debug!(url, path = %path.display(), "cached thumbnail");
        Ok(path)
    }

    /// Deletes thumbnails not modified within `max_age`, returning how many were removed.
    pub fn purge_older_than(&self, max_age: Duration) -> usize {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return 0;
        };
        let now = SystemTime::now();

        entries
            .flatten()
            .filter(|entry| {
                entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .ok()
                    .and_then(|modified| now.duration_since(modified).ok())
                    .is_some_and(|age| age > max_age)
            })
            .filter(|entry| fs::remove_file(entry.path()).is_ok())
            .count()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::fake::FakeFetcher;
    use std::sync::Arc;

    const IMAGE_URL: &str = "https://api-cdn.arte.tv/img/v2/image/abc/1920x1080";

    #[test]
    fn test_fetch_downloads_once() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeFetcher::new().with_bytes(IMAGE_URL, &[0xFF, 0xD8, 0xFF]));
        let cache = ThumbnailCache::open_in(dir.path(), fake.clone()).unwrap();

        let first = cache.fetch(IMAGE_URL).unwrap();
        let second = cache.fetch(IMAGE_URL).unwrap();

        assert_eq!(first, second);
        assert_eq!(fs::read(&first).unwrap(), vec![0xFF, 0xD8, 0xFF]);
        assert_eq!(fake.request_count(IMAGE_URL), 1);
        assert!(first.file_name().unwrap().to_str().unwrap().ends_with(".jpg"));
    }

    #[test]
    fn test_fetch_failures_leave_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeFetcher::new().with_bytes(IMAGE_URL, &[]));
        let cache = ThumbnailCache::open_in(dir.path(), fake).unwrap();

        assert!(matches!(
            cache.fetch(IMAGE_URL),
            Err(ThumbnailError::EmptyImage(_))
        ));
        assert!(matches!(
            cache.fetch("https://api-cdn.arte.tv/missing"),
            Err(ThumbnailError::Download(_))
        ));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_purge_older_than() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeFetcher::new().with_bytes(IMAGE_URL, b"jpeg"));
        let cache = ThumbnailCache::open_in(dir.path(), fake).unwrap();
        cache.fetch(IMAGE_URL).unwrap();

        assert_eq!(cache.purge_older_than(Duration::from_secs(3600)), 0);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.purge_older_than(Duration::from_millis(1)), 1);
        assert_eq!(fs::read_dir(cache.dir()).unwrap().count(), 0);
    }
}
