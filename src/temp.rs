//! Temporary file management module
//!
//! This module provides RAII-based temporary file handling with automatic
//! cleanup. Cache writes land in a temporary file next to their target and
//! are renamed into place once complete, so readers never see partial files.

use std::fs::{self, File};
use std::io;
use std::ops::Deref;
use std::path::{Path, PathBuf};

/// Guard for temporary resources that automatically cleans up on drop
#[derive(Debug)]
pub(crate) enum TempGuard {
    /// Temporary file that will be deleted when dropped
    File(PathBuf),
}

impl TempGuard {
    /// Get the path to the temporary resource
    pub(crate) fn path(&self) -> &Path {
        match self {
            TempGuard::File(path) => path,
        }
    }

    /// Moves the temporary file to `target`, disarming the cleanup.
    pub(crate) fn persist(mut self, target: &Path) -> io::Result<()> {
        fs::rename(self.path(), target)?;
        match &mut self {
            TempGuard::File(path) => path.clear(),
        }
        Ok(())
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        match self {
            TempGuard::File(path) => {
                if !path.as_os_str().is_empty() {
                    // Silently ignore errors during cleanup
                    let _ = fs::remove_file(path);
                }
            }
        }
    }
}

impl Deref for TempGuard {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        self.path()
    }
}

/// Creates a temporary file in `dir` and returns a guard that will clean it up on drop
///
/// The file name is built from `prefix`, a ULID (monotonic, sortable unique
/// identifier) and `extension`. Creating the file in the target directory
/// keeps the final rename on a single filesystem.
///
/// # Examples
///
/// ```ignore
/// let temp = create_temp_file_in(cache_dir, "listing", "part")?;
/// fs::write(temp.path(), data)?;
/// temp.persist(&cache_dir.join("listing.json"))?;
/// ```
pub(crate) fn create_temp_file_in(
    dir: &Path,
    prefix: &str,
    extension: &str,
) -> io::Result<TempGuard> {
    let ulid = ulid::Ulid::new();
    let path = dir.join(format!(".{}_{}.{}", prefix, ulid, extension));

    File::create(&path)?;

    Ok(TempGuard::File(path))
}
