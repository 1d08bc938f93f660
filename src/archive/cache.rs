//! Extraction cache
//!
//! One subdirectory per imported archive, named by the archive key. The
//! whole cache is purged when the application shuts down.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use walkdir::WalkDir;

use crate::error::{CuetimeError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectCache {
    root: PathBuf,
}

impl ProjectCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Extraction directory for `key`
    pub fn destination(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// True when `key` has already been extracted
    pub fn exists(&self, key: &str) -> bool {
        self.destination(key).is_dir()
    }

    /// Delete the extraction for `key`, if any
    pub fn remove(&self, key: &str) -> Result<()> {
        let path = self.destination(key);
        if !path.exists() {
            return Ok(());
        }
        fs::remove_dir_all(&path).map_err(|e| CuetimeError::FileWriteError { path, source: e })
    }

    /// Keys currently extracted, sorted
    pub fn list(&self) -> Vec<String> {
        if !self.root.exists() {
            return Vec::new();
        }

        let mut keys: Vec<String> = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_dir())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        keys.sort();
        keys
    }

    /// Remove everything under the cache root.
    ///
    /// Entries that cannot be removed are logged and left behind. Returns
    /// the number of entries removed.
    pub fn purge(&self) -> usize {
        if !self.root.exists() {
            return 0;
        }

        let entries: Vec<PathBuf> = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path().to_path_buf())
            .collect();

        let mut removed = 0;
        for path in entries {
            let result = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to purge {}: {}", path.display(), e),
            }
        }

        info!("Purged {} cache entries from {}", removed, self.root.display());
        removed
    }
}
