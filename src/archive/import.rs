//! Restoring a project archive into the extraction cache
//!
//! The manifest is read and validated in memory before anything is written.
//! An archive whose key was already extracted is never overwritten silently:
//! the caller gets a [`PendingImport`] and must choose.

use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use log::{info, warn};
use zip::result::ZipError;
use zip::ZipArchive;

use super::cache::ProjectCache;
use super::manifest::{is_plain_file_name, Manifest, MANIFEST_NAME};
use crate::error::{CuetimeError, Result};
use crate::timeline::Timeline;

/// An archive extracted into the cache
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedProject {
    /// Archive key (file stem), also the cache subdirectory name
    pub key: String,
    pub asset_dir: PathBuf,
    pub manifest: Manifest,
}

impl ImportedProject {
    /// Rebuild the timeline with assets resolved inside `asset_dir`
    pub fn into_timeline(self) -> Result<Timeline> {
        self.manifest.into_timeline(&self.asset_dir)
    }
}

/// An import blocked by an earlier extraction of the same key
#[derive(Debug)]
#[must_use = "a pending import does nothing until overwritten or cancelled"]
pub struct PendingImport {
    key: String,
    bytes: Vec<u8>,
    manifest: Manifest,
    destination: PathBuf,
}

impl PendingImport {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Directory holding the earlier extraction
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Delete the earlier extraction and extract this archive in its place
    pub fn overwrite(self, cache: &ProjectCache) -> Result<ImportedProject> {
        info!("Overwriting earlier import of '{}'", self.key);
        cache.remove(&self.key)?;
        extract(&self.bytes, &self.destination)?;
        Ok(ImportedProject {
            key: self.key,
            asset_dir: self.destination,
            manifest: self.manifest,
        })
    }

    /// Drop the import; nothing on disk changes
    pub fn cancel(self) {
        info!("Import of '{}' cancelled", self.key);
    }
}

/// Result of an import attempt that did not fail
#[derive(Debug)]
pub enum ImportOutcome {
    Imported(ImportedProject),
    Conflict(PendingImport),
}

/// Import archive `bytes` named `archive_name` (e.g. `show.zip`) into `cache`
pub fn import(bytes: &[u8], archive_name: &str, cache: &ProjectCache) -> Result<ImportOutcome> {
    let key = archive_key(archive_name)?;
    let manifest = read_manifest(bytes)?;
    let destination = cache.destination(&key);

    if cache.exists(&key) {
        warn!("Archive '{}' was already imported", key);
        return Ok(ImportOutcome::Conflict(PendingImport {
            key,
            bytes: bytes.to_vec(),
            manifest,
            destination,
        }));
    }

    extract(bytes, &destination)?;
    info!("Imported '{}' ({} blocks)", key, manifest.blocks.len());

    Ok(ImportOutcome::Imported(ImportedProject {
        key,
        asset_dir: destination,
        manifest,
    }))
}

/// Read `path` and import it under its file name
pub fn import_file(path: &Path, cache: &ProjectCache) -> Result<ImportOutcome> {
    let bytes = fs::read(path).map_err(|e| CuetimeError::FileReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    import(&bytes, &name, cache)
}

/// Cache key for an archive: its file stem
pub fn archive_key(archive_name: &str) -> Result<String> {
    let invalid = || CuetimeError::InvalidArchiveName {
        name: archive_name.to_string(),
    };

    if !is_plain_file_name(archive_name) {
        return Err(invalid());
    }
    let stem = Path::new(archive_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(invalid)?;

    if is_plain_file_name(&stem) {
        Ok(stem)
    } else {
        Err(invalid())
    }
}

/// Open the archive and parse its manifest without touching disk
fn read_manifest(bytes: &[u8]) -> Result<Manifest> {
    if bytes.is_empty() {
        return Err(CuetimeError::EmptyArchive);
    }

    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    if archive.len() == 0 {
        return Err(CuetimeError::EmptyArchive);
    }

    let mut json = String::new();
    match archive.by_name(MANIFEST_NAME) {
        Ok(mut entry) => {
            entry.read_to_string(&mut json)?;
        }
        Err(ZipError::FileNotFound) => {
            return Err(CuetimeError::MissingManifest {
                entry: MANIFEST_NAME,
            })
        }
        Err(e) => return Err(e.into()),
    }

    let manifest = Manifest::from_json(&json)?;
    manifest.validate_archive_names()?;
    Ok(manifest)
}

/// Extract every entry below `destination`.
///
/// Entries whose names would escape the directory are rejected by the zip
/// reader. A failed extraction removes the partial directory.
fn extract(bytes: &[u8], destination: &Path) -> Result<()> {
    fs::create_dir_all(destination).map_err(|e| CuetimeError::DirectoryCreateError {
        path: destination.to_path_buf(),
        source: e,
    })?;

    let result =
        ZipArchive::new(Cursor::new(bytes)).and_then(|mut archive| archive.extract(destination));
    if let Err(e) = result {
        warn!("Extraction into {} failed: {}", destination.display(), e);
        let _ = fs::remove_dir_all(destination);
        return Err(e.into());
    }
    Ok(())
}
