//! Packing a timeline into a project archive

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::manifest::{Manifest, MANIFEST_NAME};
use crate::error::{CuetimeError, Result};
use crate::timeline::Timeline;

/// A finished archive
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    /// Zip container bytes
    pub bytes: Vec<u8>,
    /// Assets that could not be read; their cues carry no file name
    pub skipped: Vec<PathBuf>,
}

/// Pack `timeline` and every readable cue asset into a zip archive
pub fn export(timeline: &Timeline) -> Result<ExportOutcome> {
    let mut names: HashMap<PathBuf, String> = HashMap::new();
    let mut taken: HashSet<String> = HashSet::from([MANIFEST_NAME.to_string()]);
    let mut entries: Vec<(String, Vec<u8>)> = Vec::new();
    let mut skipped: Vec<PathBuf> = Vec::new();

    for path in asset_paths(timeline) {
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) => {
                warn!("Skipping unreadable asset {}: {}", path.display(), e);
                skipped.push(path);
                continue;
            }
        };

        let name = unique_name(&path, &taken);
        taken.insert(name.clone());
        names.insert(path, name.clone());
        entries.push((name, data));
    }

    let manifest = Manifest::from_timeline(timeline, &names);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    zip.start_file(MANIFEST_NAME, options)?;
    zip.write_all(manifest.to_json()?.as_bytes())?;

    for (name, data) in &entries {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(data)?;
    }

    let bytes = zip.finish()?.into_inner();
    info!(
        "Packed {} blocks and {} assets ({} skipped)",
        timeline.len(),
        entries.len(),
        skipped.len()
    );

    Ok(ExportOutcome { bytes, skipped })
}

/// Export and write the archive to `path`, replacing any existing file
pub fn export_to_file(timeline: &Timeline, path: &Path) -> Result<ExportOutcome> {
    let outcome = export(timeline)?;
    fs::write(path, &outcome.bytes).map_err(|e| CuetimeError::FileWriteError {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(outcome)
}

/// Cue asset paths in timeline order, exact repeats removed
fn asset_paths(timeline: &Timeline) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    timeline
        .iter()
        .filter_map(|block| block.as_cue())
        .filter_map(|cue| cue.asset.clone())
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

/// Base file name of `path`, suffixed `_<n>` before the extension until free
fn unique_name(path: &Path, taken: &HashSet<String>) -> String {
    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "asset".to_string());
    if !taken.contains(&base) {
        return base;
    }

    let base_path = Path::new(&base);
    let stem = base_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = base_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1..)
        .map(|n| format!("{}_{}{}", stem, n, extension))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{Block, CueSettings, SongCue};
    use std::io::Read;
    use std::time::Duration;
    use tempfile::tempdir;
    use zip::ZipArchive;

    fn cue(path: &Path) -> Block {
        Block::song_cue(SongCue::new(
            Duration::from_secs(3),
            Some(path.to_path_buf()),
            CueSettings::default(),
        ))
    }

    fn entry_names(bytes: &[u8]) -> Vec<String> {
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        names
    }

    #[test]
    fn test_unique_name_suffixes_before_extension() {
        let mut taken = HashSet::from(["song.wav".to_string()]);
        assert_eq!(unique_name(Path::new("/b/song.wav"), &taken), "song_1.wav");
        taken.insert("song_1.wav".to_string());
        assert_eq!(unique_name(Path::new("/c/song.wav"), &taken), "song_2.wav");
        assert_eq!(unique_name(Path::new("/d/other.wav"), &taken), "other.wav");
    }

    #[test]
    fn test_manifest_name_is_reserved() {
        let taken = HashSet::from([MANIFEST_NAME.to_string()]);
        assert_eq!(unique_name(Path::new("/x/config.json"), &taken), "config_1.json");
    }

    #[test]
    fn test_same_base_name_gets_two_entries() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        let first = dir.path().join("a/song.wav");
        let second = dir.path().join("b/song.wav");
        fs::write(&first, b"first").unwrap();
        fs::write(&second, b"second").unwrap();

        let timeline = Timeline::from_blocks(vec![cue(&first), cue(&second), cue(&first)]);
        let outcome = export(&timeline).unwrap();

        assert!(outcome.skipped.is_empty());
        assert_eq!(
            entry_names(&outcome.bytes),
            vec!["config.json", "song.wav", "song_1.wav"]
        );

        let mut archive = ZipArchive::new(Cursor::new(outcome.bytes.as_slice())).unwrap();
        let mut data = String::new();
        archive
            .by_name("song_1.wav")
            .unwrap()
            .read_to_string(&mut data)
            .unwrap();
        assert_eq!(data, "second");
    }

    #[test]
    fn test_unreadable_asset_is_skipped() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("gone.wav");
        let timeline = Timeline::from_blocks(vec![Block::wait(Duration::from_secs(1)), cue(&missing)]);

        let outcome = export(&timeline).unwrap();
        assert_eq!(outcome.skipped, vec![missing]);
        assert_eq!(entry_names(&outcome.bytes), vec!["config.json"]);

        let mut archive = ZipArchive::new(Cursor::new(outcome.bytes.as_slice())).unwrap();
        let mut json = String::new();
        archive
            .by_name(MANIFEST_NAME)
            .unwrap()
            .read_to_string(&mut json)
            .unwrap();
        let manifest = Manifest::from_json(&json).unwrap();
        assert_eq!(manifest.blocks.len(), 2);
        assert_eq!(manifest.blocks[1].file_name(), None);
    }

    #[test]
    fn test_export_to_unwritable_path_fails() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("missing-dir").join("out.zip");
        let err = export_to_file(&Timeline::new(), &target).unwrap_err();
        assert!(matches!(err, CuetimeError::FileWriteError { .. }));
    }
}
