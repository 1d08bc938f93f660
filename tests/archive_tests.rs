//! Archive Integration Tests
//!
//! Export, import and cache behaviour through the public API.

use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveTime;
use hound::{SampleFormat, WavSpec, WavWriter};
use pretty_assertions::assert_eq;
use tempfile::tempdir;
use zip::ZipArchive;

use cuetime::archive::{export, import, ImportOutcome, ProjectCache, MANIFEST_NAME};
use cuetime::timeline::{Block, BlockKind, CueSettings, SongCue, Timeline};
use cuetime::workspace::{OpenOutcome, Resolution, Workspace};

/// Write a silent mono 16-bit WAV of `seconds` at 8 kHz
fn write_wav(path: &Path, seconds: u32) {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for _ in 0..8000 * seconds {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();
}

fn cue(path: &Path, seconds: u64, settings: CueSettings) -> Block {
    Block::song_cue(SongCue::new(
        Duration::from_secs(seconds),
        Some(path.to_path_buf()),
        settings,
    ))
}

/// Block content without ids or asset locations
fn shape(timeline: &Timeline) -> Vec<String> {
    timeline
        .iter()
        .map(|block| match block.kind() {
            BlockKind::Wait { duration } => format!("Wait {:?}", duration),
            BlockKind::WaitUntil { anchor } => format!("WaitUntil {}", anchor),
            BlockKind::SongCue(cue) => format!("SongCue {:?} {:?}", cue.duration, cue.settings),
        })
        .collect()
}

fn archive_entry(bytes: &[u8], name: &str) -> Vec<u8> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut data = Vec::new();
    archive.by_name(name).unwrap().read_to_end(&mut data).unwrap();
    data
}

fn imported(outcome: ImportOutcome) -> cuetime::archive::ImportedProject {
    match outcome {
        ImportOutcome::Imported(project) => project,
        ImportOutcome::Conflict(pending) => panic!("unexpected conflict for {}", pending.key()),
    }
}

// === Round Trip ===

#[test]
fn test_round_trip_preserves_blocks_and_assets() {
    let work = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let intro = work.path().join("intro.wav");
    let outro = work.path().join("outro.wav");
    write_wav(&intro, 2);
    write_wav(&outro, 3);

    let original = Timeline::from_blocks(vec![
        Block::wait(Duration::from_secs(5)),
        cue(&intro, 2, CueSettings::new(false, 0.8, 1.0, 0.5)),
        Block::wait_until(NaiveTime::from_hms_opt(8, 0, 0).unwrap()),
        cue(&outro, 3, CueSettings::new(true, 0.25, 0.0, 2.0)),
        cue(&intro, 2, CueSettings::default().with_normalize(true)),
    ]);

    let outcome = export(&original).unwrap();
    assert!(outcome.skipped.is_empty());

    let cache = ProjectCache::new(cache_dir.path());
    let project = imported(import(&outcome.bytes, "morning.zip", &cache).unwrap());
    let restored = project.into_timeline().unwrap();

    assert_eq!(shape(&restored), shape(&original));
    for (before, after) in original.iter().zip(restored.iter()) {
        assert_eq!(before.computed_start(), after.computed_start());
        assert_eq!(before.is_anchored(), after.is_anchored());
    }

    let restored_asset = restored.get(3).unwrap().as_cue().unwrap().asset.clone().unwrap();
    assert_eq!(restored_asset, cache_dir.path().join("morning").join("outro.wav"));
    assert_eq!(fs::read(restored_asset).unwrap(), fs::read(&outro).unwrap());

    // The repeated asset is stored once
    let first = restored.get(1).unwrap().as_cue().unwrap().asset.clone();
    let last = restored.get(4).unwrap().as_cue().unwrap().asset.clone();
    assert_eq!(first, last);
}

#[test]
fn test_empty_timeline_round_trips() {
    let cache_dir = tempdir().unwrap();
    let outcome = export(&Timeline::new()).unwrap();
    assert!(outcome.skipped.is_empty());

    let manifest = String::from_utf8(archive_entry(&outcome.bytes, MANIFEST_NAME)).unwrap();
    assert!(manifest.contains(r#""blocks": []"#));

    let cache = ProjectCache::new(cache_dir.path());
    let restored = imported(import(&outcome.bytes, "blank.zip", &cache).unwrap())
        .into_timeline()
        .unwrap();
    assert!(restored.is_empty());
    assert!(cache_dir.path().join("blank").is_dir());
}

#[test]
fn test_sub_second_waits_round_trip() {
    let cache_dir = tempdir().unwrap();
    let original = Timeline::from_blocks(vec![
        Block::wait(Duration::from_millis(1500)),
        Block::wait(Duration::from_secs(1)),
        Block::wait(Duration::from_millis(250)),
    ]);

    let bytes = export(&original).unwrap().bytes;
    let cache = ProjectCache::new(cache_dir.path());
    let restored = imported(import(&bytes, "fractions.zip", &cache).unwrap())
        .into_timeline()
        .unwrap();

    assert_eq!(shape(&restored), shape(&original));
    assert_eq!(restored.get(1).unwrap().computed_start(), Duration::from_millis(1500));
    assert_eq!(restored.get(2).unwrap().computed_start(), Duration::from_millis(2500));
}

#[test]
fn test_same_base_name_from_different_folders() {
    let work = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let paths: Vec<PathBuf> = ["a", "b"]
        .iter()
        .map(|folder| {
            fs::create_dir_all(work.path().join(folder)).unwrap();
            work.path().join(folder).join("song.wav")
        })
        .collect();
    write_wav(&paths[0], 1);
    write_wav(&paths[1], 2);

    let timeline = Timeline::from_blocks(vec![
        cue(&paths[0], 1, CueSettings::default()),
        cue(&paths[1], 2, CueSettings::default()),
    ]);
    let bytes = export(&timeline).unwrap().bytes;

    assert_eq!(archive_entry(&bytes, "song.wav"), fs::read(&paths[0]).unwrap());
    assert_eq!(archive_entry(&bytes, "song_1.wav"), fs::read(&paths[1]).unwrap());

    let manifest = String::from_utf8(archive_entry(&bytes, MANIFEST_NAME)).unwrap();
    assert!(manifest.contains(r#""fileName": "song.wav""#));
    assert!(manifest.contains(r#""fileName": "song_1.wav""#));

    let cache = ProjectCache::new(cache_dir.path());
    let restored = imported(import(&bytes, "pair.zip", &cache).unwrap())
        .into_timeline()
        .unwrap();
    let names: Vec<String> = restored
        .iter()
        .filter_map(|b| b.as_cue()?.asset.as_ref()?.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["song.wav", "song_1.wav"]);
}

#[test]
fn test_missing_asset_exports_cue_without_file() {
    let work = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let missing = work.path().join("gone.wav");

    let timeline = Timeline::from_blocks(vec![cue(&missing, 4, CueSettings::default())]);
    let outcome = export(&timeline).unwrap();
    assert_eq!(outcome.skipped, vec![missing]);

    let cache = ProjectCache::new(cache_dir.path());
    let restored = imported(import(&outcome.bytes, "partial.zip", &cache).unwrap())
        .into_timeline()
        .unwrap();
    let cue = restored.get(0).unwrap().as_cue().unwrap();
    assert_eq!(cue.asset, None);
    assert_eq!(cue.duration, Duration::from_secs(4));
}

// === Workspace Import ===

#[test]
fn test_import_refreshes_cue_metadata_from_assets() {
    let work = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let song = work.path().join("anthem.wav");
    write_wav(&song, 3);

    // Stored duration is stale; the decoder corrects it after import
    let timeline = Timeline::from_blocks(vec![
        cue(&song, 60, CueSettings::default()),
        Block::wait(Duration::from_secs(1)),
    ]);
    let archive = work.path().join("show.zip");
    fs::write(&archive, export(&timeline).unwrap().bytes).unwrap();

    let mut workspace = Workspace::new(ProjectCache::new(cache_dir.path()));
    let OpenOutcome::Opened(name) = workspace.import_archive(&archive).unwrap() else {
        panic!("expected a fresh import");
    };
    let page = workspace.page_mut(&name).unwrap();
    page.wait_for_assets(Duration::from_secs(5));

    let cue = page.timeline().get(0).unwrap().as_cue().unwrap();
    assert_eq!(cue.duration, Duration::from_secs(3));
    assert_eq!(cue.info.title, "anthem");
    assert_eq!(
        page.timeline().get(1).unwrap().computed_start(),
        Duration::from_secs(3)
    );
}

#[test]
fn test_conflict_without_overwrite_leaves_everything_untouched() {
    let work = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let song = work.path().join("song.wav");
    write_wav(&song, 1);

    let archive = work.path().join("show.zip");
    let timeline = Timeline::from_blocks(vec![cue(&song, 1, CueSettings::default())]);
    fs::write(&archive, export(&timeline).unwrap().bytes).unwrap();

    let mut workspace = Workspace::new(ProjectCache::new(cache_dir.path()));
    workspace.import_archive(&archive).unwrap();
    workspace
        .page_mut("show")
        .unwrap()
        .timeline_mut()
        .push(Block::wait(Duration::from_secs(9)));
    let extracted = cache_dir.path().join("show").join("song.wav");
    let before_bytes = fs::read(&extracted).unwrap();

    // A different archive with the same key
    let replacement = Timeline::from_blocks(vec![Block::wait(Duration::from_secs(2))]);
    fs::write(&archive, export(&replacement).unwrap().bytes).unwrap();

    let OpenOutcome::Conflict(pending) = workspace.import_archive(&archive).unwrap() else {
        panic!("expected a conflict");
    };
    assert_eq!(pending.destination(), cache_dir.path().join("show"));
    workspace.resolve_import(pending, Resolution::Cancel).unwrap();

    assert_eq!(fs::read(&extracted).unwrap(), before_bytes);
    assert_eq!(workspace.page_names(), vec!["show"]);
    assert_eq!(workspace.page("show").unwrap().timeline().len(), 2);
}

#[test]
fn test_overwrite_replaces_extraction_and_page() {
    let work = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let song = work.path().join("song.wav");
    write_wav(&song, 1);

    let archive = work.path().join("show.zip");
    let timeline = Timeline::from_blocks(vec![cue(&song, 1, CueSettings::default())]);
    fs::write(&archive, export(&timeline).unwrap().bytes).unwrap();

    let mut workspace = Workspace::new(ProjectCache::new(cache_dir.path()));
    workspace.import_archive(&archive).unwrap();

    let replacement = Timeline::from_blocks(vec![
        Block::wait(Duration::from_secs(2)),
        Block::wait(Duration::from_secs(3)),
    ]);
    fs::write(&archive, export(&replacement).unwrap().bytes).unwrap();

    let OpenOutcome::Conflict(pending) = workspace.import_archive(&archive).unwrap() else {
        panic!("expected a conflict");
    };
    workspace
        .resolve_import(pending, Resolution::Overwrite)
        .unwrap();

    assert!(!cache_dir.path().join("show").join("song.wav").exists());
    assert_eq!(workspace.page_names(), vec!["show"]);
    assert_eq!(workspace.page("show").unwrap().timeline().len(), 2);
}

#[test]
fn test_shutdown_purges_every_extraction() {
    let work = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let mut workspace = Workspace::new(ProjectCache::new(cache_dir.path()));

    for name in ["one.zip", "two.zip"] {
        let path = work.path().join(name);
        let timeline = Timeline::from_blocks(vec![Block::wait(Duration::from_secs(1))]);
        fs::write(&path, export(&timeline).unwrap().bytes).unwrap();
        workspace.import_archive(&path).unwrap();
    }
    assert_eq!(workspace.cache().list(), vec!["one", "two"]);

    assert_eq!(workspace.shutdown(), 2);
    assert!(workspace.cache().list().is_empty());
}
