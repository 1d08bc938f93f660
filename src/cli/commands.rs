//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fs;
use std::ops::ControlFlow;
use std::path::Path;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::archive::{export_to_file, Manifest, ProjectCache};
use crate::config::Settings;
use crate::engine::{
    AssetDecoder, Clock, LoadCompletion, PlaybackEvent, PollLoop, SystemClock, WavDecoder,
};
use crate::error::{CuetimeError, Result};
use crate::timeline::{
    format_duration, format_time_of_day, parse_duration, parse_time_of_day, Block, BlockKind,
};
use crate::workspace::{OpenOutcome, Resolution, Workspace};

/// How long to wait for imported assets to decode
const ASSET_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Parse and print a duration.
pub fn duration(text: &str) -> Result<()> {
    let parsed = parse_duration(text)?;
    println!("{}", format_duration(parsed));
    Ok(())
}

/// Parse and print a time of day.
pub fn time(text: &str) -> Result<()> {
    let parsed = parse_time_of_day(text)?;
    println!("{}", format_time_of_day(parsed));
    Ok(())
}

/// Import an archive and print each block with its timing.
pub fn inspect(settings: &Settings, archive: &Path, overwrite: bool) -> Result<()> {
    info!("Inspecting archive: {}", archive.display());

    let mut workspace = Workspace::new(ProjectCache::new(&settings.cache_root));
    let Some(name) = open_archive(&mut workspace, archive, overwrite)? else {
        return Ok(());
    };

    if let Some(page) = workspace.page_mut(&name) {
        report_loads(page.wait_for_assets(ASSET_LOAD_TIMEOUT));

        println!("=== {} ===", name);
        println!("Blocks: {}", page.timeline().len());
        println!();
        for (index, block) in page.timeline().iter().enumerate() {
            println!("{:>3}. {}", index, describe(block));
        }
    }

    workspace.shutdown();
    Ok(())
}

/// Build an archive from a manifest whose cue file names are paths.
///
/// Relative paths are resolved against the manifest's directory.
pub fn pack(manifest_path: &Path, output: &Path) -> Result<()> {
    info!("Packing {} into {}", manifest_path.display(), output.display());

    let json = fs::read_to_string(manifest_path).map_err(|e| CuetimeError::FileReadError {
        path: manifest_path.to_path_buf(),
        source: e,
    })?;
    let base_dir = manifest_path.parent().unwrap_or(Path::new("."));
    let mut timeline = Manifest::from_json(&json)?.into_timeline(base_dir)?;

    let decoder = WavDecoder;
    let cues: Vec<_> = timeline
        .iter()
        .filter_map(|block| Some((block.id(), block.as_cue()?.asset.clone()?)))
        .collect();
    for (id, path) in cues {
        match decoder.decode(&path) {
            Ok(asset) => {
                timeline.apply_asset(id, asset);
            }
            Err(e) => warn!("Keeping manifest duration for {}: {}", path.display(), e),
        }
    }

    let outcome = export_to_file(&timeline, output)?;

    println!("Archive written: {}", output.display());
    println!("Blocks: {}", timeline.len());
    if !outcome.skipped.is_empty() {
        println!();
        println!("Skipped unreadable assets:");
        for path in &outcome.skipped {
            println!("  - {}", path.display());
        }
    }

    Ok(())
}

/// Import an archive and play it with a silent output.
pub fn play(
    settings: &Settings,
    archive: &Path,
    seconds: Option<u64>,
    overwrite: bool,
) -> Result<()> {
    let mut workspace = Workspace::new(ProjectCache::new(&settings.cache_root));
    let Some(name) = open_archive(&mut workspace, archive, overwrite)? else {
        return Ok(());
    };

    if let Some(page) = workspace.page_mut(&name) {
        report_loads(page.wait_for_assets(ASSET_LOAD_TIMEOUT));
    }

    let clock = SystemClock;
    let started = Instant::now();
    let now = clock.now();
    workspace.set_playing(&name, true, now)?;

    let limit = match seconds {
        Some(s) => Duration::from_secs(s),
        None => remaining_span(&workspace, &name, now),
    };
    println!("Playing '{}' for {}", name, format_duration(limit));

    let poll = PollLoop::new(settings.tick_interval());
    let ticks = poll.run(|| {
        for page_event in workspace.tick(clock.now()) {
            print_event(&page_event.event);
        }
        if started.elapsed() >= limit {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });

    if let Some(event) = workspace.set_playing(&name, false, clock.now())? {
        print_event(&event);
    }
    info!("Stopped after {} ticks", ticks);

    workspace.shutdown();
    Ok(())
}

/// Remove every extraction from the cache.
pub fn purge_cache(settings: &Settings) -> Result<()> {
    let cache = ProjectCache::new(&settings.cache_root);
    let removed = cache.purge();
    println!("Removed {} entries from {}", removed, cache.root().display());
    Ok(())
}

fn open_archive(
    workspace: &mut Workspace,
    archive: &Path,
    overwrite: bool,
) -> Result<Option<String>> {
    match workspace.import_archive(archive)? {
        OpenOutcome::Opened(name) => Ok(Some(name)),
        OpenOutcome::Conflict(pending) => {
            let resolution = if overwrite {
                Resolution::Overwrite
            } else {
                println!(
                    "Archive '{}' is already imported at {}",
                    pending.key(),
                    pending.destination().display()
                );
                println!("Use --overwrite to replace it");
                Resolution::Cancel
            };
            workspace.resolve_import(pending, resolution)
        }
    }
}

/// Time from `now` until the last block window on the page closes
fn remaining_span(workspace: &Workspace, name: &str, now: Duration) -> Duration {
    let Some(page) = workspace.page(name) else {
        return Duration::ZERO;
    };
    let Some(session) = page.scheduler().session() else {
        return Duration::ZERO;
    };

    page.timeline()
        .iter()
        .map(|block| session.window(block).end)
        .max()
        .map(|end| end.saturating_sub(now))
        .unwrap_or_default()
}

fn report_loads(completions: Vec<LoadCompletion>) {
    for completion in completions {
        if let LoadCompletion::Failed { error, .. } = completion {
            warn!("{}", error);
        }
    }
}

fn describe(block: &Block) -> String {
    let label = block.window_label();
    match block.kind() {
        BlockKind::Wait { duration } => format!("Wait {} [{}]", format_duration(*duration), label),
        BlockKind::WaitUntil { .. } => format!("WaitUntil [{}]", label),
        BlockKind::SongCue(cue) => {
            let file = cue
                .asset
                .as_deref()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "<no asset>".to_string());
            format!(
                "SongCue {} ({} - {}) [{}] vol {:.2} fade {:.1}/{:.1}{}{}",
                file,
                cue.info.title,
                cue.info.artist,
                label,
                cue.settings.volume,
                cue.settings.fade_in,
                cue.settings.fade_out,
                if cue.settings.muted { " muted" } else { "" },
                if cue.settings.normalize { " normalized" } else { "" }
            )
        }
    }
}

fn print_event(event: &PlaybackEvent) {
    match event {
        PlaybackEvent::Started {
            index, offset, mode, ..
        } => println!(
            "[{}] block {} started at +{:.2}s",
            mode,
            index,
            offset.as_secs_f64()
        ),
        PlaybackEvent::Stopped { block, reason } => {
            println!("block {} stopped ({:?})", block, reason)
        }
    }
}
