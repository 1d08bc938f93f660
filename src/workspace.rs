//! Workspace: open pages, the current selection and the import cache
//!
//! Each page owns one timeline, one scheduler and one output channel. Pages
//! are independent: each plays or stops on its own.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::archive::{
    export_to_file, import_file, ExportOutcome, ImportOutcome, ImportedProject, PendingImport,
    ProjectCache,
};
use crate::engine::{
    AssetDecoder, AssetLoader, AudioOutput, LoadCompletion, PlaybackEvent, PlaybackScheduler,
    SilentOutput, WavDecoder,
};
use crate::error::{CuetimeError, Result};
use crate::timeline::Timeline;

/// Base name for new pages (`page`, `page1`, `page2`, ...)
pub const DEFAULT_PAGE_NAME: &str = "page";

/// Builds the output channel for each new page
pub type OutputFactory = Box<dyn Fn() -> Box<dyn AudioOutput>>;

// ============================================================================
// Page
// ============================================================================

/// One open timeline with its own playback
pub struct Page {
    name: String,
    timeline: Timeline,
    /// Archive key the page was imported from
    source_key: Option<String>,
    scheduler: PlaybackScheduler<Box<dyn AudioOutput>>,
    loader: AssetLoader,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("name", &self.name)
            .field("blocks", &self.timeline.len())
            .field("source_key", &self.source_key)
            .field("playing", &self.scheduler.is_session_on())
            .finish()
    }
}

impl Page {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }

    pub fn source_key(&self) -> Option<&str> {
        self.source_key.as_deref()
    }

    pub fn scheduler(&self) -> &PlaybackScheduler<Box<dyn AudioOutput>> {
        &self.scheduler
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.is_session_on()
    }

    /// Window progress of the block at `index` in the running session
    pub fn progress(&self, index: usize, now: Duration) -> Option<f32> {
        let block = self.timeline.get(index)?;
        self.scheduler.progress(block, now)
    }

    /// Decode `path` in the background and attach it to the cue at `index`
    pub fn request_asset(&mut self, index: usize, path: &Path) -> bool {
        match self.timeline.get(index) {
            Some(block) if block.as_cue().is_some() => {
                self.loader.request(block.id(), path);
                true
            }
            Some(_) => {
                warn!("Block {} on page '{}' is not a cue", index, self.name);
                false
            }
            None => {
                warn!("No block {} on page '{}'", index, self.name);
                false
            }
        }
    }

    pub fn pending_loads(&self) -> usize {
        self.loader.pending()
    }

    /// Block until this page's asset loads finish or `timeout` passes
    pub fn wait_for_assets(&mut self, timeout: Duration) -> Vec<LoadCompletion> {
        self.loader.wait_for(&mut self.timeline, timeout)
    }

    pub fn start_preview(&mut self, index: usize, progress: f32, now: Duration) -> bool {
        self.scheduler
            .start_preview(&self.timeline, index, progress, now)
            .is_some()
    }

    pub fn move_preview(&mut self, progress: f32, now: Duration) -> bool {
        self.scheduler.move_preview(&self.timeline, progress, now)
    }

    pub fn preview_progress(&self, now: Duration) -> f32 {
        self.scheduler.preview_progress(&self.timeline, now)
    }

    pub fn stop_preview(&mut self) -> Option<PlaybackEvent> {
        self.scheduler.stop_preview()
    }

    fn tick(&mut self, now: Duration) -> Option<PlaybackEvent> {
        for completion in self.loader.drain_into(&mut self.timeline) {
            if let LoadCompletion::Applied { asset, .. } = completion {
                info!("Loaded '{}' on page '{}'", asset.info.title, self.name);
            }
        }
        self.scheduler.tick(&self.timeline, now)
    }

    fn stop_all(&mut self) {
        self.scheduler.stop_preview();
        self.scheduler.stop_session();
    }
}

// ============================================================================
// Workspace
// ============================================================================

/// A playback transition on a named page
#[derive(Debug, Clone, PartialEq)]
pub struct PageEvent {
    pub page: String,
    pub event: PlaybackEvent,
}

/// Result of opening an archive
#[derive(Debug)]
pub enum OpenOutcome {
    /// A new page with this name was opened
    Opened(String),
    /// The archive was imported before; see [`Workspace::resolve_import`]
    Conflict(PendingImport),
}

/// Answer to an import conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Overwrite,
    Cancel,
}

pub struct Workspace {
    pages: Vec<Page>,
    selected: Option<String>,
    cache: ProjectCache,
    decoder: Arc<dyn AssetDecoder>,
    output_factory: OutputFactory,
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("pages", &self.pages)
            .field("selected", &self.selected)
            .field("cache", &self.cache)
            .finish()
    }
}

impl Workspace {
    /// Workspace with silent outputs and the WAV decoder
    pub fn new(cache: ProjectCache) -> Self {
        Self {
            pages: Vec::new(),
            selected: None,
            cache,
            decoder: Arc::new(WavDecoder),
            output_factory: Box::new(|| Box::new(SilentOutput::new()) as Box<dyn AudioOutput>),
        }
    }

    pub fn with_output_factory(mut self, factory: OutputFactory) -> Self {
        self.output_factory = factory;
        self
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn AssetDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn cache(&self) -> &ProjectCache {
        &self.cache
    }

    // ========================================================================
    // Pages
    // ========================================================================

    /// Open an empty page and select it. Returns the page name.
    pub fn add_page(&mut self, name: Option<&str>) -> String {
        self.open_page(name.unwrap_or(DEFAULT_PAGE_NAME), Timeline::new(), None)
    }

    pub fn page_names(&self) -> Vec<&str> {
        self.pages.iter().map(Page::name).collect()
    }

    pub fn page(&self, name: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.name == name)
    }

    pub fn page_mut(&mut self, name: &str) -> Option<&mut Page> {
        self.pages.iter_mut().find(|p| p.name == name)
    }

    pub fn select(&mut self, name: &str) -> Result<()> {
        if self.page(name).is_none() {
            return Err(page_not_found(name));
        }
        self.selected = Some(name.to_string());
        Ok(())
    }

    pub fn selected(&self) -> Option<&Page> {
        self.selected.as_deref().and_then(|name| self.page(name))
    }

    pub fn selected_mut(&mut self) -> Option<&mut Page> {
        let name = self.selected.clone()?;
        self.page_mut(&name)
    }

    /// Close a page, stopping its playback and dropping pending loads
    pub fn close_page(&mut self, name: &str) -> Result<()> {
        let index = self
            .pages
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| page_not_found(name))?;

        let mut page = self.pages.remove(index);
        page.stop_all();
        info!("Closed page '{}'", page.name);

        if self.selected.as_deref() == Some(name) {
            self.selected = self.pages.last().map(|p| p.name.clone());
        }
        Ok(())
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Turn a page's session on or off
    pub fn set_playing(
        &mut self,
        name: &str,
        on: bool,
        now: Duration,
    ) -> Result<Option<PlaybackEvent>> {
        let page = self.page_mut(name).ok_or_else(|| page_not_found(name))?;
        if on {
            page.scheduler.start_session(now);
            Ok(None)
        } else {
            Ok(page.scheduler.stop_session())
        }
    }

    /// Advance every page to `now`
    pub fn tick(&mut self, now: Duration) -> Vec<PageEvent> {
        self.pages
            .iter_mut()
            .filter_map(|page| {
                page.tick(now).map(|event| PageEvent {
                    page: page.name.clone(),
                    event,
                })
            })
            .collect()
    }

    pub fn request_asset(&mut self, name: &str, index: usize, path: &Path) -> Result<bool> {
        let page = self.page_mut(name).ok_or_else(|| page_not_found(name))?;
        Ok(page.request_asset(index, path))
    }

    // ========================================================================
    // Archives
    // ========================================================================

    pub fn export_page(&self, name: &str, path: &Path) -> Result<ExportOutcome> {
        let page = self.page(name).ok_or_else(|| page_not_found(name))?;
        export_to_file(&page.timeline, path)
    }

    /// Import the archive at `path` into the cache and open it as a page
    pub fn import_archive(&mut self, path: &Path) -> Result<OpenOutcome> {
        match import_file(path, &self.cache)? {
            ImportOutcome::Imported(project) => {
                Ok(OpenOutcome::Opened(self.open_project(project)?))
            }
            ImportOutcome::Conflict(pending) => Ok(OpenOutcome::Conflict(pending)),
        }
    }

    /// Settle an import conflict.
    ///
    /// Overwriting closes every page opened from the earlier extraction.
    /// Returns the new page name, or `None` when cancelled.
    pub fn resolve_import(
        &mut self,
        pending: PendingImport,
        resolution: Resolution,
    ) -> Result<Option<String>> {
        match resolution {
            Resolution::Cancel => {
                pending.cancel();
                Ok(None)
            }
            Resolution::Overwrite => {
                let stale: Vec<String> = self
                    .pages
                    .iter()
                    .filter(|p| p.source_key() == Some(pending.key()))
                    .map(|p| p.name.clone())
                    .collect();
                for name in stale {
                    self.close_page(&name)?;
                }

                let project = pending.overwrite(&self.cache)?;
                self.open_project(project).map(Some)
            }
        }
    }

    /// Stop all playback, close every page and purge the import cache
    pub fn shutdown(&mut self) -> usize {
        for page in &mut self.pages {
            page.stop_all();
        }
        self.pages.clear();
        self.selected = None;
        self.cache.purge()
    }

    fn open_project(&mut self, project: ImportedProject) -> Result<String> {
        let key = project.key.clone();
        let timeline = project.into_timeline()?;
        let name = self.open_page(&key, timeline, Some(key.clone()));

        // Refresh cue durations and metadata from the extracted assets
        if let Some(page) = self.page_mut(&name) {
            let assets: Vec<_> = page
                .timeline
                .iter()
                .filter_map(|block| Some((block.id(), block.as_cue()?.asset.clone()?)))
                .collect();
            for (id, path) in assets {
                page.loader.request(id, path);
            }
        }

        Ok(name)
    }

    fn open_page(&mut self, base: &str, timeline: Timeline, source_key: Option<String>) -> String {
        let name = next_page_name(base, self.pages.iter().map(Page::name));
        self.pages.push(Page {
            name: name.clone(),
            timeline,
            source_key,
            scheduler: PlaybackScheduler::new((self.output_factory)()),
            loader: AssetLoader::new(Arc::clone(&self.decoder)),
        });
        self.selected = Some(name.clone());
        info!("Opened page '{}'", name);
        name
    }
}

fn page_not_found(name: &str) -> CuetimeError {
    CuetimeError::PageNotFound {
        name: name.to_string(),
    }
}

/// `base` if no page uses it yet, else `base<n>` with n one past the highest taken
fn next_page_name<'a>(base: &str, taken: impl Iterator<Item = &'a str>) -> String {
    let highest = taken
        .filter_map(|name| {
            let suffix = name.strip_prefix(base)?;
            if suffix.is_empty() {
                Some(0)
            } else if suffix.bytes().all(|b| b.is_ascii_digit()) {
                suffix.parse::<u32>().ok()
            } else {
                None
            }
        })
        .max();

    match highest {
        None => base.to_string(),
        Some(n) => format!("{}{}", base, n + 1),
    }
}
