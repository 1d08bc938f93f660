//! Timeline blocks
//!
//! A block is one scheduled unit: a fixed pause, a wall-clock anchor, or an
//! audio cue. Scheduling fields (`computed_start`, `is_anchored`) belong to
//! the timeline and are only ever written by its recompute pass.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::parse::{format_clock, format_time_of_day, time_of_day_offset};

// ============================================================================
// Constants
// ============================================================================

/// Maximum fade length in seconds (fade in and fade out alike)
pub const MAX_FADE_SECONDS: f32 = 30.0;

/// Volume change per step of the settings controls
pub const VOLUME_STEP: f32 = 0.05;

/// Fade change per step of the settings controls, in seconds
pub const FADE_STEP: f32 = 0.5;

/// Placeholder metadata shown before an asset has been loaded
const NO_METADATA: &str = "none";

/// Peaks at or below this level are treated as silence and never boosted
pub const SILENCE_PEAK: f32 = 0.0001;

// ============================================================================
// Identity
// ============================================================================

/// Stable identity of a block, independent of its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(Uuid);

impl BlockId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Cue Settings
// ============================================================================

/// Per-cue playback settings.
///
/// Field names follow the archive manifest (`fadeIn`, `fadeOut`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CueSettings {
    /// Hard gate on audible output, independent of the gain envelope
    pub muted: bool,
    /// Steady-state gain (0.0 - 1.0)
    pub volume: f32,
    /// Fade-in length in seconds (0 - 30)
    pub fade_in: f32,
    /// Fade-out length in seconds (0 - 30)
    pub fade_out: f32,
    /// Scale playback so the asset's loudest sample reaches full scale
    #[serde(default)]
    pub normalize: bool,
}

impl Default for CueSettings {
    fn default() -> Self {
        Self {
            muted: false,
            volume: 1.0,
            fade_in: 0.0,
            fade_out: 0.0,
            normalize: false,
        }
    }
}

impl CueSettings {
    /// Create settings, clamping every value to its valid range
    pub fn new(muted: bool, volume: f32, fade_in: f32, fade_out: f32) -> Self {
        Self {
            muted,
            volume: clamp_or_zero(volume, 1.0),
            fade_in: clamp_or_zero(fade_in, MAX_FADE_SECONDS),
            fade_out: clamp_or_zero(fade_out, MAX_FADE_SECONDS),
            normalize: false,
        }
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Same settings with every value forced into range
    pub fn clamped(self) -> Self {
        Self::new(self.muted, self.volume, self.fade_in, self.fade_out)
            .with_normalize(self.normalize)
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn set_normalize(&mut self, normalize: bool) {
        self.normalize = normalize;
    }

    pub fn volume_up(&mut self) {
        self.volume = round_to(clamp_or_zero(self.volume + VOLUME_STEP, 1.0), 2);
    }

    pub fn volume_down(&mut self) {
        self.volume = round_to(clamp_or_zero(self.volume - VOLUME_STEP, 1.0), 2);
    }

    pub fn fade_in_up(&mut self) {
        self.fade_in = round_to(clamp_or_zero(self.fade_in + FADE_STEP, MAX_FADE_SECONDS), 1);
    }

    pub fn fade_in_down(&mut self) {
        self.fade_in = round_to(clamp_or_zero(self.fade_in - FADE_STEP, MAX_FADE_SECONDS), 1);
    }

    pub fn fade_out_up(&mut self) {
        self.fade_out = round_to(clamp_or_zero(self.fade_out + FADE_STEP, MAX_FADE_SECONDS), 1);
    }

    pub fn fade_out_down(&mut self) {
        self.fade_out = round_to(clamp_or_zero(self.fade_out - FADE_STEP, MAX_FADE_SECONDS), 1);
    }
}

fn clamp_or_zero(value: f32, max: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, max)
    }
}

/// Round to the nearest whole millisecond, the precision archives keep
pub fn whole_millis(duration: Duration) -> Duration {
    let millis = (duration.as_nanos() + 500_000) / 1_000_000;
    Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
}

fn round_to(value: f32, decimals: i32) -> f32 {
    let factor = 10f32.powi(decimals);
    (value * factor).round() / factor
}

// ============================================================================
// Block Kinds
// ============================================================================

/// Descriptive metadata read from a cue's asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    pub title: String,
    pub artist: String,
}

impl Default for AssetInfo {
    fn default() -> Self {
        Self {
            title: NO_METADATA.to_string(),
            artist: NO_METADATA.to_string(),
        }
    }
}

/// A scheduled audio cue
#[derive(Debug, Clone, PartialEq)]
pub struct SongCue {
    /// Length of the cue's window (the asset's own length once loaded)
    pub duration: Duration,
    /// Path of the referenced audio file, if one has been chosen
    pub asset: Option<PathBuf>,
    pub settings: CueSettings,
    pub info: AssetInfo,
    /// Loudest absolute sample of the decoded asset (0.0 - 1.0)
    pub peak: Option<f32>,
}

impl SongCue {
    pub fn new(duration: Duration, asset: Option<PathBuf>, settings: CueSettings) -> Self {
        Self {
            duration,
            asset,
            settings: settings.clamped(),
            info: AssetInfo::default(),
            peak: None,
        }
    }

    /// A cue with no asset yet
    pub fn empty() -> Self {
        Self::new(Duration::ZERO, None, CueSettings::default())
    }

    /// Gain factor that lifts the asset peak to full scale.
    ///
    /// 1.0 unless `normalize` is on and the peak is known and audible.
    pub fn normalize_gain(&self) -> f32 {
        match self.peak {
            Some(peak) if self.settings.normalize && peak > SILENCE_PEAK => 1.0 / peak,
            _ => 1.0,
        }
    }
}

/// What a block does
#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    /// A span of time with no absolute anchor
    Wait { duration: Duration },
    /// Re-anchors the timeline to a fixed time of day; zero length
    WaitUntil { anchor: NaiveTime },
    /// An audio cue
    SongCue(SongCue),
}

impl BlockKind {
    /// Name used in logs and the archive manifest
    pub fn tag(&self) -> &'static str {
        match self {
            BlockKind::Wait { .. } => "Wait",
            BlockKind::WaitUntil { .. } => "WaitUntil",
            BlockKind::SongCue(_) => "SongCue",
        }
    }
}

// ============================================================================
// Block
// ============================================================================

/// One scheduled unit in a timeline
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    id: BlockId,
    kind: BlockKind,
    computed_start: Duration,
    is_anchored: bool,
}

impl Block {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            id: BlockId::new(),
            kind,
            computed_start: Duration::ZERO,
            is_anchored: false,
        }
    }

    /// A pause; the length is kept to whole milliseconds
    pub fn wait(duration: Duration) -> Self {
        Self::new(BlockKind::Wait {
            duration: whole_millis(duration),
        })
    }

    pub fn wait_until(anchor: NaiveTime) -> Self {
        Self::new(BlockKind::WaitUntil { anchor })
    }

    pub fn song_cue(cue: SongCue) -> Self {
        Self::new(BlockKind::SongCue(cue))
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn kind(&self) -> &BlockKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut BlockKind {
        &mut self.kind
    }

    /// Start offset: from midnight when anchored, from the trigger instant otherwise
    pub fn computed_start(&self) -> Duration {
        self.computed_start
    }

    /// True when the start is a fixed time of day
    pub fn is_anchored(&self) -> bool {
        self.is_anchored
    }

    pub(crate) fn set_timing(&mut self, computed_start: Duration, is_anchored: bool) {
        self.computed_start = computed_start;
        self.is_anchored = is_anchored;
    }

    /// Length of the block's window; anchors are zero-length markers
    pub fn duration(&self) -> Duration {
        match &self.kind {
            BlockKind::Wait { duration } => *duration,
            BlockKind::WaitUntil { .. } => Duration::ZERO,
            BlockKind::SongCue(cue) => cue.duration,
        }
    }

    /// Anchor offset from midnight, for `WaitUntil` blocks
    pub fn anchor_offset(&self) -> Option<Duration> {
        match &self.kind {
            BlockKind::WaitUntil { anchor } => Some(time_of_day_offset(*anchor)),
            _ => None,
        }
    }

    pub fn is_anchor(&self) -> bool {
        matches!(self.kind, BlockKind::WaitUntil { .. })
    }

    pub fn as_cue(&self) -> Option<&SongCue> {
        match &self.kind {
            BlockKind::SongCue(cue) => Some(cue),
            _ => None,
        }
    }

    pub fn as_cue_mut(&mut self) -> Option<&mut SongCue> {
        match &mut self.kind {
            BlockKind::SongCue(cue) => Some(cue),
            _ => None,
        }
    }

    /// Editor timing label: `"+00:00:05 / +00:00:15"`, or `"starting 08:00:00"` for anchors
    pub fn window_label(&self) -> String {
        if let BlockKind::WaitUntil { anchor } = &self.kind {
            return format!("starting {}", format_time_of_day(*anchor));
        }

        let prefix = if self.is_anchored { "" } else { "+" };
        format!(
            "{prefix}{} / {prefix}{}",
            format_clock(self.computed_start),
            format_clock(self.computed_start + self.duration())
        )
    }
}
