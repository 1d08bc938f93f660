//! Playback Scheduler
//!
//! Decides, once per polling tick, which single song cue owns the audio
//! output and at what gain.
//!
//! Rules:
//! - At most one cue plays at a time. With nothing active, the first cue in
//!   timeline order whose window contains `now` starts.
//! - An active cue whose window no longer contains `now` stops at once. The
//!   next cue can only start on a later tick.
//! - Decisions happen at tick granularity. A cue whose window is shorter
//!   than the tick interval may never be observed as active.
//! - Preview plays one cue outside any session. Preview and session playback
//!   never share the channel: previews are refused while a session is on, and
//!   a session defers new cues while a preview holds the channel.

use std::fmt;
use std::time::Duration;

use log::warn;

use crate::engine::envelope::gain_at;
use crate::engine::output::AudioOutput;
use crate::engine::session::Session;
use crate::timeline::{whole_millis, Block, BlockId, SongCue, Timeline};

/// Who currently owns the output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Driven by the session's wall-clock windows
    Session,
    /// Driven by a preview position within the asset
    Preview,
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackMode::Session => write!(f, "Session"),
            PlaybackMode::Preview => write!(f, "Preview"),
        }
    }
}

/// Why a cue stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `now` left the cue's window
    WindowEnded,
    /// The block was removed from the timeline
    BlockRemoved,
    /// The session was turned off
    SessionStopped,
    /// The preview was stopped by the caller
    PreviewStopped,
    /// The preview reached the end of the asset
    PreviewFinished,
}

/// Transitions reported by the scheduler
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    Started {
        block: BlockId,
        index: usize,
        offset: Duration,
        mode: PlaybackMode,
    },
    Stopped {
        block: BlockId,
        reason: StopReason,
    },
}

/// Snapshot of the active cue after the latest tick
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveStatus {
    pub block: BlockId,
    pub index: usize,
    pub mode: PlaybackMode,
    /// Position within the cue
    pub elapsed: Duration,
    /// Gain applied to the output: the envelope, times the normalization
    /// factor when the cue asks for it
    pub gain: f32,
    pub muted: bool,
}

#[derive(Debug, Clone, Copy)]
struct ActiveCue {
    block: BlockId,
    mode: PlaybackMode,
    /// Preview only: wall-clock time the preview position was last set
    anchor_now: Duration,
    /// Preview only: asset position at `anchor_now`
    anchor_offset: Duration,
}

/// Drives one page's audio output from its timeline
///
/// # Example
/// ```
/// use std::path::PathBuf;
/// use std::time::Duration;
/// use cuetime::engine::{PlaybackScheduler, SilentOutput};
/// use cuetime::timeline::{Block, CueSettings, SongCue, Timeline};
///
/// let mut timeline = Timeline::new();
/// timeline.push(Block::wait(Duration::from_secs(5)));
/// timeline.push(Block::song_cue(SongCue::new(
///     Duration::from_secs(10),
///     Some(PathBuf::from("song.wav")),
///     CueSettings::default(),
/// )));
///
/// let mut scheduler = PlaybackScheduler::new(SilentOutput::new());
/// scheduler.start_session(Duration::from_secs(100));
/// scheduler.tick(&timeline, Duration::from_secs(106));
/// assert_eq!(scheduler.status().unwrap().index, 1);
/// ```
#[derive(Debug)]
pub struct PlaybackScheduler<O: AudioOutput> {
    output: O,
    session: Option<Session>,
    active: Option<ActiveCue>,
    status: Option<ActiveStatus>,
}

impl<O: AudioOutput> PlaybackScheduler<O> {
    pub fn new(output: O) -> Self {
        Self {
            output,
            session: None,
            active: None,
            status: None,
        }
    }

    // ========================================================================
    // Session Control
    // ========================================================================

    /// Turn session playback on, capturing `now` as the trigger instant.
    ///
    /// Turning it on again re-triggers from the new instant.
    pub fn start_session(&mut self, now: Duration) {
        self.session = Some(Session::start(now));
        tracing::info!(trigger = ?now, "session started");
    }

    /// Turn session playback off, stopping the active session cue
    pub fn stop_session(&mut self) -> Option<PlaybackEvent> {
        let event = match self.active {
            Some(active) if active.mode == PlaybackMode::Session => {
                Some(self.stop_active(StopReason::SessionStopped))
            }
            _ => None,
        };

        if self.session.take().is_some() {
            tracing::info!("session stopped");
        }
        event
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_session_on(&self) -> bool {
        self.session.is_some()
    }

    // ========================================================================
    // Polling
    // ========================================================================

    /// Advance the scheduler to `now`.
    ///
    /// Returns the transition that happened on this tick, if any.
    pub fn tick(&mut self, timeline: &Timeline, now: Duration) -> Option<PlaybackEvent> {
        match self.active {
            Some(active) if active.mode == PlaybackMode::Preview => {
                self.tick_preview(timeline, active, now)
            }
            Some(active) => self.tick_session_cue(timeline, active, now),
            None => self.activate_first(timeline, now),
        }
    }

    fn tick_session_cue(
        &mut self,
        timeline: &Timeline,
        active: ActiveCue,
        now: Duration,
    ) -> Option<PlaybackEvent> {
        let Some(session) = self.session else {
            return Some(self.stop_active(StopReason::SessionStopped));
        };
        let Some(index) = timeline.position_of(active.block) else {
            return Some(self.stop_active(StopReason::BlockRemoved));
        };

        let block = &timeline.blocks()[index];
        match (block.as_cue(), session.elapsed(block, now)) {
            (Some(cue), Some(elapsed)) => {
                self.apply_envelope(index, block, cue, PlaybackMode::Session, elapsed);
                None
            }
            _ => Some(self.stop_active(StopReason::WindowEnded)),
        }
    }

    fn activate_first(&mut self, timeline: &Timeline, now: Duration) -> Option<PlaybackEvent> {
        let session = self.session?;

        for (index, block) in timeline.iter().enumerate() {
            let Some(cue) = block.as_cue() else {
                continue;
            };
            let Some(elapsed) = session.elapsed(block, now) else {
                continue;
            };
            let Some(asset) = cue.asset.as_deref() else {
                tracing::debug!(block = %block.id(), "cue window open but no asset loaded");
                continue;
            };

            self.output.play(asset, elapsed);
            self.active = Some(ActiveCue {
                block: block.id(),
                mode: PlaybackMode::Session,
                anchor_now: now,
                anchor_offset: elapsed,
            });
            self.apply_envelope(index, block, cue, PlaybackMode::Session, elapsed);

            tracing::info!(block = %block.id(), index, offset = ?elapsed, "cue started");
            return Some(PlaybackEvent::Started {
                block: block.id(),
                index,
                offset: elapsed,
                mode: PlaybackMode::Session,
            });
        }

        None
    }

    // ========================================================================
    // Preview
    // ========================================================================

    /// Preview the cue at `index` from `progress` (0-1 of the asset length).
    ///
    /// Refused while a session is on, or when the block is not a playable
    /// cue. A preview of another cue is replaced.
    pub fn start_preview(
        &mut self,
        timeline: &Timeline,
        index: usize,
        progress: f32,
        now: Duration,
    ) -> Option<PlaybackEvent> {
        if self.session.is_some() {
            warn!("Preview refused while session playback is on");
            return None;
        }

        let block = timeline.get(index)?;
        let cue = block.as_cue()?;
        let Some(asset) = cue.asset.as_deref() else {
            warn!("Trying to preview a cue without an asset");
            return None;
        };
        if cue.duration.is_zero() {
            return None;
        }

        if self.active.is_some() {
            self.stop_active(StopReason::PreviewStopped);
        }

        let offset = position_for(cue, progress);
        self.output.play(asset, offset);
        self.active = Some(ActiveCue {
            block: block.id(),
            mode: PlaybackMode::Preview,
            anchor_now: now,
            anchor_offset: offset,
        });
        self.apply_envelope(index, block, cue, PlaybackMode::Preview, offset);

        Some(PlaybackEvent::Started {
            block: block.id(),
            index,
            offset,
            mode: PlaybackMode::Preview,
        })
    }

    /// Move the running preview to `progress`
    pub fn move_preview(&mut self, timeline: &Timeline, progress: f32, now: Duration) -> bool {
        let Some(active) = self.active.filter(|a| a.mode == PlaybackMode::Preview) else {
            return false;
        };
        let Some(cue) = timeline.find(active.block).and_then(Block::as_cue) else {
            return false;
        };

        let offset = position_for(cue, progress);
        self.output.seek(offset);
        self.active = Some(ActiveCue {
            anchor_now: now,
            anchor_offset: offset,
            ..active
        });
        true
    }

    /// Preview position as a fraction of the asset length (0 when not previewing)
    pub fn preview_progress(&self, timeline: &Timeline, now: Duration) -> f32 {
        let Some(active) = self.active.filter(|a| a.mode == PlaybackMode::Preview) else {
            return 0.0;
        };
        match timeline.find(active.block).and_then(Block::as_cue) {
            Some(cue) if !cue.duration.is_zero() => {
                let position = preview_position(active, now);
                (position.as_secs_f64() / cue.duration.as_secs_f64()).min(1.0) as f32
            }
            _ => 0.0,
        }
    }

    /// Stop a running preview; session playback is left alone
    pub fn stop_preview(&mut self) -> Option<PlaybackEvent> {
        match self.active {
            Some(active) if active.mode == PlaybackMode::Preview => {
                Some(self.stop_active(StopReason::PreviewStopped))
            }
            _ => None,
        }
    }

    fn tick_preview(
        &mut self,
        timeline: &Timeline,
        active: ActiveCue,
        now: Duration,
    ) -> Option<PlaybackEvent> {
        let Some(index) = timeline.position_of(active.block) else {
            return Some(self.stop_active(StopReason::BlockRemoved));
        };
        let block = &timeline.blocks()[index];
        let Some(cue) = block.as_cue() else {
            return Some(self.stop_active(StopReason::BlockRemoved));
        };

        let position = preview_position(active, now);
        if position >= cue.duration {
            return Some(self.stop_active(StopReason::PreviewFinished));
        }

        self.apply_envelope(index, block, cue, PlaybackMode::Preview, position);
        None
    }

    // ========================================================================
    // State Queries
    // ========================================================================

    /// Status of the active cue, as of the latest tick
    pub fn status(&self) -> Option<&ActiveStatus> {
        self.status.as_ref()
    }

    pub fn active_block(&self) -> Option<BlockId> {
        self.active.map(|a| a.block)
    }

    pub fn is_previewing(&self) -> bool {
        matches!(self.active, Some(a) if a.mode == PlaybackMode::Preview)
    }

    /// Window progress of any block in the current session (for progress bars)
    pub fn progress(&self, block: &Block, now: Duration) -> Option<f32> {
        self.session?.progress(block, now)
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn apply_envelope(
        &mut self,
        index: usize,
        block: &Block,
        cue: &SongCue,
        mode: PlaybackMode,
        elapsed: Duration,
    ) {
        let gain = gain_at(
            elapsed.as_secs_f32(),
            cue.duration.as_secs_f32(),
            &cue.settings,
        ) * cue.normalize_gain();
        self.output.set_gain(gain);
        self.output.set_muted(cue.settings.muted);

        self.status = Some(ActiveStatus {
            block: block.id(),
            index,
            mode,
            elapsed,
            gain,
            muted: cue.settings.muted,
        });
    }

    fn stop_active(&mut self, reason: StopReason) -> PlaybackEvent {
        self.output.stop();
        self.status = None;
        // Callers only stop when something is active
        let block = self.active.take().map(|a| a.block).unwrap_or_default();
        tracing::info!(block = %block, ?reason, "cue stopped");
        PlaybackEvent::Stopped { block, reason }
    }
}

/// Asset position for a progress fraction, on the millisecond grid so an
/// `f32` fraction lands on the position it names
fn position_for(cue: &SongCue, progress: f32) -> Duration {
    let progress = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
    whole_millis(cue.duration.mul_f64(f64::from(progress)))
}

fn preview_position(active: ActiveCue, now: Duration) -> Duration {
    active.anchor_offset + now.saturating_sub(active.anchor_now)
}
