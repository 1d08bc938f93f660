//! Playback session
//!
//! A session exists while a page's play toggle is on. Its trigger instant
//! turns the unanchored offsets of a timeline into wall-clock windows.

use std::ops::Range;
use std::time::Duration;

use crate::timeline::Block;

/// One "play" toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    trigger_instant: Duration,
}

impl Session {
    /// Start a session at `now`
    pub fn start(now: Duration) -> Self {
        Self {
            trigger_instant: now,
        }
    }

    pub fn trigger_instant(&self) -> Duration {
        self.trigger_instant
    }

    /// Wall-clock start of a block in this session
    pub fn effective_start(&self, block: &Block) -> Duration {
        if block.is_anchored() {
            block.computed_start()
        } else {
            self.trigger_instant + block.computed_start()
        }
    }

    /// Half-open wall-clock window `[start, start + duration)`
    pub fn window(&self, block: &Block) -> Range<Duration> {
        let start = self.effective_start(block);
        start..start + block.duration()
    }

    /// Time since the block's window opened, if `now` is inside it
    pub fn elapsed(&self, block: &Block, now: Duration) -> Option<Duration> {
        let window = self.window(block);
        window.contains(&now).then(|| now - window.start)
    }

    /// Fraction of the window already passed, if `now` is inside it
    pub fn progress(&self, block: &Block, now: Duration) -> Option<f32> {
        let elapsed = self.elapsed(block, now)?;
        Some((elapsed.as_secs_f64() / block.duration().as_secs_f64()) as f32)
    }
}

/// True iff `now` falls inside the block's window for this session
pub fn should_play_now(block: &Block, session: &Session, now: Duration) -> bool {
    session.window(block).contains(&now)
}
