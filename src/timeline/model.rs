//! Timeline model
//!
//! Owns the ordered blocks of one page and keeps their scheduling fields
//! valid. Every mutating call recomputes timing before it returns, so callers
//! never observe stale `computed_start` / `is_anchored` values.
//!
//! # Anchoring
//!
//! A `WaitUntil` block pins the timeline to a time of day and opens a new
//! chapter. Every other block starts where its predecessor ends and inherits
//! the predecessor's `is_anchored` flag. Blocks before the first anchor are
//! unanchored offsets from the moment playback is turned on.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;
use log::{debug, warn};

use super::block::{whole_millis, AssetInfo, Block, BlockId, BlockKind, CueSettings};
use super::parse::{parse_duration, parse_time_of_day};
use crate::error::Result;

/// Direction for [`Timeline::move_block`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// A decoded asset ready to be attached to a cue
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedAsset {
    pub path: PathBuf,
    pub duration: Duration,
    pub info: AssetInfo,
    /// Loudest absolute sample, 0.0 - 1.0
    pub peak: f32,
}

/// Ordered sequence of blocks for one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    blocks: Vec<Block>,
}

impl Timeline {
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Build a timeline from blocks in order
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut timeline = Self { blocks };
        timeline.recompute_timing();
        timeline
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    /// Current index of a block
    pub fn position_of(&self, id: BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| b.id() == id)
    }

    pub fn find(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id() == id)
    }

    /// Block identities in sequence order
    pub fn order(&self) -> Vec<BlockId> {
        self.blocks.iter().map(Block::id).collect()
    }

    // ========================================================================
    // Structural Edits
    // ========================================================================

    /// Insert a block at `position` (appends when `None` or past the end).
    ///
    /// Returns the index the block ended up at.
    pub fn insert(&mut self, block: Block, position: Option<usize>) -> usize {
        let index = position.map_or(self.blocks.len(), |p| p.min(self.blocks.len()));
        debug!("Inserting {} block at {}", block.kind().tag(), index);
        self.blocks.insert(index, block);
        self.recompute_timing();
        index
    }

    /// Append a block, returning its index
    pub fn push(&mut self, block: Block) -> usize {
        self.insert(block, None)
    }

    /// Remove the block at `index`; a missing index is a logged no-op
    pub fn remove(&mut self, index: usize) -> Option<Block> {
        if index >= self.blocks.len() {
            warn!(
                "Ignoring remove of block {} (timeline has {} blocks)",
                index,
                self.blocks.len()
            );
            return None;
        }

        let removed = self.blocks.remove(index);
        self.recompute_timing();
        Some(removed)
    }

    /// Swap the block at `index` with its neighbour.
    ///
    /// Moving the first block up or the last block down does nothing.
    /// Returns true when the order changed.
    pub fn move_block(&mut self, index: usize, direction: Direction) -> bool {
        if index >= self.blocks.len() {
            warn!("Ignoring move {} of missing block {}", direction, index);
            return false;
        }

        let target = match direction {
            Direction::Up if index > 0 => index - 1,
            Direction::Down if index + 1 < self.blocks.len() => index + 1,
            _ => return false,
        };

        self.blocks.swap(index, target);
        self.recompute_timing();
        true
    }

    // ========================================================================
    // Block Edits
    // ========================================================================

    /// Set the length of a `Wait` or `SongCue` block
    pub fn set_duration(&mut self, index: usize, duration: Duration) -> bool {
        let Some(block) = self.blocks.get_mut(index) else {
            warn!("Ignoring duration change on missing block {}", index);
            return false;
        };

        match block.kind_mut() {
            BlockKind::Wait { duration: d } => *d = whole_millis(duration),
            BlockKind::SongCue(cue) => cue.duration = duration,
            BlockKind::WaitUntil { .. } => {
                warn!("Block {} is an anchor and has no duration", index);
                return false;
            }
        }

        self.recompute_from(index);
        true
    }

    /// Parse duration text and apply it; malformed text leaves the timeline untouched
    pub fn set_duration_text(&mut self, index: usize, text: &str) -> Result<bool> {
        let duration = parse_duration(text)?;
        Ok(self.set_duration(index, duration))
    }

    /// Set the time of day of a `WaitUntil` block
    pub fn set_anchor(&mut self, index: usize, time_of_day: NaiveTime) -> bool {
        let Some(block) = self.blocks.get_mut(index) else {
            warn!("Ignoring anchor change on missing block {}", index);
            return false;
        };

        match block.kind_mut() {
            BlockKind::WaitUntil { anchor } => *anchor = time_of_day,
            _ => {
                warn!("Block {} is not an anchor", index);
                return false;
            }
        }

        self.recompute_from(index);
        true
    }

    /// Parse time-of-day text and apply it; malformed text leaves the timeline untouched
    pub fn set_anchor_text(&mut self, index: usize, text: &str) -> Result<bool> {
        let time = parse_time_of_day(text)?;
        Ok(self.set_anchor(index, time))
    }

    /// Replace a cue's settings
    pub fn set_cue_settings(&mut self, index: usize, settings: CueSettings) -> bool {
        match self.blocks.get_mut(index).and_then(Block::as_cue_mut) {
            Some(cue) => {
                cue.settings = settings.clamped();
                true
            }
            None => {
                warn!("Block {} is not a cue", index);
                false
            }
        }
    }

    /// Attach a decoded asset to the cue with the given id.
    ///
    /// Returns false when the block is gone or is not a cue.
    pub fn apply_asset(&mut self, id: BlockId, asset: LoadedAsset) -> bool {
        let Some(index) = self.position_of(id) else {
            debug!("Dropping asset {} for removed block", asset.path.display());
            return false;
        };
        let Some(cue) = self.blocks[index].as_cue_mut() else {
            warn!("Block {} is not a cue", index);
            return false;
        };

        cue.asset = Some(asset.path);
        cue.duration = asset.duration;
        cue.info = asset.info;
        cue.peak = Some(asset.peak);
        self.recompute_from(index);
        true
    }

    // ========================================================================
    // Timing
    // ========================================================================

    /// Recompute scheduling fields for the whole timeline in one pass
    pub fn recompute_timing(&mut self) {
        for index in 0..self.blocks.len() {
            self.update_block_timing(index);
        }
    }

    /// Recompute starting at `index`.
    ///
    /// Rooted at an anchor, the pass stops at the next anchor: later chapters
    /// are governed by their own anchor. Rooted anywhere else, it runs to the
    /// end of the timeline.
    pub fn recompute_from(&mut self, index: usize) {
        if index >= self.blocks.len() {
            return;
        }

        self.update_block_timing(index);
        let stop_at_anchor = self.blocks[index].is_anchor();

        for i in index + 1..self.blocks.len() {
            if stop_at_anchor && self.blocks[i].is_anchor() {
                break;
            }
            self.update_block_timing(i);
        }
    }

    fn update_block_timing(&mut self, index: usize) {
        if let Some(anchor) = self.blocks[index].anchor_offset() {
            self.blocks[index].set_timing(anchor, true);
            return;
        }

        let (start, anchored) = match index.checked_sub(1).map(|i| &self.blocks[i]) {
            Some(prev) => (prev.computed_start() + prev.duration(), prev.is_anchored()),
            None => (Duration::ZERO, false),
        };
        self.blocks[index].set_timing(start, anchored);
    }
}
