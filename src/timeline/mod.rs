//! Timeline Module
//!
//! The block model and the timing rules:
//! - Block kinds (wait, wait-until anchor, song cue) and cue settings
//! - Timeline ordering and scheduling recompute
//! - Duration and time-of-day text parsing

pub mod block;
pub mod model;
pub mod parse;

pub use block::{whole_millis, AssetInfo, Block, BlockId, BlockKind, CueSettings, SongCue};
pub use model::{Direction, LoadedAsset, Timeline};
pub use parse::{format_duration, format_time_of_day, parse_duration, parse_time_of_day};
