//! Cuetime - Wall-Clock Cue Scheduling
//!
//! Cuetime plays audio cues from a timeline of blocks against the time of
//! day:
//! 1. Timeline - `Wait`, `WaitUntil` and `SongCue` blocks with derived start times
//! 2. Playback - a polling scheduler that drives one output per page through
//!    a fade envelope
//! 3. Archives - zip projects with a `config.json` manifest, imported into an
//!    extraction cache with conflict detection
//!
//! # Architecture
//!
//! A `WaitUntil` block anchors everything after it (up to the next anchor) to
//! a fixed time of day. Blocks before the first anchor are offsets from the
//! moment playback is switched on.

pub mod archive;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod timeline;
pub mod workspace;

pub use error::{CuetimeError, Result};
