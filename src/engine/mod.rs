//! Playback Engine Module
//!
//! Wall-clock scheduling of song cues:
//! - Sessions and cue windows
//! - Gain envelope
//! - Scheduler state machine driving a single output
//! - Background asset decoding and the polling loop

pub mod clock;
pub mod envelope;
pub mod loader;
pub mod output;
pub mod poll;
pub mod scheduler;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use envelope::gain_at;
pub use loader::{AssetDecoder, AssetLoader, LoadCompletion, WavDecoder};
pub use output::{AudioOutput, OutputCommand, SilentOutput};
pub use poll::{PollLoop, DEFAULT_TICK_INTERVAL};
pub use scheduler::{ActiveStatus, PlaybackEvent, PlaybackMode, PlaybackScheduler, StopReason};
pub use session::{should_play_now, Session};
