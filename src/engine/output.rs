//! Audio output channel
//!
//! The single channel a page plays through. Only the scheduler drives it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;

/// The single audio output channel
pub trait AudioOutput {
    /// Start playing `asset` from `offset`, replacing anything loaded
    fn play(&mut self, asset: &Path, offset: Duration);

    /// Jump within the current asset
    fn seek(&mut self, offset: Duration);

    /// Apply a linear gain; above 1.0 only when a quiet asset is normalized
    fn set_gain(&mut self, gain: f32);

    /// Hard mute, independent of gain
    fn set_muted(&mut self, muted: bool);

    /// Stop and unload the current asset
    fn stop(&mut self);

    fn is_playing(&self) -> bool;
}

impl<T: AudioOutput + ?Sized> AudioOutput for Box<T> {
    fn play(&mut self, asset: &Path, offset: Duration) {
        (**self).play(asset, offset)
    }

    fn seek(&mut self, offset: Duration) {
        (**self).seek(offset)
    }

    fn set_gain(&mut self, gain: f32) {
        (**self).set_gain(gain)
    }

    fn set_muted(&mut self, muted: bool) {
        (**self).set_muted(muted)
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn is_playing(&self) -> bool {
        (**self).is_playing()
    }
}

/// Transport commands recorded by [`SilentOutput`]
#[derive(Debug, Clone, PartialEq)]
pub enum OutputCommand {
    Play { asset: PathBuf, offset: Duration },
    Seek { offset: Duration },
    Stop,
}

/// Output that produces no sound but tracks what it was told
///
/// Used by headless hosts (the CLI) and tests. Gain and mute changes update
/// state only; transport commands are also kept in order.
#[derive(Debug, Clone, Default)]
pub struct SilentOutput {
    current: Option<PathBuf>,
    position: Duration,
    gain: f32,
    muted: bool,
    commands: Vec<OutputCommand>,
}

impl SilentOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    /// Position of the last play or seek
    pub fn position(&self) -> Duration {
        self.position
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn commands(&self) -> &[OutputCommand] {
        &self.commands
    }
}

impl AudioOutput for SilentOutput {
    fn play(&mut self, asset: &Path, offset: Duration) {
        debug!("[OUTPUT] play {} from {:.3}s", asset.display(), offset.as_secs_f64());
        self.current = Some(asset.to_path_buf());
        self.position = offset;
        self.commands.push(OutputCommand::Play {
            asset: asset.to_path_buf(),
            offset,
        });
    }

    fn seek(&mut self, offset: Duration) {
        self.position = offset;
        self.commands.push(OutputCommand::Seek { offset });
    }

    fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn stop(&mut self) {
        debug!("[OUTPUT] stop");
        self.current = None;
        self.position = Duration::ZERO;
        self.commands.push(OutputCommand::Stop);
    }

    fn is_playing(&self) -> bool {
        self.current.is_some()
    }
}
