//! Project manifest (`config.json`)
//!
//! The `type` tag spelling is the compatibility surface with existing
//! archives; an unknown tag fails the whole manifest.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CuetimeError, Result};
use crate::timeline::{
    format_time_of_day, parse_time_of_day, whole_millis, Block, BlockKind, CueSettings, SongCue,
    Timeline,
};

/// Reserved archive entry holding the manifest
pub const MANIFEST_NAME: &str = "config.json";

/// Serialized form of one block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BlockDescriptor {
    /// `value` is seconds: an integer when whole, else a fraction to the millisecond
    Wait {
        #[serde(with = "wait_seconds")]
        value: Duration,
    },
    /// `value` is canonical `hh:mm:ss`
    WaitUntil { value: String },
    SongCue {
        /// Short name of the asset inside the archive
        #[serde(rename = "fileName")]
        file_name: Option<String>,
        #[serde(default)]
        settings: CueSettings,
        #[serde(rename = "durationMs", default)]
        duration_ms: u64,
    },
}

impl BlockDescriptor {
    /// Describe a block, giving its cue asset the archive name `file_name`
    pub fn from_block(block: &Block, file_name: Option<String>) -> Self {
        match block.kind() {
            BlockKind::Wait { duration } => BlockDescriptor::Wait {
                value: whole_millis(*duration),
            },
            BlockKind::WaitUntil { anchor } => BlockDescriptor::WaitUntil {
                value: format_time_of_day(*anchor),
            },
            BlockKind::SongCue(cue) => BlockDescriptor::SongCue {
                file_name,
                settings: cue.settings,
                duration_ms: cue.duration.as_millis() as u64,
            },
        }
    }

    /// Rebuild the block, resolving the asset name against `asset_dir`
    pub fn into_block(self, asset_dir: &Path) -> Result<Block> {
        let block = match self {
            BlockDescriptor::Wait { value } => Block::wait(value),
            BlockDescriptor::WaitUntil { value } => Block::wait_until(parse_time_of_day(&value)?),
            BlockDescriptor::SongCue {
                file_name,
                settings,
                duration_ms,
            } => Block::song_cue(SongCue::new(
                Duration::from_millis(duration_ms),
                file_name.map(|name| asset_dir.join(name)),
                settings,
            )),
        };
        Ok(block)
    }

    pub fn file_name(&self) -> Option<&str> {
        match self {
            BlockDescriptor::SongCue { file_name, .. } => file_name.as_deref(),
            _ => None,
        }
    }
}

/// Ordered block list of one project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub blocks: Vec<BlockDescriptor>,
}

impl Manifest {
    /// Describe `timeline`, naming each cue asset through `names`.
    ///
    /// Cues whose asset has no entry in `names` are written with a null
    /// file name.
    pub fn from_timeline(timeline: &Timeline, names: &HashMap<PathBuf, String>) -> Self {
        let blocks = timeline
            .iter()
            .map(|block| {
                let name = block
                    .as_cue()
                    .and_then(|cue| cue.asset.as_ref())
                    .and_then(|path| names.get(path))
                    .cloned();
                BlockDescriptor::from_block(block, name)
            })
            .collect();
        Self { blocks }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CuetimeError::InvalidManifest {
            reason: e.to_string(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject asset names that would resolve outside the extraction directory
    pub fn validate_archive_names(&self) -> Result<()> {
        for name in self.blocks.iter().filter_map(BlockDescriptor::file_name) {
            if !is_plain_file_name(name) || name == MANIFEST_NAME {
                return Err(CuetimeError::InvalidManifest {
                    reason: format!("'{}' is not a valid asset name", name),
                });
            }
        }
        Ok(())
    }

    /// Rebuild the blocks in order
    pub fn into_blocks(self, asset_dir: &Path) -> Result<Vec<Block>> {
        self.blocks
            .into_iter()
            .map(|descriptor| descriptor.into_block(asset_dir))
            .collect()
    }

    pub fn into_timeline(self, asset_dir: &Path) -> Result<Timeline> {
        Ok(Timeline::from_blocks(self.into_blocks(asset_dir)?))
    }
}

/// `Wait.value` on the wire: whole seconds stay integers for older readers
mod wait_seconds {
    use std::time::Duration;

    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.subsec_nanos() == 0 {
            serializer.serialize_u64(value.as_secs())
        } else {
            serializer.serialize_f64(value.as_millis() as f64 / 1000.0)
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = f64::deserialize(deserializer)?;
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(D::Error::custom(format!("invalid wait length {seconds}")));
        }
        let millis = (seconds * 1000.0).round();
        if millis > u64::MAX as f64 {
            return Err(D::Error::custom(format!("wait length {seconds} is too long")));
        }
        Ok(Duration::from_millis(millis as u64))
    }
}

/// True when `name` is a single path component
pub(crate) fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && Path::new(name).file_name().is_some_and(|n| n == name)
}
