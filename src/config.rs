//! Application settings
//!
//! Stored as JSON; every field has a default so a partial or missing file
//! still loads.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{CuetimeError, Result};

/// Environment variable overriding [`Settings::cache_root`]
pub const CACHE_DIR_ENV: &str = "CUETIME_CACHE_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where imported archives are extracted
    pub cache_root: PathBuf,
    /// Scheduler polling interval
    pub tick_interval_ms: u64,
    /// Default log filter, used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_root: env::temp_dir().join("cuetime"),
            tick_interval_ms: 20,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults when it is absent
    pub fn load(path: &Path) -> Result<Self> {
        let mut settings = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| CuetimeError::FileReadError {
                path: path.to_path_buf(),
                source: e,
            })?;
            serde_json::from_str(&content)?
        } else {
            debug!("No settings at {}, using defaults", path.display());
            Self::default()
        };

        if let Some(dir) = env::var_os(CACHE_DIR_ENV).filter(|v| !v.is_empty()) {
            settings.cache_root = PathBuf::from(dir);
        }
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CuetimeError::DirectoryCreateError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| CuetimeError::FileWriteError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Polling interval, never below one millisecond
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            cache_root: dir.path().join("cache"),
            tick_interval_ms: 10,
            log_filter: "debug".to_string(),
        };

        settings.save(&path).unwrap();
        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.tick_interval_ms, 10);
        assert_eq!(loaded.log_filter, "debug");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"tick_interval_ms": 5}"#).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.tick_interval(), Duration::from_millis(5));
        assert_eq!(loaded.log_filter, "info");
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempdir().unwrap();
        let loaded = Settings::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded.tick_interval_ms, 20);
    }

    #[test]
    fn test_malformed_file_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ nope").unwrap();
        assert!(matches!(
            Settings::load(&path),
            Err(CuetimeError::Serialization(_))
        ));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let settings = Settings {
            tick_interval_ms: 0,
            ..Settings::default()
        };
        assert_eq!(settings.tick_interval(), Duration::from_millis(1));
    }
}
