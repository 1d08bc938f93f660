//! Error handling for Cuetime
//!
//! Validation problems, archive conflicts and I/O failures all surface
//! through [`CuetimeError`]. Stale indices and wrong block kinds are not
//! errors: the timeline treats them as logged no-ops.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Cuetime operations
pub type Result<T> = std::result::Result<T, CuetimeError>;

/// Main error type for Cuetime operations
#[derive(Error, Debug)]
pub enum CuetimeError {
    // Validation Errors
    #[error("Invalid duration: '{input}'")]
    InvalidDuration { input: String },

    #[error("Invalid time of day: '{input}'")]
    InvalidTimeOfDay { input: String },

    #[error("Invalid archive name: '{name}'")]
    InvalidArchiveName { name: String },

    #[error("Invalid manifest: {reason}")]
    InvalidManifest { reason: String },

    // Archive Errors
    #[error("Archive is empty")]
    EmptyArchive,

    #[error("Archive has no {entry} entry")]
    MissingManifest { entry: &'static str },

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    // Asset Errors
    #[error("Asset not found: {path}")]
    AssetNotFound { path: PathBuf },

    #[error("Failed to decode asset {path}: {reason}")]
    AssetDecode { path: PathBuf, reason: String },

    // File Errors
    #[error("Failed to read file: {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}: {source}")]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory creation failed: {path}: {source}")]
    DirectoryCreateError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Workspace Errors
    #[error("Page not found: {name}")]
    PageNotFound { name: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CuetimeError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            CuetimeError::InvalidDuration { .. } => "INVALID_DURATION",
            CuetimeError::InvalidTimeOfDay { .. } => "INVALID_TIME_OF_DAY",
            CuetimeError::InvalidArchiveName { .. } => "INVALID_ARCHIVE_NAME",
            CuetimeError::InvalidManifest { .. } => "INVALID_MANIFEST",
            CuetimeError::EmptyArchive => "EMPTY_ARCHIVE",
            CuetimeError::MissingManifest { .. } => "MISSING_MANIFEST",
            CuetimeError::Archive(_) => "ARCHIVE_ERROR",
            CuetimeError::AssetNotFound { .. } => "ASSET_NOT_FOUND",
            CuetimeError::AssetDecode { .. } => "ASSET_DECODE",
            CuetimeError::FileReadError { .. } => "FILE_READ_ERROR",
            CuetimeError::FileWriteError { .. } => "FILE_WRITE_ERROR",
            CuetimeError::DirectoryCreateError { .. } => "DIRECTORY_CREATE_ERROR",
            CuetimeError::PageNotFound { .. } => "PAGE_NOT_FOUND",
            CuetimeError::Io(_) => "IO_ERROR",
            CuetimeError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// True for user-input problems that leave all state untouched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CuetimeError::InvalidDuration { .. }
                | CuetimeError::InvalidTimeOfDay { .. }
                | CuetimeError::InvalidArchiveName { .. }
                | CuetimeError::InvalidManifest { .. }
                | CuetimeError::Serialization(_)
        )
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors fail only the call that raised them; the running
    /// session and any open timeline keep working.
    pub fn is_recoverable(&self) -> bool {
        match self {
            CuetimeError::DirectoryCreateError { .. } => false,
            CuetimeError::Io(_) => false,
            _ => true,
        }
    }
}
