//! Project Archives
//!
//! A project travels as a zip container: one `config.json` manifest plus
//! every cue asset under a collision-free short name.
//!
//! - `manifest`: tagged block descriptors
//! - `export`: timeline to archive
//! - `import`: archive to extraction cache, with conflict handling
//! - `cache`: the extraction cache and its purge

pub mod cache;
pub mod export;
pub mod import;
pub mod manifest;

pub use cache::ProjectCache;
pub use export::{export, export_to_file, ExportOutcome};
pub use import::{archive_key, import, import_file, ImportOutcome, ImportedProject, PendingImport};
pub use manifest::{BlockDescriptor, Manifest, MANIFEST_NAME};
