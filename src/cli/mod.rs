//! CLI Module
//!
//! Command-line interface for the Cuetime scheduler.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default settings file, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "cuetime.json";

/// Cuetime - wall-clock cue timelines and project archives
#[derive(Parser, Debug)]
#[command(name = "cuetime")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Overwrite an earlier import of the same archive instead of cancelling
    #[arg(long, global = true)]
    pub overwrite: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a duration such as "1h 5m 3s" and print it canonically
    #[command(name = "duration")]
    Duration {
        /// Duration text
        text: String,
    },

    /// Parse a time of day such as "8.30" and print it as hh:mm:ss
    #[command(name = "time")]
    Time {
        /// Time-of-day text
        text: String,
    },

    /// Import an archive and print its timeline
    #[command(name = "inspect")]
    Inspect {
        /// Path to the project archive
        archive: PathBuf,
    },

    /// Build an archive from a manifest whose cue file names are paths
    #[command(name = "pack")]
    Pack {
        /// Manifest JSON
        manifest: PathBuf,

        /// Output archive
        output: PathBuf,
    },

    /// Import an archive and play it against the wall clock
    #[command(name = "play")]
    Play {
        /// Path to the project archive
        archive: PathBuf,

        /// Stop after this many seconds (default: end of the last block)
        #[arg(short, long)]
        seconds: Option<u64>,
    },

    /// Delete every extracted archive from the cache
    #[command(name = "purge-cache")]
    PurgeCache,
}
