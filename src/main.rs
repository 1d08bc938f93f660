//! Cuetime CLI
//!
//! Command-line front end for cue timelines and project archives.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cuetime::cli::{commands, Cli, Commands};
use cuetime::config::Settings;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(&cli.config)
        .with_context(|| format!("loading settings from {}", cli.config.display()))?;

    // RUST_LOG wins over the configured filter; --verbose wins over both
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Cuetime v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd, &settings, cli.overwrite)?,
        None => {
            println!("Cuetime v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
        }
    }

    Ok(())
}

fn handle_command(cmd: Commands, settings: &Settings, overwrite: bool) -> anyhow::Result<()> {
    match cmd {
        Commands::Duration { text } => commands::duration(&text)?,
        Commands::Time { text } => commands::time(&text)?,
        Commands::Inspect { archive } => {
            commands::inspect(settings, &archive, overwrite)
                .with_context(|| format!("inspecting {}", archive.display()))?
        }
        Commands::Pack { manifest, output } => commands::pack(&manifest, &output)?,
        Commands::Play { archive, seconds } => {
            commands::play(settings, &archive, seconds, overwrite)
                .with_context(|| format!("playing {}", archive.display()))?
        }
        Commands::PurgeCache => commands::purge_cache(settings)?,
    }
    Ok(())
}
