use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{AttractionCommand, CityCommand, ConfigCommand, ShareCommand, SyncCommand};
use config::Config;

#[derive(Parser)]
#[command(name = "triplog")]
#[command(version)]
#[command(about = "Track the cities and attractions of a trip, and share them", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage cities
    City(CityCommand),

    /// Manage attractions, visits, media and coordinates
    Attraction(AttractionCommand),

    /// Export, import and link trip data
    Share(ShareCommand),

    /// Sync trip data with a partner through a room server
    Sync(SyncCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

fn main() {
    // Diagnostics go to stderr; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load(cli.config)?;
    tracing::debug!("Data directory: {}", config.data_dir.value.display());

    match &cli.command {
        Some(Commands::City(cmd)) => cmd.run(&config)?,
        Some(Commands::Attraction(cmd)) => cmd.run(&config)?,
        Some(Commands::Share(cmd)) => cmd.run(&config)?,
        Some(Commands::Sync(cmd)) => cmd.run(&config)?,
        Some(Commands::Config(cmd)) => cmd.run(&config)?,
        None => println!("Use --help to see available commands"),
    }

    Ok(())
}
