//! Moving whole snapshots in and out: files, clipboard text and links.

use chrono::Local;
use clap::{Args, Subcommand};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use triplog_core::codec::{self, export_filename, share_link, strip_share_param};
use triplog_core::{AppData, AppState};

use crate::config::Config;

use super::{confirm, load_state, summarize};

/// Links longer than this tend to be cut off by chat apps and browsers.
const LONG_LINK_WARNING: usize = 8000;

#[derive(Args)]
pub struct ShareCommand {
    #[command(subcommand)]
    pub command: ShareSubcommand,
}

#[derive(Subcommand)]
pub enum ShareSubcommand {
    /// Export all trip data to a JSON file
    Export {
        /// Output file (default: trip-data-<date>.json)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Replace all trip data with an exported JSON file
    Import {
        /// File to import
        file: PathBuf,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Print trip data as text for copying
    Copy,

    /// Replace all trip data with text read from stdin
    Paste {
        /// Confirm the import (stdin carries the data, so there is no prompt)
        #[arg(long, short)]
        force: bool,
    },

    /// Print a link that carries all trip data
    Link {
        /// Base URL of the link (default: share_base_url from config)
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Import trip data from a shared link
    Open {
        /// The shared URL (or just its query string)
        url: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl ShareCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let mut state = load_state(config)?;

        match &self.command {
            ShareSubcommand::Export { output } => {
                let path = output
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(export_filename(Local::now().date_naive())));
                fs::write(&path, codec::encode(state.data()))?;
                println!("Exported {} to {}", summarize(state.data()), path.display());
                Ok(())
            }

            ShareSubcommand::Import { file, force } => {
                let text = fs::read_to_string(file)?;
                let data = codec::decode(&text)
                    .map_err(|e| format!("Cannot import {}: {}", file.display(), e))?;

                let prompt = format!(
                    "Replace all trip data with {} from {}?",
                    summarize(&data),
                    file.display()
                );
                if !force && !confirm(&prompt)? {
                    println!("Import cancelled.");
                    return Ok(());
                }

                replace(&mut state, data)
            }

            ShareSubcommand::Copy => {
                println!("{}", codec::encode(state.data()));
                Ok(())
            }

            ShareSubcommand::Paste { force } => {
                let mut text = String::new();
                io::stdin().read_to_string(&mut text)?;
                let data = codec::decode(&text)
                    .map_err(|e| format!("Cannot import pasted text: {}", e))?;

                if !force {
                    println!("Pasted text contains {}.", summarize(&data));
                    println!(
                        "Nothing was imported. Re-run with --force to replace your trip data."
                    );
                    return Ok(());
                }

                replace(&mut state, data)
            }

            ShareSubcommand::Link { base_url } => {
                let base = base_url
                    .as_deref()
                    .unwrap_or(&config.share_base_url.value);
                let link = share_link(base, state.data());
                println!("{}", link);

                if link.len() > LONG_LINK_WARNING {
                    tracing::warn!("Share link is {} characters long", link.len());
                    eprintln!(
                        "Note: this link is {} characters long and may be truncated by some apps. \
                         Consider 'triplog share export' instead.",
                        link.len()
                    );
                }
                Ok(())
            }

            ShareSubcommand::Open { url, force } => {
                let data = match codec::decode_from_link(url)? {
                    Some(data) => data,
                    None => {
                        println!("This link does not carry any trip data.");
                        return Ok(());
                    }
                };

                let prompt = format!(
                    "This link shares {}. Replace your trip data with it?",
                    summarize(&data)
                );
                if !force && !confirm(&prompt)? {
                    println!("Import cancelled.");
                    return Ok(());
                }

                replace(&mut state, data)?;
                println!("Link without shared data: {}", strip_share_param(url));
                Ok(())
            }
        }
    }
}

fn replace(state: &mut AppState, data: AppData) -> Result<(), Box<dyn std::error::Error>> {
    if state.replace(data)? {
        println!("Imported {}.", summarize(state.data()));
    } else {
        println!("Trip data is already identical; nothing changed.");
    }
    Ok(())
}
