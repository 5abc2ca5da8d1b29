mod attraction;
mod city;
mod config_cmd;
mod share;
mod sync_cmd;

pub use attraction::AttractionCommand;
pub use city::CityCommand;
pub use config_cmd::ConfigCommand;
pub use share::ShareCommand;
pub use sync_cmd::SyncCommand;

use clap::ValueEnum;
use std::io::{self, Write};

use triplog_core::{
    seed_data, AppData, AppState, Attraction, City, LocalStore, ModelError, StorageError,
};

use crate::config::Config;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Opens the local store and loads the data merged with the seed.
fn load_state(config: &Config) -> Result<AppState, StorageError> {
    let store = LocalStore::new(config.data_dir.value.clone());
    AppState::load(store, &seed_data())
}

/// Asks a yes/no question on stdin. Anything but `y` is a no.
fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Finds a city by ID, falling back to its name.
fn find_city<'a>(data: &'a AppData, identifier: &str) -> Result<&'a City, ModelError> {
    data.city(identifier).or_else(|err| {
        data.cities
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(identifier))
            .ok_or(err)
    })
}

/// Finds an attraction in `city` by ID, falling back to its name.
fn find_attraction<'a>(city: &'a City, identifier: &str) -> Result<&'a Attraction, ModelError> {
    city.attraction(identifier).or_else(|err| {
        city.attractions
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(identifier))
            .ok_or(err)
    })
}

/// Resolves city and attraction identifiers to their IDs.
fn resolve_ids(
    data: &AppData,
    city: &str,
    attraction: &str,
) -> Result<(String, String), ModelError> {
    let city = find_city(data, city)?;
    let attraction = find_attraction(city, attraction)?;
    Ok((city.id.clone(), attraction.id.clone()))
}

/// One-line summary of a snapshot.
fn summarize(data: &AppData) -> String {
    let (visited, total) = data.totals();
    format!(
        "{} cities, {}/{} attractions visited",
        data.cities.len(),
        visited,
        total
    )
}
