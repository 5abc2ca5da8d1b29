use clap::{Args, Subcommand};
use std::fs;
use std::path::PathBuf;

use triplog_core::models::media::{self, MediaKind};
use triplog_core::{AppState, AttractionUpdate};

use crate::config::Config;

use super::{confirm, find_city, load_state, resolve_ids, OutputFormat};

#[derive(Args)]
pub struct AttractionCommand {
    #[command(subcommand)]
    pub command: AttractionSubcommand,
}

#[derive(Subcommand)]
pub enum AttractionSubcommand {
    /// Add an attraction to a city
    Add {
        /// City ID or name
        city: String,

        /// Name of the attraction
        name: String,

        /// Latitude
        #[arg(long, requires = "lng", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lng: Option<f64>,
    },

    /// Show an attraction's details
    Show {
        /// City ID or name
        city: String,

        /// Attraction ID or name
        attraction: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update an attraction's name or notes
    Update {
        /// City ID or name
        city: String,

        /// Attraction ID or name
        attraction: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New notes (replaces existing notes)
        #[arg(long)]
        notes: Option<String>,
    },

    /// Toggle the visited mark
    Visit {
        /// City ID or name
        city: String,

        /// Attraction ID or name
        attraction: String,
    },

    /// Change the visit count by a delta (e.g. 1 or -1)
    Count {
        /// City ID or name
        city: String,

        /// Attraction ID or name
        attraction: String,

        /// Amount to add; the count never drops below zero
        #[arg(allow_negative_numbers = true)]
        delta: i64,
    },

    /// List, add or remove photos
    Photo {
        /// City ID or name
        city: String,

        /// Attraction ID or name
        attraction: String,

        /// Image file to attach
        #[arg(long, conflicts_with = "remove")]
        add: Option<PathBuf>,

        /// Index of the photo to remove
        #[arg(long)]
        remove: Option<usize>,
    },

    /// List, add or remove videos
    Video {
        /// City ID or name
        city: String,

        /// Attraction ID or name
        attraction: String,

        /// Video file to attach
        #[arg(long, conflicts_with = "remove")]
        add: Option<PathBuf>,

        /// Index of the video to remove
        #[arg(long)]
        remove: Option<usize>,
    },

    /// Set or clear map coordinates
    Coords {
        /// City ID or name
        city: String,

        /// Attraction ID or name
        attraction: String,

        /// Latitude (-90 to 90)
        #[arg(allow_negative_numbers = true, required_unless_present = "clear")]
        lat: Option<f64>,

        /// Longitude (-180 to 180)
        #[arg(allow_negative_numbers = true, required_unless_present = "clear")]
        lng: Option<f64>,

        /// Remove the coordinates instead
        #[arg(long, conflicts_with_all = ["lat", "lng"])]
        clear: bool,
    },

    /// Delete an attraction
    Delete {
        /// City ID or name
        city: String,

        /// Attraction ID or name
        attraction: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl AttractionCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let mut state = load_state(config)?;

        match &self.command {
            AttractionSubcommand::Add {
                city,
                name,
                lat,
                lng,
            } => {
                let city_id = find_city(state.data(), city)?.id.clone();
                let attraction = state.update(|data| {
                    let id = data.add_attraction(&city_id, name)?.id.clone();
                    let added = match (lat, lng) {
                        (Some(lat), Some(lng)) => data.set_coordinates(&city_id, &id, *lat, *lng),
                        _ => data.attraction(&city_id, &id),
                    };
                    added.cloned()
                })?;
                println!("Added attraction:");
                println!("{}", attraction);
                Ok(())
            }

            AttractionSubcommand::Show {
                city,
                attraction,
                format,
            } => {
                let (city_id, attraction_id) = resolve_ids(state.data(), city, attraction)?;
                let attraction = state.data().attraction(&city_id, &attraction_id)?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(attraction)?);
                    }
                    OutputFormat::Text => {
                        println!("{}", attraction);
                        println!("  ID:      {}", attraction.id);
                        println!("  Visits:  {}", attraction.visit_count);
                        if let Some(coords) = &attraction.coordinates {
                            println!("  Map:     {}", coords);
                        }
                        println!("  Photos:  {}", attraction.photos.len());
                        println!("  Videos:  {}", attraction.videos.len());
                        if !attraction.notes.is_empty() {
                            println!("\nNotes:\n{}", attraction.notes);
                        }
                    }
                }
                Ok(())
            }

            AttractionSubcommand::Update {
                city,
                attraction,
                name,
                notes,
            } => {
                if name.is_none() && notes.is_none() {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let (city_id, attraction_id) = resolve_ids(state.data(), city, attraction)?;
                let update = AttractionUpdate {
                    name: name.clone(),
                    notes: notes.clone(),
                    ..Default::default()
                };
                let updated = state.update(|data| {
                    data.update_attraction(&city_id, &attraction_id, update)
                        .cloned()
                })?;
                println!("Updated attraction:");
                println!("{}", updated);
                Ok(())
            }

            AttractionSubcommand::Visit { city, attraction } => {
                let (city_id, attraction_id) = resolve_ids(state.data(), city, attraction)?;
                let updated =
                    state.update(|data| data.toggle_visited(&city_id, &attraction_id).cloned())?;
                if updated.is_visited() {
                    println!(
                        "Marked '{}' as visited ({} visit(s))",
                        updated.name, updated.visit_count
                    );
                } else {
                    println!("Marked '{}' as not visited", updated.name);
                }
                Ok(())
            }

            AttractionSubcommand::Count {
                city,
                attraction,
                delta,
            } => {
                let (city_id, attraction_id) = resolve_ids(state.data(), city, attraction)?;
                let updated = state.update(|data| {
                    data.adjust_visit_count(&city_id, &attraction_id, *delta)
                        .cloned()
                })?;
                println!("'{}' visited {} time(s)", updated.name, updated.visit_count);
                Ok(())
            }

            AttractionSubcommand::Photo {
                city,
                attraction,
                add,
                remove,
            } => self.media(&mut state, MediaKind::Photo, city, attraction, add, remove),

            AttractionSubcommand::Video {
                city,
                attraction,
                add,
                remove,
            } => self.media(&mut state, MediaKind::Video, city, attraction, add, remove),

            AttractionSubcommand::Coords {
                city,
                attraction,
                lat,
                lng,
                clear,
            } => {
                let (city_id, attraction_id) = resolve_ids(state.data(), city, attraction)?;
                let updated = state.update(|data| {
                    let changed = match (clear, lat, lng) {
                        (false, Some(lat), Some(lng)) => {
                            data.set_coordinates(&city_id, &attraction_id, *lat, *lng)
                        }
                        _ => data.clear_coordinates(&city_id, &attraction_id),
                    };
                    changed.cloned()
                })?;
                match &updated.coordinates {
                    Some(coords) => println!("Set coordinates of '{}' to {}", updated.name, coords),
                    None => println!("Cleared coordinates of '{}'", updated.name),
                }
                Ok(())
            }

            AttractionSubcommand::Delete {
                city,
                attraction,
                force,
            } => {
                let (city_id, attraction_id) = resolve_ids(state.data(), city, attraction)?;
                let name = state.data().attraction(&city_id, &attraction_id)?.name.clone();

                // Confirm deletion unless --force is used
                if !force && !confirm(&format!("Delete attraction '{}'?", name))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                state.update(|data| data.delete_attraction(&city_id, &attraction_id))?;
                println!("Deleted attraction: {}", name);
                Ok(())
            }
        }
    }

    fn media(
        &self,
        state: &mut AppState,
        kind: MediaKind,
        city: &str,
        attraction: &str,
        add: &Option<PathBuf>,
        remove: &Option<usize>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let (city_id, attraction_id) = resolve_ids(state.data(), city, attraction)?;
        let label = match kind {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        };

        if let Some(path) = add {
            let mime = match media::guess_mime(path) {
                Some((mime, found)) if found == kind => mime,
                _ => {
                    return Err(
                        format!("Not a supported {} file: {}", label, path.display()).into(),
                    )
                }
            };
            let bytes = fs::read(path)?;
            let url = media::to_data_url(mime, &bytes);

            state.update(|data| {
                let attraction = data.attraction_mut(&city_id, &attraction_id)?;
                match kind {
                    MediaKind::Photo => attraction.add_photo(url),
                    MediaKind::Video => attraction.add_video(url),
                }
                Ok(())
            })?;
            println!("Attached {} {} ({} bytes)", label, path.display(), bytes.len());
            return Ok(());
        }

        if let Some(index) = remove {
            state.update(|data| {
                let attraction = data.attraction_mut(&city_id, &attraction_id)?;
                match kind {
                    MediaKind::Photo => attraction.remove_photo(*index),
                    MediaKind::Video => attraction.remove_video(*index),
                }
            })?;
            println!("Removed {} #{}", label, index);
            return Ok(());
        }

        let attraction = state.data().attraction(&city_id, &attraction_id)?;
        let items = match kind {
            MediaKind::Photo => &attraction.photos,
            MediaKind::Video => &attraction.videos,
        };
        if items.is_empty() {
            println!("No {}s for '{}'.", label, attraction.name);
            return Ok(());
        }
        for (index, item) in items.iter().enumerate() {
            match media::from_data_url(item) {
                Some((mime, bytes)) => {
                    println!("{:>3}  {:<16}  {} bytes", index, mime, bytes.len())
                }
                None => println!("{:>3}  {}", index, item),
            }
        }
        Ok(())
    }
}
