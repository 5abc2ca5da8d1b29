use clap::{Args, Subcommand};

use crate::config::Config;

use super::{confirm, find_city, load_state, summarize, OutputFormat};

#[derive(Args)]
pub struct CityCommand {
    #[command(subcommand)]
    pub command: CitySubcommand,
}

#[derive(Subcommand)]
pub enum CitySubcommand {
    /// List all cities
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a city and its attractions
    Show {
        /// City ID or name
        city: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Add a city
    Add {
        /// Name of the city
        name: String,
    },

    /// Delete a city and all of its attractions
    Delete {
        /// City ID or name
        city: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl CityCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let mut state = load_state(config)?;

        match &self.command {
            CitySubcommand::List { format } => {
                let data = state.data();
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&data.cities)?);
                    }
                    OutputFormat::Text => {
                        if data.cities.is_empty() {
                            println!("No cities yet. Add one with 'triplog city add <name>'.");
                            return Ok(());
                        }

                        println!("{:<40}  {:<20}  VISITED", "ID", "NAME");
                        println!("{}", "-".repeat(72));
                        for city in &data.cities {
                            println!(
                                "{:<40}  {:<20}  {}/{}",
                                city.id,
                                city.name,
                                city.visited_count(),
                                city.attractions.len()
                            );
                        }
                        println!("\n{}", summarize(data));
                    }
                }
                Ok(())
            }

            CitySubcommand::Show { city, format } => {
                let city = find_city(state.data(), city)?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(city)?);
                    }
                    OutputFormat::Text => {
                        println!("{}", city);
                    }
                }
                Ok(())
            }

            CitySubcommand::Add { name } => {
                let city = state.update(|data| data.add_city(name).cloned())?;
                println!("Added city: {} ({})", city.name, city.id);
                Ok(())
            }

            CitySubcommand::Delete { city, force } => {
                let city = find_city(state.data(), city)?.clone();

                // Confirm deletion unless --force is used
                if !force {
                    let prompt = format!(
                        "Delete city '{}' and its {} attraction(s)?",
                        city.name,
                        city.attractions.len()
                    );
                    if !confirm(&prompt)? {
                        println!("Deletion cancelled.");
                        return Ok(());
                    }
                }

                state.update(|data| data.delete_city(&city.id))?;
                println!("Deleted city: {}", city.name);
                Ok(())
            }
        }
    }
}
