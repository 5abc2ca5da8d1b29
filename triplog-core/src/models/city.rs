use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{Attraction, ModelError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub id: String,
    pub name: String,
    pub attractions: Vec<Attraction>,
    pub created_at: DateTime<Utc>,
}

impl City {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(format!("city-{}", Uuid::new_v4().simple()), name)
    }

    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attractions: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_attractions(mut self, attractions: Vec<Attraction>) -> Self {
        self.attractions = attractions;
        self
    }

    pub fn attraction(&self, attraction_id: &str) -> Result<&Attraction, ModelError> {
        self.attractions
            .iter()
            .find(|a| a.id == attraction_id)
            .ok_or_else(|| self.attraction_not_found(attraction_id))
    }

    pub fn attraction_mut(&mut self, attraction_id: &str) -> Result<&mut Attraction, ModelError> {
        match self.attractions.iter().position(|a| a.id == attraction_id) {
            Some(index) => Ok(&mut self.attractions[index]),
            None => Err(self.attraction_not_found(attraction_id)),
        }
    }

    /// Number of attractions that count as visited.
    pub fn visited_count(&self) -> usize {
        self.attractions.iter().filter(|a| a.is_visited()).count()
    }

    fn attraction_not_found(&self, attraction_id: &str) -> ModelError {
        ModelError::AttractionNotFound {
            city_id: self.id.clone(),
            attraction_id: attraction_id.to_string(),
        }
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.chars().count()))?;
        writeln!(f, "ID: {}", self.id)?;
        writeln!(
            f,
            "Visited: {} / {}",
            self.visited_count(),
            self.attractions.len()
        )?;

        if !self.attractions.is_empty() {
            writeln!(f, "\nAttractions:")?;
            for attraction in &self.attractions {
                let mark = if attraction.is_visited() { "x" } else { " " };
                writeln!(f, "  [{}] {} ({})", mark, attraction.name, attraction.id)?;
            }
        }

        Ok(())
    }
}
