use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{Coordinates, ModelError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attraction {
    pub id: String,
    pub name: String,
    pub visited: bool,
    pub visit_count: u32,
    pub photos: Vec<String>,
    pub videos: Vec<String>,
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update for an attraction. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct AttractionUpdate {
    pub name: Option<String>,
    pub notes: Option<String>,
    pub visited: Option<bool>,
    pub visit_count: Option<u32>,
    pub photos: Option<Vec<String>>,
    pub videos: Option<Vec<String>>,
    /// `Some(None)` removes the coordinates.
    pub coordinates: Option<Option<Coordinates>>,
}

impl Attraction {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(format!("attraction-{}", Uuid::new_v4().simple()), name)
    }

    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            visited: false,
            visit_count: 0,
            photos: Vec::new(),
            videos: Vec::new(),
            notes: String::new(),
            coordinates: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    /// Derived visit state: the flag alone is not trusted, the count must agree.
    pub fn is_visited(&self) -> bool {
        self.visited && self.visit_count > 0
    }

    /// Applies a partial update and stamps `updated_at`.
    pub fn apply(&mut self, update: AttractionUpdate) -> Result<(), ModelError> {
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(ModelError::EmptyName);
            }
        }
        if let Some(Some(coords)) = &update.coordinates {
            if !coords.is_valid() {
                return Err(ModelError::InvalidCoordinates {
                    lat: coords.lat,
                    lng: coords.lng,
                });
            }
        }

        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if let Some(notes) = update.notes {
            self.notes = notes;
        }
        if let Some(visited) = update.visited {
            self.visited = visited;
        }
        if let Some(count) = update.visit_count {
            self.visit_count = count;
        }
        if let Some(photos) = update.photos {
            self.photos = photos;
        }
        if let Some(videos) = update.videos {
            self.videos = videos;
        }
        if let Some(coordinates) = update.coordinates {
            self.coordinates = coordinates;
        }

        self.touch();
        Ok(())
    }

    /// Flips the visited flag. Marking visited with a zero count records one visit.
    pub fn toggle_visited(&mut self) {
        self.visited = !self.visited;
        if self.visited && self.visit_count == 0 {
            self.visit_count = 1;
        }
        self.touch();
    }

    /// Adds `delta` to the visit count, clamping at zero, and re-derives `visited`.
    pub fn adjust_visit_count(&mut self, delta: i64) {
        let count = (i64::from(self.visit_count) + delta).clamp(0, i64::from(u32::MAX));
        self.visit_count = count as u32;
        self.visited = self.visit_count > 0;
        self.touch();
    }

    pub fn add_photo(&mut self, photo: impl Into<String>) {
        self.photos.push(photo.into());
        self.touch();
    }

    pub fn add_video(&mut self, video: impl Into<String>) {
        self.videos.push(video.into());
        self.touch();
    }

    pub fn remove_photo(&mut self, index: usize) -> Result<String, ModelError> {
        if index >= self.photos.len() {
            return Err(self.media_not_found(index));
        }
        let removed = self.photos.remove(index);
        self.touch();
        Ok(removed)
    }

    pub fn remove_video(&mut self, index: usize) -> Result<String, ModelError> {
        if index >= self.videos.len() {
            return Err(self.media_not_found(index));
        }
        let removed = self.videos.remove(index);
        self.touch();
        Ok(removed)
    }

    fn media_not_found(&self, index: usize) -> ModelError {
        ModelError::MediaNotFound {
            attraction_id: self.id.clone(),
            index,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl fmt::Display for Attraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.chars().count()))?;
        writeln!(f, "ID: {}", self.id)?;
        if self.is_visited() {
            writeln!(f, "Visited: yes ({} times)", self.visit_count)?;
        } else {
            writeln!(f, "Visited: no")?;
        }
        if let Some(coords) = &self.coordinates {
            writeln!(f, "Coordinates: {}", coords)?;
        }
        writeln!(f, "Photos: {}", self.photos.len())?;
        writeln!(f, "Videos: {}", self.videos.len())?;

        if !self.notes.is_empty() {
            writeln!(f, "\nNotes:\n{}", self.notes)?;
        }

        Ok(())
    }
}
