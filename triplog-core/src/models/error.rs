//! Errors raised by dataset mutations.

/// Errors that can occur when editing cities and attractions.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// No city with the given id
    CityNotFound(String),
    /// No attraction with the given id inside the city
    AttractionNotFound {
        city_id: String,
        attraction_id: String,
    },
    /// Photo or video index past the end of the list
    MediaNotFound { attraction_id: String, index: usize },
    /// Latitude or longitude outside the valid range
    InvalidCoordinates { lat: f64, lng: f64 },
    /// Blank city or attraction name
    EmptyName,
}

impl ModelError {
    /// Returns true for the "referenced id does not exist" family.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ModelError::CityNotFound(_)
                | ModelError::AttractionNotFound { .. }
                | ModelError::MediaNotFound { .. }
        )
    }

    /// Returns true for rejected input values.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ModelError::InvalidCoordinates { .. } | ModelError::EmptyName
        )
    }
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::CityNotFound(id) => write!(f, "City not found: {}", id),
            ModelError::AttractionNotFound {
                city_id,
                attraction_id,
            } => write!(
                f,
                "Attraction not found: {} (city {})",
                attraction_id, city_id
            ),
            ModelError::MediaNotFound {
                attraction_id,
                index,
            } => write!(f, "No media at index {} for {}", index, attraction_id),
            ModelError::InvalidCoordinates { lat, lng } => write!(
                f,
                "Invalid coordinates ({}, {}): latitude must be in -90..90, longitude in -180..180",
                lat, lng
            ),
            ModelError::EmptyName => write!(f, "Name must not be empty"),
        }
    }
}

impl std::error::Error for ModelError {}
