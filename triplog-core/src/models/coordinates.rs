use serde::{Deserialize, Serialize};
use std::fmt;

use super::ModelError;

/// Geographic position of an attraction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Creates validated coordinates, rounded to 6 decimal places.
    pub fn new(lat: f64, lng: f64) -> Result<Self, ModelError> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(ModelError::InvalidCoordinates { lat, lng });
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(ModelError::InvalidCoordinates { lat, lng });
        }

        Ok(Self {
            lat: round6(lat),
            lng: round6(lng),
        })
    }

    /// Checks the range invariant on values that bypassed `new` (e.g. decoded data).
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lng)
    }
}
