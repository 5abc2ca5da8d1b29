mod app_data;
mod attraction;
mod city;
mod coordinates;
mod error;
pub mod media;

pub use app_data::AppData;
pub use attraction::{Attraction, AttractionUpdate};
pub use city::City;
pub use coordinates::Coordinates;
pub use error::ModelError;
