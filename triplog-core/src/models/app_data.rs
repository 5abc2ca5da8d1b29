use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{Attraction, AttractionUpdate, City, Coordinates, ModelError};

/// The whole dataset: the unit of storage, export, merge and sync.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppData {
    pub cities: Vec<City>,
}

impl AppData {
    pub fn new(cities: Vec<City>) -> Self {
        Self { cities }
    }

    pub fn city(&self, city_id: &str) -> Result<&City, ModelError> {
        self.cities
            .iter()
            .find(|c| c.id == city_id)
            .ok_or_else(|| ModelError::CityNotFound(city_id.to_string()))
    }

    pub fn city_mut(&mut self, city_id: &str) -> Result<&mut City, ModelError> {
        self.cities
            .iter_mut()
            .find(|c| c.id == city_id)
            .ok_or_else(|| ModelError::CityNotFound(city_id.to_string()))
    }

    pub fn attraction(
        &self,
        city_id: &str,
        attraction_id: &str,
    ) -> Result<&Attraction, ModelError> {
        self.city(city_id)?.attraction(attraction_id)
    }

    pub fn attraction_mut(
        &mut self,
        city_id: &str,
        attraction_id: &str,
    ) -> Result<&mut Attraction, ModelError> {
        self.city_mut(city_id)?.attraction_mut(attraction_id)
    }

    pub fn add_city(&mut self, name: &str) -> Result<&City, ModelError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ModelError::EmptyName);
        }

        self.cities.push(City::new(name));
        Ok(&self.cities[self.cities.len() - 1])
    }

    pub fn delete_city(&mut self, city_id: &str) -> Result<City, ModelError> {
        let index = self
            .cities
            .iter()
            .position(|c| c.id == city_id)
            .ok_or_else(|| ModelError::CityNotFound(city_id.to_string()))?;
        Ok(self.cities.remove(index))
    }

    pub fn add_attraction(&mut self, city_id: &str, name: &str) -> Result<&Attraction, ModelError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ModelError::EmptyName);
        }

        let city = self.city_mut(city_id)?;
        city.attractions.push(Attraction::new(name));
        Ok(&city.attractions[city.attractions.len() - 1])
    }

    pub fn delete_attraction(
        &mut self,
        city_id: &str,
        attraction_id: &str,
    ) -> Result<Attraction, ModelError> {
        let city = self.city_mut(city_id)?;
        let index = city
            .attractions
            .iter()
            .position(|a| a.id == attraction_id)
            .ok_or_else(|| ModelError::AttractionNotFound {
                city_id: city_id.to_string(),
                attraction_id: attraction_id.to_string(),
            })?;
        Ok(city.attractions.remove(index))
    }

    pub fn update_attraction(
        &mut self,
        city_id: &str,
        attraction_id: &str,
        update: AttractionUpdate,
    ) -> Result<&Attraction, ModelError> {
        let attraction = self.attraction_mut(city_id, attraction_id)?;
        attraction.apply(update)?;
        Ok(attraction)
    }

    pub fn toggle_visited(
        &mut self,
        city_id: &str,
        attraction_id: &str,
    ) -> Result<&Attraction, ModelError> {
        let attraction = self.attraction_mut(city_id, attraction_id)?;
        attraction.toggle_visited();
        Ok(attraction)
    }

    pub fn adjust_visit_count(
        &mut self,
        city_id: &str,
        attraction_id: &str,
        delta: i64,
    ) -> Result<&Attraction, ModelError> {
        let attraction = self.attraction_mut(city_id, attraction_id)?;
        attraction.adjust_visit_count(delta);
        Ok(attraction)
    }

    pub fn set_coordinates(
        &mut self,
        city_id: &str,
        attraction_id: &str,
        lat: f64,
        lng: f64,
    ) -> Result<&Attraction, ModelError> {
        let coordinates = Coordinates::new(lat, lng)?;
        self.update_attraction(
            city_id,
            attraction_id,
            AttractionUpdate {
                coordinates: Some(Some(coordinates)),
                ..Default::default()
            },
        )
    }

    pub fn clear_coordinates(
        &mut self,
        city_id: &str,
        attraction_id: &str,
    ) -> Result<&Attraction, ModelError> {
        self.update_attraction(
            city_id,
            attraction_id,
            AttractionUpdate {
                coordinates: Some(None),
                ..Default::default()
            },
        )
    }

    /// (visited, total) attraction counts across all cities.
    pub fn totals(&self) -> (usize, usize) {
        self.cities.iter().fold((0, 0), |(visited, total), city| {
            (
                visited + city.visited_count(),
                total + city.attractions.len(),
            )
        })
    }

    /// Short content hash, handy for telling snapshots apart in status output.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let hash = Sha256::digest(&bytes);
        hash[..6].iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AppData {
        AppData::new(vec![City::with_id("beijing", "Beijing").with_attractions(vec![
            Attraction::with_id("tiananmen", "Tiananmen"),
            Attraction::with_id("great-wall", "Great Wall"),
        ])])
    }

    #[test]
    fn test_add_city() {
        let mut data = sample();
        let id = data.add_city("  Tokyo ").unwrap().id.clone();
        assert_eq!(data.cities.len(), 2);
        assert_eq!(data.city(&id).unwrap().name, "Tokyo");
    }

    #[test]
    fn test_add_city_blank_name() {
        let mut data = sample();
        assert_eq!(data.add_city("  ").unwrap_err(), ModelError::EmptyName);
        assert_eq!(data.cities.len(), 1);
    }

    #[test]
    fn test_delete_city() {
        let mut data = sample();
        let removed = data.delete_city("beijing").unwrap();
        assert_eq!(removed.id, "beijing");
        assert!(data.cities.is_empty());
        assert!(data.delete_city("beijing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_add_and_delete_attraction() {
        let mut data = sample();
        let id = data.add_attraction("beijing", "Temple of Heaven").unwrap().id.clone();
        assert_eq!(data.city("beijing").unwrap().attractions.len(), 3);
        assert_eq!(data.city("beijing").unwrap().attractions[2].id, id);

        data.delete_attraction("beijing", &id).unwrap();
        assert_eq!(data.city("beijing").unwrap().attractions.len(), 2);
    }

    #[test]
    fn test_attraction_in_missing_city() {
        let mut data = sample();
        let err = data.add_attraction("tokyo", "Shibuya").unwrap_err();
        assert_eq!(err, ModelError::CityNotFound("tokyo".to_string()));

        let err = data.toggle_visited("beijing", "summer-palace").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_visit_operations_and_totals() {
        let mut data = sample();
        assert_eq!(data.totals(), (0, 2));

        data.toggle_visited("beijing", "tiananmen").unwrap();
        assert_eq!(data.totals(), (1, 2));

        data.adjust_visit_count("beijing", "great-wall", 2).unwrap();
        assert_eq!(data.totals(), (2, 2));

        data.adjust_visit_count("beijing", "great-wall", -2).unwrap();
        assert_eq!(data.totals(), (1, 2));
    }

    #[test]
    fn test_coordinates_set_and_clear() {
        let mut data = sample();
        data.set_coordinates("beijing", "tiananmen", 39.9042, 116.3974)
            .unwrap();
        assert!(data
            .attraction("beijing", "tiananmen")
            .unwrap()
            .coordinates
            .is_some());

        let err = data
            .set_coordinates("beijing", "tiananmen", 91.0, 0.0)
            .unwrap_err();
        assert!(err.is_validation());
        // Previous coordinates survive a rejected update
        assert!(data
            .attraction("beijing", "tiananmen")
            .unwrap()
            .coordinates
            .is_some());

        data.clear_coordinates("beijing", "tiananmen").unwrap();
        assert!(data
            .attraction("beijing", "tiananmen")
            .unwrap()
            .coordinates
            .is_none());
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = sample();
        let mut b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 12);

        b.cities[0].name = "Peking".to_string();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
