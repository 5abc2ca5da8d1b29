//! Reconciles the built-in seed dataset with the user's stored dataset.
//!
//! Stored data always wins: stored cities and attractions are kept verbatim
//! and in order. Seed entries whose id is missing from the stored data are
//! added, so defaults introduced in a later release reach existing users.
//! A seed attraction the user deleted is indistinguishable from one they never
//! had, so it comes back on the next merge.

use std::collections::HashSet;

use crate::models::{AppData, City};

/// Merges `seed` into `stored` without mutating either.
///
/// Output order is seed cities first (in seed order), then cities that only
/// exist in `stored` (in their stored order).
pub fn merge(seed: &AppData, stored: &AppData) -> AppData {
    let mut cities: Vec<City> = Vec::with_capacity(seed.cities.len() + stored.cities.len());

    for seed_city in &seed.cities {
        match stored.cities.iter().find(|c| c.id == seed_city.id) {
            Some(stored_city) => cities.push(merge_city(seed_city, stored_city)),
            None => cities.push(seed_city.clone()),
        }
    }

    let seed_ids: HashSet<&str> = seed.cities.iter().map(|c| c.id.as_str()).collect();
    cities.extend(
        stored
            .cities
            .iter()
            .filter(|c| !seed_ids.contains(c.id.as_str()))
            .cloned(),
    );

    AppData::new(cities)
}

fn merge_city(seed_city: &City, stored_city: &City) -> City {
    let known: HashSet<&str> = stored_city
        .attractions
        .iter()
        .map(|a| a.id.as_str())
        .collect();

    let mut merged = stored_city.clone();
    merged.attractions.extend(
        seed_city
            .attractions
            .iter()
            .filter(|a| !known.contains(a.id.as_str()))
            .cloned(),
    );
    merged
}
