//! Built-in default dataset shipped with the application.
//!
//! New seed entries added here show up for existing users on their next load
//! through [`crate::merge`].

use crate::models::{AppData, Attraction, City, Coordinates};

/// (id, name, lat, lng)
type SeedAttraction = (&'static str, &'static str, f64, f64);

const BEIJING: &[SeedAttraction] = &[
    ("tiananmen", "天安门", 39.9042, 116.3974),
    ("yuanmingyuan", "圆明园", 40.0086, 116.3008),
    ("forbidden-city", "故宫", 39.9163, 116.3972),
    ("great-wall", "长城", 40.4319, 116.5704),
    ("summer-palace", "颐和园", 39.9998, 116.2754),
];

const SHANGHAI: &[SeedAttraction] = &[
    ("bund", "外滩", 31.2397, 121.4994),
    ("disney", "迪士尼乐园", 31.1443, 121.6573),
    ("yu-garden", "豫园", 31.2267, 121.4932),
];

const GUANGZHOU: &[SeedAttraction] = &[
    ("canton-tower", "广州塔", 23.1064, 113.3245),
    ("yuexiu-park", "越秀公园", 23.1394, 113.2688),
];

const CITIES: &[(&str, &str, &[SeedAttraction])] = &[
    ("beijing", "北京", BEIJING),
    ("shanghai", "上海", SHANGHAI),
    ("guangzhou", "广州", GUANGZHOU),
];

/// Builds the default dataset. Timestamps are taken at call time.
pub fn seed_data() -> AppData {
    let cities = CITIES
        .iter()
        .map(|(id, name, attractions)| {
            City::with_id(*id, *name).with_attractions(
                attractions
                    .iter()
                    .map(|(id, name, lat, lng)| {
                        let attraction = Attraction::with_id(*id, *name);
                        match Coordinates::new(*lat, *lng) {
                            Ok(coords) => attraction.with_coordinates(coords),
                            Err(_) => attraction,
                        }
                    })
                    .collect(),
            )
        })
        .collect();

    AppData::new(cities)
}
