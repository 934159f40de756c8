// ── Built-in city catalog ──

use serde::Serialize;

use crate::model::{Coordinates, Location};

/// A selectable city.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct City {
    pub name: &'static str,
    pub coords: Coordinates,
}

impl City {
    pub fn location(&self) -> Location {
        Location::at(self.name, self.coords)
    }
}

const fn city(name: &'static str, lat: f64, lon: f64) -> City {
    City {
        name,
        coords: Coordinates { lat, lon },
    }
}

pub const CITIES: [City; 10] = [
    city("Auckland", -36.8485, 174.7633),
    city("Tokyo", 35.6762, 139.6503),
    city("London", 51.5074, -0.1278),
    city("New York", 40.7128, -74.0060),
    city("Sydney", -33.8688, 151.2093),
    city("Paris", 48.8566, 2.3522),
    city("Singapore", 1.3521, 103.8198),
    city("Dubai", 25.2048, 55.2708),
    city("Mumbai", 19.0760, 72.8777),
    city("Cape Town", -33.9249, 18.4241),
];

/// Case-insensitive lookup by name.
pub fn find(name: &str) -> Option<&'static City> {
    let name = name.trim();
    CITIES.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}
