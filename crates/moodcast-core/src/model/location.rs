// ── Location domain types ──

use serde::{Deserialize, Serialize};

/// A pair of WGS-84 coordinates in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// The place the user is interested in.
///
/// Immutable once built; two locations are the same when name and
/// coordinates are structurally equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lon: Option<f64>,
}

impl Location {
    /// A location known only by name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lat: None,
            lon: None,
        }
    }

    /// A named location with coordinates.
    pub fn at(name: impl Into<String>, coords: Coordinates) -> Self {
        Self {
            name: name.into(),
            lat: Some(coords.lat),
            lon: Some(coords.lon),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lat(&self) -> Option<f64> {
        self.lat
    }

    pub fn lon(&self) -> Option<f64> {
        self.lon
    }

    /// Both coordinates, if present.
    pub fn coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates {
            lat: self.lat?,
            lon: self.lon?,
        })
    }

    /// Same name, coordinates dropped.
    pub fn without_coordinates(&self) -> Self {
        Self::named(self.name.clone())
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.coordinates() {
            Some(c) => write!(f, "{} ({:.4}, {:.4})", self.name, c.lat, c.lon),
            None => f.write_str(&self.name),
        }
    }
}
