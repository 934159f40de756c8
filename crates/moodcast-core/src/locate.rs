// ── Location resolution ──
//
// Turns device coordinates into a named `Location`. Any failure (no
// coordinates, lookup error, empty answer) falls back to the configured
// default with its coordinates cleared, plus a notice explaining why.

use std::future::Future;

use moodcast_api::GeocodeClient;

use crate::error::Notice;
use crate::model::{Coordinates, Location};

/// Coordinates → place name lookup.
pub trait ReverseGeocoder: Send + Sync {
    /// `Ok(None)` means the service answered without a usable name.
    fn reverse(
        &self,
        lat: f64,
        lon: f64,
    ) -> impl Future<Output = Result<Option<String>, moodcast_api::Error>> + Send;
}

impl ReverseGeocoder for GeocodeClient {
    fn reverse(
        &self,
        lat: f64,
        lon: f64,
    ) -> impl Future<Output = Result<Option<String>, moodcast_api::Error>> + Send {
        GeocodeClient::reverse(self, lat, lon)
    }
}

/// Outcome of [`resolve`].
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub location: Location,
    /// Set when the fallback was used.
    pub notice: Option<Notice>,
}

impl Resolution {
    fn fallback(default: &Location, reason: impl Into<String>) -> Self {
        let location = default.without_coordinates();
        let reason = reason.into();
        tracing::warn!(%reason, fallback = %location, "location resolution failed");
        Self {
            notice: Some(Notice::LocationResolutionFailure {
                reason,
                fallback: location.name().to_owned(),
            }),
            location,
        }
    }
}

/// Resolve `coords` to a named location. `None` means the position was
/// unavailable (permission denied or unsupported).
pub async fn resolve<G: ReverseGeocoder>(
    geocoder: &G,
    coords: Option<Coordinates>,
    default: &Location,
) -> Resolution {
    let Some(coords) = coords else {
        return Resolution::fallback(default, "position unavailable");
    };

    match geocoder.reverse(coords.lat, coords.lon).await {
        Ok(Some(name)) if !name.trim().is_empty() => {
            let location = Location::at(name.trim(), coords);
            tracing::debug!(%location, "location resolved");
            Resolution {
                location,
                notice: None,
            }
        }
        Ok(_) => Resolution::fallback(default, "no place name for these coordinates"),
        Err(e) => Resolution::fallback(default, e.to_string()),
    }
}
