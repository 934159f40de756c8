// Reverse geocoding client (Nominatim-style `/reverse` endpoint).

use serde::Deserialize;
use url::Url;

use crate::error::Error;
use crate::transport::{TransportConfig, read_json};

/// Subset of the `/reverse?format=json` response we care about.
#[derive(Debug, Default, Deserialize)]
pub struct ReverseResponse {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Address {
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub hamlet: Option<String>,
}

impl ReverseResponse {
    /// Best settlement-level name, or `None` if the response carries nothing usable.
    pub fn place_name(&self) -> Option<String> {
        let address = self.address.as_ref();
        address
            .and_then(|a| {
                a.city
                    .as_ref()
                    .or(a.town.as_ref())
                    .or(a.village.as_ref())
                    .or(a.hamlet.as_ref())
            })
            .or(self.name.as_ref())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(String::from)
    }
}

/// HTTP client for reverse geocoding.
#[derive(Debug, Clone)]
pub struct GeocodeClient {
    http: reqwest::Client,
    base_url: Url,
}

impl GeocodeClient {
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            base_url,
        })
    }

    /// Wrap an existing `reqwest::Client` (shared pools, tests).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
        })
    }

    /// Resolve `(lat, lon)` to a place name.
    ///
    /// `Ok(None)` means the service answered but had no usable name.
    pub async fn reverse(&self, lat: f64, lon: f64) -> Result<Option<String>, Error> {
        let url = self.base_url.join("reverse")?;
        tracing::debug!(lat, lon, "reverse geocoding");

        let resp = self
            .http
            .get(url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("format", "json".to_owned()),
            ])
            .send()
            .await?;

        let body: ReverseResponse = read_json(resp).await?;
        Ok(body.place_name())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn place_name_prefers_city_over_town() {
        let resp: ReverseResponse = serde_json::from_str(
            r#"{"name": "Shibuya", "address": {"city": "Tokyo", "town": "Shibuya"}}"#,
        )
        .unwrap();
        assert_eq!(resp.place_name().as_deref(), Some("Tokyo"));
    }

    #[test]
    fn place_name_falls_back_to_name() {
        let resp: ReverseResponse =
            serde_json::from_str(r#"{"name": "Cape Point", "address": {}}"#).unwrap();
        assert_eq!(resp.place_name().as_deref(), Some("Cape Point"));
    }

    #[test]
    fn blank_names_are_none() {
        let resp: ReverseResponse =
            serde_json::from_str(r#"{"name": "  ", "display_name": "somewhere"}"#).unwrap();
        assert!(resp.place_name().is_none());
        assert!(ReverseResponse::default().place_name().is_none());
    }
}
