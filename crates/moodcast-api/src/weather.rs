// Current-weather REST client: the on-demand counterpart to the pub/sub feed.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;
use crate::transport::{TransportConfig, read_json};

/// Response body of `GET /weather?lat=..&lon=..`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub city: String,
    pub lat: f64,
    pub lon: f64,
    pub weather: Conditions,
    #[serde(default)]
    pub mood_score: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub quality: Option<Quality>,
}

/// Sensor values; any of them may be missing upstream.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Conditions {
    pub temp: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub wind_speed: Option<f64>,
    pub clouds: Option<f64>,
    pub rain: Option<f64>,
}

/// Data-quality metrics attached by the service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Quality {
    pub completeness: Option<f64>,
    /// Age of the sample in seconds.
    pub freshness: Option<f64>,
    #[serde(default)]
    pub missing_fields: Vec<String>,
    pub error: Option<String>,
}

/// HTTP client for the current-weather endpoint.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    base_url: Url,
}

impl WeatherClient {
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            base_url,
        })
    }

    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
        })
    }

    /// Latest stored reading near `(lat, lon)`.
    pub async fn current(&self, lat: f64, lon: f64) -> Result<CurrentWeather, Error> {
        let url = self.base_url.join("weather")?;
        tracing::debug!(lat, lon, "fetching current weather");

        let resp = self
            .http
            .get(url)
            .query(&[("lat", lat.to_string()), ("lon", lon.to_string())])
            .send()
            .await?;

        read_json(resp).await
    }
}
