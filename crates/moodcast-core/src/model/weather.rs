// ── Weather domain types ──
//
// Each type is a full replacement of its slice of state. Fields the
// provider may omit stay `None`; rendering "N/A" is the consumer's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current conditions for one city, as published on the weather channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub city: String,
    /// Degrees Celsius.
    pub temperature: f64,
    #[serde(default, alias = "feelsLike")]
    pub feels_like: Option<f64>,
    /// hPa.
    pub pressure: f64,
    /// Percent.
    pub humidity: f64,
    /// Cloud cover, percent.
    pub clouds: f64,
    /// Precipitation over the last hour, mm.
    #[serde(default, alias = "rain1h")]
    pub rain_1h: Option<f64>,
    /// m/s.
    #[serde(default, alias = "windSpeed")]
    pub wind_speed: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    /// Unix seconds.
    #[serde(default)]
    pub sunrise: Option<i64>,
    /// Unix seconds.
    #[serde(default)]
    pub sunset: Option<i64>,
    /// Provider observation time, unix seconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// When this reading was accepted locally.
    #[serde(default, skip_deserializing)]
    pub received_at: DateTime<Utc>,
}

/// One step of a forecast sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Unix seconds.
    pub timestamp: i64,
    pub temperature: f64,
    pub pressure: f64,
    pub clouds: f64,
    #[serde(default)]
    pub icon: Option<String>,
}
