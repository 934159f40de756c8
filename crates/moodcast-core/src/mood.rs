// ── Mood scoring ──
//
// Turns a reading into an integer score and a recommendation band.
// Pure and deterministic: the caller supplies "now" for the sunset check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::model::{ForecastPoint, WeatherReading};

/// Weights and thresholds for [`MoodScorer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoodWeights {
    pub low_pressure_below: f64,
    pub low_pressure: i32,
    pub high_pressure_above: f64,
    pub high_pressure: i32,
    pub overcast_above: f64,
    pub overcast: i32,
    pub clear_below: f64,
    pub clear: i32,
    pub rain: i32,
    pub windy_above: f64,
    pub windy: i32,
    pub after_sunset: i32,
    /// Scores at or below this land in [`MoodBand::ZenMaster`].
    pub zen_at_or_below: i32,
    /// Scores at or above this land in [`MoodBand::EnergyStar`].
    pub energy_at_or_above: i32,
}

impl Default for MoodWeights {
    fn default() -> Self {
        Self {
            low_pressure_below: 1000.0,
            low_pressure: -20,
            high_pressure_above: 1020.0,
            high_pressure: 10,
            overcast_above: 70.0,
            overcast: -10,
            clear_below: 30.0,
            clear: 10,
            rain: -15,
            windy_above: 10.0,
            windy: -10,
            after_sunset: -10,
            zen_at_or_below: -30,
            energy_at_or_above: 15,
        }
    }
}

/// Ordered recommendation bands, gloomiest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
pub enum MoodBand {
    #[strum(to_string = "Zen Master")]
    ZenMaster,
    #[strum(to_string = "Cozy Reader")]
    CozyReader,
    #[strum(to_string = "Sunshine Explorer")]
    SunshineExplorer,
    #[strum(to_string = "Energy Star")]
    EnergyStar,
}

impl MoodBand {
    pub fn message(self) -> &'static str {
        match self {
            Self::ZenMaster => {
                "Heavy skies out there. Brew some tea and try a ten-minute breathing session."
            }
            Self::CozyReader => "A blanket-and-book kind of day. Stay in and get cozy.",
            Self::SunshineExplorer => "Decent weather. A walk around the neighbourhood will do you good.",
            Self::EnergyStar => "Bright and crisp! Perfect time for a run or a day outdoors.",
        }
    }

    pub fn badge(self) -> String {
        self.to_string()
    }
}

/// Derived recommendation for one reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodResult {
    pub score: i32,
    pub band: MoodBand,
    pub message: String,
    pub badge: String,
}

/// Applies [`MoodWeights`] to readings.
#[derive(Debug, Clone, Default)]
pub struct MoodScorer {
    weights: MoodWeights,
}

impl MoodScorer {
    pub fn new(weights: MoodWeights) -> Self {
        Self { weights }
    }

    /// Score `reading` as seen at `now`. Missing optional fields add nothing.
    pub fn score(&self, reading: &WeatherReading, now: DateTime<Utc>) -> MoodResult {
        let w = &self.weights;
        // Weights come from user config; extreme values clamp instead of wrapping.
        let mut score: i32 = 0;

        if reading.pressure < w.low_pressure_below {
            score = score.saturating_add(w.low_pressure);
        } else if reading.pressure > w.high_pressure_above {
            score = score.saturating_add(w.high_pressure);
        }

        if reading.clouds > w.overcast_above {
            score = score.saturating_add(w.overcast);
        } else if reading.clouds < w.clear_below {
            score = score.saturating_add(w.clear);
        }

        if reading.rain_1h.unwrap_or(0.0) > 0.0 {
            score = score.saturating_add(w.rain);
        }

        if reading.wind_speed.unwrap_or(0.0) > w.windy_above {
            score = score.saturating_add(w.windy);
        }

        if reading.sunset.is_some_and(|sunset| now.timestamp() >= sunset) {
            score = score.saturating_add(w.after_sunset);
        }

        let band = self.band(score);
        MoodResult {
            score,
            band,
            message: band.message().to_owned(),
            badge: band.badge(),
        }
    }

    pub fn band(&self, score: i32) -> MoodBand {
        if score <= self.weights.zen_at_or_below {
            MoodBand::ZenMaster
        } else if score < 0 {
            MoodBand::CozyReader
        } else if score < self.weights.energy_at_or_above {
            MoodBand::SunshineExplorer
        } else {
            MoodBand::EnergyStar
        }
    }
}

/// Simple 0–100 comfort index for a forecast step:
/// `(100 - clouds) * temperature / 30`, clamped, one decimal.
pub fn forecast_comfort(point: &ForecastPoint) -> f64 {
    let raw = (100.0 - point.clouds) * (point.temperature / 30.0);
    (raw.clamp(0.0, 100.0) * 10.0).round() / 10.0
}
