// ── Runtime controller configuration ──
//
// Describes how the controller talks to the broker and derives state.
// Core never reads config files: the CLI builds a `ControllerConfig`
// and hands it in.

use std::time::Duration;

use moodcast_api::ReconnectConfig;
use url::Url;

use crate::error::CoreError;
use crate::model::{Coordinates, Location};
use crate::mood::MoodWeights;

pub const DEFAULT_BROKER_URL: &str = "ws://localhost:9001/mqtt";
pub const DEFAULT_TOPIC_PREFIX: &str = "moodcast";

/// Configuration for one controller instance.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Broker WebSocket endpoint (e.g. `ws://localhost:9001/mqtt`).
    pub broker_url: String,
    /// Prefix for all channel topics.
    pub topic_prefix: String,
    /// Quiet window before a location change is announced.
    pub debounce: Duration,
    /// How long without a reading before the feed is flagged stale.
    pub staleness_timeout: Duration,
    /// Number of recent alerts kept.
    pub alert_capacity: usize,
    /// Used until a location is chosen, and whenever resolution fails.
    pub default_location: Location,
    pub reconnect: ReconnectConfig,
    pub mood: MoodWeights,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            broker_url: DEFAULT_BROKER_URL.into(),
            topic_prefix: DEFAULT_TOPIC_PREFIX.into(),
            debounce: Duration::from_millis(500),
            staleness_timeout: Duration::from_millis(10_000),
            alert_capacity: 5,
            default_location: Location::at(
                "London",
                Coordinates {
                    lat: 51.5074,
                    lon: -0.1278,
                },
            ),
            reconnect: ReconnectConfig::default(),
            mood: MoodWeights::default(),
        }
    }
}

impl ControllerConfig {
    /// Parsed broker URL; only `ws` and `wss` are accepted.
    pub fn broker_url(&self) -> Result<Url, CoreError> {
        let url = Url::parse(&self.broker_url).map_err(|e| CoreError::Config {
            message: format!("broker URL '{}': {e}", self.broker_url),
        })?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(CoreError::Config {
                message: format!("broker URL must use ws:// or wss://, got {other}://"),
            }),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        self.broker_url()?;

        if self.debounce.is_zero() {
            return Err(CoreError::Config {
                message: "debounce must be greater than zero".into(),
            });
        }
        if self.staleness_timeout.is_zero() {
            return Err(CoreError::Config {
                message: "staleness timeout must be greater than zero".into(),
            });
        }
        if self.default_location.name().trim().is_empty() {
            return Err(CoreError::Config {
                message: "default location needs a name".into(),
            });
        }
        Ok(())
    }
}
