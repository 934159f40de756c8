//! CLI-owned configuration: TOML file + environment, and translation to
//! `moodcast_core::ControllerConfig`.
//!
//! Core never sees these types -- it receives a pre-built `ControllerConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use moodcast_api::{TlsMode, TransportConfig};
use moodcast_core::config::{DEFAULT_BROKER_URL, DEFAULT_TOPIC_PREFIX};
use moodcast_core::{
    Backoff, ControllerConfig, Coordinates, Location, MoodWeights, ReconnectConfig,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── TOML config structs ──────────────────────────────────────────────

/// CLI-owned TOML configuration. Core never touches this type.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub broker: BrokerSection,
    pub feed: FeedSection,
    pub location: LocationSection,
    pub reconnect: ReconnectSection,
    pub services: ServicesSection,
    pub mood: MoodWeights,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct BrokerSection {
    pub url: String,
    pub topic_prefix: String,
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self {
            url: DEFAULT_BROKER_URL.into(),
            topic_prefix: DEFAULT_TOPIC_PREFIX.into(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedSection {
    pub debounce_ms: u64,
    pub staleness_timeout_ms: u64,
    pub alert_capacity: usize,
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            staleness_timeout_ms: 10_000,
            alert_capacity: 5,
        }
    }
}

/// Fallback location when none is chosen or resolution fails.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LocationSection {
    pub default_city: String,
    pub default_lat: Option<f64>,
    pub default_lon: Option<f64>,
}

impl Default for LocationSection {
    fn default() -> Self {
        Self {
            default_city: "London".into(),
            default_lat: Some(51.5074),
            default_lon: Some(-0.1278),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconnectSection {
    /// "exponential", "fixed" or "never".
    pub backoff: String,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_retries: Option<u32>,
}

impl Default for ReconnectSection {
    fn default() -> Self {
        Self {
            backoff: "exponential".into(),
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
            max_retries: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ServicesSection {
    /// Base URL of the weather REST service.
    pub api_url: String,
    /// Base URL of the reverse-geocoding service.
    pub geocoder_url: String,
    /// Request timeout in seconds.
    pub timeout: u64,
    pub insecure: bool,
}

impl Default for ServicesSection {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000/".into(),
            geocoder_url: "https://nominatim.openstreetmap.org/".into(),
            timeout: 10,
            insecure: false,
        }
    }
}

// ── Config file path ─────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    if let Some(path) = &global.config {
        return path.clone();
    }
    ProjectDirs::from("dev", "moodcast", "moodcast")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from(".moodcast.toml"))
}

// ── Config loading ───────────────────────────────────────────────────

/// Load the full Config: defaults, then the file (if present), then
/// `MOODCAST_<SECTION>__<KEY>` environment variables.
pub fn load_config(path: &Path) -> Result<Config, CliError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("MOODCAST_").split("__"));

    let config: Config = figment.extract()?;
    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// Config with global flag overrides applied.
pub fn resolve(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut config = load_config(&config_path(global))?;
    if let Some(url) = &global.broker {
        config.broker.url.clone_from(url);
    }
    if let Some(url) = &global.api_url {
        config.services.api_url.clone_from(url);
    }
    if let Some(url) = &global.geocoder_url {
        config.services.geocoder_url.clone_from(url);
    }
    if let Some(timeout) = global.timeout {
        config.services.timeout = timeout;
    }
    config.services.insecure |= global.insecure;
    Ok(config)
}

// ── Translation to core types ────────────────────────────────────────

impl Config {
    /// This is the single boundary where CLI config types cross into core types.
    pub fn controller_config(&self) -> Result<ControllerConfig, CliError> {
        let backoff = match self.reconnect.backoff.to_ascii_lowercase().as_str() {
            "exponential" => Backoff::Exponential,
            "fixed" => Backoff::Fixed,
            "never" => Backoff::Never,
            other => {
                return Err(CliError::Validation {
                    field: "reconnect.backoff".into(),
                    reason: format!("expected 'exponential', 'fixed' or 'never', got '{other}'"),
                });
            }
        };

        let config = ControllerConfig {
            broker_url: self.broker.url.clone(),
            topic_prefix: self.broker.topic_prefix.clone(),
            debounce: Duration::from_millis(self.feed.debounce_ms),
            staleness_timeout: Duration::from_millis(self.feed.staleness_timeout_ms),
            alert_capacity: self.feed.alert_capacity,
            default_location: self.default_location(),
            reconnect: ReconnectConfig {
                backoff,
                initial_delay: Duration::from_millis(self.reconnect.initial_delay_ms),
                max_delay: Duration::from_millis(self.reconnect.max_delay_ms),
                max_retries: self.reconnect.max_retries,
            },
            mood: self.mood.clone(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn default_location(&self) -> Location {
        let name = self.location.default_city.clone();
        match (self.location.default_lat, self.location.default_lon) {
            (Some(lat), Some(lon)) => Location::at(name, Coordinates { lat, lon }),
            _ => Location::named(name),
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: if self.services.insecure {
                TlsMode::DangerAcceptInvalid
            } else {
                TlsMode::System
            },
            timeout: Duration::from_secs(self.services.timeout),
        }
    }

    pub fn api_url(&self) -> Result<url::Url, CliError> {
        parse_url("services.api_url", &self.services.api_url)
    }

    pub fn geocoder_url(&self) -> Result<url::Url, CliError> {
        parse_url("services.geocoder_url", &self.services.geocoder_url)
    }
}

/// Parse a base URL, making sure relative joins keep its path.
fn parse_url(field: &str, raw: &str) -> Result<url::Url, CliError> {
    let normalized = if raw.ends_with('/') {
        raw.to_owned()
    } else {
        format!("{raw}/")
    };
    normalized.parse().map_err(|e| CliError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })
}
