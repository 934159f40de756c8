// ── Core error types ──
//
// Two families live here. `Notice` is the non-fatal condition surfaced on
// the snapshot while the controller keeps running. `CoreError` is what a
// caller of the controller handle gets back. The `From<moodcast_api::Error>`
// impl translates transport-layer errors into the latter.

use std::time::Duration;

use strum::Display;
use thiserror::Error;

use crate::channels::Channel;

/// Non-fatal condition observed by the controller.
///
/// None of these stop the controller; the latest one is exposed as the
/// snapshot's `notice` until something clears or replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Notice {
    /// The broker session failed or closed. A reconnect is scheduled unless
    /// the policy has given up. Cleared on the next connect-ack.
    #[error("Connection to broker failed: {reason}")]
    ConnectionFailure { reason: String },

    /// An inbound payload could not be parsed. Prior state is retained.
    #[error("Could not parse {channel} message: {reason}")]
    ParseFailure { channel: Channel, reason: String },

    /// Reverse geocoding was denied or failed; the default location is used.
    #[error("Could not resolve location ({reason}); using {fallback}")]
    LocationResolutionFailure { reason: String, fallback: String },

    /// No reading arrived within the staleness timeout.
    #[error("No weather data received in the last {}s", .timeout.as_secs())]
    StalenessFailure { timeout: Duration },
}

/// Discriminant of [`Notice`], handy for matching and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum NoticeKind {
    #[strum(to_string = "connection")]
    Connection,
    #[strum(to_string = "parse")]
    Parse,
    #[strum(to_string = "location")]
    LocationResolution,
    #[strum(to_string = "stale")]
    Staleness,
}

impl Notice {
    pub fn kind(&self) -> NoticeKind {
        match self {
            Self::ConnectionFailure { .. } => NoticeKind::Connection,
            Self::ParseFailure { .. } => NoticeKind::Parse,
            Self::LocationResolutionFailure { .. } => NoticeKind::LocationResolution,
            Self::StalenessFailure { .. } => NoticeKind::Staleness,
        }
    }
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Controller has stopped")]
    ControllerStopped,

    #[error("Cannot connect to broker at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    // ── Data ─────────────────────────────────────────────────────────
    #[error("Not found: {message}")]
    NotFound { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<moodcast_api::Error> for CoreError {
    fn from(err: moodcast_api::Error) -> Self {
        use moodcast_api::Error as Api;

        match err {
            Api::Transport(ref e) if e.is_connect() => CoreError::ConnectionFailed {
                url: e
                    .url()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| "<unknown>".into()),
                reason: e.to_string(),
            },
            Api::Transport(e) => CoreError::Api {
                message: e.to_string(),
                status: e.status().map(|s| s.as_u16()),
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid URL: {e}"),
            },
            Api::ClientSetup(message) => CoreError::Config { message },
            Api::NotFound { message } => CoreError::NotFound { message },
            Api::BadRequest { message } => CoreError::Api {
                message,
                status: Some(400),
            },
            Api::Http { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            Api::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: "<broker>".into(),
                reason,
            },
            Api::WebSocketClosed { code, reason } => CoreError::ConnectionFailed {
                url: "<broker>".into(),
                reason: format!("closed with code {code}: {reason}"),
            },
            Api::Deserialization { message, .. } => CoreError::Api {
                message: format!("unexpected response: {message}"),
                status: None,
            },
        }
    }
}
