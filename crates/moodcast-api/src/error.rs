use thiserror::Error;

/// Top-level error type for the `moodcast-api` crate.
///
/// Covers every failure mode across the transport surfaces:
/// HTTP (geocoding, current weather), WebSocket pub/sub, and payload decoding.
/// `moodcast-core` maps these into notices and user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Failed to construct the HTTP client.
    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),

    // ── REST ────────────────────────────────────────────────────────
    /// The service had no data for the request (HTTP 404).
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// The request was rejected as malformed (HTTP 400).
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// Any other non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed unexpectedly.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::WebSocketConnect(_) | Self::WebSocketClosed { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::NotFound { .. } => true,
            _ => false,
        }
    }
}
