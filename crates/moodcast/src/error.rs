//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use moodcast_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach {url}")]
    #[diagnostic(
        code(moodcast::connection_failed),
        help(
            "Check that the service is running and reachable.\n\
             URL: {url}\n\
             Override it with --broker, --api-url or --geocoder-url."
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(moodcast::not_found),
        help("Run: moodcast {list_command} to see what is available")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("No weather data for this location: {message}")]
    #[diagnostic(
        code(moodcast::no_data),
        help("The weather service has no reading here yet. Try a city from: moodcast cities")
    )]
    NoData { message: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Service error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    #[diagnostic(code(moodcast::api_error))]
    Api { message: String, status: Option<u16> },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(moodcast::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(moodcast::config),
        help("Check the config file shown by: moodcast config path")
    )]
    Config(Box<figment::Error>),

    #[error("Could not render configuration: {0}")]
    #[diagnostic(code(moodcast::config_render))]
    ConfigRender(#[from] toml::ser::Error),

    // ── Internal ─────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    #[diagnostic(code(moodcast::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(moodcast::json))]
    Json(#[from] serde_json::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl From<moodcast_api::Error> for CliError {
    fn from(err: moodcast_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::NotFound { .. } | Self::NoData { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::Config(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },
            CoreError::ControllerStopped => CliError::Internal("controller has stopped".into()),
            CoreError::NotFound { message } => CliError::NoData { message },
            CoreError::Api { message, status } => CliError::Api { message, status },
            CoreError::Config { message } => CliError::Validation {
                field: "configuration".into(),
                reason: message,
            },
        }
    }
}
