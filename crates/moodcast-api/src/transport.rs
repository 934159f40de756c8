// Shared transport configuration for building reqwest::Client instances.
//
// The geocoding and current-weather clients share timeout and TLS
// settings through this module, avoiding duplicated builder logic.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::Error;

const USER_AGENT: &str = concat!("moodcast/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode for REST collaborators.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Use the system certificate store.
    #[default]
    System,
    /// Accept any certificate (local development services).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(10),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT);

        if matches!(self.tls, TlsMode::DangerAcceptInvalid) {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder
            .build()
            .map_err(|e| Error::ClientSetup(format!("failed to build HTTP client: {e}")))
    }
}

/// Map a response into `T`, translating error statuses and keeping the raw
/// body around when decoding fails.
pub(crate) async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        let message = error_message(&body);
        return Err(match status.as_u16() {
            400 => Error::BadRequest { message },
            404 => Error::NotFound { message },
            code => Error::Http {
                status: code,
                message,
            },
        });
    }

    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body,
    })
}

/// Pull `{"error": "..."}` out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| body.trim().to_owned())
}
