// ── Alert domain type ──

use serde::{Deserialize, Serialize};

/// Provider alert (e.g. a pressure drop warning).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertMessage {
    pub message: String,
    #[serde(default)]
    pub severity: Option<String>,
    /// Provider timestamp as sent (ISO-8601). Stamped locally when absent.
    #[serde(default)]
    pub timestamp: String,
}
