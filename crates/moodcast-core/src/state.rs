// ── Connection state machine ──

use serde::Serialize;
use strum::Display;

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

/// Inputs that drive [`ConnectionState`] transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnEvent {
    Start,
    ConnectAck,
    TransportError,
    TransportClosed,
    RetryDue,
    Stop,
}

impl ConnectionState {
    /// Next state after `event`. Total: pairs with no defined transition
    /// leave the state unchanged.
    #[must_use]
    pub fn on(self, event: ConnEvent) -> Self {
        use ConnEvent as E;

        match (self, event) {
            (_, E::Stop) => Self::Disconnected,
            (Self::Disconnected, E::Start) => Self::Connecting,
            (Self::Connecting, E::ConnectAck) => Self::Connected,
            (Self::Connecting | Self::Connected, E::TransportError | E::TransportClosed) => {
                Self::Failed
            }
            (Self::Failed, E::RetryDue) => Self::Connecting,
            (state, _) => state,
        }
    }
}
