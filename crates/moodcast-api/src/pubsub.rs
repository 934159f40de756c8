//! WebSocket publish/subscribe session.
//!
//! Connects to a broker's WebSocket endpoint and exchanges JSON frames
//! carrying topic-addressed payloads. Each call to [`Connector::open`]
//! spawns exactly one connection attempt; the session reports its lifecycle
//! (`Connected`, `Message`, `Closed`, `Failed`) on an mpsc channel tagged
//! with the caller's [`SessionId`]. Reconnection is the caller's concern --
//! [`ReconnectConfig`] describes the backoff policy it should apply.
//!
//! # Example
//!
//! ```rust,ignore
//! use moodcast_api::pubsub::{Connector, SessionId, WebSocketConnector};
//! use tokio::sync::mpsc;
//!
//! let connector = WebSocketConnector::new("ws://localhost:9001/mqtt".parse()?);
//! let (tx, mut rx) = mpsc::unbounded_channel();
//!
//! let link = connector.open(SessionId(1), tx);
//! link.subscribe("moodcast/weather")?;
//!
//! while let Some(evt) = rx.recv().await {
//!     println!("{:?}", evt.event);
//! }
//!
//! link.close();
//! ```

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;

// ── Session identity & events ────────────────────────────────────────

/// Identifies one connection attempt. Callers bump this on every reconnect
/// so events from a superseded session can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

/// Lifecycle and data events produced by a session.
#[derive(Debug)]
pub enum TransportEvent {
    /// The broker accepted the connection.
    Connected,
    /// A message arrived on `topic`. The payload is forwarded as raw text.
    Message { topic: String, payload: String },
    /// The broker closed the session (close frame or end of stream).
    Closed { reason: String },
    /// The connection could not be established or broke with an error.
    Failed(Error),
}

/// A [`TransportEvent`] tagged with the session that produced it.
#[derive(Debug)]
pub struct SessionEvent {
    pub session: SessionId,
    pub event: TransportEvent,
}

// ── Wire frames ──────────────────────────────────────────────────────

/// Frame sent from the client to the broker.
///
/// Serialized as `{"op": "subscribe", "topic": ...}` or
/// `{"op": "publish", "topic": ..., "payload": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ClientFrame {
    Subscribe { topic: String },
    Publish { topic: String, payload: String },
}

/// Raw envelope the broker sends for every delivered message.
///
/// `payload` is either JSON text in a string or inline JSON -- both are
/// normalized to text before being handed on.
#[derive(Debug, Deserialize)]
struct ServerFrame {
    topic: String,
    #[serde(default)]
    payload: serde_json::Value,
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Delay growth strategy between reconnection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// `initial * 2^attempt`, capped at `max_delay`, with jitter.
    #[default]
    Exponential,
    /// Always wait `initial_delay`.
    Fixed,
    /// Never reconnect.
    Never,
}

/// Backoff configuration for pub/sub reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    pub backoff: Backoff,

    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            backoff: Backoff::Exponential,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

impl ReconnectConfig {
    /// Delay to wait before reconnection attempt number `attempt` (0-based),
    /// or `None` if the policy says to give up.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if let Some(max) = self.max_retries {
            if attempt >= max {
                return None;
            }
        }

        match self.backoff {
            Backoff::Never => None,
            Backoff::Fixed => Some(self.initial_delay),
            Backoff::Exponential => Some(calculate_backoff(attempt, self)),
        }
    }
}

// ── Link ─────────────────────────────────────────────────────────────

/// Owner-side handle to one session.
///
/// Frames queued before the broker accepts the connection are written as
/// soon as it does. Dropping the link closes the session.
#[derive(Debug)]
pub struct Link {
    outbound: mpsc::UnboundedSender<ClientFrame>,
    cancel: CancellationToken,
}

impl Link {
    pub fn new(outbound: mpsc::UnboundedSender<ClientFrame>, cancel: CancellationToken) -> Self {
        Self { outbound, cancel }
    }

    /// Ask the broker to deliver messages published on `topic`.
    pub fn subscribe(&self, topic: &str) -> Result<(), Error> {
        self.send(ClientFrame::Subscribe {
            topic: topic.to_owned(),
        })
    }

    /// Publish `payload` (JSON text) on `topic`.
    pub fn publish(&self, topic: &str, payload: String) -> Result<(), Error> {
        self.send(ClientFrame::Publish {
            topic: topic.to_owned(),
            payload,
        })
    }

    /// Signal the session task to close the connection.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.outbound.is_closed()
    }

    fn send(&self, frame: ClientFrame) -> Result<(), Error> {
        self.outbound
            .send(frame)
            .map_err(|_| Error::WebSocketClosed {
                code: 1006,
                reason: "session task has ended".into(),
            })
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Connector ────────────────────────────────────────────────────────

/// Opens pub/sub sessions. The seam between the controller and the network.
pub trait Connector: Send + Sync + 'static {
    /// Start one connection attempt, reporting events on `events`.
    ///
    /// Must not block: the attempt runs in the background and its outcome
    /// arrives as a [`TransportEvent`].
    fn open(&self, session: SessionId, events: mpsc::UnboundedSender<SessionEvent>) -> Link;
}

/// [`Connector`] speaking JSON frames over a WebSocket.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: Url,
}

impl WebSocketConnector {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Connector for WebSocketConnector {
    fn open(&self, session: SessionId, events: mpsc::UnboundedSender<SessionEvent>) -> Link {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let url = self.url.clone();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            run_session(url, session, events, outbound_rx, task_cancel).await;
        });

        Link::new(outbound_tx, cancel)
    }
}

// ── Single session lifecycle ─────────────────────────────────────────

async fn run_session(
    url: Url,
    session: SessionId,
    events: mpsc::UnboundedSender<SessionEvent>,
    mut outbound: mpsc::UnboundedReceiver<ClientFrame>,
    cancel: CancellationToken,
) {
    let event = match connect_and_pump(&url, session, &events, &mut outbound, &cancel).await {
        Ok(Some(reason)) => TransportEvent::Closed { reason },
        // Closed locally: the owner already knows.
        Ok(None) => return,
        Err(e) => TransportEvent::Failed(e),
    };

    // Ignore send errors -- the owner has gone away.
    let _ = events.send(SessionEvent { session, event });
    tracing::debug!(session = session.0, "pub/sub session ended");
}

/// Establish the connection and shuttle frames until it drops.
///
/// Returns `Ok(Some(reason))` when the broker ended the session,
/// `Ok(None)` when the owner closed it.
async fn connect_and_pump(
    url: &Url,
    session: SessionId,
    events: &mpsc::UnboundedSender<SessionEvent>,
    outbound: &mut mpsc::UnboundedReceiver<ClientFrame>,
    cancel: &CancellationToken,
) -> Result<Option<String>, Error> {
    tracing::info!(url = %url, session = session.0, "Connecting to broker");

    let (ws_stream, _response) = tokio::select! {
        biased;
        () = cancel.cancelled() => return Ok(None),
        result = tokio_tungstenite::connect_async(url.as_str()) => {
            result.map_err(|e| Error::WebSocketConnect(e.to_string()))?
        }
    };

    tracing::info!(session = session.0, "Broker connected");
    let _ = events.send(SessionEvent {
        session,
        event: TransportEvent::Connected,
    });

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                let _ = write.send(tungstenite::Message::Close(None)).await;
                return Ok(None);
            }
            frame = outbound.recv() => {
                let Some(frame) = frame else {
                    let _ = write.send(tungstenite::Message::Close(None)).await;
                    return Ok(None);
                };
                let text = encode_client_frame(&frame)?;
                tracing::trace!(frame = %text, "sending frame");
                write
                    .send(tungstenite::Message::text(text))
                    .await
                    .map_err(|e| Error::WebSocketConnect(e.to_string()))?;
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        if let Some((topic, payload)) = decode_server_frame(&text) {
                            let _ = events.send(SessionEvent {
                                session,
                                event: TransportEvent::Message { topic, payload },
                            });
                        }
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        // tungstenite handles pong replies automatically
                        tracing::trace!("WebSocket ping");
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        let reason = match frame {
                            Some(cf) => format!("close frame {}: {}", cf.code, cf.reason),
                            None => "close frame (no payload)".to_owned(),
                        };
                        tracing::info!(%reason, "Broker closed session");
                        return Ok(Some(reason));
                    }
                    Some(Err(e)) => {
                        return Err(Error::WebSocketConnect(e.to_string()));
                    }
                    None => {
                        tracing::info!("WebSocket stream ended");
                        return Ok(Some("stream ended".to_owned()));
                    }
                    _ => {
                        // Binary, Pong, Frame -- ignore
                    }
                }
            }
        }
    }
}

// ── Frame codec ──────────────────────────────────────────────────────

fn encode_client_frame(frame: &ClientFrame) -> Result<String, Error> {
    serde_json::to_string(frame).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: String::new(),
    })
}

/// Split a broker frame into `(topic, payload text)`.
///
/// Envelopes without a topic cannot be routed and are dropped here; payload
/// validation is left to the consumer.
fn decode_server_frame(text: &str) -> Option<(String, String)> {
    let frame: ServerFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            tracing::debug!(error = %e, "Failed to parse broker envelope");
            return None;
        }
    };

    let payload = match frame.payload {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    };
    Some((frame.topic, payload))
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25% to spread out reconnection storms from multiple clients.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt.min(30)).unwrap_or(30);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic "jitter" seeded from the attempt number.
    // Not cryptographically random, but good enough for backoff spread.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────
