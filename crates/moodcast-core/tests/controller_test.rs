#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use moodcast_api::{
    Backoff, ClientFrame, Connector, Link, ReconnectConfig, SessionEvent, SessionId,
    TransportEvent,
};
use moodcast_core::{
    Channel, ConnectionState, Controller, ControllerConfig, Coordinates, Location, Notice,
    ReverseGeocoder, catalog,
};
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ── Mock transport ──────────────────────────────────────────────────

struct MockSession {
    id: SessionId,
    events: mpsc::UnboundedSender<SessionEvent>,
    frames: mpsc::UnboundedReceiver<ClientFrame>,
    cancel: CancellationToken,
}

/// Records every session the controller opens and lets the test drive it.
#[derive(Clone, Default)]
struct MockConnector {
    sessions: Arc<Mutex<Vec<MockSession>>>,
}

impl Connector for MockConnector {
    fn open(&self, session: SessionId, events: mpsc::UnboundedSender<SessionEvent>) -> Link {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        self.sessions.lock().unwrap().push(MockSession {
            id: session,
            events,
            frames: rx,
            cancel: cancel.clone(),
        });
        Link::new(tx, cancel)
    }
}

impl MockConnector {
    fn opened(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    fn emit(&self, index: usize, event: TransportEvent) {
        let sessions = self.sessions.lock().unwrap();
        let session = &sessions[index];
        let _ = session.events.send(SessionEvent {
            session: session.id,
            event,
        });
    }

    fn connect(&self, index: usize) {
        self.emit(index, TransportEvent::Connected);
    }

    fn deliver(&self, index: usize, channel: &str, payload: &str) {
        self.emit(
            index,
            TransportEvent::Message {
                topic: format!("moodcast/{channel}"),
                payload: payload.to_owned(),
            },
        );
    }

    fn frames(&self, index: usize) -> Vec<ClientFrame> {
        let mut sessions = self.sessions.lock().unwrap();
        let mut out = Vec::new();
        while let Ok(frame) = sessions[index].frames.try_recv() {
            out.push(frame);
        }
        out
    }

    /// Cities announced on `session` since the last drain.
    fn announced(&self, index: usize) -> Vec<String> {
        self.frames(index)
            .into_iter()
            .filter_map(|frame| match frame {
                ClientFrame::Publish { topic, payload } => {
                    assert_eq!(topic, "moodcast/city");
                    let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
                    Some(value["city"].as_str().unwrap().to_owned())
                }
                ClientFrame::Subscribe { .. } => None,
            })
            .collect()
    }

    fn is_closed(&self, index: usize) -> bool {
        self.sessions.lock().unwrap()[index].cancel.is_cancelled()
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

const GLOOMY: &str = r#"{"city":"London","temperature":9.5,"pressure":992,"humidity":88,
    "clouds":90,"rain_1h":1.2,"wind_speed":11.5,"description":"moderate rain"}"#;
const BRIGHT: &str = r#"{"city":"London","temperature":21,"pressure":1024,"humidity":40,
    "clouds":5,"rain_1h":0,"wind_speed":3.0,"description":"clear sky"}"#;

fn config() -> ControllerConfig {
    ControllerConfig {
        alert_capacity: 3,
        reconnect: ReconnectConfig {
            backoff: Backoff::Fixed,
            initial_delay: Duration::from_secs(1),
            ..ReconnectConfig::default()
        },
        ..ControllerConfig::default()
    }
}

fn controller() -> (Controller, MockConnector) {
    let mock = MockConnector::default();
    let controller = Controller::new(config(), Arc::new(mock.clone())).unwrap();
    (controller, mock)
}

/// Let the run task drain everything that is ready.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

async fn wait(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn city(name: &str) -> Location {
    catalog::find(name).unwrap().location()
}

/// Start, connect the first session and drop its setup frames.
async fn connected() -> (Controller, MockConnector) {
    let (controller, mock) = controller();
    controller.start().await.unwrap();
    settle().await;
    mock.connect(0);
    settle().await;
    assert_eq!(controller.connection_state(), ConnectionState::Connected);
    mock.frames(0);
    (controller, mock)
}

// ── Connection lifecycle ────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn connect_subscribes_and_announces_default_location() {
    let (controller, mock) = controller();
    assert_eq!(controller.connection_state(), ConnectionState::Disconnected);

    controller.start().await.unwrap();
    settle().await;
    assert_eq!(controller.connection_state(), ConnectionState::Connecting);
    assert_eq!(mock.opened(), 1);

    mock.connect(0);
    settle().await;
    assert_eq!(controller.connection_state(), ConnectionState::Connected);

    let frames = mock.frames(0);
    let subscribed: Vec<&str> = frames
        .iter()
        .filter_map(|f| match f {
            ClientFrame::Subscribe { topic } => Some(topic.as_str()),
            ClientFrame::Publish { .. } => None,
        })
        .collect();
    assert_eq!(
        subscribed,
        vec!["moodcast/weather", "moodcast/forecast", "moodcast/alerts"]
    );
    assert!(frames.iter().any(|f| matches!(
        f,
        ClientFrame::Publish { payload, .. } if payload == r#"{"city":"London","lat":51.5074,"lon":-0.1278}"#
    )));

    controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn start_is_idempotent_while_running() {
    let (controller, mock) = controller();
    controller.start().await.unwrap();
    controller.start().await.unwrap();
    settle().await;
    controller.start().await.unwrap();
    settle().await;

    assert_eq!(mock.opened(), 1);
    controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn reconnects_after_failure_and_ignores_superseded_session() {
    let (controller, mock) = connected().await;

    mock.emit(
        0,
        TransportEvent::Failed(moodcast_api::Error::WebSocketConnect("connection reset".into())),
    );
    settle().await;

    let snap = controller.snapshot();
    assert_eq!(snap.connection, ConnectionState::Failed);
    assert!(matches!(snap.notice, Some(Notice::ConnectionFailure { .. })));
    assert!(mock.is_closed(0));
    assert_eq!(mock.opened(), 1);

    wait(1_000).await;
    assert_eq!(mock.opened(), 2);
    assert_eq!(controller.connection_state(), ConnectionState::Connecting);
    assert_eq!(controller.snapshot().reconnect_attempt, 1);

    // Late traffic from the dead session changes nothing.
    mock.deliver(0, "weather", GLOOMY);
    settle().await;
    assert!(controller.snapshot().reading.is_none());

    mock.connect(1);
    settle().await;
    let snap = controller.snapshot();
    assert_eq!(snap.connection, ConnectionState::Connected);
    assert_eq!(snap.reconnect_attempt, 0);
    assert!(snap.notice.is_none());

    controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn broker_close_also_triggers_reconnect() {
    let (controller, mock) = connected().await;

    mock.emit(
        0,
        TransportEvent::Closed {
            reason: "close frame 1001: going away".into(),
        },
    );
    settle().await;
    assert_eq!(controller.connection_state(), ConnectionState::Failed);

    wait(1_000).await;
    assert_eq!(mock.opened(), 2);
    controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn never_policy_stays_failed() {
    let mock = MockConnector::default();
    let controller = Controller::new(
        ControllerConfig {
            reconnect: ReconnectConfig {
                backoff: Backoff::Never,
                ..ReconnectConfig::default()
            },
            ..config()
        },
        Arc::new(mock.clone()),
    )
    .unwrap();
    controller.start().await.unwrap();
    settle().await;

    mock.emit(
        0,
        TransportEvent::Failed(moodcast_api::Error::WebSocketConnect("refused".into())),
    );
    wait(60_000).await;

    assert_eq!(mock.opened(), 1);
    assert_eq!(controller.connection_state(), ConnectionState::Failed);
    assert_eq!(controller.open_handles(), 0);
    controller.stop().await;
}

// ── Location publishing ─────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn burst_within_debounce_publishes_last_value_once() {
    let (controller, mock) = connected().await;

    controller.set_location(city("Auckland")).await.unwrap();
    wait(100).await;
    controller.set_location(city("Tokyo")).await.unwrap();
    wait(100).await;
    controller.set_location(city("Paris")).await.unwrap();
    settle().await;
    assert_eq!(controller.snapshot().location, city("Paris"));
    assert!(mock.announced(0).is_empty());

    wait(600).await;
    assert_eq!(mock.announced(0), vec!["Paris"]);

    wait(5_000).await;
    assert!(mock.announced(0).is_empty());
    controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn same_location_twice_publishes_once() {
    let (controller, mock) = connected().await;

    controller.set_location(city("Tokyo")).await.unwrap();
    wait(600).await;
    controller.set_location(city("Tokyo")).await.unwrap();
    wait(600).await;

    assert_eq!(mock.announced(0), vec!["Tokyo"]);
    controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn announcement_held_while_disconnected_is_flushed_once_on_reconnect() {
    let (controller, mock) = connected().await;

    mock.emit(0, TransportEvent::Closed { reason: "stream ended".into() });
    settle().await;
    controller.set_location(city("Mumbai")).await.unwrap();
    wait(600).await;
    assert!(mock.announced(0).is_empty());

    wait(500).await;
    assert_eq!(mock.opened(), 2);
    assert!(mock.announced(1).is_empty());

    mock.connect(1);
    settle().await;
    assert_eq!(mock.announced(1), vec!["Mumbai"]);

    wait(2_000).await;
    assert!(mock.announced(1).is_empty());
    controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn location_set_while_stopped_is_announced_on_connect() {
    let (controller, mock) = controller();
    controller.set_location(city("Dubai")).await.unwrap();
    assert_eq!(controller.snapshot().location, city("Dubai"));
    assert_eq!(controller.open_handles(), 0);

    controller.start().await.unwrap();
    settle().await;
    mock.connect(0);
    settle().await;
    assert_eq!(mock.announced(0), vec!["Dubai"]);
    controller.stop().await;
}

struct DeniedGeocoder;

impl ReverseGeocoder for DeniedGeocoder {
    async fn reverse(&self, _lat: f64, _lon: f64) -> Result<Option<String>, moodcast_api::Error> {
        Err(moodcast_api::Error::Http {
            status: 403,
            message: "forbidden".into(),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn failed_resolution_falls_back_to_default_with_notice() {
    let (controller, mock) = connected().await;

    let location = controller
        .resolve_location(
            &DeniedGeocoder,
            Some(Coordinates {
                lat: 19.076,
                lon: 72.8777,
            }),
        )
        .await
        .unwrap();
    assert_eq!(location, Location::named("London"));
    settle().await;

    let snap = controller.snapshot();
    assert_eq!(snap.location, Location::named("London"));
    assert!(matches!(
        snap.notice,
        Some(Notice::LocationResolutionFailure { .. })
    ));

    wait(600).await;
    // Coordinates dropped, so the payload differs from the initial one.
    assert_eq!(mock.announced(0), vec!["London"]);
    controller.stop().await;
}

// ── Inbound messages ────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn readings_drive_mood_and_malformed_payloads_are_isolated() {
    let (controller, mock) = connected().await;

    mock.deliver(0, "weather", GLOOMY);
    settle().await;
    let gloomy = controller.snapshot();
    let gloomy_mood = gloomy.mood.clone().unwrap();
    assert_eq!(gloomy.reading.as_ref().unwrap().temperature, 9.5);

    mock.deliver(0, "weather", "{\"city\": \"London\", \"temperature\": ");
    settle().await;
    let after = controller.snapshot();
    assert_eq!(after.reading, gloomy.reading);
    assert_eq!(after.mood, gloomy.mood);
    assert!(matches!(after.notice, Some(Notice::ParseFailure { .. })));
    assert_eq!(controller.connection_state(), ConnectionState::Connected);

    mock.deliver(0, "weather", BRIGHT);
    settle().await;
    let bright = controller.snapshot();
    let bright_mood = bright.mood.clone().unwrap();
    assert!(gloomy_mood.score < bright_mood.score);
    assert_eq!(bright_mood.badge, "Energy Star");
    assert!(bright.notice.is_none());

    controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn parse_failure_cleared_only_by_its_own_channel() {
    let (controller, mock) = connected().await;

    mock.deliver(0, "forecast", "not json");
    mock.deliver(0, "weather", GLOOMY);
    mock.deliver(0, "alerts", r#"{"message":"gale","severity":"minor"}"#);
    settle().await;
    assert!(matches!(
        controller.snapshot().notice,
        Some(Notice::ParseFailure { channel: Channel::Forecast, .. })
    ));

    mock.deliver(
        0,
        "forecast",
        r#"[{"timestamp":1760900000,"temperature":12,"pressure":1008,"clouds":60,"icon":"03d"}]"#,
    );
    settle().await;
    assert!(controller.snapshot().notice.is_none());
    controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn forecast_and_alerts_update_snapshot() {
    let (controller, mock) = connected().await;

    mock.deliver(
        0,
        "forecast",
        r#"[{"timestamp":1760900000,"temperature":12,"pressure":1008,"clouds":60,"icon":"03d"},
            {"timestamp":1760910800,"temperature":10,"pressure":1006,"clouds":75,"icon":"04n"}]"#,
    );
    for i in 1..=4 {
        mock.deliver(0, "alerts", &format!(r#"{{"message":"a{i}","severity":"minor"}}"#));
    }
    mock.deliver(0, "sensors", r#"{"anything":true}"#);
    settle().await;

    let snap = controller.snapshot();
    assert_eq!(snap.forecast.len(), 2);
    let alerts: Vec<&str> = snap.alerts.iter().map(|a| a.message.as_str()).collect();
    assert_eq!(alerts, vec!["a2", "a3", "a4"]);
    assert!(snap.notice.is_none());
    controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn staleness_raised_once_and_cleared_by_next_reading() {
    let (controller, mock) = connected().await;

    wait(10_000).await;
    let snap = controller.snapshot();
    assert!(snap.stale);
    assert!(matches!(snap.notice, Some(Notice::StalenessFailure { .. })));

    // Replace the notice, then make sure the watchdog stays quiet.
    mock.deliver(0, "forecast", "not json");
    settle().await;
    wait(30_000).await;
    assert!(matches!(
        controller.snapshot().notice,
        Some(Notice::ParseFailure { .. })
    ));

    mock.deliver(0, "weather", BRIGHT);
    settle().await;
    assert!(!controller.snapshot().stale);

    wait(10_100).await;
    assert!(controller.snapshot().stale);
    controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn reading_clears_staleness_notice() {
    let (controller, mock) = connected().await;

    wait(10_000).await;
    assert!(controller.snapshot().stale);

    mock.deliver(0, "weather", GLOOMY);
    settle().await;
    let snap = controller.snapshot();
    assert!(!snap.stale);
    assert!(snap.notice.is_none());
    controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn staleness_survives_reconnect_until_a_reading_lands() {
    let (controller, mock) = connected().await;

    wait(10_000).await;
    assert!(controller.snapshot().stale);

    mock.emit(
        0,
        TransportEvent::Closed {
            reason: "close frame 1001: going away".into(),
        },
    );
    settle().await;
    assert!(matches!(
        controller.snapshot().notice,
        Some(Notice::ConnectionFailure { .. })
    ));

    wait(1_000).await;
    mock.connect(1);
    settle().await;
    let snap = controller.snapshot();
    assert_eq!(snap.connection, ConnectionState::Connected);
    assert!(snap.stale);
    assert!(matches!(
        snap.notice,
        Some(Notice::StalenessFailure { timeout }) if timeout == Duration::from_secs(10)
    ));

    mock.deliver(1, "weather", BRIGHT);
    settle().await;
    let snap = controller.snapshot();
    assert!(!snap.stale);
    assert!(snap.notice.is_none());
    controller.stop().await;
}

// ── Teardown ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn stop_twice_or_before_start_leaves_no_handles() {
    let (controller, mock) = controller();
    controller.stop().await;
    controller.stop().await;
    assert_eq!(controller.open_handles(), 0);

    // Stop before the session ever connects.
    controller.start().await.unwrap();
    controller.stop().await;
    controller.stop().await;
    assert_eq!(controller.open_handles(), 0);
    assert_eq!(controller.connection_state(), ConnectionState::Disconnected);

    // Stop with a pending debounce and an armed watchdog.
    controller.start().await.unwrap();
    settle().await;
    mock.connect(1);
    settle().await;
    controller.set_location(city("Sydney")).await.unwrap();
    settle().await;
    assert!(controller.open_handles() >= 3);

    controller.stop().await;
    assert_eq!(controller.open_handles(), 0);
    assert!(mock.is_closed(1));
    assert_eq!(controller.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn stop_discards_pending_reconnect() {
    let (controller, mock) = connected().await;

    mock.emit(
        0,
        TransportEvent::Failed(moodcast_api::Error::WebSocketConnect("reset".into())),
    );
    settle().await;
    assert_eq!(controller.open_handles(), 1);

    controller.stop().await;
    assert_eq!(controller.open_handles(), 0);

    wait(5_000).await;
    assert_eq!(mock.opened(), 1);
    assert_eq!(controller.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn dropping_every_handle_tears_down_session() {
    let (controller, mock) = connected().await;
    controller.set_location(city("Tokyo")).await.unwrap();

    let clone = controller.clone();
    drop(controller);
    settle().await;
    assert!(!mock.is_closed(0));

    drop(clone);
    settle().await;
    assert!(mock.is_closed(0));

    wait(5_000).await;
    assert_eq!(mock.opened(), 1);
    assert!(mock.announced(0).is_empty());
}

#[tokio::test(start_paused = true)]
async fn stream_follows_state_changes() {
    use futures_util::StreamExt;

    let (controller, mock) = controller();
    let mut stream = controller.stream().into_stream();
    let first = stream.next().await.unwrap();
    assert_eq!(first.connection, ConnectionState::Disconnected);

    controller.start().await.unwrap();
    settle().await;
    mock.connect(0);
    settle().await;

    let mut last = stream.next().await.unwrap();
    while last.connection != ConnectionState::Connected {
        last = stream.next().await.unwrap();
    }
    assert_eq!(last.location, city("London"));
    controller.stop().await;
}
