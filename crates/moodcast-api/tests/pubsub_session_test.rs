// Loopback tests for `WebSocketConnector` against an in-process broker.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use moodcast_api::{
    ClientFrame, Connector, SessionEvent, SessionId, TransportEvent, WebSocketConnector,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn next_event(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for session event")
        .expect("event channel closed")
}

/// Accept one client, wait for its subscribe frame, push one message on
/// that topic, then read one more frame and close.
async fn spawn_broker() -> (String, tokio::task::JoinHandle<Vec<ClientFrame>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let mut received = Vec::new();

        while received.len() < 2 {
            let Some(Ok(msg)) = ws.next().await else { break };
            if let Message::Text(text) = msg {
                let frame: ClientFrame = serde_json::from_str(&text).unwrap();
                if let ClientFrame::Subscribe { topic } = &frame {
                    let push = serde_json::json!({
                        "topic": topic,
                        "payload": { "city": "Tokyo", "temperature": 21.0 }
                    });
                    ws.send(Message::text(push.to_string())).await.unwrap();
                }
                received.push(frame);
            }
        }

        let _ = ws.close(None).await;
        received
    });

    (format!("ws://{addr}/mqtt"), handle)
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_session_lifecycle() {
    let (url, broker) = spawn_broker().await;
    let connector = WebSocketConnector::new(url.parse().unwrap());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let link = connector.open(SessionId(7), tx);
    link.subscribe("moodcast/weather").unwrap();

    let evt = next_event(&mut rx).await;
    assert_eq!(evt.session, SessionId(7));
    assert!(matches!(evt.event, TransportEvent::Connected));

    match next_event(&mut rx).await.event {
        TransportEvent::Message { topic, payload } => {
            assert_eq!(topic, "moodcast/weather");
            let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
            assert_eq!(value["city"], "Tokyo");
        }
        other => panic!("expected Message, got {other:?}"),
    }

    link.publish("moodcast/city", r#"{"city":"Tokyo"}"#.into()).unwrap();

    match next_event(&mut rx).await.event {
        TransportEvent::Closed { .. } => {}
        other => panic!("expected Closed, got {other:?}"),
    }

    let frames = broker.await.unwrap();
    assert_eq!(
        frames,
        vec![
            ClientFrame::Subscribe {
                topic: "moodcast/weather".into()
            },
            ClientFrame::Publish {
                topic: "moodcast/city".into(),
                payload: r#"{"city":"Tokyo"}"#.into()
            },
        ]
    );
}

#[tokio::test]
async fn test_connect_refused_reports_failure() {
    // Bind then drop to get a port nobody is listening on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let connector = WebSocketConnector::new(format!("ws://{addr}/mqtt").parse().unwrap());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _link = connector.open(SessionId(1), tx);

    match next_event(&mut rx).await.event {
        TransportEvent::Failed(err) => assert!(err.is_transient()),
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_local_close_is_silent() {
    let (url, _broker) = spawn_broker().await;
    let connector = WebSocketConnector::new(url.parse().unwrap());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let link = connector.open(SessionId(3), tx);
    assert!(matches!(next_event(&mut rx).await.event, TransportEvent::Connected));

    link.close();

    // The session ends without reporting Closed/Failed for a local close.
    let after = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
    assert!(matches!(after, Ok(None) | Err(_)));
}
