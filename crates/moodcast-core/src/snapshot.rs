// ── Read-only state view ──
//
// The controller publishes a fresh `Arc<Snapshot>` on a watch channel after
// every handled event that changes something. Consumers either poll the
// latest value or follow changes as a `Stream`.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use serde::Serialize;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::error::Notice;
use crate::model::{AlertMessage, ForecastPoint, Location, WeatherReading};
use crate::mood::MoodResult;
use crate::state::ConnectionState;

/// Everything the presentation layer may render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub connection: ConnectionState,
    /// Reconnect attempts since the last successful connect.
    pub reconnect_attempt: u32,
    pub location: Location,
    pub reading: Option<WeatherReading>,
    pub mood: Option<MoodResult>,
    pub forecast: Vec<ForecastPoint>,
    /// Oldest first.
    pub alerts: Vec<AlertMessage>,
    #[serde(serialize_with = "notice_text")]
    pub notice: Option<Notice>,
    pub stale: bool,
}

impl Snapshot {
    pub(crate) fn initial(location: Location) -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            reconnect_attempt: 0,
            location,
            reading: None,
            mood: None,
            forecast: Vec::new(),
            alerts: Vec::new(),
            notice: None,
            stale: false,
        }
    }
}

#[allow(clippy::ref_option)]
fn notice_text<S: serde::Serializer>(notice: &Option<Notice>, s: S) -> Result<S::Ok, S::Error> {
    match notice {
        Some(n) => s.serialize_some(&n.to_string()),
        None => s.serialize_none(),
    }
}

/// A subscription to controller state.
///
/// Gives point-in-time access plus change notification, either through
/// [`changed()`](Self::changed) or by converting into a `Stream`.
pub struct SnapshotStream {
    current: Arc<Snapshot>,
    receiver: watch::Receiver<Arc<Snapshot>>,
}

impl SnapshotStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<Snapshot>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Snapshot captured at creation (or at the last `changed()`).
    pub fn current(&self) -> &Arc<Snapshot> {
        &self.current
    }

    /// Wait for the next change. `None` once the controller is gone.
    pub async fn changed(&mut self) -> Option<Arc<Snapshot>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    pub fn into_stream(self) -> SnapshotWatchStream {
        SnapshotWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` of snapshots backed by a `watch::Receiver`.
///
/// Yields the current value first, then one item per change. Intermediate
/// values may be skipped if the consumer falls behind.
pub struct SnapshotWatchStream {
    inner: WatchStream<Arc<Snapshot>>,
}

impl Stream for SnapshotWatchStream {
    type Item = Arc<Snapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
