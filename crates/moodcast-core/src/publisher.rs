// ── Location publisher ──
//
// Debounces outbound location announcements and suppresses repeats.
//
// Invariants:
// - a burst of changes inside the quiet window yields one announcement
//   of the last value;
// - the same serialized payload is never sent twice in a row within a
//   session;
// - nothing goes out while disconnected. At most one payload is held and
//   it is flushed once on the next connect.

use std::time::Duration;

use serde::Serialize;

use crate::model::Location;
use crate::timer::{Scheduler, TimerId, TimerKind, TimerSlot};

/// Payload published on the `city` channel.
#[derive(Debug, Serialize)]
pub struct Announcement<'a> {
    pub city: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

impl<'a> From<&'a Location> for Announcement<'a> {
    fn from(location: &'a Location) -> Self {
        Self {
            city: location.name(),
            lat: location.lat(),
            lon: location.lon(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct LocationPublisher {
    slot: TimerSlot,
    debounce: Duration,
    current: Location,
    held: Option<String>,
    last_sent: Option<String>,
}

impl LocationPublisher {
    pub(crate) fn new(debounce: Duration, initial: Location) -> Self {
        Self {
            slot: TimerSlot::new(TimerKind::Debounce),
            debounce,
            current: initial,
            held: None,
            last_sent: None,
        }
    }

    pub(crate) fn current(&self) -> &Location {
        &self.current
    }

    /// Record a change and (re)start the quiet window.
    pub(crate) fn on_location_changed(&mut self, location: Location, scheduler: &mut Scheduler) {
        self.current = location;
        // Whatever was held is superseded by the value the window will settle on.
        self.held = None;
        self.slot.arm(scheduler, self.debounce);
    }

    /// Record a change without scheduling; announced on the next connect.
    pub(crate) fn adopt(&mut self, location: Location) {
        self.current = location;
        self.held = None;
        self.slot.cancel();
    }

    /// Quiet window elapsed. Returns the payload to publish now, if any.
    pub(crate) fn on_timer(&mut self, id: TimerId, connected: bool) -> Option<String> {
        if !self.slot.take_fired(id) {
            return None;
        }
        let payload = self.serialize_current()?;
        if connected {
            self.dedupe(payload)
        } else {
            tracing::debug!("not connected; holding location announcement");
            self.held = Some(payload);
            None
        }
    }

    /// A session was established. Returns the (re-)announcement, unless a
    /// pending quiet window will produce one shortly.
    pub(crate) fn on_connected(&mut self) -> Option<String> {
        self.last_sent = None;
        if self.slot.is_armed() {
            self.held = None;
            return None;
        }
        let payload = match self.held.take() {
            Some(held) => held,
            None => self.serialize_current()?,
        };
        self.dedupe(payload)
    }

    /// The transport rejected `payload`; keep it for the next connect.
    pub(crate) fn requeue(&mut self, payload: String) {
        self.last_sent = None;
        self.held = Some(payload);
    }

    /// Drop all pending work (controller stopped).
    pub(crate) fn cancel(&mut self) {
        self.slot.cancel();
        self.held = None;
        self.last_sent = None;
    }

    fn serialize_current(&self) -> Option<String> {
        match serde_json::to_string(&Announcement::from(&self.current)) {
            Ok(payload) => Some(payload),
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize location announcement");
                None
            }
        }
    }

    fn dedupe(&mut self, payload: String) -> Option<String> {
        if self.last_sent.as_deref() == Some(payload.as_str()) {
            tracing::debug!(%payload, "suppressing duplicate announcement");
            return None;
        }
        self.last_sent = Some(payload.clone());
        Some(payload)
    }
}
