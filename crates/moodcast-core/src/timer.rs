// ── Cancelable timers ──
//
// A timer is a spawned sleep that posts `ControlEvent::TimerFired` back to
// the run loop. Each one carries a `TimerId`; a slot remembers only the id
// it armed last, so a fire from a replaced or cancelled timer is recognised
// and dropped even if it was already queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use strum::Display;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::event::ControlEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum TimerKind {
    Debounce,
    Watchdog,
    Reconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

// ── Handle accounting ────────────────────────────────────────────────

/// Counts live resources (armed timers, open transport links).
#[derive(Debug, Clone, Default)]
pub(crate) struct HandleGauge(Arc<AtomicUsize>);

impl HandleGauge {
    pub(crate) fn guard(&self) -> HandleGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        HandleGuard(Arc::clone(&self.0))
    }

    pub(crate) fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Keeps one unit of a [`HandleGauge`] alive until dropped.
#[derive(Debug)]
pub(crate) struct HandleGuard(Arc<AtomicUsize>);

impl Drop for HandleGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// ── Scheduler ────────────────────────────────────────────────────────

/// Spawns timer tasks that report back on the control channel.
#[derive(Debug)]
pub(crate) struct Scheduler {
    tx: mpsc::UnboundedSender<ControlEvent>,
    gauge: HandleGauge,
    next_id: u64,
}

impl Scheduler {
    pub(crate) fn new(tx: mpsc::UnboundedSender<ControlEvent>, gauge: HandleGauge) -> Self {
        Self {
            tx,
            gauge,
            next_id: 0,
        }
    }

    pub(crate) fn gauge(&self) -> &HandleGauge {
        &self.gauge
    }

    fn schedule(&mut self, kind: TimerKind, delay: Duration) -> Armed {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let tx = self.tx.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The run loop may already be gone.
            let _ = tx.send(ControlEvent::TimerFired { kind, id });
        });

        Armed {
            id,
            handle,
            _guard: self.gauge.guard(),
        }
    }
}

/// A scheduled timer. Dropping it aborts the sleep.
#[derive(Debug)]
struct Armed {
    id: TimerId,
    handle: JoinHandle<()>,
    _guard: HandleGuard,
}

impl Drop for Armed {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ── TimerSlot ────────────────────────────────────────────────────────

/// Holds at most one pending timer of a given kind.
#[derive(Debug)]
pub(crate) struct TimerSlot {
    kind: TimerKind,
    armed: Option<Armed>,
}

impl TimerSlot {
    pub(crate) fn new(kind: TimerKind) -> Self {
        Self { kind, armed: None }
    }

    /// Arm for `delay`, replacing (and aborting) any pending timer.
    pub(crate) fn arm(&mut self, scheduler: &mut Scheduler, delay: Duration) -> TimerId {
        let armed = scheduler.schedule(self.kind, delay);
        let id = armed.id;
        self.armed = Some(armed);
        tracing::trace!(kind = %self.kind, id = id.0, ?delay, "timer armed");
        id
    }

    /// Consume a fire event. Returns `false` for a stale id.
    pub(crate) fn take_fired(&mut self, id: TimerId) -> bool {
        match &self.armed {
            Some(armed) if armed.id == id => {
                self.armed = None;
                true
            }
            _ => {
                tracing::trace!(kind = %self.kind, id = id.0, "discarding stale timer");
                false
            }
        }
    }

    pub(crate) fn cancel(&mut self) {
        self.armed = None;
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.armed.is_some()
    }
}
