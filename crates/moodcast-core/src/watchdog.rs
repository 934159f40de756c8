// ── Staleness watchdog ──
//
// One-shot timer armed on connect and re-armed by every accepted reading.
// When it elapses the feed is flagged stale exactly once; the flag (and the
// right to raise it again) is only reset by the next reading.

use std::time::Duration;

use crate::error::Notice;
use crate::timer::{Scheduler, TimerId, TimerKind, TimerSlot};

#[derive(Debug)]
pub(crate) struct StalenessWatchdog {
    slot: TimerSlot,
    timeout: Duration,
    stale: bool,
}

impl StalenessWatchdog {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            slot: TimerSlot::new(TimerKind::Watchdog),
            timeout,
            stale: false,
        }
    }

    /// Start (or restart) the countdown. Does not clear an already raised
    /// staleness condition.
    pub(crate) fn arm(&mut self, scheduler: &mut Scheduler) {
        self.slot.arm(scheduler, self.timeout);
    }

    /// A reading arrived. Returns `true` if this cleared a stale condition.
    pub(crate) fn reset(&mut self, scheduler: &mut Scheduler) -> bool {
        let was_stale = std::mem::take(&mut self.stale);
        self.arm(scheduler);
        was_stale
    }

    pub(crate) fn disarm(&mut self) {
        self.slot.cancel();
    }

    /// Handle a watchdog fire. Yields a notice only on the first elapse
    /// since the last reading.
    pub(crate) fn on_timer(&mut self, id: TimerId) -> Option<Notice> {
        if !self.slot.take_fired(id) || self.stale {
            return None;
        }
        self.stale = true;
        self.notice()
    }

    /// The staleness notice, while the feed is stale.
    pub(crate) fn notice(&self) -> Option<Notice> {
        self.stale.then_some(Notice::StalenessFailure {
            timeout: self.timeout,
        })
    }

    pub(crate) fn is_stale(&self) -> bool {
        self.stale
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::event::ControlEvent;
    use crate::timer::HandleGauge;
    use tokio::sync::mpsc;

    async fn fired(rx: &mut mpsc::UnboundedReceiver<ControlEvent>) -> TimerId {
        match rx.recv().await {
            Some(ControlEvent::TimerFired { id, .. }) => id,
            other => panic!("expected watchdog fire, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn raises_once_until_reset() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sched = Scheduler::new(tx, HandleGauge::default());
        let mut dog = StalenessWatchdog::new(Duration::from_secs(10));

        dog.arm(&mut sched);
        let id = fired(&mut rx).await;
        assert!(matches!(
            dog.on_timer(id),
            Some(Notice::StalenessFailure { .. })
        ));
        assert!(dog.is_stale());

        // Re-arming (e.g. after a reconnect) does not raise a second time.
        dog.arm(&mut sched);
        let id = fired(&mut rx).await;
        assert!(dog.on_timer(id).is_none());
        assert!(matches!(
            dog.notice(),
            Some(Notice::StalenessFailure { timeout }) if timeout == Duration::from_secs(10)
        ));

        assert!(dog.reset(&mut sched));
        assert!(!dog.is_stale());
        assert!(dog.notice().is_none());
        let id = fired(&mut rx).await;
        assert!(dog.on_timer(id).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_before_elapse_keeps_feed_fresh() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sched = Scheduler::new(tx, HandleGauge::default());
        let mut dog = StalenessWatchdog::new(Duration::from_secs(10));

        dog.arm(&mut sched);
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(!dog.reset(&mut sched));
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(rx.try_recv().is_err());

        dog.disarm();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(rx.try_recv().is_err());
    }
}
