// ── Controller abstraction ──
//
// Lifecycle management for one broker connection. A single run task owns
// the `ConnectionManager` and handles one event at a time: transport
// events, timer expiries and caller requests. Nothing else touches its
// state, so no locks guard it. Consumers read a watch-published snapshot.

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::Utc;
use moodcast_api::{Connector, Link, ReconnectConfig, SessionEvent, SessionId, TransportEvent};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::channels::{Channel, Topics};
use crate::config::ControllerConfig;
use crate::error::{CoreError, Notice, NoticeKind};
use crate::event::ControlEvent;
use crate::locate::{ReverseGeocoder, resolve};
use crate::model::{Coordinates, Location};
use crate::mood::MoodScorer;
use crate::publisher::LocationPublisher;
use crate::router::{MessageRouter, Routed};
use crate::snapshot::{Snapshot, SnapshotStream};
use crate::state::{ConnEvent, ConnectionState};
use crate::timer::{HandleGauge, HandleGuard, Scheduler, TimerKind, TimerSlot};
use crate::watchdog::StalenessWatchdog;

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. `start()` spawns the run
/// task, `stop()` tears it down; both are idempotent.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    connector: Arc<dyn Connector>,
    snapshot_tx: Arc<watch::Sender<Arc<Snapshot>>>,
    /// Replaced only when a crashed run task has to be rebuilt.
    control_tx: ArcSwap<mpsc::UnboundedSender<ControlEvent>>,
    gauge: HandleGauge,
    lifecycle: Mutex<Lifecycle>,
}

enum Lifecycle {
    Idle(Parked),
    Running {
        cancel: CancellationToken,
        task: JoinHandle<Parked>,
    },
    /// Transient while switching states, or after a crash until rebuilt.
    Vacant,
}

/// Run-loop state while no task is running.
struct Parked {
    manager: ConnectionManager,
    control_rx: mpsc::UnboundedReceiver<ControlEvent>,
    session_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Controller {
    /// Create a controller. Does NOT connect -- call [`start()`](Self::start).
    pub fn new(config: ControllerConfig, connector: Arc<dyn Connector>) -> Result<Self, CoreError> {
        config.validate()?;

        let (snapshot_tx, _) = watch::channel(Arc::new(Snapshot::initial(
            config.default_location.clone(),
        )));
        let snapshot_tx = Arc::new(snapshot_tx);
        let gauge = HandleGauge::default();
        let (control_tx, parked) = Parked::build(&config, &connector, &snapshot_tx, &gauge);

        Ok(Self {
            inner: Arc::new(ControllerInner {
                config,
                connector,
                snapshot_tx,
                control_tx: ArcSwap::from_pointee(control_tx),
                gauge,
                lifecycle: Mutex::new(Lifecycle::Idle(parked)),
            }),
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Open the broker session and start processing events.
    ///
    /// A no-op while already running.
    pub async fn start(&self) -> Result<(), CoreError> {
        let mut lifecycle = self.inner.lifecycle.lock().await;

        if let Lifecycle::Running { task, .. } = &*lifecycle {
            if !task.is_finished() {
                debug!("controller already running");
                return Ok(());
            }
        }

        let parked = self.inner.park(&mut lifecycle).await;
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(parked, cancel.clone()));
        *lifecycle = Lifecycle::Running { cancel, task };
        info!("controller started");
        Ok(())
    }

    /// Tear everything down: transport link, timers, watchdog.
    ///
    /// Safe to call repeatedly and before `start()`.
    pub async fn stop(&self) {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        let was_running = matches!(*lifecycle, Lifecycle::Running { .. });
        let parked = self.inner.park(&mut lifecycle).await;
        *lifecycle = Lifecycle::Idle(parked);
        if was_running {
            info!("controller stopped");
        }
    }

    // ── Location ─────────────────────────────────────────────────

    /// Select a new location. Announced after the debounce window once
    /// connected; while stopped it is simply remembered.
    pub async fn set_location(&self, location: Location) -> Result<(), CoreError> {
        self.deliver_location(location, None).await
    }

    /// Resolve device coordinates (falling back to the default location)
    /// and select the result.
    pub async fn resolve_location<G: ReverseGeocoder>(
        &self,
        geocoder: &G,
        coords: Option<Coordinates>,
    ) -> Result<Location, CoreError> {
        let resolution = resolve(geocoder, coords, &self.inner.config.default_location).await;
        self.deliver_location(resolution.location.clone(), resolution.notice)
            .await?;
        Ok(resolution.location)
    }

    async fn deliver_location(
        &self,
        location: Location,
        notice: Option<Notice>,
    ) -> Result<(), CoreError> {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if let Lifecycle::Idle(parked) = &mut *lifecycle {
            parked.manager.adopt_location(location, notice);
            return Ok(());
        }

        let event = match notice {
            None => ControlEvent::LocationChanged(location),
            Some(notice) => ControlEvent::LocationResolved {
                location,
                notice: Some(notice),
            },
        };
        self.inner
            .control_tx
            .load()
            .send(event)
            .map_err(|_| CoreError::ControllerStopped)
    }

    // ── State observation ────────────────────────────────────────

    /// Latest published state.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.snapshot_tx.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.inner.snapshot_tx.subscribe()
    }

    pub fn stream(&self) -> SnapshotStream {
        SnapshotStream::new(self.subscribe())
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.snapshot_tx.borrow().connection
    }

    /// Live timers plus open transport links. Zero once stopped.
    pub fn open_handles(&self) -> usize {
        self.inner.gauge.count()
    }
}

impl ControllerInner {
    /// Bring the lifecycle back to a parked run state, stopping the run
    /// task if there is one. A crashed task is replaced by fresh state.
    async fn park(&self, lifecycle: &mut Lifecycle) -> Parked {
        match std::mem::replace(lifecycle, Lifecycle::Vacant) {
            Lifecycle::Idle(parked) => parked,
            Lifecycle::Running { cancel, task } => {
                cancel.cancel();
                match task.await {
                    Ok(parked) => parked,
                    Err(e) => {
                        error!(error = %e, "controller task ended abnormally; rebuilding");
                        self.rebuild()
                    }
                }
            }
            Lifecycle::Vacant => self.rebuild(),
        }
    }

    fn rebuild(&self) -> Parked {
        let (control_tx, parked) =
            Parked::build(&self.config, &self.connector, &self.snapshot_tx, &self.gauge);
        self.control_tx.store(Arc::new(control_tx));
        parked
    }
}

impl Drop for ControllerInner {
    fn drop(&mut self) {
        if let Lifecycle::Running { cancel, .. } = self.lifecycle.get_mut() {
            cancel.cancel();
        }
    }
}

impl Parked {
    fn build(
        config: &ControllerConfig,
        connector: &Arc<dyn Connector>,
        snapshot_tx: &Arc<watch::Sender<Arc<Snapshot>>>,
        gauge: &HandleGauge,
    ) -> (mpsc::UnboundedSender<ControlEvent>, Self) {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (session_tx, session_rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(control_tx.clone(), gauge.clone());
        let manager = ConnectionManager::new(
            config,
            Arc::clone(connector),
            scheduler,
            session_tx,
            Arc::clone(snapshot_tx),
        );
        (
            control_tx,
            Self {
                manager,
                control_rx,
                session_rx,
            },
        )
    }
}

// ── Run loop ─────────────────────────────────────────────────────

async fn run(parked: Parked, cancel: CancellationToken) -> Parked {
    let Parked {
        mut manager,
        mut control_rx,
        mut session_rx,
    } = parked;

    manager.begin();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            Some(event) = control_rx.recv() => manager.on_control(event),
            Some(event) = session_rx.recv() => manager.on_session(event),
        }
    }

    manager.teardown();

    // Keep location requests that raced with the stop; drop everything else.
    while let Ok(event) = control_rx.try_recv() {
        match event {
            ControlEvent::LocationChanged(location) => manager.adopt_location(location, None),
            ControlEvent::LocationResolved { location, notice } => {
                manager.adopt_location(location, notice);
            }
            ControlEvent::TimerFired { .. } => {}
        }
    }
    while session_rx.try_recv().is_ok() {}

    Parked {
        manager,
        control_rx,
        session_rx,
    }
}

// ── ConnectionManager ────────────────────────────────────────────

/// The open transport session.
struct ActiveSession {
    id: SessionId,
    link: Link,
    _guard: HandleGuard,
}

/// Owns the connection state machine and composes the publisher, router
/// and watchdog. Only ever touched from the run task (or while parked).
struct ConnectionManager {
    connector: Arc<dyn Connector>,
    topics: Topics,
    reconnect: ReconnectConfig,
    scheduler: Scheduler,
    session_tx: mpsc::UnboundedSender<SessionEvent>,
    session: Option<ActiveSession>,
    next_session: u64,
    state: ConnectionState,
    active: bool,
    attempt: u32,
    reconnect_timer: TimerSlot,
    publisher: LocationPublisher,
    router: MessageRouter,
    watchdog: StalenessWatchdog,
    notice: Option<Notice>,
    snapshot_tx: Arc<watch::Sender<Arc<Snapshot>>>,
}

impl ConnectionManager {
    fn new(
        config: &ControllerConfig,
        connector: Arc<dyn Connector>,
        scheduler: Scheduler,
        session_tx: mpsc::UnboundedSender<SessionEvent>,
        snapshot_tx: Arc<watch::Sender<Arc<Snapshot>>>,
    ) -> Self {
        let topics = Topics::new(config.topic_prefix.clone());
        // Carry the last known location over a rebuild.
        let location = snapshot_tx.borrow().location.clone();

        Self {
            connector,
            router: MessageRouter::new(
                topics.clone(),
                MoodScorer::new(config.mood.clone()),
                config.alert_capacity,
            ),
            topics,
            reconnect: config.reconnect.clone(),
            scheduler,
            session_tx,
            session: None,
            next_session: 0,
            state: ConnectionState::Disconnected,
            active: false,
            attempt: 0,
            reconnect_timer: TimerSlot::new(TimerKind::Reconnect),
            publisher: LocationPublisher::new(config.debounce, location),
            watchdog: StalenessWatchdog::new(config.staleness_timeout),
            notice: None,
            snapshot_tx,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────

    fn begin(&mut self) {
        if self.active {
            return;
        }
        self.active = true;
        self.attempt = 0;
        self.transition(ConnEvent::Start);
        self.open_session();
        self.publish_snapshot();
    }

    fn teardown(&mut self) {
        let was_active = std::mem::replace(&mut self.active, false);
        self.session = None;
        self.reconnect_timer.cancel();
        self.watchdog.disarm();
        self.publisher.cancel();
        self.attempt = 0;
        self.transition(ConnEvent::Stop);
        self.publish_snapshot();
        if was_active {
            debug!("connection manager torn down");
        }
    }

    fn open_session(&mut self) {
        self.next_session += 1;
        let id = SessionId(self.next_session);
        let link = self.connector.open(id, self.session_tx.clone());
        debug!(session = id.0, attempt = self.attempt, "opening broker session");
        self.session = Some(ActiveSession {
            id,
            link,
            _guard: self.scheduler.gauge().guard(),
        });
    }

    fn transition(&mut self, event: ConnEvent) {
        let next = self.state.on(event);
        if next != self.state {
            debug!(from = %self.state, to = %next, ?event, "connection state change");
            self.state = next;
        }
    }

    // ── Transport events ─────────────────────────────────────────

    fn on_session(&mut self, event: SessionEvent) {
        let current = self.session.as_ref().map(|s| s.id);
        if !self.active || current != Some(event.session) {
            debug!(session = event.session.0, "ignoring event from superseded session");
            return;
        }

        match event.event {
            TransportEvent::Connected => self.on_connected(),
            TransportEvent::Message { topic, payload } => self.on_message(&topic, &payload),
            TransportEvent::Closed { reason } => {
                self.on_failure(ConnEvent::TransportClosed, reason);
            }
            TransportEvent::Failed(e) => self.on_failure(ConnEvent::TransportError, e.to_string()),
        }
    }

    fn on_connected(&mut self) {
        self.transition(ConnEvent::ConnectAck);
        self.attempt = 0;
        if self.notice_is(NoticeKind::Connection) {
            // A feed that went stale before the drop stays stale until a reading lands.
            self.notice = self.watchdog.notice();
        }

        let Some(session) = &self.session else {
            return;
        };
        let subscribed = Channel::INBOUND
            .iter()
            .try_for_each(|channel| session.link.subscribe(&self.topics.topic(*channel)));
        if let Err(e) = subscribed {
            self.on_failure(ConnEvent::TransportError, e.to_string());
            return;
        }
        info!(channels = Channel::INBOUND.len(), "subscribed to broker feed");

        self.watchdog.arm(&mut self.scheduler);
        if let Some(payload) = self.publisher.on_connected() {
            self.send_announcement(payload);
        }
        self.publish_snapshot();
    }

    fn on_message(&mut self, topic: &str, payload: &str) {
        match self.router.on_message(topic, payload, Utc::now()) {
            Routed::Ignored => return,
            Routed::Reading => {
                self.watchdog.reset(&mut self.scheduler);
                if self.notice_is(NoticeKind::Staleness) {
                    self.notice = None;
                }
                self.clear_parse_notice(Channel::Weather);
            }
            Routed::Forecast => self.clear_parse_notice(Channel::Forecast),
            Routed::Alert => self.clear_parse_notice(Channel::Alerts),
            Routed::Rejected(notice) => self.notice = Some(notice),
        }
        self.publish_snapshot();
    }

    fn on_failure(&mut self, event: ConnEvent, reason: String) {
        warn!(%reason, attempt = self.attempt, "broker session lost");
        self.session = None;
        self.watchdog.disarm();
        self.transition(event);
        self.notice = Some(Notice::ConnectionFailure { reason });

        match self.reconnect.delay_for(self.attempt) {
            Some(delay) => {
                info!(?delay, attempt = self.attempt + 1, "scheduling reconnect");
                self.reconnect_timer.arm(&mut self.scheduler, delay);
            }
            None => warn!(attempts = self.attempt, "giving up on broker reconnection"),
        }
        self.publish_snapshot();
    }

    // ── Control events ───────────────────────────────────────────

    fn on_control(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::LocationChanged(location) => self.change_location(location),
            ControlEvent::LocationResolved { location, notice } => {
                if notice.is_some() {
                    self.notice = notice;
                }
                self.change_location(location);
            }
            ControlEvent::TimerFired { kind, id } => match kind {
                TimerKind::Debounce => {
                    let connected = self.state == ConnectionState::Connected;
                    if let Some(payload) = self.publisher.on_timer(id, connected) {
                        self.send_announcement(payload);
                    }
                }
                TimerKind::Watchdog => {
                    if let Some(notice) = self.watchdog.on_timer(id) {
                        warn!(%notice, "weather feed is stale");
                        self.notice = Some(notice);
                        self.publish_snapshot();
                    }
                }
                TimerKind::Reconnect => {
                    if !self.reconnect_timer.take_fired(id) || !self.active {
                        return;
                    }
                    self.attempt += 1;
                    self.transition(ConnEvent::RetryDue);
                    self.open_session();
                    self.publish_snapshot();
                }
            },
        }
    }

    fn change_location(&mut self, location: Location) {
        debug!(%location, "location changed");
        self.publisher
            .on_location_changed(location, &mut self.scheduler);
        self.publish_snapshot();
    }

    /// Record a location while no run task is active.
    fn adopt_location(&mut self, location: Location, notice: Option<Notice>) {
        if notice.is_some() {
            self.notice = notice;
        }
        self.publisher.adopt(location);
        self.publish_snapshot();
    }

    fn send_announcement(&mut self, payload: String) {
        let topic = self.topics.topic(Channel::City);
        let Some(session) = &self.session else {
            self.publisher.requeue(payload);
            return;
        };
        match session.link.publish(&topic, payload.clone()) {
            Ok(()) => debug!(%topic, %payload, "location announced"),
            Err(e) => {
                warn!(error = %e, "announcement not sent; holding for reconnect");
                self.publisher.requeue(payload);
            }
        }
    }

    // ── Snapshot ─────────────────────────────────────────────────

    /// A valid message on `channel` supersedes that channel's parse failure.
    fn clear_parse_notice(&mut self, channel: Channel) {
        if matches!(&self.notice, Some(Notice::ParseFailure { channel: c, .. }) if *c == channel) {
            self.notice = None;
        }
    }

    fn notice_is(&self, kind: NoticeKind) -> bool {
        self.notice.as_ref().is_some_and(|n| n.kind() == kind)
    }

    fn publish_snapshot(&self) {
        let snapshot = Snapshot {
            connection: self.state,
            reconnect_attempt: self.attempt,
            location: self.publisher.current().clone(),
            reading: self.router.reading().cloned(),
            mood: self.router.mood().cloned(),
            forecast: self.router.forecast().to_vec(),
            alerts: self.router.alerts().snapshot(),
            notice: self.notice.clone(),
            stale: self.watchdog.is_stale(),
        };
        self.snapshot_tx.send_if_modified(|current| {
            if **current == snapshot {
                return false;
            }
            *current = Arc::new(snapshot);
            true
        });
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if self.active {
            self.teardown();
        }
    }
}
