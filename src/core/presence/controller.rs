//! The presence controller actor.
//!
//! Single owner of the presence state and the device registry. Every
//! mutation (user commands, sightings, connect results, link events,
//! reconnect ticks) is serialized through one mailbox; the spawned scan
//! sessions, connect attempts and link watches report back into it and
//! are fenced by monotonically increasing ids so that superseded or
//! cancelled work can never touch current state.

use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::alert::AlertSink;
use crate::config::AppConfig;
use crate::core::bluetooth::{LinkEvent, Radio, Sighting};
use crate::core::presence::alert_loop::AlertLoop;
use crate::core::presence::machine::{Effect, Event, Note, PresenceState};
use crate::core::presence::reconnect_loop::ReconnectLoop;
use crate::core::presence::registry::{DeviceRegistry, DiscoveredDevice};
use crate::error::RadioError;
use crate::events::{StatusReport, UiEvent};
use crate::permissions::{PermissionGate, REQUIRED_CAPABILITIES};
use crate::storage::BondStore;

const MAILBOX_CAPACITY: usize = 64;
const EVENT_CAPACITY: usize = 64;

/// Messages accepted by the controller's mailbox
enum Msg {
    // User-facing requests
    Scan,
    Connect {
        device_id: String,
    },
    Disconnect,
    Forget,
    Resume,
    Devices {
        reply: oneshot::Sender<Vec<DiscoveredDevice>>,
    },
    Status {
        reply: oneshot::Sender<StatusReport>,
    },
    Shutdown,
    // Reports from spawned tasks
    Sighting {
        session: u64,
        sighting: Sighting,
    },
    ScanEnded {
        session: u64,
    },
    ConnectResolved {
        attempt: u64,
        device_id: String,
        result: Result<(), String>,
    },
    LinkDown {
        device_id: String,
    },
}

/// Cloneable call surface over the controller's mailbox
#[derive(Clone)]
pub struct PresenceHandle {
    tx: mpsc::Sender<Msg>,
}

impl PresenceHandle {
    pub async fn scan(&self) {
        let _ = self.tx.send(Msg::Scan).await;
    }

    pub async fn connect(&self, device_id: impl Into<String>) {
        let _ = self
            .tx
            .send(Msg::Connect {
                device_id: device_id.into(),
            })
            .await;
    }

    pub async fn disconnect(&self) {
        let _ = self.tx.send(Msg::Disconnect).await;
    }

    pub async fn forget(&self) {
        let _ = self.tx.send(Msg::Forget).await;
    }

    /// Re-runs the bonded-reconnect attempt, e.g. when the app regains focus.
    pub async fn resume(&self) {
        let _ = self.tx.send(Msg::Resume).await;
    }

    pub async fn devices(&self) -> Vec<DiscoveredDevice> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Msg::Devices { reply }).await.is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    pub async fn status(&self) -> Option<StatusReport> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Msg::Status { reply }).await.is_err() {
            return None;
        }
        rx.await.ok()
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(Msg::Shutdown).await;
    }
}

/// A scan session currently owned by the controller
struct ScanSession {
    id: u64,
    target: Option<String>,
    silent: bool,
    token: CancellationToken,
}

pub struct PresenceController {
    config: AppConfig,
    radio: Arc<dyn Radio>,
    bonds: Arc<dyn BondStore>,
    gate: Arc<dyn PermissionGate>,
    events: broadcast::Sender<UiEvent>,

    state: PresenceState,
    registry: DeviceRegistry,

    rx: mpsc::Receiver<Msg>,
    tx: mpsc::Sender<Msg>,
    tick_rx: mpsc::Receiver<()>,

    alert_loop: AlertLoop,
    reconnect_loop: ReconnectLoop<()>,

    scan: Option<ScanSession>,
    session_seq: u64,
    attempt_seq: u64,
    /// The one connect attempt allowed to be outstanding
    current_attempt: Option<u64>,
    /// A user disconnect arrived while Connecting; unwind when it resolves
    abort_after_attempt: bool,
    link_watch: Option<(CancellationToken, JoinHandle<()>)>,
    permissions_ok: bool,
}

impl PresenceController {
    pub fn new(
        config: AppConfig,
        radio: Arc<dyn Radio>,
        bonds: Arc<dyn BondStore>,
        alerts: Arc<dyn AlertSink>,
        gate: Arc<dyn PermissionGate>,
    ) -> (Self, PresenceHandle, broadcast::Receiver<UiEvent>) {
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        let (tick_tx, tick_rx) = mpsc::channel(4);
        let (events, events_rx) = broadcast::channel(EVENT_CAPACITY);

        let alert_loop = AlertLoop::new(alerts, config.alert_interval());
        let reconnect_loop = ReconnectLoop::new(tick_tx, (), config.reconnect_interval());
        let registry = DeviceRegistry::new(config.device_name_prefix.clone());

        let controller = Self {
            config,
            radio,
            bonds,
            gate,
            events,
            state: PresenceState::new(),
            registry,
            rx,
            tx: tx.clone(),
            tick_rx,
            alert_loop,
            reconnect_loop,
            scan: None,
            session_seq: 0,
            attempt_seq: 0,
            current_attempt: None,
            abort_after_attempt: false,
            link_watch: None,
            permissions_ok: false,
        };
        (controller, PresenceHandle { tx }, events_rx)
    }

    /// Runs the controller until `shutdown` or until every handle is dropped.
    pub async fn run(mut self) {
        if self.ensure_permissions().await {
            let bonded = self.load_bond().await;
            let effects = self.state.handle(Event::Started { bonded });
            self.apply(effects).await;
        }

        loop {
            tokio::select! {
                // The mailbox is drained before reconnect ticks so that a
                // disconnect event already queued always wins over a tick.
                biased;
                msg = self.rx.recv() => {
                    match msg {
                        Some(Msg::Shutdown) | None => break,
                        Some(msg) => self.dispatch(msg).await,
                    }
                }
                Some(()) = self.tick_rx.recv() => {
                    self.on_reconnect_tick().await;
                }
            }
        }

        self.teardown().await;
    }

    async fn dispatch(&mut self, msg: Msg) {
        match msg {
            Msg::Scan => {
                if !self.ensure_permissions().await {
                    return;
                }
                let effects = self.state.handle(Event::ManualScan);
                self.apply(effects).await;
            }
            Msg::Connect { device_id } => {
                if !self.ensure_permissions().await {
                    return;
                }
                let effects = self.state.handle(Event::Tapped { device_id });
                self.apply(effects).await;
            }
            Msg::Disconnect => self.on_disconnect_request().await,
            Msg::Forget => self.on_forget().await,
            Msg::Resume => {
                if !self.ensure_permissions().await {
                    return;
                }
                let bonded = self.load_bond().await;
                let effects = self.state.handle(Event::Started { bonded });
                self.apply(effects).await;
            }
            Msg::Devices { reply } => {
                let _ = reply.send(self.registry.snapshot());
            }
            Msg::Status { reply } => {
                let report = StatusReport {
                    phase: self.state.phase(),
                    active_device_id: self.state.active_device_id().map(String::from),
                    bonded_device_id: self.load_bond().await,
                    discovered: self.registry.len(),
                };
                let _ = reply.send(report);
            }
            Msg::Shutdown => unreachable!("handled by the run loop"),
            Msg::Sighting { session, sighting } => self.on_sighting(session, sighting).await,
            Msg::ScanEnded { session } => self.on_scan_ended(session).await,
            Msg::ConnectResolved {
                attempt,
                device_id,
                result,
            } => self.on_connect_resolved(attempt, device_id, result).await,
            Msg::LinkDown { device_id } => self.on_link_down(device_id).await,
        }
    }

    async fn on_disconnect_request(&mut self) {
        use crate::core::presence::machine::Phase;
        if self.state.phase() == Phase::Connecting {
            // Let the outstanding attempt resolve, then unwind.
            info!("Disconnect requested while connecting; deferring teardown");
            self.abort_after_attempt = true;
            return;
        }
        if self.state.phase() == Phase::Lost {
            // Any in-flight reconnect attempt is now stale; a late success
            // must be discarded.
            self.current_attempt = None;
        }
        let effects = self.state.handle(Event::DisconnectRequested);
        self.apply(effects).await;
    }

    async fn on_forget(&mut self) {
        if let Err(e) = self.bonds.forget().await {
            error!("Failed to forget bonded device: {}", e);
            return;
        }
        // Purely a future-behavior change: a live connection, and even the
        // current Lost cycle's alert loop, are unaffected.
        self.emit(UiEvent::BondForgotten);
    }

    async fn on_sighting(&mut self, session: u64, sighting: Sighting) {
        let Some(current) = self.scan.as_ref() else {
            return;
        };
        if current.id != session {
            debug!("Dropping sighting from superseded scan session {}", session);
            return;
        }

        let silent = current.silent;
        let target_hit = current.target.as_deref() == Some(sighting.id.as_str());

        if let Some(entry) = self.registry.upsert(&sighting) {
            if !silent {
                self.emit(UiEvent::DeviceFound(entry));
            }
        }

        if target_hit {
            let effects = self.state.handle(Event::TargetSighted {
                device_id: sighting.id,
            });
            self.apply(effects).await;
        }
    }

    async fn on_scan_ended(&mut self, session: u64) {
        let Some(current) = self.scan.as_ref() else {
            return;
        };
        if current.id != session {
            debug!("Dropping end of superseded scan session {}", session);
            return;
        }
        let silent = current.silent;
        self.scan = None;

        if silent {
            // Reconnect windows end without ceremony; the loop retries.
            return;
        }
        let any_found = !self.registry.is_empty();
        let effects = self.state.handle(Event::ScanEnded { any_found });
        self.apply(effects).await;
    }

    async fn on_connect_resolved(
        &mut self,
        attempt: u64,
        device_id: String,
        result: Result<(), String>,
    ) {
        if self.current_attempt != Some(attempt) {
            debug!("Dropping resolution of stale connect attempt {}", attempt);
            if result.is_ok() {
                // The radio did connect; leave nothing half-open behind.
                self.spawn_disconnect(device_id);
            }
            return;
        }
        self.current_attempt = None;

        if std::mem::take(&mut self.abort_after_attempt) {
            if result.is_ok() {
                self.spawn_disconnect(device_id);
            }
            let effects = self.state.handle(Event::AttemptAborted);
            self.apply(effects).await;
            return;
        }

        let effects = match result {
            Ok(()) => self.state.handle(Event::ConnectOk { device_id }),
            Err(reason) => {
                warn!("Connect attempt to {} failed: {}", device_id, reason);
                self.state.handle(Event::ConnectErr { reason })
            }
        };
        self.apply(effects).await;
    }

    async fn on_link_down(&mut self, device_id: String) {
        if self.state.active_device_id() != Some(device_id.as_str()) {
            debug!("Dropping link-down for inactive device {}", device_id);
            return;
        }
        let has_bond = self.load_bond().await.is_some();
        let effects = self.state.handle(Event::LinkDown { has_bond });
        self.apply(effects).await;
    }

    async fn on_reconnect_tick(&mut self) {
        if !self.state.lost_mode_active() {
            return;
        }
        if self.scan.is_some() || self.state.attempt_in_flight() {
            debug!("Reconnect tick skipped; previous attempt still running");
            return;
        }
        // The bond is re-read on every tick: forgetting the device stops
        // future attempts without touching the alert loop.
        match self.load_bond().await {
            Some(target) => {
                self.begin_scan(Some(target), true);
            }
            None => {
                self.reconnect_loop.disarm().await;
            }
        }
    }

    async fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ClearRegistry => self.registry.clear(),
                Effect::CancelScan => self.cancel_scan(),
                Effect::BeginScan { target, silent } => self.begin_scan(target, silent),
                Effect::BeginConnect { device_id } => self.begin_connect(device_id),
                Effect::PersistBond { device_id } => {
                    if let Err(e) = self.bonds.store(&device_id).await {
                        error!("Failed to persist bonded device: {}", e);
                    }
                }
                Effect::WatchLink { device_id } => self.watch_link(device_id),
                Effect::StopWatch => self.stop_watch().await,
                Effect::DropLink { device_id } => {
                    self.stop_watch().await;
                    self.spawn_disconnect(device_id);
                }
                Effect::ArmAlertLoop => self.alert_loop.arm(),
                Effect::ArmReconnectLoop => self.reconnect_loop.arm(),
                Effect::DisarmLostLoops => {
                    self.alert_loop.disarm().await;
                    self.reconnect_loop.disarm().await;
                }
                Effect::Notify(note) => self.emit_note(note),
            }
        }
    }

    fn cancel_scan(&mut self) {
        if let Some(session) = self.scan.take() {
            debug!("Cancelling scan session {}", session.id);
            session.token.cancel();
        }
    }

    fn begin_scan(&mut self, target: Option<String>, silent: bool) {
        self.cancel_scan();

        self.session_seq += 1;
        let id = self.session_seq;
        let token = CancellationToken::new();
        let duration = if silent {
            self.config.reconnect_scan_duration()
        } else {
            self.config.scan_duration()
        };
        info!(
            "Starting scan session {} (target: {:?}, window {:?})",
            id, target, duration
        );

        let radio = self.radio.clone();
        let mailbox = self.tx.clone();
        let child = token.clone();
        tokio::spawn(async move {
            let (sightings_tx, mut sightings_rx) = mpsc::channel::<Sighting>(32);
            let pump = radio.scan_into(sightings_tx, child.clone());
            tokio::pin!(pump);
            let deadline = tokio::time::sleep(duration);
            tokio::pin!(deadline);
            let mut pump_done = false;

            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = &mut deadline => break,
                    result = &mut pump, if !pump_done => {
                        pump_done = true;
                        if let Err(e) = result {
                            error!("Scan session {} failed: {}", id, e);
                            break;
                        }
                    }
                    maybe = sightings_rx.recv() => {
                        match maybe {
                            Some(sighting) => {
                                let _ = mailbox.send(Msg::Sighting { session: id, sighting }).await;
                            }
                            None => break,
                        }
                    }
                }
            }

            child.cancel();
            let _ = mailbox.send(Msg::ScanEnded { session: id }).await;
        });

        self.scan = Some(ScanSession {
            id,
            target,
            silent,
            token,
        });
    }

    fn begin_connect(&mut self, device_id: String) {
        self.attempt_seq += 1;
        let attempt = self.attempt_seq;
        self.current_attempt = Some(attempt);

        let radio = self.radio.clone();
        let mailbox = self.tx.clone();
        let timeout = self.config.connect_timeout();
        info!("Connect attempt {} to {} (timeout {:?})", attempt, device_id, timeout);

        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, radio.connect(&device_id)).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err(RadioError::ConnectTimeout.to_string()),
            };
            let _ = mailbox
                .send(Msg::ConnectResolved {
                    attempt,
                    device_id,
                    result,
                })
                .await;
        });
    }

    fn watch_link(&mut self, device_id: String) {
        if let Some((token, _)) = self.link_watch.take() {
            token.cancel();
        }
        let token = CancellationToken::new();
        let child = token.clone();
        let radio = self.radio.clone();
        let mailbox = self.tx.clone();

        let handle = tokio::spawn(async move {
            let (link_tx, mut link_rx) = mpsc::channel::<LinkEvent>(8);
            let pump_radio = radio.clone();
            let pump_id = device_id.clone();
            let pump_token = child.clone();
            let pump = tokio::spawn(async move {
                if let Err(e) = pump_radio.watch_link(&pump_id, link_tx, pump_token).await {
                    warn!("Link watch for {} ended with error: {}", pump_id, e);
                }
            });

            while let Some(event) = link_rx.recv().await {
                if event == LinkEvent::Down {
                    let _ = mailbox.send(Msg::LinkDown { device_id: device_id.clone() }).await;
                    break;
                }
            }
            child.cancel();
            let _ = pump.await;
        });
        self.link_watch = Some((token, handle));
    }

    async fn stop_watch(&mut self) {
        if let Some((token, handle)) = self.link_watch.take() {
            token.cancel();
            let _ = handle.await;
        }
    }

    fn spawn_disconnect(&self, device_id: String) {
        let radio = self.radio.clone();
        tokio::spawn(async move {
            if let Err(e) = radio.disconnect(&device_id).await {
                warn!("Disconnect of {} failed: {}", device_id, e);
            }
        });
    }

    async fn ensure_permissions(&mut self) -> bool {
        if self.permissions_ok {
            return true;
        }
        let denied = self.gate.request(&REQUIRED_CAPABILITIES).await;
        if denied.is_empty() {
            self.permissions_ok = true;
            return true;
        }
        for capability in denied {
            warn!("Capability denied: {:?}", capability);
            self.emit(UiEvent::PermissionDenied(capability));
        }
        false
    }

    async fn load_bond(&self) -> Option<String> {
        match self.bonds.load().await {
            Ok(bonded) => bonded,
            Err(e) => {
                error!("Failed to read bonded device: {}", e);
                None
            }
        }
    }

    fn emit_note(&self, note: Note) {
        let event = match note {
            Note::ScanStarted => UiEvent::ScanStarted,
            Note::NoDevicesFound => UiEvent::ScanFinished { discovered: 0 },
            Note::SelectToConnect => UiEvent::ScanFinished {
                discovered: self.registry.len(),
            },
            Note::Connecting { device_id } => UiEvent::Connecting { device_id },
            Note::Connected { device_id } => UiEvent::Connected { device_id },
            Note::ConnectFailed { reason } => UiEvent::ConnectFailed { reason },
            Note::LinkLost => UiEvent::LinkLost,
            Note::Disconnected => UiEvent::Disconnected,
            Note::Busy => UiEvent::Busy,
        };
        self.emit(event);
    }

    fn emit(&self, event: UiEvent) {
        debug!("Event: {:?}", event);
        let _ = self.events.send(event);
    }

    async fn teardown(&mut self) {
        info!("Presence controller shutting down");
        self.cancel_scan();
        self.stop_watch().await;
        self.alert_loop.disarm().await;
        self.reconnect_loop.disarm().await;
        if let Some(device_id) = self.state.active_device_id() {
            self.spawn_disconnect(device_id.to_string());
        }
    }
}
