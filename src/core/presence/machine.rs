//! The presence state machine.
//!
//! The original behaviour lived in callback closures; here it is an
//! explicit five-phase machine with a single transition function. The
//! machine is pure: it mutates its own fields and returns the side
//! effects the controller must carry out, which is what makes reachable
//! and forbidden transitions directly testable.

use serde::Serialize;

/// Connection phase of the tracked umbrella
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    Scanning,
    Connecting,
    Connected,
    Lost,
}

/// Status notes surfaced to the user when a transition warrants one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Note {
    ScanStarted,
    NoDevicesFound,
    SelectToConnect,
    Connecting { device_id: String },
    Connected { device_id: String },
    ConnectFailed { reason: String },
    LinkLost,
    Disconnected,
    Busy,
}

/// Inputs to the transition function
#[derive(Debug, Clone)]
pub enum Event {
    /// App start or resume from background, with the persisted bond if any
    Started { bonded: Option<String> },
    /// User requested a fresh manual scan
    ManualScan,
    /// A targeted scan session sighted its target
    TargetSighted { device_id: String },
    /// User tapped an entry in the discovered list
    Tapped { device_id: String },
    /// A manual/startup scan session reached its bounded duration
    ScanEnded { any_found: bool },
    /// The connect attempt resolved successfully
    ConnectOk { device_id: String },
    /// The connect attempt failed or timed out
    ConnectErr { reason: String },
    /// The radio's link feed reported an unexpected disconnect
    LinkDown { has_bond: bool },
    /// User requested a disconnect
    DisconnectRequested,
    /// A deferred user disconnect landed after the in-flight connect
    /// attempt resolved; unwind to Idle without a failure status
    AttemptAborted,
}

/// Side effects the controller must execute after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ClearRegistry,
    CancelScan,
    BeginScan {
        target: Option<String>,
        /// Silent sessions (reconnect mode) emit no discovery events or
        /// end-of-session status.
        silent: bool,
    },
    BeginConnect { device_id: String },
    PersistBond { device_id: String },
    WatchLink { device_id: String },
    /// Cancel the link watch without touching the radio (link already down)
    StopWatch,
    /// Cancel the link watch and actively disconnect the device
    DropLink { device_id: String },
    ArmAlertLoop,
    ArmReconnectLoop,
    DisarmLostLoops,
    Notify(Note),
}

/// Mutable session state owned by the presence controller
#[derive(Debug, Default)]
pub struct PresenceState {
    phase: Phase,
    /// Device currently connected or being connected to
    active_device_id: Option<String>,
    /// Target of an in-flight reconnect attempt while Lost
    lost_attempt: Option<String>,
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Idle
    }
}

impl PresenceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn active_device_id(&self) -> Option<&str> {
        self.active_device_id.as_deref()
    }

    /// True exactly while the alert/reconnect loops are armed.
    pub fn lost_mode_active(&self) -> bool {
        self.phase == Phase::Lost
    }

    /// True while a connect attempt (normal or reconnect) is outstanding.
    pub fn attempt_in_flight(&self) -> bool {
        self.phase == Phase::Connecting || self.lost_attempt.is_some()
    }

    /// The single transition function. Events that are not meaningful in
    /// the current phase produce no state change and no effects (beyond
    /// an occasional busy note), never a panic or an inconsistent state.
    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::Started { bonded } => self.on_started(bonded),
            Event::ManualScan => self.on_manual_scan(),
            Event::TargetSighted { device_id } => self.on_target_sighted(device_id),
            Event::Tapped { device_id } => self.on_tapped(device_id),
            Event::ScanEnded { any_found } => self.on_scan_ended(any_found),
            Event::ConnectOk { device_id } => self.on_connect_ok(device_id),
            Event::ConnectErr { reason } => self.on_connect_err(reason),
            Event::LinkDown { has_bond } => self.on_link_down(has_bond),
            Event::DisconnectRequested => self.on_disconnect_requested(),
            Event::AttemptAborted => self.on_attempt_aborted(),
        }
    }

    fn on_attempt_aborted(&mut self) -> Vec<Effect> {
        if self.phase != Phase::Connecting {
            return Vec::new();
        }
        self.phase = Phase::Idle;
        let mut effects = Vec::new();
        if let Some(device_id) = self.active_device_id.take() {
            effects.push(Effect::DropLink { device_id });
        }
        effects.push(Effect::Notify(Note::Disconnected));
        effects
    }

    fn on_started(&mut self, bonded: Option<String>) -> Vec<Effect> {
        match self.phase {
            Phase::Idle | Phase::Scanning => {
                let Some(target) = bonded else {
                    return Vec::new();
                };
                let mut effects = Vec::new();
                if self.phase == Phase::Scanning {
                    effects.push(Effect::CancelScan);
                }
                self.phase = Phase::Scanning;
                effects.push(Effect::BeginScan {
                    target: Some(target),
                    silent: false,
                });
                effects
            }
            // Resuming while Lost runs one immediate silent reconnect
            // attempt; the phase stays Lost.
            Phase::Lost => match bonded {
                Some(target) if self.lost_attempt.is_none() => vec![Effect::BeginScan {
                    target: Some(target),
                    silent: true,
                }],
                _ => Vec::new(),
            },
            Phase::Connecting | Phase::Connected => Vec::new(),
        }
    }

    fn on_manual_scan(&mut self) -> Vec<Effect> {
        match self.phase {
            Phase::Idle => {
                self.phase = Phase::Scanning;
                vec![
                    Effect::ClearRegistry,
                    Effect::BeginScan { target: None, silent: false },
                    Effect::Notify(Note::ScanStarted),
                ]
            }
            Phase::Scanning => vec![
                Effect::CancelScan,
                Effect::ClearRegistry,
                Effect::BeginScan { target: None, silent: false },
                Effect::Notify(Note::ScanStarted),
            ],
            Phase::Connecting | Phase::Connected | Phase::Lost => {
                vec![Effect::Notify(Note::Busy)]
            }
        }
    }

    fn on_target_sighted(&mut self, device_id: String) -> Vec<Effect> {
        match self.phase {
            Phase::Scanning => self.begin_connect(device_id, true),
            Phase::Lost => {
                if self.lost_attempt.is_some() {
                    return Vec::new();
                }
                self.lost_attempt = Some(device_id.clone());
                vec![Effect::CancelScan, Effect::BeginConnect { device_id }]
            }
            _ => Vec::new(),
        }
    }

    fn on_tapped(&mut self, device_id: String) -> Vec<Effect> {
        match self.phase {
            // Tapping is also valid from Idle: the list stays on screen
            // after a session ends ("select to connect").
            Phase::Idle => self.begin_connect(device_id, false),
            Phase::Scanning => self.begin_connect(device_id, true),
            Phase::Connecting | Phase::Connected => vec![Effect::Notify(Note::Busy)],
            Phase::Lost => Vec::new(),
        }
    }

    fn begin_connect(&mut self, device_id: String, cancel_scan: bool) -> Vec<Effect> {
        self.phase = Phase::Connecting;
        self.active_device_id = Some(device_id.clone());
        let mut effects = Vec::new();
        if cancel_scan {
            effects.push(Effect::CancelScan);
        }
        effects.push(Effect::BeginConnect {
            device_id: device_id.clone(),
        });
        effects.push(Effect::Notify(Note::Connecting { device_id }));
        effects
    }

    fn on_scan_ended(&mut self, any_found: bool) -> Vec<Effect> {
        if self.phase != Phase::Scanning {
            return Vec::new();
        }
        self.phase = Phase::Idle;
        let note = if any_found {
            Note::SelectToConnect
        } else {
            Note::NoDevicesFound
        };
        vec![Effect::Notify(note)]
    }

    fn on_connect_ok(&mut self, device_id: String) -> Vec<Effect> {
        let accepted = match self.phase {
            Phase::Connecting => self.active_device_id.as_deref() == Some(&device_id),
            Phase::Lost => self.lost_attempt.as_deref() == Some(&device_id),
            _ => false,
        };
        if !accepted {
            return Vec::new();
        }
        self.phase = Phase::Connected;
        self.active_device_id = Some(device_id.clone());
        self.lost_attempt = None;
        vec![
            Effect::PersistBond {
                device_id: device_id.clone(),
            },
            Effect::WatchLink {
                device_id: device_id.clone(),
            },
            Effect::DisarmLostLoops,
            Effect::Notify(Note::Connected { device_id }),
        ]
    }

    fn on_connect_err(&mut self, reason: String) -> Vec<Effect> {
        match self.phase {
            Phase::Connecting => {
                self.phase = Phase::Idle;
                self.active_device_id = None;
                vec![Effect::Notify(Note::ConnectFailed { reason })]
            }
            // A failed reconnect attempt stays in Lost; the loop retries.
            Phase::Lost => {
                self.lost_attempt = None;
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn on_link_down(&mut self, has_bond: bool) -> Vec<Effect> {
        if self.phase != Phase::Connected {
            return Vec::new();
        }
        self.phase = Phase::Lost;
        self.active_device_id = None;
        let mut effects = vec![Effect::StopWatch, Effect::ArmAlertLoop];
        if has_bond {
            effects.push(Effect::ArmReconnectLoop);
        }
        effects.push(Effect::Notify(Note::LinkLost));
        effects
    }

    fn on_disconnect_requested(&mut self) -> Vec<Effect> {
        match self.phase {
            Phase::Connected => {
                self.phase = Phase::Idle;
                let mut effects = Vec::new();
                if let Some(device_id) = self.active_device_id.take() {
                    effects.push(Effect::DropLink { device_id });
                }
                effects.push(Effect::Notify(Note::Disconnected));
                effects
            }
            Phase::Lost => {
                self.phase = Phase::Idle;
                self.lost_attempt = None;
                vec![
                    Effect::CancelScan,
                    Effect::DisarmLostLoops,
                    Effect::Notify(Note::Disconnected),
                ]
            }
            // An outstanding connect attempt is allowed to resolve; the
            // controller defers the teardown until it does.
            Phase::Connecting => Vec::new(),
            Phase::Idle | Phase::Scanning => Vec::new(),
        }
    }
}
