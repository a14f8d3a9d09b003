//! The device-presence core: registry, state machine, controller and the
//! two Lost-mode loops.

mod alert_loop;
mod controller;
mod machine;
mod reconnect_loop;
mod registry;

pub use controller::{PresenceController, PresenceHandle};
pub use machine::{Phase, PresenceState};
pub use registry::{DeviceRegistry, DiscoveredDevice};
