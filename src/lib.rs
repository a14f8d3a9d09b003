//! Brolly, a companion app for a BLE smart umbrella.
//!
//! Pairs with a single umbrella peripheral, watches the connection, and
//! raises a repeating alert when the umbrella drops off the link (it was
//! probably left behind), while silently trying to reconnect.

// Module declarations
pub mod alert;
pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod logging;
pub mod permissions;
pub mod state;
pub mod storage;
pub mod utils;

pub use config::AppConfig;
pub use core::bluetooth::{BluestRadio, LinkEvent, Radio, Sighting};
pub use core::presence::{DiscoveredDevice, Phase, PresenceController, PresenceHandle};
pub use events::{StatusReport, UiEvent};
