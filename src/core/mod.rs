//! Core functionality for the umbrella companion
//! This module contains the radio layer and the presence state machine.

pub mod bluetooth;
pub mod presence;

// Re-export commonly used types
pub use bluetooth::{BluestRadio, Radio};
pub use presence::{PresenceController, PresenceHandle};
