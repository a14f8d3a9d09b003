//! Bluetooth functionality for the umbrella companion.
//! This module holds the radio seam the presence controller talks to
//! and its `bluest`-backed production implementation.

pub mod constants;
mod radio;
mod scanner;
mod types;

pub use radio::Radio;
pub use scanner::BluestRadio;
pub use types::{LinkEvent, Sighting};
