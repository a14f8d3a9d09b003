//! Alert delivery seam.
//!
//! The lost-alert loop only ever talks to [`AlertSink`]; the production
//! sink is a thin wrapper over the host's attention channel and tests
//! substitute a recording fake.

use log::warn;

/// Title used for every left-behind alert
pub const ALERT_TITLE: &str = "Umbrella left behind!";

/// Body used for every left-behind alert
pub const ALERT_BODY: &str = "Your umbrella is out of range. Don't walk away without it.";

pub trait AlertSink: Send + Sync {
    /// Deliver one high-urgency alert.
    fn raise(&self, title: &str, body: &str);

    /// Withdraw every alert this app currently has on display.
    fn clear(&self);
}

/// Alert sink for the terminal front end: logs at warn level and rings
/// the terminal bell for the sound-and-vibration delivery class.
#[derive(Debug, Default)]
pub struct ConsoleAlertSink;

impl AlertSink for ConsoleAlertSink {
    fn raise(&self, title: &str, body: &str) {
        warn!("{} {}", title, body);
        eprint!("\x07");
    }

    fn clear(&self) {
        // Nothing persists on a terminal; logged alerts scroll away.
    }
}
