//! Events the controller publishes to the user-facing surface.
//!
//! The mobile original pushed these to the view layer one callback at a
//! time; here they travel over a broadcast channel and the front end
//! renders them however it likes.

use serde::Serialize;

use crate::core::presence::{DiscoveredDevice, Phase};
use crate::permissions::Capability;

#[derive(Debug, Clone, Serialize)]
pub enum UiEvent {
    ScanStarted,
    DeviceFound(DiscoveredDevice),
    ScanFinished { discovered: usize },
    Connecting { device_id: String },
    Connected { device_id: String },
    ConnectFailed { reason: String },
    LinkLost,
    Disconnected,
    BondForgotten,
    PermissionDenied(Capability),
    /// A second connect/scan request arrived while one is outstanding
    Busy,
}

/// Snapshot answered by the `status` query
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub phase: Phase,
    pub active_device_id: Option<String>,
    pub bonded_device_id: Option<String>,
    pub discovered: usize,
}

impl StatusReport {
    /// Phase-derived status line for the display.
    pub fn describe(&self) -> String {
        match self.phase {
            Phase::Idle => match self.bonded_device_id.as_deref() {
                Some(id) => format!("Idle (bonded to {})", id),
                None => "Idle".to_string(),
            },
            Phase::Scanning => "Scanning for umbrellas...".to_string(),
            Phase::Connecting => match self.active_device_id.as_deref() {
                Some(id) => format!("Connecting to {}...", id),
                None => "Connecting...".to_string(),
            },
            Phase::Connected => match self.active_device_id.as_deref() {
                Some(id) => format!("Connected to {}", id),
                None => "Connected".to_string(),
            },
            Phase::Lost => "Umbrella lost! Alerting and trying to reconnect".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_follows_the_phase() {
        let mut report = StatusReport {
            phase: Phase::Lost,
            active_device_id: None,
            bonded_device_id: Some("AA:BB".into()),
            discovered: 0,
        };
        assert!(report.describe().contains("lost"));

        report.phase = Phase::Connected;
        report.active_device_id = Some("AA:BB".into());
        assert_eq!(report.describe(), "Connected to AA:BB");
    }
}
