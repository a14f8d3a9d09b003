//! Defines shared data structures for the Bluetooth module.

use crate::core::bluetooth::constants::UNNAMED_DEVICE_LABEL;

/// One raw advertisement sighting observed during a scan session
#[derive(Debug, Clone, serde::Serialize)]
pub struct Sighting {
    /// Platform-specific unique identifier for the device (stable across sessions)
    pub id: String,
    /// Name carried in the advertisement packet, if any
    pub advertised_name: Option<String>,
    /// Name the platform reports for the device, if any
    pub device_name: Option<String>,
    /// The signal strength (RSSI) of the sighting
    pub rssi: i16,
}

impl Sighting {
    /// Advertised name if non-empty, else the platform name, else a fallback literal.
    pub fn display_name(&self) -> &str {
        match self.advertised_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => match self.device_name.as_deref() {
                Some(name) if !name.is_empty() => name,
                _ => UNNAMED_DEVICE_LABEL,
            },
        }
    }
}

/// Connection-state events from the radio's link feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    Up,
    Down,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sighting(advertised: Option<&str>, platform: Option<&str>) -> Sighting {
        Sighting {
            id: "AA:BB".into(),
            advertised_name: advertised.map(String::from),
            device_name: platform.map(String::from),
            rssi: -60,
        }
    }

    #[test]
    fn advertised_name_wins() {
        assert_eq!(
            sighting(Some("Brolly U1"), Some("generic")).display_name(),
            "Brolly U1"
        );
    }

    #[test]
    fn empty_advertised_name_falls_back_to_platform_name() {
        assert_eq!(sighting(Some(""), Some("Brolly U1")).display_name(), "Brolly U1");
    }

    #[test]
    fn nameless_sighting_gets_fallback_label() {
        assert_eq!(sighting(None, Some("")).display_name(), UNNAMED_DEVICE_LABEL);
    }
}
