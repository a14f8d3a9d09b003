//! Registry of umbrella devices discovered during a scan session.
//!
//! The registry never fails, it only filters: sightings whose display
//! name does not start with the configured prefix are dropped, everything
//! else is keyed by the stable device id with the latest signal strength.

use serde::Serialize;

use crate::core::bluetooth::Sighting;

/// One entry of the discovered-device list shown to the user
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DiscoveredDevice {
    /// Platform-specific stable identifier
    pub id: String,
    /// Resolved display name (advertised, platform or fallback)
    pub display_name: String,
    /// Latest signal strength (RSSI) for this device
    pub signal_strength: i16,
}

#[derive(Debug)]
pub struct DeviceRegistry {
    name_prefix: String,
    /// Entries in insertion order; `snapshot` sorts a copy.
    entries: Vec<DiscoveredDevice>,
}

impl DeviceRegistry {
    pub fn new(name_prefix: impl Into<String>) -> Self {
        Self {
            name_prefix: name_prefix.into(),
            entries: Vec::new(),
        }
    }

    /// Empties the discovered set. Called at the start of every manual scan.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Records a sighting, overwriting the entry for that id if one exists.
    /// Returns the updated entry, or `None` if the prefix filter dropped it.
    pub fn upsert(&mut self, sighting: &Sighting) -> Option<DiscoveredDevice> {
        let display_name = sighting.display_name();
        if !display_name.starts_with(&self.name_prefix) {
            return None;
        }

        let entry = DiscoveredDevice {
            id: sighting.id.clone(),
            display_name: display_name.to_string(),
            signal_strength: sighting.rssi,
        };
        match self.entries.iter_mut().find(|e| e.id == sighting.id) {
            Some(existing) => *existing = entry.clone(),
            None => self.entries.push(entry.clone()),
        }
        Some(entry)
    }

    /// All current entries, strongest signal first; ties keep insertion order.
    pub fn snapshot(&self) -> Vec<DiscoveredDevice> {
        let mut sorted = self.entries.clone();
        sorted.sort_by_key(|e| std::cmp::Reverse(e.signal_strength));
        sorted
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
