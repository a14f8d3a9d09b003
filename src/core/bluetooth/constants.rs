//! Constants used throughout the application
//! This module contains the default name filter, timeouts and loop
//! cadences used by the presence controller and its satellite loops.

/// Advertised name prefix the umbrella broadcasts
pub const UMBRELLA_NAME_PREFIX: &str = "Brolly";

/// Display name used when a sighting carries no name at all
pub const UNNAMED_DEVICE_LABEL: &str = "Unknown device";

/// Timeout for a single connect attempt in seconds
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Duration of a manual or startup scan session in seconds
pub const SCAN_DURATION_SECS: u64 = 10;

/// Duration of one silent reconnect scan window in seconds
pub const RECONNECT_SCAN_SECS: u64 = 4;

/// Cadence of the lost-alert loop in seconds
pub const ALERT_INTERVAL_SECS: u64 = 3;

/// Cadence of the reconnect loop in seconds
pub const RECONNECT_INTERVAL_SECS: u64 = 3;
