//! Application configuration.
//!
//! Every knob has a default from `core::bluetooth::constants`; an
//! optional `config.json` in the platform config directory overrides
//! individual fields.

use std::path::PathBuf;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::core::bluetooth::constants::{
    ALERT_INTERVAL_SECS, CONNECT_TIMEOUT_SECS, RECONNECT_INTERVAL_SECS, RECONNECT_SCAN_SECS,
    SCAN_DURATION_SECS, UMBRELLA_NAME_PREFIX,
};

const CONFIG_FILE_NAME: &str = "config.json";
const APP_DIR_NAME: &str = "brolly";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Advertised-name prefix that identifies an umbrella
    pub device_name_prefix: String,
    /// Bounded duration of a manual or startup scan session, seconds
    pub scan_duration_secs: u64,
    /// Bounded duration of one silent reconnect scan window, seconds
    pub reconnect_scan_secs: u64,
    /// Timeout for a single connect attempt, seconds
    pub connect_timeout_secs: u64,
    /// Cadence of the lost-alert loop, seconds
    pub alert_interval_secs: u64,
    /// Cadence of the reconnect loop, seconds
    pub reconnect_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device_name_prefix: UMBRELLA_NAME_PREFIX.to_string(),
            scan_duration_secs: SCAN_DURATION_SECS,
            reconnect_scan_secs: RECONNECT_SCAN_SECS,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            alert_interval_secs: ALERT_INTERVAL_SECS,
            reconnect_interval_secs: RECONNECT_INTERVAL_SECS,
        }
    }
}

impl AppConfig {
    /// Platform directory holding the config file and the bond record.
    pub fn app_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
    }

    /// Loads the config file if present, falling back to defaults on
    /// absence and on parse failures (which are logged, never fatal).
    pub async fn load() -> Self {
        let path = Self::app_dir().join(CONFIG_FILE_NAME);
        match tokio::fs::read(&path).await {
            Ok(raw) => match serde_json::from_slice(&raw) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Malformed config at {:?} ({}), using defaults", path, e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn scan_duration(&self) -> Duration {
        Duration::from_secs(self.scan_duration_secs)
    }

    pub fn reconnect_scan_duration(&self) -> Duration {
        Duration::from_secs(self.reconnect_scan_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn alert_interval(&self) -> Duration {
        Duration::from_secs(self.alert_interval_secs)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.reconnect_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_timings() {
        let config = AppConfig::default();
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.alert_interval(), Duration::from_secs(3));
        assert_eq!(config.reconnect_interval(), Duration::from_secs(3));
        assert_eq!(config.reconnect_scan_duration(), Duration::from_secs(4));
        assert_eq!(config.device_name_prefix, "Brolly");
    }

    #[test]
    fn partial_config_files_keep_defaults_for_missing_fields() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "device_name_prefix": "Parapluie" }"#).unwrap();
        assert_eq!(config.device_name_prefix, "Parapluie");
        assert_eq!(config.scan_duration_secs, SCAN_DURATION_SECS);
    }
}
