//! Application state management
//! This module wires the production collaborators into the presence
//! controller and exposes the handles the front end needs.

use std::sync::Arc;

use anyhow::Result;
use log::info;
use tokio::sync::broadcast;

use crate::alert::ConsoleAlertSink;
use crate::config::AppConfig;
use crate::core::bluetooth::BluestRadio;
use crate::core::presence::{PresenceController, PresenceHandle};
use crate::events::UiEvent;
use crate::permissions::HostPermissionGate;
use crate::storage::FileBondStore;

/// Global application state
pub struct AppState {
    pub handle: PresenceHandle,
    pub events: broadcast::Receiver<UiEvent>,
}

impl AppState {
    /// Builds the full stack and spawns the presence controller.
    pub async fn new() -> Result<Self> {
        let config = AppConfig::load().await;
        info!(
            "Tracking devices advertising the prefix {:?}",
            config.device_name_prefix
        );

        let radio = Arc::new(BluestRadio::new().await?);
        let bonds = Arc::new(FileBondStore::new(AppConfig::app_dir()));
        let alerts = Arc::new(ConsoleAlertSink);
        let gate = Arc::new(HostPermissionGate);

        let (controller, handle, events) =
            PresenceController::new(config, radio, bonds, alerts, gate);
        tokio::spawn(controller.run());

        Ok(Self { handle, events })
    }
}
