//! Bluetooth radio implementation backed by the `bluest` crate.
//!
//! Keeps a cache of platform device handles keyed by their stable id so
//! that a later connect request can be resolved back to the handle the
//! scan produced.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bluest::{Adapter, ConnectionEvent, Device};
use futures_util::StreamExt;
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::radio::Radio;
use crate::core::bluetooth::types::{LinkEvent, Sighting};
use crate::error::RadioError;

pub struct BluestRadio {
    adapter: Adapter,
    /// Map of device ids to platform handles, refreshed on every sighting
    handles: Mutex<HashMap<String, Device>>,
}

impl BluestRadio {
    /// Opens the default adapter and waits for it to become available.
    pub async fn new() -> Result<Self, RadioError> {
        let adapter = Adapter::default()
            .await
            .ok_or(RadioError::AdapterUnavailable)?;
        adapter.wait_available().await?;
        info!("Bluetooth adapter is available.");
        Ok(Self {
            adapter,
            handles: Mutex::new(HashMap::new()),
        })
    }

    fn handle_for(&self, device_id: &str) -> Result<Device, RadioError> {
        let handles = self.handles.lock().unwrap();
        handles
            .get(device_id)
            .cloned()
            .ok_or_else(|| RadioError::UnknownDevice(device_id.to_string()))
    }

    fn remember(&self, id: &str, device: &Device) {
        let mut handles = self.handles.lock().unwrap();
        handles.insert(id.to_string(), device.clone());
    }
}

#[async_trait]
impl Radio for BluestRadio {
    async fn scan_into(
        &self,
        out: mpsc::Sender<Sighting>,
        cancel: CancellationToken,
    ) -> Result<(), RadioError> {
        info!("Starting bluetooth scan");
        let mut scan_stream = self.adapter.scan(&[]).await?;

        loop {
            tokio::select! {
                result = scan_stream.next() => {
                    match result {
                        Some(adv) => {
                            let device = adv.device;
                            let id = device.id().to_string();
                            debug!("Advertisement from {} (rssi {:?})", id, adv.rssi);
                            self.remember(&id, &device);

                            let sighting = Sighting {
                                id,
                                advertised_name: adv.adv_data.local_name.clone(),
                                device_name: device.name().ok(),
                                rssi: adv.rssi.unwrap_or(i16::MIN),
                            };
                            if out.send(sighting).await.is_err() {
                                // Session receiver went away, scan is over.
                                break;
                            }
                        }
                        None => {
                            info!("Bluetooth scan stream has ended.");
                            break;
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    debug!("Scan cancelled");
                    break;
                }
            }
        }
        Ok(())
    }

    async fn connect(&self, device_id: &str) -> Result<(), RadioError> {
        let device = self.handle_for(device_id)?;
        if device.is_connected().await {
            info!("Device {} already connected.", device_id);
            return Ok(());
        }
        info!("Initiating connection to {}...", device_id);
        self.adapter.connect_device(&device).await?;
        info!("Connection to {} established", device_id);
        Ok(())
    }

    async fn disconnect(&self, device_id: &str) -> Result<(), RadioError> {
        let device = self.handle_for(device_id)?;
        if device.is_connected().await {
            info!("Disconnecting from device {}", device_id);
            self.adapter.disconnect_device(&device).await?;
        } else {
            info!("Device {} not connected", device_id);
        }
        Ok(())
    }

    async fn watch_link(
        &self,
        device_id: &str,
        out: mpsc::Sender<LinkEvent>,
        cancel: CancellationToken,
    ) -> Result<(), RadioError> {
        let device = self.handle_for(device_id)?;
        let mut events = self.adapter.device_connection_events(&device).await?;
        info!("Watching link state for {}", device_id);

        loop {
            tokio::select! {
                event = events.next() => {
                    match event {
                        Some(ConnectionEvent::Connected) => {
                            if out.send(LinkEvent::Up).await.is_err() {
                                break;
                            }
                        }
                        Some(ConnectionEvent::Disconnected) => {
                            warn!("Link to {} went down", device_id);
                            if out.send(LinkEvent::Down).await.is_err() {
                                break;
                            }
                        }
                        None => {
                            warn!("Connection event stream for {} ended", device_id);
                            break;
                        }
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }
        Ok(())
    }
}
