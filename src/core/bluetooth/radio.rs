//! The radio seam between the presence controller and the Bluetooth stack.
//!
//! The controller only ever talks to this trait; the production
//! implementation lives in [`scanner`](super::scanner) and tests
//! substitute scripted fakes.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::types::{LinkEvent, Sighting};
use crate::error::RadioError;

/// Radio primitives consumed by the presence controller.
///
/// `scan_into` and `watch_link` are pumps: they run until the token is
/// cancelled (or the underlying stream ends) and push items into the
/// provided channel. The controller spawns and bounds them.
#[async_trait]
pub trait Radio: Send + Sync {
    /// Stream advertisement sightings into `out` until cancelled.
    async fn scan_into(
        &self,
        out: mpsc::Sender<Sighting>,
        cancel: CancellationToken,
    ) -> Result<(), RadioError>;

    /// Request a connection to a previously sighted device.
    /// The caller bounds this with a timeout.
    async fn connect(&self, device_id: &str) -> Result<(), RadioError>;

    /// Tear down the connection to a device.
    async fn disconnect(&self, device_id: &str) -> Result<(), RadioError>;

    /// Stream connection-state events for a device into `out` until cancelled.
    async fn watch_link(
        &self,
        device_id: &str,
        out: mpsc::Sender<LinkEvent>,
        cancel: CancellationToken,
    ) -> Result<(), RadioError>;
}
