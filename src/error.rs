//! Error types for the umbrella companion.
//!
//! Nothing here is fatal to the process: radio failures degrade to a
//! status message and a safe phase, storage failures are surfaced and
//! retried on the next operation.

use thiserror::Error;

/// Errors produced by the radio layer
#[derive(Debug, Error)]
pub enum RadioError {
    /// No Bluetooth adapter, or the adapter is powered off
    #[error("Bluetooth adapter is unavailable")]
    AdapterUnavailable,

    /// The controller asked to connect to an id no scan has produced a handle for
    #[error("no device handle for id {0}")]
    UnknownDevice(String),

    /// The connect attempt did not resolve within its bounded timeout
    #[error("connect attempt timed out")]
    ConnectTimeout,

    /// Error reported by the underlying Bluetooth stack
    #[error("bluetooth error: {0}")]
    Backend(#[from] bluest::Error),
}

/// Errors from the bonded-device store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed bond record: {0}")]
    Malformed(#[from] serde_json::Error),
}
