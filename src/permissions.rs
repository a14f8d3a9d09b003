//! Runtime capability gate.
//!
//! The controller asks for every capability it needs before doing any
//! automated work; a single denial is a hard stop with a user-visible
//! reason until the user retries an action.

use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Capability {
    Scan,
    Connect,
    Location,
    Notify,
}

/// Capabilities the presence controller requires
pub const REQUIRED_CAPABILITIES: [Capability; 4] = [
    Capability::Scan,
    Capability::Connect,
    Capability::Location,
    Capability::Notify,
];

#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// Request the given capabilities; returns those that were denied.
    async fn request(&self, capabilities: &[Capability]) -> Vec<Capability>;
}

/// Desktop hosts have no runtime permission prompts; every capability is
/// implicitly granted and radio availability is checked separately when
/// the adapter is opened.
#[derive(Debug, Default)]
pub struct HostPermissionGate;

#[async_trait]
impl PermissionGate for HostPermissionGate {
    async fn request(&self, _capabilities: &[Capability]) -> Vec<Capability> {
        Vec::new()
    }
}
