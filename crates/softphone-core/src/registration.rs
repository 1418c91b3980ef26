//! Registration and transport state
//!
//! The actual REGISTER traffic, refresh timers and retry/backoff live in the
//! signaling adapter; this module only holds the state the core tracks from
//! the adapter's reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of the persistent signaling transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportState {
    /// No transport, or the transport dropped
    Disconnected,
    /// Transport is being established
    Connecting,
    /// Transport is up
    Connected,
}

impl TransportState {
    pub fn is_connected(&self) -> bool {
        matches!(self, TransportState::Connected)
    }
}

/// Registration state of the softphone identity, orthogonal to transport
/// state (though registration can only succeed while connected).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationStatus {
    Unregistered,
    Registered,
}

impl RegistrationStatus {
    /// Check if registration is active
    pub fn is_active(&self) -> bool {
        matches!(self, RegistrationStatus::Registered)
    }
}

/// Everything the signaling adapter needs to register the identity
#[derive(Debug, Clone)]
pub struct RegistrationConfig {
    /// Address of record, e.g. `sip:2001@sip.example.com`
    pub uri: String,
    /// Authentication username
    pub username: String,
    /// Authentication password
    pub password: String,
    /// Display name
    pub display_name: String,
    /// User agent string
    pub user_agent: String,
    /// Registration expiration time (seconds)
    pub expires: u32,
}

/// Snapshot of registration progress kept by the manager
#[derive(Debug, Clone)]
pub struct RegistrationInfo {
    /// Current registration status
    pub status: RegistrationStatus,
    /// Current transport state
    pub transport: TransportState,
    /// When the identity last registered successfully
    pub registered_at: Option<DateTime<Utc>>,
    /// Last registration failure reason (if any)
    pub last_error: Option<String>,
}

impl Default for RegistrationInfo {
    fn default() -> Self {
        Self {
            status: RegistrationStatus::Unregistered,
            transport: TransportState::Disconnected,
            registered_at: None,
            last_error: None,
        }
    }
}
