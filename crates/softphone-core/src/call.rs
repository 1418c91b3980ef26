//! Call-level data types
//!
//! A call is described by exactly one [`CallInfo`]; the session controller
//! owns it for the lifetime of the underlying signaling session and destroys
//! it the instant the call ends. No history is retained by this crate.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of the underlying signaling session, valid only while
/// the session exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Allocate a fresh session identifier (used for outgoing sessions; the
    /// signaling adapter maps it onto its own protocol handle).
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current state of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallState {
    /// Incoming call, not yet answered
    Ringing,
    /// Outgoing call, not yet accepted by the remote party
    Connecting,
    /// Call is established and media is flowing
    Connected,
    /// Call has ended (terminal)
    Ended,
}

impl CallState {
    /// Check if the call is in an active state (can send/receive media)
    pub fn is_active(&self) -> bool {
        matches!(self, CallState::Connected)
    }

    /// Check if the call is in a terminated state
    pub fn is_terminated(&self) -> bool {
        matches!(self, CallState::Ended)
    }
}

/// Direction of a call (from the softphone's perspective)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallDirection {
    /// Received from the network
    Incoming,
    /// Initiated locally
    Outgoing,
}

/// Information about a call
///
/// Serialized with camelCase field names; the workbench UI consumes these
/// payloads directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallInfo {
    /// Identifier of the underlying signaling session
    pub session_id: SessionId,
    /// Number of the other party
    pub remote_number: String,
    /// Display name of the other party (falls back to the number)
    pub remote_name: String,
    /// Direction, fixed at creation
    pub direction: CallDirection,
    /// Current state of the call
    pub status: CallState,
    /// When the call was connected (if it ever was)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// Whole seconds on the call, computed only when the call ends; absent
    /// if the call never connected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

impl CallInfo {
    /// Transition into the terminal state, computing the duration from the
    /// connect time if the call ever connected.
    pub(crate) fn finalize(&mut self, ended_at: DateTime<Utc>) {
        self.status = CallState::Ended;
        self.duration = self.start_time.map(|start| elapsed_secs(start, ended_at));
    }
}

/// Whole seconds between connect and end, clamped at zero.
fn elapsed_secs(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    (end - start).num_seconds().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn call(start_time: Option<DateTime<Utc>>) -> CallInfo {
        CallInfo {
            session_id: SessionId("abc123".into()),
            remote_number: "1000".into(),
            remote_name: "Alice".into(),
            direction: CallDirection::Outgoing,
            status: CallState::Connected,
            start_time,
            duration: None,
        }
    }

    #[test]
    fn duration_is_whole_seconds_between_connect_and_end() {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let t1 = t0 + chrono::Duration::milliseconds(7_400);

        let mut info = call(Some(t0));
        info.finalize(t1);

        assert_eq!(info.status, CallState::Ended);
        assert_eq!(info.duration, Some(7));
    }

    #[test]
    fn duration_is_absent_when_never_connected() {
        let mut info = call(None);
        info.finalize(Utc::now());
        assert_eq!(info.duration, None);
    }

    #[test]
    fn serializes_camel_case_for_the_ui() {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut info = call(Some(t0));
        info.finalize(t0 + chrono::Duration::seconds(3));

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["sessionId"], "abc123");
        assert_eq!(json["remoteNumber"], "1000");
        assert_eq!(json["remoteName"], "Alice");
        assert_eq!(json["direction"], "outgoing");
        assert_eq!(json["status"], "ended");
        assert_eq!(json["duration"], 3);
    }

    #[test]
    fn state_predicates() {
        assert!(CallState::Connected.is_active());
        assert!(!CallState::Ringing.is_active());
        assert!(CallState::Ended.is_terminated());
        assert!(!CallState::Connecting.is_terminated());
    }
}
