//! Error types for the softphone core
//!
//! Errors are grouped the way callers recover from them:
//!
//! - **Misuse errors** (`NotRegistered`, `AlreadyInCall`, `NoIncomingCall`) -
//!   synchronous rejections that mutate no state; check state first.
//! - **Media errors** - permission denial or device absence; these abort the
//!   in-flight `call`/`answer` and force the session to an ended state.
//! - **Setup/termination errors** - the signaling layer refused an operation;
//!   reported once, never retried by this core.
//! - **Configuration errors** - can't recover without fixing the config.
//!
//! Transport problems (disconnects, registration failures) never surface
//! here; they are reported through [`crate::events::SoftphoneEvent`] and are
//! recoverable by the signaling layer's own behavior.

use thiserror::Error;

use crate::media::MediaError;

/// Result type alias for softphone-core operations
pub type SoftphoneResult<T> = Result<T, SoftphoneError>;

/// Error types for softphone operations
#[derive(Error, Debug, Clone)]
pub enum SoftphoneError {
    #[error("not registered with the signaling server")]
    NotRegistered,

    #[error("already in a call")]
    AlreadyInCall,

    #[error("no incoming call to answer")]
    NoIncomingCall,

    #[error("call setup failed: {reason}")]
    CallSetupFailed { reason: String },

    #[error("call terminated: {reason}")]
    CallTerminated { reason: String },

    /// Local media could not be acquired
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("invalid configuration: {field} - {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("signaling transport failed: {reason}")]
    TransportFailed { reason: String },

    #[error("softphone core has been destroyed")]
    Destroyed,

    #[error("internal error: {message}")]
    InternalError { message: String },
}

impl SoftphoneError {
    /// Create a call setup failed error
    pub fn call_setup_failed(reason: impl Into<String>) -> Self {
        Self::CallSetupFailed { reason: reason.into() }
    }

    /// Create a call terminated error
    pub fn call_terminated(reason: impl Into<String>) -> Self {
        Self::CallTerminated { reason: reason.into() }
    }

    /// Create an invalid configuration error
    pub fn invalid_configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration { field: field.into(), reason: reason.into() }
    }

    /// Create a transport failed error
    pub fn transport_failed(reason: impl Into<String>) -> Self {
        Self::TransportFailed { reason: reason.into() }
    }

    /// Create an internal error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError { message: message.into() }
    }

    /// Check if this error is a synchronous misuse rejection (no state was
    /// mutated, the caller should check state before retrying)
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            SoftphoneError::NotRegistered
                | SoftphoneError::AlreadyInCall
                | SoftphoneError::NoIncomingCall
        )
    }

    /// Check if this error came from local media acquisition
    pub fn is_media_error(&self) -> bool {
        matches!(self, SoftphoneError::Media(_))
    }

    /// Get error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            SoftphoneError::NotRegistered => "registration",

            SoftphoneError::AlreadyInCall
            | SoftphoneError::NoIncomingCall
            | SoftphoneError::CallSetupFailed { .. }
            | SoftphoneError::CallTerminated { .. } => "call",

            SoftphoneError::Media(_) => "media",

            SoftphoneError::InvalidConfiguration { .. } => "configuration",

            SoftphoneError::TransportFailed { .. } => "transport",

            SoftphoneError::Destroyed | SoftphoneError::InternalError { .. } => "system",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn misuse_errors_are_flagged() {
        assert!(SoftphoneError::NotRegistered.is_misuse());
        assert!(SoftphoneError::AlreadyInCall.is_misuse());
        assert!(SoftphoneError::NoIncomingCall.is_misuse());
        assert!(!SoftphoneError::call_setup_failed("busy").is_misuse());
    }

    #[test]
    fn media_errors_convert_and_categorize() {
        let err: SoftphoneError = MediaError::PermissionDenied.into();
        assert!(err.is_media_error());
        assert_eq!(err.category(), "media");
        assert_eq!(SoftphoneError::NotRegistered.category(), "registration");
        assert_eq!(
            SoftphoneError::invalid_configuration("domain", "empty").category(),
            "configuration"
        );
    }
}
