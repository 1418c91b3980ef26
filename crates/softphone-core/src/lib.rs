//! Softphone-core: call session coordination for the agent workbench
//!
//! This crate registers a softphone identity against a SIP signaling endpoint,
//! originates and receives calls under a strict single-concurrent-call policy,
//! mediates local and remote audio resources, and publishes a small typed
//! event contract that higher layers (status bars, call panels, incoming-call
//! prompts) observe and drive.
//!
//! ## Layer separation
//! ```text
//! UI surfaces -> CallContext -> SoftphoneManager -> {SignalingUserAgent, AudioInput, MediaSink}
//! ```
//!
//! The protocol stack and the host media environment sit *behind* the three
//! capability traits on the right; this crate owns everything in between:
//! - Registration and transport lifecycle tracking
//! - The call state machine and its resource-cleanup guarantees
//! - Local capture / remote playback mediation
//! - Typed event publication for UI integration

pub mod call;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod media;
pub mod registration;
pub mod signaling;

// Public API exports
pub use call::{CallDirection, CallInfo, CallState, SessionId};
pub use client::{CallContext, SoftphoneBuilder, SoftphoneManager};
pub use config::{DisconnectPolicy, SoftphoneConfig};
pub use error::{SoftphoneError, SoftphoneResult};
pub use events::{CallFailure, EventBus, EventKind, SoftphoneEvent, SubscriberId};
pub use media::{AudioInput, AudioTrack, MediaError, MediaSink, MediaStream};
pub use registration::{
    RegistrationConfig, RegistrationInfo, RegistrationStatus, TransportState,
};
pub use signaling::{IncomingSessionOffer, SignalingEvent, SignalingUserAgent};

/// Softphone-core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
