//! The narrow interface the core drives the signaling stack through
//!
//! The protocol implementation - transport handling, REGISTER refresh,
//! SDP negotiation, retry/backoff - lives behind [`SignalingUserAgent`];
//! the core only issues commands and consumes [`SignalingEvent`]s delivered
//! over an mpsc channel the adapter writes to. This keeps the core
//! constructible in tests without a network stack.

use async_trait::async_trait;

use crate::call::SessionId;
use crate::error::SoftphoneResult;
use crate::media::MediaStream;
use crate::registration::RegistrationConfig;

/// A session offered by the remote side
#[derive(Debug, Clone)]
pub struct IncomingSessionOffer {
    /// The adapter's identifier for the offered session
    pub session_id: SessionId,
    /// Number of the calling party
    pub remote_number: String,
    /// Display name of the calling party, if the signaling carried one
    pub remote_name: Option<String>,
}

/// Events the signaling adapter reports to the core
#[derive(Debug, Clone)]
pub enum SignalingEvent {
    /// The persistent transport came up
    TransportConnected,
    /// The persistent transport dropped
    TransportDisconnected,
    /// The identity registered successfully
    Registered,
    /// The identity unregistered
    Unregistered,
    /// A registration attempt failed; the adapter keeps retrying on its own
    RegistrationFailed { reason: String },
    /// The remote side offered a new session
    IncomingSession { offer: IncomingSessionOffer },
    /// The remote side accepted a session we originated
    SessionAccepted { session_id: SessionId },
    /// The session ended (remote hangup or adapter-side teardown)
    SessionTerminated { session_id: SessionId },
    /// The session could not be established or broke down
    SessionFailed {
        session_id: SessionId,
        cause: String,
        message: String,
    },
    /// Negotiation surfaced the remote audio stream
    RemoteMedia {
        session_id: SessionId,
        stream: MediaStream,
    },
}

/// Driving interface of the signaling stack
///
/// Outgoing session identifiers are allocated by the core and passed to
/// [`invite`](SignalingUserAgent::invite); the adapter maps them onto its
/// protocol handles and uses them in every event it reports back.
#[async_trait]
pub trait SignalingUserAgent: Send + Sync {
    /// Open the transport and begin registering the identity. Connection and
    /// registration outcomes are reported through [`SignalingEvent`]s, not
    /// through the returned future.
    async fn start(&self, registration: RegistrationConfig) -> SoftphoneResult<()>;

    /// Originate a session toward `target`, binding `local` into the
    /// negotiation.
    async fn invite(
        &self,
        session_id: &SessionId,
        target: &str,
        local: MediaStream,
    ) -> SoftphoneResult<()>;

    /// Accept a previously offered incoming session, binding `local` into
    /// the negotiation.
    async fn accept(&self, session_id: &SessionId, local: MediaStream) -> SoftphoneResult<()>;

    /// Terminate a session in any state. Terminating an unknown or already
    /// dead session must be a no-op.
    async fn terminate(&self, session_id: &SessionId) -> SoftphoneResult<()>;

    /// Send one in-band DTMF tone on an established session
    async fn send_dtmf(&self, session_id: &SessionId, tone: char) -> SoftphoneResult<()>;

    /// Close the transport and drop all protocol state
    async fn stop(&self);
}
