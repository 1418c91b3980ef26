//! The softphone manager: state machine core and signaling event loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock as StdRwLock, Weak};

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::call::{CallDirection, CallInfo, CallState, SessionId};
use crate::config::{DisconnectPolicy, SoftphoneConfig};
use crate::error::{SoftphoneError, SoftphoneResult};
use crate::events::{CallFailure, EventBus, SoftphoneEvent};
use crate::media::MediaPipeline;
use crate::registration::{
    RegistrationConfig, RegistrationInfo, RegistrationStatus, TransportState,
};
use crate::signaling::{IncomingSessionOffer, SignalingEvent, SignalingUserAgent};

/// The single call slot.
///
/// `next_epoch` numbers slot occupancies, so a command resuming from an
/// await can tell whether the call it started working on is still the
/// current one.
#[derive(Debug, Default)]
pub(crate) struct CallSlot {
    pub(crate) next_epoch: u64,
    pub(crate) call: Option<ActiveCall>,
}

impl CallSlot {
    pub(crate) fn allocate_epoch(&mut self) -> u64 {
        self.next_epoch += 1;
        self.next_epoch
    }

    /// The active call, only if it is still the occupancy `epoch` refers to
    pub(crate) fn call_at(&mut self, epoch: u64) -> Option<&mut ActiveCall> {
        self.call.as_mut().filter(|c| c.epoch == epoch)
    }
}

#[derive(Debug)]
pub(crate) struct ActiveCall {
    pub(crate) epoch: u64,
    pub(crate) info: CallInfo,
    /// The session exists at the signaling layer (originated or offered)
    pub(crate) signaled: bool,
    /// A hangup arrived while origination was still acquiring media
    pub(crate) cancelled: bool,
    /// An answer is in flight (acquiring media)
    pub(crate) answering: bool,
}

/// How a call left the slot
pub(crate) enum EndKind {
    /// Local hangup (including cancellation before origination)
    Local,
    /// Remote hangup or adapter-side teardown
    Remote,
    /// Media, negotiation or transport-policy failure
    Failed { cause: String, message: String },
}

/// Coordinates registration, the single-call state machine and media
/// mediation; the sole owner of the active call.
pub struct SoftphoneManager {
    pub(crate) config: SoftphoneConfig,
    pub(crate) ua: Arc<dyn SignalingUserAgent>,
    pub(crate) media: MediaPipeline,
    pub(crate) events: Arc<EventBus>,
    pub(crate) slot: Mutex<CallSlot>,
    registration: StdRwLock<RegistrationInfo>,
    initialized: AtomicBool,
    destroyed: AtomicBool,
    me: Weak<SoftphoneManager>,
    signaling_rx: StdMutex<Option<mpsc::Receiver<SignalingEvent>>>,
    loop_handle: StdMutex<Option<tokio::task::JoinHandle<()>>>,
}

impl SoftphoneManager {
    pub(crate) fn new(
        config: SoftphoneConfig,
        ua: Arc<dyn SignalingUserAgent>,
        media: MediaPipeline,
        signaling_rx: mpsc::Receiver<SignalingEvent>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            config,
            ua,
            media,
            events: Arc::new(EventBus::new()),
            slot: Mutex::new(CallSlot::default()),
            registration: StdRwLock::new(RegistrationInfo::default()),
            initialized: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            me: me.clone(),
            signaling_rx: StdMutex::new(Some(signaling_rx)),
            loop_handle: StdMutex::new(None),
        })
    }

    /// Open the signaling transport and begin registering the identity.
    ///
    /// Fails synchronously if no transport URL can be constructed from the
    /// configured domain; connection and registration outcomes arrive as
    /// events afterwards.
    pub async fn initialize(&self) -> SoftphoneResult<()> {
        self.ensure_live()?;
        let url = self.config.transport_url()?;

        if self.initialized.swap(true, Ordering::SeqCst) {
            warn!("softphone core already initialized");
            return Ok(());
        }

        let Some(mut rx) = self.signaling_rx.lock().unwrap().take() else {
            return Err(SoftphoneError::internal_error(
                "signaling event channel already consumed",
            ));
        };
        let Some(manager) = self.me.upgrade() else {
            return Err(SoftphoneError::internal_error("manager already dropped"));
        };

        info!(uri = %self.config.uri(), transport = %url, "initializing softphone core");
        self.registration.write().unwrap().transport = TransportState::Connecting;

        if let Err(e) = self.ua.start(self.registration_config()).await {
            self.registration.write().unwrap().transport = TransportState::Disconnected;
            self.initialized.store(false, Ordering::SeqCst);
            *self.signaling_rx.lock().unwrap() = Some(rx);
            return Err(e);
        }

        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                manager.handle_signaling_event(event).await;
            }
            debug!("signaling event channel closed");
        });
        *self.loop_handle.lock().unwrap() = Some(handle);

        Ok(())
    }

    /// Terminate any active session, release all media, stop the adapter
    /// and drop every subscription. Idempotent.
    pub async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("destroying softphone core");

        {
            let mut slot = self.slot.lock().await;
            if let Some(call) = slot.call.take() {
                if call.signaled {
                    if let Err(e) = self.ua.terminate(&call.info.session_id).await {
                        warn!(error = %e, "terminate during destroy failed");
                    }
                }
            }
            self.media.release();
        }

        self.ua.stop().await;

        if let Some(handle) = self.loop_handle.lock().unwrap().take() {
            handle.abort();
        }
        self.events.clear();
        *self.registration.write().unwrap() = RegistrationInfo::default();
    }

    /// The event bus consumers subscribe on
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// True while the identity is registered
    pub fn is_registered(&self) -> bool {
        self.registration.read().unwrap().status.is_active()
    }

    /// True while the signaling transport is up
    pub fn is_connected(&self) -> bool {
        self.registration.read().unwrap().transport.is_connected()
    }

    /// Snapshot of registration progress
    pub fn registration_info(&self) -> RegistrationInfo {
        self.registration.read().unwrap().clone()
    }

    /// The active call, if any
    pub async fn current_call(&self) -> Option<CallInfo> {
        self.slot.lock().await.call.as_ref().map(|c| c.info.clone())
    }

    /// True while the local microphone is muted
    pub fn is_muted(&self) -> bool {
        self.media.is_muted()
    }

    pub(crate) fn ensure_live(&self) -> SoftphoneResult<()> {
        if self.destroyed.load(Ordering::SeqCst) {
            Err(SoftphoneError::Destroyed)
        } else {
            Ok(())
        }
    }

    fn registration_config(&self) -> RegistrationConfig {
        RegistrationConfig {
            uri: self.config.uri(),
            username: self.config.identity.clone(),
            password: self.config.credential.clone(),
            display_name: self.config.effective_display_name().to_string(),
            user_agent: self.config.user_agent.clone(),
            expires: self.config.register_expires,
        }
    }

    /// Take the active call out of the slot, run the one cleanup path
    /// (finalize, release media, detach sink) and produce the event to emit.
    ///
    /// Every transition into the ended state funnels through here.
    pub(crate) fn end_active(&self, slot: &mut CallSlot, kind: EndKind) -> Option<SoftphoneEvent> {
        let mut call = slot.call.take()?;
        self.media.release();
        call.info.finalize(Utc::now());
        info!(
            session_id = %call.info.session_id,
            duration = call.info.duration.unwrap_or(0),
            "call ended"
        );
        Some(match kind {
            EndKind::Local | EndKind::Remote => SoftphoneEvent::CallEnded(call.info),
            EndKind::Failed { cause, message } => {
                SoftphoneEvent::CallFailed(CallFailure { cause, message })
            }
        })
    }

    pub(crate) async fn handle_signaling_event(&self, event: SignalingEvent) {
        match event {
            SignalingEvent::TransportConnected => {
                self.registration.write().unwrap().transport = TransportState::Connected;
                info!("signaling transport connected");
                self.events.emit(SoftphoneEvent::Connected);
            }
            SignalingEvent::TransportDisconnected => {
                self.registration.write().unwrap().transport = TransportState::Disconnected;
                warn!("signaling transport disconnected");
                self.events.emit(SoftphoneEvent::Disconnected);
                if self.config.disconnect_policy == DisconnectPolicy::EndCall {
                    self.end_call_on_transport_loss().await;
                }
            }
            SignalingEvent::Registered => {
                {
                    let mut reg = self.registration.write().unwrap();
                    reg.status = RegistrationStatus::Registered;
                    reg.registered_at = Some(Utc::now());
                    reg.last_error = None;
                }
                info!("registered with signaling server");
                self.events.emit(SoftphoneEvent::Registered);
            }
            SignalingEvent::Unregistered => {
                self.registration.write().unwrap().status = RegistrationStatus::Unregistered;
                info!("unregistered from signaling server");
                self.events.emit(SoftphoneEvent::Unregistered);
            }
            SignalingEvent::RegistrationFailed { reason } => {
                {
                    let mut reg = self.registration.write().unwrap();
                    reg.status = RegistrationStatus::Unregistered;
                    reg.last_error = Some(reason.clone());
                }
                warn!(reason = %reason, "registration failed");
                self.events.emit(SoftphoneEvent::RegistrationFailed { reason });
            }
            SignalingEvent::IncomingSession { offer } => {
                self.handle_incoming_session(offer).await;
            }
            SignalingEvent::SessionAccepted { session_id } => {
                self.handle_session_accepted(session_id).await;
            }
            SignalingEvent::SessionTerminated { session_id } => {
                self.handle_session_terminated(session_id).await;
            }
            SignalingEvent::SessionFailed { session_id, cause, message } => {
                self.handle_session_failed(session_id, cause, message).await;
            }
            SignalingEvent::RemoteMedia { session_id, stream } => {
                let slot = self.slot.lock().await;
                match slot.call.as_ref() {
                    Some(call) if call.info.session_id == session_id => {
                        self.media.play_remote(stream);
                    }
                    _ => {
                        debug!(session_id = %session_id, "remote media for a dead session, dropping");
                        stream.stop_all();
                    }
                }
            }
        }
    }

    async fn handle_incoming_session(&self, offer: IncomingSessionOffer) {
        let mut slot = self.slot.lock().await;

        // Single-call policy: a second inbound session is terminated
        // immediately and never announced.
        if slot.call.is_some() {
            debug!(
                session_id = %offer.session_id,
                "already in a call, terminating new incoming session"
            );
            if let Err(e) = self.ua.terminate(&offer.session_id).await {
                warn!(error = %e, "failed to terminate surplus incoming session");
            }
            return;
        }

        let epoch = slot.allocate_epoch();
        let remote_name = offer
            .remote_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| offer.remote_number.clone());
        let info = CallInfo {
            session_id: offer.session_id,
            remote_number: offer.remote_number,
            remote_name,
            direction: CallDirection::Incoming,
            status: CallState::Ringing,
            start_time: None,
            duration: None,
        };
        info!(
            session_id = %info.session_id,
            remote = %info.remote_number,
            "incoming call"
        );
        slot.call = Some(ActiveCall {
            epoch,
            info: info.clone(),
            signaled: true,
            cancelled: false,
            answering: false,
        });
        self.events.emit(SoftphoneEvent::IncomingCall(info));
    }

    async fn handle_session_accepted(&self, session_id: SessionId) {
        let mut slot = self.slot.lock().await;
        let Some(call) = slot.call.as_mut().filter(|c| c.info.session_id == session_id) else {
            debug!(session_id = %session_id, "accept for a dead session, ignoring");
            return;
        };
        if call.info.status != CallState::Connecting {
            // Answered incoming calls transition when `accept` returns; a
            // duplicate report from the adapter lands here.
            debug!(session_id = %session_id, status = ?call.info.status, "ignoring accept");
            return;
        }
        call.info.status = CallState::Connected;
        call.info.start_time = Some(Utc::now());
        info!(session_id = %session_id, "call connected");
        let info = call.info.clone();
        self.events.emit(SoftphoneEvent::CallConnected(info));
    }

    async fn handle_session_terminated(&self, session_id: SessionId) {
        let mut slot = self.slot.lock().await;
        let matches = slot
            .call
            .as_ref()
            .map(|c| c.info.session_id == session_id)
            .unwrap_or(false);
        if !matches {
            debug!(session_id = %session_id, "termination for a dead session, ignoring");
            return;
        }
        if let Some(event) = self.end_active(&mut slot, EndKind::Remote) {
            self.events.emit(event);
        }
    }

    async fn handle_session_failed(&self, session_id: SessionId, cause: String, message: String) {
        let mut slot = self.slot.lock().await;
        let matches = slot
            .call
            .as_ref()
            .map(|c| c.info.session_id == session_id)
            .unwrap_or(false);
        if !matches {
            debug!(session_id = %session_id, cause = %cause, "failure for a dead session, ignoring");
            return;
        }
        warn!(session_id = %session_id, cause = %cause, message = %message, "call failed");
        if let Some(event) = self.end_active(&mut slot, EndKind::Failed { cause, message }) {
            self.events.emit(event);
        }
    }

    async fn end_call_on_transport_loss(&self) {
        let mut slot = self.slot.lock().await;
        let Some(call) = slot.call.as_ref() else {
            return;
        };
        let session_id = call.info.session_id.clone();
        let signaled = call.signaled;
        warn!(session_id = %session_id, "ending active call on transport loss");
        if signaled {
            if let Err(e) = self.ua.terminate(&session_id).await {
                debug!(error = %e, "terminate after transport loss failed");
            }
        }
        if let Some(event) = self.end_active(
            &mut slot,
            EndKind::Failed {
                cause: "transport".to_string(),
                message: "signaling transport lost".to_string(),
            },
        ) {
            self.events.emit(event);
        }
    }
}
