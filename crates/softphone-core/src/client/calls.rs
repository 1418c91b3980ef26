//! Call operations for the softphone manager
//!
//! Making, answering and hanging up calls. Every operation re-checks the
//! call slot after each await: the media acquisition suspension point may
//! be overtaken by a hangup or a remote termination, in which case whatever
//! was acquired is released instead of bound to the departed session.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::call::{CallDirection, CallInfo, CallState, SessionId};
use crate::error::{SoftphoneError, SoftphoneResult};
use crate::events::SoftphoneEvent;

use super::manager::{ActiveCall, EndKind, SoftphoneManager};

impl SoftphoneManager {
    /// Originate a call to `number`.
    ///
    /// Requires a registered identity and an idle call slot; acquires the
    /// local microphone before origination and emits
    /// [`SoftphoneEvent::OutgoingCall`] once the session is signaled.
    pub async fn call(&self, number: &str) -> SoftphoneResult<()> {
        self.ensure_live()?;
        if !self.is_registered() {
            return Err(SoftphoneError::NotRegistered);
        }

        let (epoch, session_id) = {
            let mut slot = self.slot.lock().await;
            if slot.call.is_some() {
                return Err(SoftphoneError::AlreadyInCall);
            }
            let epoch = slot.allocate_epoch();
            let session_id = SessionId::new();
            let info = CallInfo {
                session_id: session_id.clone(),
                remote_number: number.to_string(),
                remote_name: number.to_string(),
                direction: CallDirection::Outgoing,
                status: CallState::Connecting,
                start_time: None,
                duration: None,
            };
            slot.call = Some(ActiveCall {
                epoch,
                info,
                signaled: false,
                cancelled: false,
                answering: false,
            });
            (epoch, session_id)
        };
        info!(number = %number, session_id = %session_id, "placing outgoing call");

        // The slot is reserved but unlocked while the microphone is acquired,
        // so a hangup can arrive and mark the occupancy cancelled.
        let stream = match self.media.acquire_local_audio().await {
            Ok(stream) => stream,
            Err(e) => {
                let mut slot = self.slot.lock().await;
                if let Some(call) = slot.call_at(epoch) {
                    let cancelled = call.cancelled;
                    let kind = if cancelled {
                        EndKind::Local
                    } else {
                        EndKind::Failed { cause: "media".to_string(), message: e.to_string() }
                    };
                    if let Some(event) = self.end_active(&mut slot, kind) {
                        self.events.emit(event);
                    }
                    if cancelled {
                        return Ok(());
                    }
                }
                warn!(error = %e, "microphone acquisition failed");
                return Err(e.into());
            }
        };

        let mut slot = self.slot.lock().await;
        let cancelled = match slot.call_at(epoch) {
            Some(call) => call.cancelled,
            None => {
                debug!(session_id = %session_id, "call ended during media acquisition, discarding stream");
                stream.stop_all();
                return Ok(());
            }
        };
        if cancelled {
            stream.stop_all();
            if let Some(event) = self.end_active(&mut slot, EndKind::Local) {
                self.events.emit(event);
            }
            return Ok(());
        }

        self.media.adopt(stream.clone());
        match self.ua.invite(&session_id, number, stream).await {
            Ok(()) => {
                if let Some(call) = slot.call_at(epoch) {
                    call.signaled = true;
                    let info = call.info.clone();
                    self.events.emit(SoftphoneEvent::OutgoingCall(info));
                }
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, session_id = %session_id, "origination failed");
                if let Some(event) = self.end_active(
                    &mut slot,
                    EndKind::Failed { cause: "signaling".to_string(), message: e.to_string() },
                ) {
                    self.events.emit(event);
                }
                Err(SoftphoneError::call_setup_failed(e.to_string()))
            }
        }
    }

    /// Answer the ringing incoming call.
    ///
    /// Acquires the local microphone first; an acquisition failure aborts
    /// the answer, terminates the session and reports
    /// [`SoftphoneEvent::CallFailed`] with a media cause.
    pub async fn answer(&self) -> SoftphoneResult<()> {
        self.ensure_live()?;

        let (epoch, session_id) = {
            let mut slot = self.slot.lock().await;
            match slot.call.as_mut() {
                Some(call) if call.info.status == CallState::Ringing && !call.answering => {
                    call.answering = true;
                    (call.epoch, call.info.session_id.clone())
                }
                _ => return Err(SoftphoneError::NoIncomingCall),
            }
        };
        info!(session_id = %session_id, "answering call");

        let stream = match self.media.acquire_local_audio().await {
            Ok(stream) => stream,
            Err(e) => {
                let mut slot = self.slot.lock().await;
                if slot.call_at(epoch).is_some() {
                    if let Err(te) = self.ua.terminate(&session_id).await {
                        debug!(error = %te, "terminate after media failure also failed");
                    }
                    if let Some(event) = self.end_active(
                        &mut slot,
                        EndKind::Failed { cause: "media".to_string(), message: e.to_string() },
                    ) {
                        self.events.emit(event);
                    }
                }
                warn!(error = %e, session_id = %session_id, "microphone acquisition failed during answer");
                return Err(e.into());
            }
        };

        let mut slot = self.slot.lock().await;
        if slot.call_at(epoch).is_none() {
            debug!(session_id = %session_id, "call ended during media acquisition, discarding stream");
            stream.stop_all();
            return Ok(());
        }

        self.media.adopt(stream.clone());
        match self.ua.accept(&session_id, stream).await {
            Ok(()) => {
                if let Some(call) = slot.call_at(epoch) {
                    call.answering = false;
                    call.info.status = CallState::Connected;
                    call.info.start_time = Some(Utc::now());
                    let info = call.info.clone();
                    info!(session_id = %session_id, "call connected");
                    self.events.emit(SoftphoneEvent::CallConnected(info));
                }
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, session_id = %session_id, "accept failed");
                if let Err(te) = self.ua.terminate(&session_id).await {
                    debug!(error = %te, "terminate after accept failure also failed");
                }
                if let Some(event) = self.end_active(
                    &mut slot,
                    EndKind::Failed { cause: "signaling".to_string(), message: e.to_string() },
                ) {
                    self.events.emit(event);
                }
                Err(SoftphoneError::call_setup_failed(e.to_string()))
            }
        }
    }

    /// Hang up the active call. Always safe: a no-op when idle, and
    /// idempotent - one call produces exactly one
    /// [`SoftphoneEvent::CallEnded`].
    pub async fn hangup(&self) {
        let mut slot = self.slot.lock().await;
        let Some(call) = slot.call.as_mut() else {
            debug!("hangup with no active call");
            return;
        };

        if !call.signaled {
            // Origination is still acquiring media; mark the occupancy so
            // the resuming `call` ends it instead of binding the stream.
            if !call.cancelled {
                call.cancelled = true;
                debug!(session_id = %call.info.session_id, "hangup before origination, cancelling pending call");
            }
            return;
        }

        let session_id = call.info.session_id.clone();
        info!(session_id = %session_id, "hanging up");
        if let Err(e) = self.ua.terminate(&session_id).await {
            warn!(error = %e, session_id = %session_id, "terminate failed during hangup");
        }
        if let Some(event) = self.end_active(&mut slot, EndKind::Local) {
            self.events.emit(event);
        }
    }
}
