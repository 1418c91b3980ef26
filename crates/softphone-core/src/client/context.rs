//! Consumer-facing call orchestration façade
//!
//! [`CallContext`] is the adapter UI surfaces talk to: it projects event-bus
//! activity into simple observable state (`current_call`, `incoming_call`,
//! registration/connectivity flags) and wraps the manager's verbs so that no
//! failure ever crosses the boundary unreported. It performs no state
//! transitions of its own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::warn;

use crate::call::CallInfo;
use crate::error::SoftphoneResult;
use crate::events::{SoftphoneEvent, SubscriberId};

use super::manager::SoftphoneManager;

#[derive(Default)]
struct ContextState {
    current_call: RwLock<Option<CallInfo>>,
    incoming_call: RwLock<Option<CallInfo>>,
    registered: AtomicBool,
    connected: AtomicBool,
    last_error: RwLock<Option<String>>,
}

impl ContextState {
    fn apply(&self, event: &SoftphoneEvent) {
        match event {
            SoftphoneEvent::Registered => {
                self.registered.store(true, Ordering::SeqCst);
            }
            SoftphoneEvent::Unregistered => {
                self.registered.store(false, Ordering::SeqCst);
            }
            SoftphoneEvent::RegistrationFailed { reason } => {
                self.registered.store(false, Ordering::SeqCst);
                *self.last_error.write().unwrap() = Some(reason.clone());
            }
            SoftphoneEvent::Connected => {
                self.connected.store(true, Ordering::SeqCst);
            }
            SoftphoneEvent::Disconnected => {
                self.connected.store(false, Ordering::SeqCst);
            }
            SoftphoneEvent::IncomingCall(info) => {
                *self.incoming_call.write().unwrap() = Some(info.clone());
                *self.current_call.write().unwrap() = Some(info.clone());
            }
            SoftphoneEvent::OutgoingCall(info) => {
                *self.current_call.write().unwrap() = Some(info.clone());
            }
            SoftphoneEvent::CallConnected(info) => {
                *self.current_call.write().unwrap() = Some(info.clone());
                *self.incoming_call.write().unwrap() = None;
            }
            SoftphoneEvent::CallEnded(_) => {
                *self.current_call.write().unwrap() = None;
                *self.incoming_call.write().unwrap() = None;
            }
            SoftphoneEvent::CallFailed(failure) => {
                *self.current_call.write().unwrap() = None;
                *self.incoming_call.write().unwrap() = None;
                *self.last_error.write().unwrap() = Some(failure.message.clone());
            }
        }
    }
}

/// Observable projection of the softphone plus never-panicking verbs
pub struct CallContext {
    manager: Arc<SoftphoneManager>,
    state: Arc<ContextState>,
    subscription: SubscriberId,
}

impl CallContext {
    /// Create a context subscribed to the manager's event bus
    pub fn new(manager: Arc<SoftphoneManager>) -> Self {
        let state = Arc::new(ContextState::default());
        let observer = state.clone();
        let subscription = manager
            .event_bus()
            .subscribe_all(move |event| observer.apply(event));
        Self { manager, state, subscription }
    }

    /// The call currently occupying the slot, as last observed
    pub fn current_call(&self) -> Option<CallInfo> {
        self.state.current_call.read().unwrap().clone()
    }

    /// The ringing incoming call, as last observed
    pub fn incoming_call(&self) -> Option<CallInfo> {
        self.state.incoming_call.read().unwrap().clone()
    }

    pub fn is_registered(&self) -> bool {
        self.state.registered.load(Ordering::SeqCst)
    }

    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }

    /// The most recently reported failure, if any
    pub fn last_error(&self) -> Option<String> {
        self.state.last_error.read().unwrap().clone()
    }

    /// Originate a call; a failure is recorded in `last_error` and the
    /// observable state stays where it was.
    pub async fn make_call(&self, number: &str) -> SoftphoneResult<()> {
        self.manager.call(number).await.map_err(|e| {
            warn!(error = %e, number = %number, "make_call failed");
            *self.state.last_error.write().unwrap() = Some(e.to_string());
            e
        })
    }

    /// Answer the ringing call; failures are recorded like `make_call`
    pub async fn answer_call(&self) -> SoftphoneResult<()> {
        self.manager.answer().await.map_err(|e| {
            warn!(error = %e, "answer_call failed");
            *self.state.last_error.write().unwrap() = Some(e.to_string());
            e
        })
    }

    /// Hang up; always safe
    pub async fn hangup_call(&self) {
        self.manager.hangup().await;
    }

    /// Flip the mute state, returning the new muted flag
    pub async fn toggle_mute(&self) -> bool {
        self.manager.toggle_mute().await
    }

    /// Send a DTMF tone; ignored off-call
    pub async fn send_dtmf(&self, tone: char) {
        self.manager.send_dtmf(tone).await;
    }

    /// The manager this context fronts
    pub fn manager(&self) -> &Arc<SoftphoneManager> {
        &self.manager
    }
}

impl Drop for CallContext {
    fn drop(&mut self) {
        self.manager.event_bus().unsubscribe(self.subscription);
    }
}
