//! Typed event publication for the softphone core
//!
//! Every state change the core announces goes through [`EventBus`] as a
//! [`SoftphoneEvent`]. Delivery is synchronous and in subscription order,
//! one subscriber list per event kind; a panicking subscriber is isolated
//! so it cannot suppress delivery to the rest. There is no queuing or
//! replay: subscribers added after an event fired never observe it.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tracing::{error, trace};
use uuid::Uuid;

use crate::call::CallInfo;

/// Payload of [`SoftphoneEvent::CallFailed`]
#[derive(Debug, Clone, Serialize)]
pub struct CallFailure {
    /// Failure class as reported by the failing layer ("media", "transport",
    /// or the signaling cause such as a status code)
    pub cause: String,
    /// Human-readable detail
    pub message: String,
}

/// Events emitted by the softphone core
#[derive(Debug, Clone)]
pub enum SoftphoneEvent {
    /// The identity registered with the signaling server
    Registered,
    /// The identity unregistered
    Unregistered,
    /// A registration attempt failed
    RegistrationFailed { reason: String },
    /// The signaling transport came up
    Connected,
    /// The signaling transport dropped
    Disconnected,
    /// An incoming call is ringing
    IncomingCall(CallInfo),
    /// An outgoing call was originated
    OutgoingCall(CallInfo),
    /// The call was established
    CallConnected(CallInfo),
    /// The call ended (local or remote hangup)
    CallEnded(CallInfo),
    /// The call failed (media acquisition, negotiation, transport policy)
    CallFailed(CallFailure),
}

/// Discriminant of [`SoftphoneEvent`], used for per-kind subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Registered,
    Unregistered,
    RegistrationFailed,
    Connected,
    Disconnected,
    IncomingCall,
    OutgoingCall,
    CallConnected,
    CallEnded,
    CallFailed,
}

impl EventKind {
    /// Every event kind, in a fixed order
    pub const ALL: [EventKind; 10] = [
        EventKind::Registered,
        EventKind::Unregistered,
        EventKind::RegistrationFailed,
        EventKind::Connected,
        EventKind::Disconnected,
        EventKind::IncomingCall,
        EventKind::OutgoingCall,
        EventKind::CallConnected,
        EventKind::CallEnded,
        EventKind::CallFailed,
    ];
}

impl SoftphoneEvent {
    /// Get the kind of this event
    pub fn kind(&self) -> EventKind {
        match self {
            SoftphoneEvent::Registered => EventKind::Registered,
            SoftphoneEvent::Unregistered => EventKind::Unregistered,
            SoftphoneEvent::RegistrationFailed { .. } => EventKind::RegistrationFailed,
            SoftphoneEvent::Connected => EventKind::Connected,
            SoftphoneEvent::Disconnected => EventKind::Disconnected,
            SoftphoneEvent::IncomingCall(_) => EventKind::IncomingCall,
            SoftphoneEvent::OutgoingCall(_) => EventKind::OutgoingCall,
            SoftphoneEvent::CallConnected(_) => EventKind::CallConnected,
            SoftphoneEvent::CallEnded(_) => EventKind::CallEnded,
            SoftphoneEvent::CallFailed(_) => EventKind::CallFailed,
        }
    }

    /// Get the call info carried by this event (if any)
    pub fn call_info(&self) -> Option<&CallInfo> {
        match self {
            SoftphoneEvent::IncomingCall(info)
            | SoftphoneEvent::OutgoingCall(info)
            | SoftphoneEvent::CallConnected(info)
            | SoftphoneEvent::CallEnded(info) => Some(info),
            _ => None,
        }
    }
}

/// Identifier returned by `subscribe`, used to unsubscribe
pub type SubscriberId = Uuid;

type Handler = Arc<dyn Fn(&SoftphoneEvent) + Send + Sync>;

struct Subscriber {
    id: SubscriberId,
    handler: Handler,
}

/// Typed publish/subscribe dispatch, one subscriber list per event kind
pub struct EventBus {
    by_kind: DashMap<EventKind, Vec<Subscriber>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { by_kind: DashMap::new() }
    }

    /// Subscribe to one event kind. Handlers run synchronously on the
    /// emitting task and must not block.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriberId
    where
        F: Fn(&SoftphoneEvent) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        let handler: Handler = Arc::new(handler);
        self.by_kind.entry(kind).or_default().push(Subscriber {
            id,
            handler,
        });
        id
    }

    /// Subscribe one handler to every event kind
    pub fn subscribe_all<F>(&self, handler: F) -> SubscriberId
    where
        F: Fn(&SoftphoneEvent) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        let handler: Handler = Arc::new(handler);
        for kind in EventKind::ALL {
            self.by_kind.entry(kind).or_default().push(Subscriber {
                id,
                handler: handler.clone(),
            });
        }
        id
    }

    /// Remove a subscriber everywhere it was registered
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut removed = false;
        for mut entry in self.by_kind.iter_mut() {
            let before = entry.value().len();
            entry.value_mut().retain(|s| s.id != id);
            removed |= entry.value().len() != before;
        }
        removed
    }

    /// Deliver an event to its kind's subscribers, in subscription order.
    ///
    /// A subscriber that panics is caught and logged; the remaining
    /// subscribers still receive the event.
    pub fn emit(&self, event: SoftphoneEvent) {
        let kind = event.kind();
        trace!(kind = ?kind, "emitting event");

        // Clone the handlers out so a subscriber may (un)subscribe reentrantly
        let handlers: Vec<Handler> = self
            .by_kind
            .get(&kind)
            .map(|subs| subs.iter().map(|s| s.handler.clone()).collect())
            .unwrap_or_default();

        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
                error!(kind = ?kind, "event subscriber panicked, continuing delivery");
            }
        }
    }

    /// Number of subscribers for a kind
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.by_kind.get(&kind).map(|subs| subs.len()).unwrap_or(0)
    }

    /// Drop every subscription
    pub fn clear(&self) {
        self.by_kind.clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
