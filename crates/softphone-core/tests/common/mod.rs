//! Shared in-memory capabilities for integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};

use calldesk_softphone_core::{
    AudioInput, CallInfo, EventKind, IncomingSessionOffer, MediaError, MediaSink, MediaStream,
    RegistrationConfig, SessionId, SignalingEvent, SignalingUserAgent, SoftphoneBuilder,
    SoftphoneConfig, SoftphoneError, SoftphoneEvent, SoftphoneManager, SoftphoneResult,
};

/// Scriptable in-memory signaling adapter: records every command the core
/// issues; the test drives the other direction by pushing `SignalingEvent`s.
pub struct FakeUserAgent {
    pub started: AtomicBool,
    pub stopped: AtomicBool,
    pub invites: Mutex<Vec<(SessionId, String)>>,
    pub accepts: Mutex<Vec<SessionId>>,
    pub terminations: Mutex<Vec<SessionId>>,
    pub dtmf: Mutex<Vec<(SessionId, char)>>,
    pub fail_invite: AtomicBool,
    pub fail_accept: AtomicBool,
}

impl FakeUserAgent {
    pub fn new() -> Self {
        Self {
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            invites: Mutex::new(Vec::new()),
            accepts: Mutex::new(Vec::new()),
            terminations: Mutex::new(Vec::new()),
            dtmf: Mutex::new(Vec::new()),
            fail_invite: AtomicBool::new(false),
            fail_accept: AtomicBool::new(false),
        }
    }

    pub fn terminated(&self, session_id: &SessionId) -> bool {
        self.terminations.lock().unwrap().contains(session_id)
    }

    pub fn last_invite(&self) -> Option<(SessionId, String)> {
        self.invites.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl SignalingUserAgent for FakeUserAgent {
    async fn start(&self, _registration: RegistrationConfig) -> SoftphoneResult<()> {
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn invite(
        &self,
        session_id: &SessionId,
        target: &str,
        _local: MediaStream,
    ) -> SoftphoneResult<()> {
        if self.fail_invite.load(Ordering::SeqCst) {
            return Err(SoftphoneError::transport_failed("invite refused"));
        }
        self.invites
            .lock()
            .unwrap()
            .push((session_id.clone(), target.to_string()));
        Ok(())
    }

    async fn accept(&self, session_id: &SessionId, _local: MediaStream) -> SoftphoneResult<()> {
        if self.fail_accept.load(Ordering::SeqCst) {
            return Err(SoftphoneError::transport_failed("accept refused"));
        }
        self.accepts.lock().unwrap().push(session_id.clone());
        Ok(())
    }

    async fn terminate(&self, session_id: &SessionId) -> SoftphoneResult<()> {
        self.terminations.lock().unwrap().push(session_id.clone());
        Ok(())
    }

    async fn send_dtmf(&self, session_id: &SessionId, tone: char) -> SoftphoneResult<()> {
        self.dtmf.lock().unwrap().push((session_id.clone(), tone));
        Ok(())
    }

    async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Microphone fake with a scriptable failure and an optional gate that holds
/// every acquisition open until the test releases it.
pub struct FakeMicrophone {
    fail_with: Mutex<Option<MediaError>>,
    gate: Mutex<Option<Arc<Notify>>>,
    pub captured: Mutex<Vec<MediaStream>>,
}

impl FakeMicrophone {
    pub fn new() -> Self {
        Self {
            fail_with: Mutex::new(None),
            gate: Mutex::new(None),
            captured: Mutex::new(Vec::new()),
        }
    }

    /// Make the next acquisition fail with `err`
    pub fn fail_next(&self, err: MediaError) {
        *self.fail_with.lock().unwrap() = Some(err);
    }

    /// Hold acquisitions open; `notify_one` on the returned handle releases
    /// one pending acquisition.
    pub fn hold_acquisitions(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn last_captured(&self) -> Option<MediaStream> {
        self.captured.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl AudioInput for FakeMicrophone {
    async fn capture(&self) -> Result<MediaStream, MediaError> {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(err) = self.fail_with.lock().unwrap().take() {
            return Err(err);
        }
        let stream = MediaStream::audio_capture();
        self.captured.lock().unwrap().push(stream.clone());
        Ok(stream)
    }
}

/// Playback sink fake recording attach/detach traffic
pub struct RecordingSink {
    pub attached: Mutex<Option<MediaStream>>,
    pub attaches: AtomicUsize,
    pub detaches: AtomicUsize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            attached: Mutex::new(None),
            attaches: AtomicUsize::new(0),
            detaches: AtomicUsize::new(0),
        }
    }
}

impl MediaSink for RecordingSink {
    fn attach(&self, stream: MediaStream) {
        self.attaches.fetch_add(1, Ordering::SeqCst);
        *self.attached.lock().unwrap() = Some(stream);
    }

    fn detach(&self) {
        self.detaches.fetch_add(1, Ordering::SeqCst);
        *self.attached.lock().unwrap() = None;
    }
}

/// Collects every emitted event for assertion
pub struct EventLog {
    events: Mutex<Vec<SoftphoneEvent>>,
}

impl EventLog {
    pub fn install(manager: &SoftphoneManager) -> Arc<Self> {
        let log = Arc::new(Self { events: Mutex::new(Vec::new()) });
        let sink = log.clone();
        manager
            .event_bus()
            .subscribe_all(move |event| sink.events.lock().unwrap().push(event.clone()));
        log
    }

    pub fn events(&self) -> Vec<SoftphoneEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().unwrap().iter().map(|e| e.kind()).collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }

    pub fn last_of(&self, kind: EventKind) -> Option<SoftphoneEvent> {
        self.events().into_iter().rev().find(|e| e.kind() == kind)
    }

    pub fn last_call_info(&self, kind: EventKind) -> Option<CallInfo> {
        self.last_of(kind).and_then(|e| e.call_info().cloned())
    }
}

/// A fully wired softphone core over in-memory capabilities
pub struct Harness {
    pub phone: Arc<SoftphoneManager>,
    pub ua: Arc<FakeUserAgent>,
    pub mic: Arc<FakeMicrophone>,
    pub speaker: Arc<RecordingSink>,
    pub signaling: mpsc::Sender<SignalingEvent>,
    pub log: Arc<EventLog>,
}

pub fn test_config() -> SoftphoneConfig {
    SoftphoneConfig::new("2001", "secret", "sip.example.com").with_display_name("Agent")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("calldesk_softphone_core=debug")
        .with_test_writer()
        .try_init();
}

/// Give the signaling event loop a moment to drain
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

impl Harness {
    pub async fn start() -> Self {
        Self::start_with(test_config()).await
    }

    pub async fn start_with(config: SoftphoneConfig) -> Self {
        init_tracing();
        let ua = Arc::new(FakeUserAgent::new());
        let mic = Arc::new(FakeMicrophone::new());
        let speaker = Arc::new(RecordingSink::new());
        let (tx, rx) = mpsc::channel(32);

        let phone = SoftphoneBuilder::new(config)
            .user_agent(ua.clone())
            .audio_input(mic.clone())
            .media_sink(speaker.clone())
            .signaling_events(rx)
            .build()
            .expect("build softphone");
        phone.initialize().await.expect("initialize softphone");

        let log = EventLog::install(&phone);
        Self { phone, ua, mic, speaker, signaling: tx, log }
    }

    pub async fn push(&self, event: SignalingEvent) {
        self.signaling.send(event).await.expect("signaling channel open");
        settle().await;
    }

    /// Bring the transport up and register the identity
    pub async fn register(&self) {
        self.push(SignalingEvent::TransportConnected).await;
        self.push(SignalingEvent::Registered).await;
        assert!(self.phone.is_registered());
    }

    /// Offer an incoming session and wait for it to be announced
    pub async fn offer_incoming(&self, session_id: &str, number: &str) -> SessionId {
        let session_id = SessionId(session_id.to_string());
        self.push(SignalingEvent::IncomingSession {
            offer: IncomingSessionOffer {
                session_id: session_id.clone(),
                remote_number: number.to_string(),
                remote_name: None,
            },
        })
        .await;
        session_id
    }

    /// Register, place an outgoing call and let the remote accept it
    pub async fn connected_outgoing(&self) -> SessionId {
        self.register().await;
        self.phone.call("1000").await.expect("call placed");
        let (session_id, _) = self.ua.last_invite().expect("invite recorded");
        self.push(SignalingEvent::SessionAccepted { session_id: session_id.clone() })
            .await;
        session_id
    }
}
