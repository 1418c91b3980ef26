//! Local capture and remote playback mediation
//!
//! The [`MediaPipeline`] owns the local microphone stream for exactly the
//! lifetime of the active session: acquired lazily when a call is originated
//! or answered, never held while idle, and released on every path that ends
//! the call. Remote audio is attached to one process-wide playback sink
//! supplied by the host environment.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Why local audio could not be acquired
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("no usable audio capture device")]
    DeviceUnavailable,

    #[error("audio capture failed: {reason}")]
    CaptureFailed { reason: String },
}

/// One audio track of a stream.
///
/// Mute state is the track's `enabled` flag; flipping it is synchronous and
/// local, no network round trip is involved.
#[derive(Debug)]
pub struct AudioTrack {
    id: String,
    enabled: AtomicBool,
    stopped: AtomicBool,
}

impl AudioTrack {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Stop the track; a stopped track never produces media again.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            debug!(track = %self.id, "stopped audio track");
        }
    }
}

/// Handle to a set of audio tracks; clones share the underlying tracks.
#[derive(Debug, Clone)]
pub struct MediaStream {
    tracks: Arc<Vec<AudioTrack>>,
}

impl MediaStream {
    pub fn new(tracks: Vec<AudioTrack>) -> Self {
        Self { tracks: Arc::new(tracks) }
    }

    /// A single-track audio capture stream, the shape every [`AudioInput`]
    /// implementation hands out.
    pub fn audio_capture() -> Self {
        Self::new(vec![AudioTrack::new("audio-0")])
    }

    pub fn tracks(&self) -> &[AudioTrack] {
        &self.tracks
    }

    /// Flip the enabled flag of every audio track
    pub fn set_audio_enabled(&self, enabled: bool) {
        for track in self.tracks.iter() {
            track.set_enabled(enabled);
        }
    }

    /// True if every track is enabled and not stopped
    pub fn is_audio_enabled(&self) -> bool {
        self.tracks.iter().all(|t| t.is_enabled() && !t.is_stopped())
    }

    /// Stop every track individually
    pub fn stop_all(&self) {
        for track in self.tracks.iter() {
            track.stop();
        }
    }

    /// True while any track is still live
    pub fn is_live(&self) -> bool {
        self.tracks.iter().any(|t| !t.is_stopped())
    }
}

/// Capture capability supplied by the host environment
#[async_trait]
pub trait AudioInput: Send + Sync {
    /// Request an audio-only capture stream.
    async fn capture(&self) -> Result<MediaStream, MediaError>;
}

/// Playback capability supplied by the host environment.
///
/// One sink exists per core instance; the remote stream of the active call
/// is attached to it and detached when the call ends.
pub trait MediaSink: Send + Sync {
    fn attach(&self, stream: MediaStream);
    fn detach(&self);
}

/// Mediates local capture and remote playback for the active session
pub struct MediaPipeline {
    input: Arc<dyn AudioInput>,
    sink: Arc<dyn MediaSink>,
    local: Mutex<Option<MediaStream>>,
}

impl MediaPipeline {
    pub fn new(input: Arc<dyn AudioInput>, sink: Arc<dyn MediaSink>) -> Self {
        Self { input, sink, local: Mutex::new(None) }
    }

    /// Request the local capture stream from the host environment.
    ///
    /// The stream is not adopted yet; the caller decides whether to bind it
    /// into the session or discard it (the acquisition may have been
    /// overtaken by a hangup).
    pub async fn acquire_local_audio(&self) -> Result<MediaStream, MediaError> {
        let stream = self.input.capture().await?;
        debug!(tracks = stream.tracks().len(), "acquired local audio");
        Ok(stream)
    }

    /// Adopt the stream as the active session's local media
    pub fn adopt(&self, stream: MediaStream) {
        *self.local.lock().unwrap() = Some(stream);
    }

    /// Attach the remote stream of the active session to the playback sink
    pub fn play_remote(&self, stream: MediaStream) {
        debug!("attaching remote stream to playback sink");
        self.sink.attach(stream);
    }

    /// True when a local stream is held and its tracks are disabled
    pub fn is_muted(&self) -> bool {
        self.local
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| !s.is_audio_enabled())
            .unwrap_or(false)
    }

    /// Flip the local mute state, returning the new muted flag
    pub fn toggle_muted(&self) -> bool {
        let guard = self.local.lock().unwrap();
        match guard.as_ref() {
            Some(stream) => {
                let muted = stream.is_audio_enabled();
                stream.set_audio_enabled(!muted);
                muted
            }
            None => false,
        }
    }

    /// Release everything the active session held: stop every local track
    /// individually and detach the playback sink's source.
    ///
    /// Called on every path that reaches the ended state, failure paths
    /// included; releasing with nothing held is a no-op.
    pub fn release(&self) {
        if let Some(stream) = self.local.lock().unwrap().take() {
            stream.stop_all();
            debug!("released local media stream");
        }
        self.sink.detach();
    }
}
