//! Builder for constructing a softphone core with injected capabilities

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::SoftphoneConfig;
use crate::error::{SoftphoneError, SoftphoneResult};
use crate::media::{AudioInput, MediaPipeline, MediaSink};
use crate::signaling::{SignalingEvent, SignalingUserAgent};

use super::manager::SoftphoneManager;

/// Builder for a [`SoftphoneManager`].
///
/// The signaling user agent, the audio input and the media sink are
/// capabilities of the host environment; all three (plus the adapter's
/// event channel) must be supplied before `build`.
pub struct SoftphoneBuilder {
    config: SoftphoneConfig,
    user_agent: Option<Arc<dyn SignalingUserAgent>>,
    audio_input: Option<Arc<dyn AudioInput>>,
    media_sink: Option<Arc<dyn MediaSink>>,
    signaling_events: Option<mpsc::Receiver<SignalingEvent>>,
}

impl SoftphoneBuilder {
    pub fn new(config: SoftphoneConfig) -> Self {
        Self {
            config,
            user_agent: None,
            audio_input: None,
            media_sink: None,
            signaling_events: None,
        }
    }

    /// Set the signaling user agent
    pub fn user_agent(mut self, ua: Arc<dyn SignalingUserAgent>) -> Self {
        self.user_agent = Some(ua);
        self
    }

    /// Set the audio capture capability
    pub fn audio_input(mut self, input: Arc<dyn AudioInput>) -> Self {
        self.audio_input = Some(input);
        self
    }

    /// Set the playback sink capability
    pub fn media_sink(mut self, sink: Arc<dyn MediaSink>) -> Self {
        self.media_sink = Some(sink);
        self
    }

    /// Set the channel the signaling adapter reports its events on
    pub fn signaling_events(mut self, rx: mpsc::Receiver<SignalingEvent>) -> Self {
        self.signaling_events = Some(rx);
        self
    }

    /// Build the softphone manager
    pub fn build(self) -> SoftphoneResult<Arc<SoftphoneManager>> {
        let ua = self.user_agent.ok_or_else(|| {
            SoftphoneError::invalid_configuration("user_agent", "signaling user agent is required")
        })?;
        let input = self.audio_input.ok_or_else(|| {
            SoftphoneError::invalid_configuration("audio_input", "audio input is required")
        })?;
        let sink = self.media_sink.ok_or_else(|| {
            SoftphoneError::invalid_configuration("media_sink", "media sink is required")
        })?;
        let rx = self.signaling_events.ok_or_else(|| {
            SoftphoneError::invalid_configuration(
                "signaling_events",
                "signaling event channel is required",
            )
        })?;

        let media = MediaPipeline::new(input, sink);
        Ok(SoftphoneManager::new(self.config, ua, media, rx))
    }
}
