//! In-call controls for the softphone manager
//!
//! Mute and DTMF act on an already negotiated media path, so outside the
//! connected state they are no-ops rather than errors.

use tracing::{debug, warn};

use crate::call::SessionId;

use super::manager::SoftphoneManager;

/// Valid in-band tones: dial-pad digits, `*`, `#` and A-D
fn is_dtmf_tone(tone: char) -> bool {
    matches!(tone, '0'..='9' | '*' | '#' | 'A'..='D' | 'a'..='d')
}

impl SoftphoneManager {
    /// Flip the microphone mute state, returning the new muted flag.
    ///
    /// Purely local: the enabled flag of the capture track is flipped
    /// synchronously, no signaling round trip. Outside the connected state
    /// this is a no-op that reports the previous state.
    pub async fn toggle_mute(&self) -> bool {
        let slot = self.slot.lock().await;
        let connected = slot
            .call
            .as_ref()
            .map(|c| c.info.status.is_active())
            .unwrap_or(false);
        if !connected {
            debug!("toggle_mute outside a connected call, ignoring");
            return self.media.is_muted();
        }

        let muted = self.media.toggle_muted();
        debug!(muted, "toggled microphone mute");
        muted
    }

    /// Send one DTMF tone on the established call. Ignored when no call is
    /// connected or the character is not a valid tone.
    pub async fn send_dtmf(&self, tone: char) {
        if !is_dtmf_tone(tone) {
            warn!(tone = %tone, "ignoring invalid DTMF tone");
            return;
        }

        let session_id: SessionId = {
            let slot = self.slot.lock().await;
            match slot.call.as_ref() {
                Some(call) if call.info.status.is_active() => call.info.session_id.clone(),
                _ => {
                    debug!(tone = %tone, "send_dtmf outside a connected call, ignoring");
                    return;
                }
            }
        };

        debug!(tone = %tone, session_id = %session_id, "sending DTMF");
        if let Err(e) = self.ua.send_dtmf(&session_id, tone).await {
            warn!(error = %e, session_id = %session_id, "failed to send DTMF");
        }
    }
}
