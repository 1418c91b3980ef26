//! Configuration for the softphone core

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{SoftphoneError, SoftphoneResult};

/// What to do with an active call when the signaling transport drops.
///
/// A transient disconnect is always reported via
/// [`crate::events::SoftphoneEvent::Disconnected`]; this policy decides
/// whether the call itself is torn down too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectPolicy {
    /// Leave the call up; the media path may survive the signaling drop.
    #[default]
    PreserveCall,
    /// Tear the call down and report it as failed.
    EndCall,
}

/// Configuration for the softphone core
///
/// Consumed from an external profile/settings source; `identity`,
/// `credential` and `domain` are required, everything else has workable
/// defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftphoneConfig {
    /// SIP identity (the user part of the address of record)
    pub identity: String,
    /// Registration credential
    pub credential: String,
    /// Signaling domain; also the host of the persistent transport
    pub domain: String,
    /// Display name announced to remote parties
    pub display_name: Option<String>,
    /// User agent string
    pub user_agent: String,
    /// Registration expiration in seconds
    pub register_expires: u32,
    /// Behavior for an active call when the transport drops
    pub disconnect_policy: DisconnectPolicy,
}

impl SoftphoneConfig {
    /// Create a configuration with default ancillary settings
    pub fn new(
        identity: impl Into<String>,
        credential: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            credential: credential.into(),
            domain: domain.into(),
            display_name: None,
            user_agent: "calldesk-softphone-core/0.1.0".to_string(),
            register_expires: 600,
            disconnect_policy: DisconnectPolicy::default(),
        }
    }

    /// Set display name
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Set user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set registration expiration
    pub fn with_register_expires(mut self, expires: u32) -> Self {
        self.register_expires = expires;
        self
    }

    /// Set the transport-drop policy
    pub fn with_disconnect_policy(mut self, policy: DisconnectPolicy) -> Self {
        self.disconnect_policy = policy;
        self
    }

    /// SIP URI of the local identity
    pub fn uri(&self) -> String {
        format!("sip:{}@{}", self.identity, self.domain)
    }

    /// Display name to announce; falls back to the identity
    pub fn effective_display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.identity)
    }

    /// Build the secure WebSocket URL the signaling transport connects to.
    ///
    /// This is the synchronous failure point of `initialize`: a domain no
    /// transport URL can be constructed from is rejected here, before the
    /// adapter is started.
    pub fn transport_url(&self) -> SoftphoneResult<Url> {
        if self.identity.is_empty() {
            return Err(SoftphoneError::invalid_configuration(
                "identity",
                "identity cannot be empty",
            ));
        }
        if self.domain.is_empty() {
            return Err(SoftphoneError::invalid_configuration(
                "domain",
                "domain cannot be empty",
            ));
        }

        let url = Url::parse(&format!("wss://{}", self.domain)).map_err(|e| {
            SoftphoneError::invalid_configuration("domain", e.to_string())
        })?;
        if url.host_str().is_none() {
            return Err(SoftphoneError::invalid_configuration(
                "domain",
                "domain has no host",
            ));
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_uri_and_transport_url() {
        let config = SoftphoneConfig::new("2001", "secret", "sip.example.com");
        assert_eq!(config.uri(), "sip:2001@sip.example.com");
        assert_eq!(config.register_expires, 600);
        assert_eq!(config.disconnect_policy, DisconnectPolicy::PreserveCall);

        let url = config.transport_url().expect("valid domain");
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.host_str(), Some("sip.example.com"));
    }

    #[test]
    fn rejects_malformed_domain() {
        let config = SoftphoneConfig::new("2001", "secret", "not a domain");
        assert!(matches!(
            config.transport_url(),
            Err(SoftphoneError::InvalidConfiguration { .. })
        ));

        let config = SoftphoneConfig::new("2001", "secret", "");
        assert!(config.transport_url().is_err());
    }

    #[test]
    fn display_name_falls_back_to_identity() {
        let config = SoftphoneConfig::new("2001", "secret", "sip.example.com");
        assert_eq!(config.effective_display_name(), "2001");

        let config = config.with_display_name("Agent Smith");
        assert_eq!(config.effective_display_name(), "Agent Smith");
    }
}
