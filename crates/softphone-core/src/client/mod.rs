//! High-level softphone implementation
//!
//! The client module is organized into several sub-modules:
//!
//! - **`manager`** - the [`SoftphoneManager`] owning the call state machine,
//!   registration tracking and the signaling event loop
//! - **`calls`** - call operations (call, answer, hangup)
//! - **`controls`** - in-call controls (mute, DTMF)
//! - **`builder`** - construction with injected capabilities
//! - **`context`** - the consumer-facing [`CallContext`] façade
//!
//! # Basic flow
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use calldesk_softphone_core::*;
//! # async fn example(
//! #     ua: Arc<dyn SignalingUserAgent>,
//! #     mic: Arc<dyn AudioInput>,
//! #     speaker: Arc<dyn MediaSink>,
//! #     rx: tokio::sync::mpsc::Receiver<SignalingEvent>,
//! # ) -> SoftphoneResult<()> {
//! let phone = SoftphoneBuilder::new(SoftphoneConfig::new("2001", "secret", "sip.example.com"))
//!     .user_agent(ua)
//!     .audio_input(mic)
//!     .media_sink(speaker)
//!     .signaling_events(rx)
//!     .build()?;
//!
//! phone.initialize().await?;
//!
//! phone.event_bus().subscribe(EventKind::IncomingCall, |event| {
//!     if let SoftphoneEvent::IncomingCall(info) = event {
//!         println!("{} is calling", info.remote_name);
//!     }
//! });
//!
//! phone.call("1000").await?;
//! phone.hangup().await;
//! phone.destroy().await;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod calls;
pub mod context;
pub mod controls;
pub mod manager;


pub use builder::SoftphoneBuilder;
pub use context::CallContext;
pub use manager::SoftphoneManager;
