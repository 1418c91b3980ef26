//! Integration tests for the consumer-facing call context

mod common;

use common::Harness;

use calldesk_softphone_core::{CallContext, CallState, MediaError, SoftphoneError};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn context_projects_the_full_call_flow() {
    let h = Harness::start().await;
    let ctx = CallContext::new(h.phone.clone());

    assert!(!ctx.is_registered());
    h.register().await;
    assert!(ctx.is_connected());
    assert!(ctx.is_registered());

    h.offer_incoming("sess-1", "5001").await;
    let ringing = ctx.incoming_call().expect("incoming projected");
    assert_eq!(ringing.status, CallState::Ringing);
    assert_eq!(ctx.current_call().unwrap().session_id, ringing.session_id);

    ctx.answer_call().await.expect("answer through the façade");
    assert!(ctx.incoming_call().is_none(), "prompt cleared on connect");
    assert_eq!(ctx.current_call().unwrap().status, CallState::Connected);

    assert!(ctx.toggle_mute().await);
    ctx.send_dtmf('5').await;
    assert_eq!(h.ua.dtmf.lock().unwrap().len(), 1);

    ctx.hangup_call().await;
    assert!(ctx.current_call().is_none());
    assert!(ctx.incoming_call().is_none());
}

#[tokio::test]
#[serial]
async fn context_reports_failures_without_moving_state() {
    let h = Harness::start().await;
    let ctx = CallContext::new(h.phone.clone());
    h.push(calldesk_softphone_core::SignalingEvent::TransportConnected).await;

    // not registered yet: the verb fails, the projection stays idle
    let err = ctx.make_call("1000").await.expect_err("unregistered");
    assert!(matches!(err, SoftphoneError::NotRegistered));
    assert!(ctx.current_call().is_none());
    assert!(ctx.last_error().unwrap().contains("not registered"));
}

#[tokio::test]
#[serial]
async fn context_clears_the_call_on_failure_events() {
    let h = Harness::start().await;
    let ctx = CallContext::new(h.phone.clone());
    h.register().await;
    h.offer_incoming("sess-1", "5001").await;

    h.mic.fail_next(MediaError::PermissionDenied);
    let err = ctx.answer_call().await.expect_err("media denied");
    assert!(err.is_media_error());

    assert!(ctx.current_call().is_none());
    assert!(ctx.incoming_call().is_none());
    assert!(ctx.last_error().is_some());
}

#[tokio::test]
#[serial]
async fn dropping_the_context_detaches_its_subscription() {
    use calldesk_softphone_core::EventKind;

    let h = Harness::start().await;
    let before = h.phone.event_bus().subscriber_count(EventKind::CallEnded);
    {
        let _ctx = CallContext::new(h.phone.clone());
        assert_eq!(
            h.phone.event_bus().subscriber_count(EventKind::CallEnded),
            before + 1
        );
    }
    assert_eq!(h.phone.event_bus().subscriber_count(EventKind::CallEnded), before);
}
