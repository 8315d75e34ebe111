//! Tests for reply backpressure driven through the session handler.
//!
//! Watermarks are 100 and 1000 bytes throughout; the session's write backlog
//! is set directly on the mock.

use std::{sync::Arc, time::Duration};

use futures::FutureExt;
use rstest::{fixture, rstest};
use tokio::time::sleep;
use wiregate::{HandlerConfig, ReturnError, SessionHandler, SessionId};
use wiregate_testing::{MockSession, RecordingDispatcher, TestPacket};

type Handler = Arc<SessionHandler<TestPacket, RecordingDispatcher>>;

#[fixture]
fn config() -> HandlerConfig {
    HandlerConfig::builder()
        .watermarks(100, 1000)
        .block_timeout(Duration::from_millis(5000))
        .build()
        .expect("valid config")
}

fn handler(config: HandlerConfig) -> Handler {
    SessionHandler::builder(RecordingDispatcher::default())
        .config(config)
        .build()
        .expect("handler")
}

async fn request_reply(handler: &Handler, session: &Arc<MockSession>, channel: u64) {
    handler
        .message_received(session, TestPacket::new(channel, "req").expecting_reply(1))
        .await
        .expect("queued");
}

/// Backlog jumps to 1200, a worker reply waits, and a completion 50ms later
/// drains it to 50, releasing the reply and resuming reads.
#[rstest]
#[tokio::test(start_paused = true)]
async fn drained_backlog_releases_waiting_reply(config: HandlerConfig) {
    let handler = handler(config);
    let session = MockSession::with_backlog(1, 0);
    handler.session_created(&*session);

    session.set_scheduled_bytes(1200);
    assert!(handler.gate().suspend_if_saturated(&*session));
    assert!(handler.gate().is_blocked(&*session));
    assert_eq!(session.suspend_count(), 1);

    request_reply(&handler, &session, 7).await;
    sleep(Duration::from_millis(50)).await;
    assert!(handler.dispatcher().reply_outcomes().is_empty(), "reply must wait");

    session.set_scheduled_bytes(50);
    handler.message_sent(&*session);

    handler.dispatcher().wait_for_completed(1).await;
    assert_eq!(handler.dispatcher().reply_outcomes(), vec![Ok(())]);
    assert_eq!(session.written(), vec![TestPacket::new(7, "re:req")]);
    assert_eq!(session.resume_count(), 1);
    assert!(!handler.gate().is_blocked(&*session));
    handler.shutdown().await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn every_waiting_reply_is_woken(config: HandlerConfig) {
    let handler = handler(config);
    let session = MockSession::with_backlog(1, 1200);

    for channel in 1..=3 {
        request_reply(&handler, &session, channel).await;
    }
    sleep(Duration::from_millis(10)).await;
    assert!(handler.gate().is_blocked(&*session));

    session.set_scheduled_bytes(500);
    handler.message_sent(&*session);
    sleep(Duration::from_millis(10)).await;
    assert!(
        handler.dispatcher().reply_outcomes().is_empty(),
        "backlog above the low watermark keeps replies waiting"
    );

    session.set_scheduled_bytes(0);
    handler.message_sent(&*session);
    handler.dispatcher().wait_for_completed(3).await;
    assert_eq!(handler.dispatcher().reply_outcomes(), vec![Ok(()); 3]);
    handler.shutdown().await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn persistent_backlog_times_out_but_still_writes(config: HandlerConfig) {
    let config = HandlerConfig {
        block_timeout: Duration::from_millis(1000),
        ..config
    };
    let handler = handler(config);
    let session = MockSession::with_backlog(4, 5000);

    request_reply(&handler, &session, 2).await;
    handler.dispatcher().wait_for_completed(1).await;

    let outcomes = handler.dispatcher().reply_outcomes();
    assert!(matches!(
        outcomes.as_slice(),
        [Err(ReturnError::BackpressureTimeout { session, waited })]
            if *session == SessionId::new(4) && *waited >= Duration::from_millis(1000)
    ));
    assert_eq!(session.written(), vec![TestPacket::new(2, "re:req")]);
    handler.shutdown().await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn closing_the_session_fails_waiting_replies(config: HandlerConfig) {
    let handler = handler(config);
    let session = MockSession::with_backlog(5, 1200);
    handler.session_created(&*session);

    request_reply(&handler, &session, 1).await;
    sleep(Duration::from_millis(10)).await;
    handler.session_closed(&*session);

    handler.dispatcher().wait_for_completed(1).await;
    assert_eq!(
        handler.dispatcher().reply_outcomes(),
        vec![Err(ReturnError::SessionClosed(SessionId::new(5)))]
    );
    handler.shutdown().await;
}

#[rstest]
fn io_path_reply_never_blocks(config: HandlerConfig) {
    let config = HandlerConfig {
        ordered_dispatch: false,
        ..config
    };
    let handler = handler(config);
    let session = MockSession::with_backlog(6, 50_000);

    handler
        .message_received(&session, TestPacket::new(3, "req").expecting_reply(1))
        .now_or_never()
        .expect("I/O path must not wait on backpressure")
        .expect("dispatch succeeds");

    assert_eq!(session.written(), vec![TestPacket::new(3, "re:req")]);
    assert_eq!(session.suspend_count(), 1);
    assert!(handler.gate().is_blocked(&*session));

    session.set_scheduled_bytes(100);
    handler.message_sent(&*session);
    assert_eq!(session.resume_count(), 1);
    assert!(!handler.gate().is_blocked(&*session));
}

#[tokio::test]
async fn practically_unbounded_timeout_still_replies() {
    let config: HandlerConfig = serde_json::from_str(
        r#"{ "block_timeout": { "secs": 18446744073709551615, "nanos": 0 } }"#,
    )
    .expect("parse config");
    assert!(config.validate().is_ok());
    let handler = handler(config);
    let session = MockSession::new(8);

    request_reply(&handler, &session, 4).await;
    handler.dispatcher().wait_for_completed(1).await;
    handler.shutdown().await;

    assert_eq!(handler.dispatcher().reply_outcomes(), vec![Ok(())]);
    assert_eq!(session.written(), vec![TestPacket::new(4, "re:req")]);
}

#[rstest]
#[tokio::test]
async fn reply_after_session_close_fails_without_waiting(config: HandlerConfig) {
    let handler = handler(config);
    let session = MockSession::with_backlog(9, 1200);
    handler.session_created(&*session);
    handler.session_closed(&*session);

    request_reply(&handler, &session, 2).await;
    handler.dispatcher().wait_for_completed(1).await;
    handler.shutdown().await;

    assert_eq!(
        handler.dispatcher().reply_outcomes(),
        vec![Err(ReturnError::SessionClosed(SessionId::new(9)))]
    );
}
