//! Tests for per-channel ordered dispatch through the session handler.
//!
//! Packets sharing a channel must reach the dispatcher in arrival order while
//! distinct channels progress independently.

use std::sync::Arc;

use proptest::prelude::*;
use tokio::{runtime::Builder, sync::Mutex};
use wiregate::{ChannelId, SessionHandler};
use wiregate_testing::{MockSession, RecordingDispatcher, TestPacket};

type Handler = Arc<SessionHandler<TestPacket, RecordingDispatcher>>;

fn handler() -> Handler {
    SessionHandler::builder(RecordingDispatcher::default())
        .build()
        .expect("ordered handler")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn packets_from_separate_callbacks_keep_arrival_order() {
    let handler = handler();
    let session = MockSession::new(1);

    for label in ["A", "B", "C"] {
        let handler = Arc::clone(&handler);
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            handler
                .message_received(&session, TestPacket::new(7, label))
                .await
        })
        .await
        .expect("callback task panicked")
        .expect("ordered dispatch never fails the caller");
    }

    handler.dispatcher().wait_for_completed(3).await;
    handler.shutdown().await;
    assert_eq!(handler.dispatcher().labels_on(7), vec!["A", "B", "C"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_callers_are_served_in_receipt_order() {
    const CALLERS: usize = 4;
    const PER_CALLER: usize = 50;

    let handler = handler();
    let session = MockSession::new(1);
    let receipts = Arc::new(Mutex::new(Vec::new()));

    let callers: Vec<_> = (0..CALLERS)
        .map(|caller| {
            let handler = Arc::clone(&handler);
            let session = Arc::clone(&session);
            let receipts = Arc::clone(&receipts);
            tokio::spawn(async move {
                for n in 0..PER_CALLER {
                    let label = format!("{caller}-{n}");
                    // Hold the receipt log across delivery so it records the
                    // exact order the handler saw.
                    let mut log = receipts.lock().await;
                    log.push(label.clone());
                    handler
                        .message_received(&session, TestPacket::new(3, label))
                        .await
                        .expect("queued");
                }
            })
        })
        .collect();
    for caller in callers {
        caller.await.expect("caller panicked");
    }

    handler
        .dispatcher()
        .wait_for_completed(CALLERS * PER_CALLER)
        .await;
    handler.shutdown().await;
    assert_eq!(handler.dispatcher().labels_on(3), *receipts.lock().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stalled_channel_does_not_block_others() {
    let handler = handler();
    let session = MockSession::new(1);
    let release = handler.dispatcher().hold("slow");

    handler
        .message_received(&session, TestPacket::new(1, "slow"))
        .await
        .expect("queued");
    handler
        .message_received(&session, TestPacket::new(2, "fast"))
        .await
        .expect("queued");

    handler.dispatcher().wait_for_completed(1).await;
    assert_eq!(handler.dispatcher().completed(), vec!["fast"]);

    release.add_permits(1);
    handler.dispatcher().wait_for_completed(2).await;
    handler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn deregistered_channel_restarts_on_a_fresh_queue() {
    let handler = handler();
    let session = MockSession::new(1);
    let release = handler.dispatcher().hold("A");
    let executors = handler.executors().expect("ordered dispatch enabled");

    for label in ["A", "B"] {
        handler
            .message_received(&session, TestPacket::new(7, label))
            .await
            .expect("queued");
    }
    handler.dispatcher().wait_for(1).await;
    let stalled = executors
        .get(ChannelId::new(7))
        .expect("queue for channel 7");
    assert_eq!(stalled.pending(), 1, "B waits behind A");

    handler.dispatcher().unregister(7);
    handler
        .message_received(&session, TestPacket::new(7, "C"))
        .await
        .expect("queued");

    handler.dispatcher().wait_for_completed(1).await;
    assert_eq!(handler.dispatcher().completed(), vec!["C"]);
    let fresh = executors
        .get(ChannelId::new(7))
        .expect("fresh queue for channel 7");
    assert!(!fresh.same_queue(&stalled));
    assert_eq!(executors.installed(), 2);

    release.add_permits(1);
    handler.dispatcher().wait_for_completed(3).await;
    handler.shutdown().await;
    assert_eq!(handler.dispatcher().completed(), vec!["C", "A", "B"]);
}

#[tokio::test]
async fn registration_events_reach_the_handler() {
    let handler = handler();
    assert!(handler.dispatcher().has_listener());

    handler.dispatcher().register(9);
    assert!(handler.executors().is_some_and(|e| e.is_empty()));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn interleaved_channels_keep_per_channel_order(channels in prop::collection::vec(0u64..4, 1..64)) {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("runtime");

        let dispatcher_order = runtime.block_on(async {
            let handler = handler();
            let session = MockSession::new(1);
            for (n, channel) in channels.iter().enumerate() {
                handler
                    .message_received(&session, TestPacket::new(*channel, n.to_string()))
                    .await
                    .expect("queued");
            }
            handler.dispatcher().wait_for_completed(channels.len()).await;
            handler.shutdown().await;
            (0..4)
                .map(|channel| handler.dispatcher().labels_on(channel))
                .collect::<Vec<_>>()
        });

        for (channel, seen) in (0u64..4).zip(dispatcher_order) {
            let expected: Vec<String> = channels
                .iter()
                .enumerate()
                .filter(|(_, c)| **c == channel)
                .map(|(n, _)| n.to_string())
                .collect();
            prop_assert_eq!(seen, expected);
        }
    }
}
