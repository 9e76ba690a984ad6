mod common;

use std::sync::Arc;

use common::{FakeHelix, connector_with, stream_item};
use vigil_core::VigilError;
use vigil_core::connector::{LivenessProvider, StreamConnector};
use vigil_types::StreamStatus;

fn ids(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| (*s).to_string()).collect()
}

#[tokio::test]
async fn absent_ids_come_back_ended() {
    let transport = Arc::new(FakeHelix::default());
    transport
        .users_queue
        .lock()
        .unwrap()
        .push(Ok(vec![stream_item("alive", "still rolling", 42)]));

    let connector = connector_with(transport);
    let updates = connector
        .check_liveness(&ids(&["alive", "gone"]))
        .await
        .unwrap();

    assert_eq!(updates.len(), 2);
    let alive = updates.iter().find(|u| u.platform_stream_id == "alive").unwrap();
    assert_eq!(alive.status, StreamStatus::Live);
    assert_eq!(alive.viewer_count, 42);

    let gone = updates.iter().find(|u| u.platform_stream_id == "gone").unwrap();
    assert_eq!(gone.status, StreamStatus::Ended);
    assert_eq!(gone.viewer_count, 0);
}

#[tokio::test]
async fn liveness_batches_at_one_hundred_ids() {
    let transport = Arc::new(FakeHelix::default());
    let many: Vec<String> = (0..250).map(|n| format!("u{n}")).collect();

    let connector = connector_with(transport.clone());
    let updates = connector.check_liveness(&many).await.unwrap();

    assert_eq!(updates.len(), 250);
    assert_eq!(transport.users_call_sizes(), vec![100, 100, 50]);
}

#[tokio::test]
async fn failed_chunks_are_skipped_not_fabricated() {
    let transport = Arc::new(FakeHelix::default());
    // Popped in reverse order: the first chunk succeeds, the second keeps
    // failing until its retries are spent.
    transport.users_queue.lock().unwrap().extend([
        Err(VigilError::upstream("vigil-twitch", "status 503")),
        Err(VigilError::upstream("vigil-twitch", "status 503")),
        Err(VigilError::upstream("vigil-twitch", "status 503")),
        Ok(vec![]),
    ]);

    let many: Vec<String> = (0..150).map(|n| format!("u{n}")).collect();
    let connector = connector_with(transport.clone());
    let updates = connector.check_liveness(&many).await.unwrap();

    // The failed second chunk produced no updates at all; the first chunk's
    // 100 ids were all absent and therefore ended.
    assert_eq!(updates.len(), 100);
    assert!(updates.iter().all(|u| u.status == StreamStatus::Ended));
    assert_eq!(connector.governor().error_count(), 1);
}

#[tokio::test]
async fn hard_rate_limit_rejections_pause_until_the_reset() {
    let transport = Arc::new(FakeHelix::default());
    transport
        .users_queue
        .lock()
        .unwrap()
        .push(Err(VigilError::RateLimited { reset_in_ms: 60 }));

    let connector = connector_with(transport);
    let updates = connector.check_liveness(&ids(&["a"])).await.unwrap();

    assert!(updates.is_empty());
    assert!(!connector.governor().is_operational());

    tokio::time::sleep(std::time::Duration::from_millis(90)).await;
    assert!(connector.governor().is_operational());
}

#[tokio::test]
async fn empty_input_is_a_no_op() {
    let transport = Arc::new(FakeHelix::default());
    let connector = connector_with(transport.clone());
    assert!(connector.check_liveness(&[]).await.unwrap().is_empty());
    assert_eq!(transport.token_call_count(), 0);
}
