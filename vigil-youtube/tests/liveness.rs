mod common;

use std::sync::Arc;

use common::{FakeTransport, connector_with, live_video};
use vigil_core::connector::{ChannelProvider, LivenessProvider, StreamConnector};
use vigil_types::StreamStatus;
use vigil_youtube::dto::{
    ChannelItem, ChannelListResponse, ChannelSnippet, Statistics, Thumbnail, Thumbnails,
    VideoListResponse,
};

fn ids(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| (*s).to_string()).collect()
}

#[tokio::test]
async fn liveness_yields_one_update_per_requested_id() {
    let transport = Arc::new(FakeTransport::default());
    transport
        .video_responses
        .lock()
        .unwrap()
        .push(Ok(VideoListResponse {
            items: vec![live_video("alive", "still going", 300)],
        }));

    let connector = connector_with(transport, 10_000);
    let updates = connector
        .check_liveness(&ids(&["alive", "gone"]))
        .await
        .unwrap();

    assert_eq!(updates.len(), 2);
    let alive = updates.iter().find(|u| u.platform_stream_id == "alive").unwrap();
    assert_eq!(alive.status, StreamStatus::Live);
    assert_eq!(alive.viewer_count, 300);

    let gone = updates.iter().find(|u| u.platform_stream_id == "gone").unwrap();
    assert_eq!(gone.status, StreamStatus::Ended);
    assert_eq!(gone.viewer_count, 0);
}

#[tokio::test]
async fn liveness_batches_at_fifty_ids() {
    let transport = Arc::new(FakeTransport::default());
    for _ in 0..3 {
        transport
            .video_responses
            .lock()
            .unwrap()
            .push(Ok(VideoListResponse { items: vec![] }));
    }

    let many: Vec<String> = (0..120).map(|n| format!("v{n}")).collect();
    let connector = connector_with(transport.clone(), 10_000);
    let updates = connector.check_liveness(&many).await.unwrap();

    assert_eq!(updates.len(), 120);
    assert_eq!(transport.video_call_sizes(), vec![50, 50, 20]);
    // One unit per batch.
    assert_eq!(connector.governor().quota_consumed(), 3);
}

#[tokio::test]
async fn liveness_returns_partial_results_when_quota_runs_out() {
    let transport = Arc::new(FakeTransport::default());
    transport
        .video_responses
        .lock()
        .unwrap()
        .push(Ok(VideoListResponse { items: vec![] }));

    let many: Vec<String> = (0..120).map(|n| format!("v{n}")).collect();
    let connector = connector_with(transport.clone(), 1);
    let updates = connector.check_liveness(&many).await.unwrap();

    // Only the first batch fit the budget.
    assert_eq!(updates.len(), 50);
    assert_eq!(transport.video_call_sizes(), vec![50]);
    assert_eq!(connector.governor().quota_consumed(), 1);
}

#[tokio::test]
async fn liveness_detects_ended_broadcasts() {
    let transport = Arc::new(FakeTransport::default());
    let mut ended = live_video("over", "was live", 10);
    ended.live_details.as_mut().unwrap().actual_end_time =
        Some("2026-08-01T11:00:00Z".to_string());
    transport
        .video_responses
        .lock()
        .unwrap()
        .push(Ok(VideoListResponse { items: vec![ended] }));

    let connector = connector_with(transport, 10_000);
    let updates = connector.check_liveness(&ids(&["over"])).await.unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].status, StreamStatus::Ended);
}

#[tokio::test]
async fn liveness_is_a_no_op_without_ids_or_when_paused() {
    let transport = Arc::new(FakeTransport::default());
    let connector = connector_with(transport.clone(), 10_000);

    assert!(connector.check_liveness(&[]).await.unwrap().is_empty());

    connector.governor().pause(
        vigil_core::PauseReason::Errors,
        std::time::Duration::from_secs(600),
    );
    let updates = connector.check_liveness(&ids(&["a"])).await.unwrap();
    assert!(updates.is_empty());
    assert!(transport.video_call_sizes().is_empty());
}

#[tokio::test]
async fn channel_lookup_fills_trust_score() {
    let transport = Arc::new(FakeTransport::default());
    let created = chrono::Utc::now() - chrono::Duration::days(365);
    transport
        .channel_responses
        .lock()
        .unwrap()
        .push(Ok(ChannelListResponse {
            items: vec![ChannelItem {
                id: "UC1".to_string(),
                snippet: Some(ChannelSnippet {
                    title: "street newsroom".to_string(),
                    published_at: Some(created.to_rfc3339()),
                    thumbnails: Thumbnails {
                        high: None,
                        default: Some(Thumbnail {
                            url: "https://yt3.example/avatar.jpg".to_string(),
                        }),
                    },
                }),
                statistics: Some(Statistics {
                    view_count: None,
                    subscriber_count: Some("100000".to_string()),
                }),
            }],
        }));

    let connector = connector_with(transport, 10_000);
    let channel = connector.channel("UC1").await.unwrap().unwrap();

    assert_eq!(channel.display_name, "street newsroom");
    assert_eq!(channel.subscriber_count, 100_000);
    assert!((channel.trust_score - 0.80).abs() < f64::EPSILON);
    assert!(channel.last_scraped_at.is_some());
    assert_eq!(connector.governor().quota_consumed(), 1);
}

#[tokio::test]
async fn unknown_channels_come_back_none() {
    let transport = Arc::new(FakeTransport::default());
    let connector = connector_with(transport, 10_000);
    assert!(connector.channel("nope").await.unwrap().is_none());
}
