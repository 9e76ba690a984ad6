mod common;

use std::sync::Arc;

use common::{FakeTransport, builder_with, connector_with, live_video, search_ids};
use vigil_core::connector::{DiscoveryProvider, StreamConnector};
use vigil_core::VigilError;
use vigil_types::{ConnectorStatus, DiscoveryMethod, Platform, StreamStatus};
use vigil_youtube::dto::VideoListResponse;

fn kw(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

#[tokio::test]
async fn discovery_normalizes_search_results() {
    let transport = Arc::new(FakeTransport::default());
    transport
        .search_responses
        .lock()
        .unwrap()
        .push(Ok(search_ids(&["vid1", "vid2"])));
    transport
        .video_responses
        .lock()
        .unwrap()
        .push(Ok(VideoListResponse {
            items: vec![
                live_video("vid1", "PROTEST at city hall", 1200),
                live_video("vid2", "cooking stream", 50),
            ],
        }));

    let connector = connector_with(transport.clone(), 10_000);
    let streams = connector.discover(&kw(&["protest", "rally"])).await.unwrap();

    assert_eq!(streams.len(), 2);
    let first = &streams[0];
    assert_eq!(first.platform, Platform::YouTube);
    assert_eq!(first.platform_stream_id, "vid1");
    assert_eq!(first.status, StreamStatus::Live);
    assert_eq!(first.viewer_count, 1200);
    assert_eq!(first.matched_keywords, kw(&["protest"]));
    assert_eq!(first.discovery_method, DiscoveryMethod::Search);
    assert_eq!(first.embed_url.as_deref(), Some("https://www.youtube.com/watch?v=vid1"));
    assert!(first.start_time.is_some());

    // No keyword in the title: normalized, but unmatched.
    assert!(streams[1].matched_keywords.is_empty());

    // One search (100 units) plus one batch resolve (1 unit).
    assert_eq!(connector.governor().quota_consumed(), 101);
}

#[tokio::test]
async fn discovery_dedups_by_stream_id() {
    let transport = Arc::new(FakeTransport::default());
    transport
        .search_responses
        .lock()
        .unwrap()
        .push(Ok(search_ids(&["dup", "dup"])));
    transport
        .video_responses
        .lock()
        .unwrap()
        .push(Ok(VideoListResponse {
            items: vec![
                live_video("dup", "march downtown", 10),
                live_video("dup", "march downtown", 10),
            ],
        }));

    let connector = connector_with(transport, 10_000);
    let streams = connector.discover(&kw(&["march"])).await.unwrap();
    assert_eq!(streams.len(), 1);
}

#[tokio::test]
async fn discovery_skips_when_searched_too_recently() {
    let transport = Arc::new(FakeTransport::default());
    transport
        .search_responses
        .lock()
        .unwrap()
        .extend([Ok(search_ids(&[])), Ok(search_ids(&[]))]);

    let connector = connector_with(transport.clone(), 10_000);
    connector.discover(&[]).await.unwrap();
    let again = connector.discover(&[]).await.unwrap();

    assert!(again.is_empty());
    assert_eq!(transport.search_call_count(), 1);
    // The skipped run consumed nothing.
    assert_eq!(connector.governor().quota_consumed(), 100);
}

#[tokio::test]
async fn discovery_is_firewalled_by_quota() {
    let transport = Arc::new(FakeTransport::default());
    let connector = connector_with(transport.clone(), 50);

    let streams = connector.discover(&[]).await.unwrap();

    assert!(streams.is_empty());
    assert_eq!(transport.search_call_count(), 0);
    assert_eq!(connector.governor().quota_consumed(), 0);
    assert_eq!(connector.governor().status(), ConnectorStatus::Paused);
}

#[tokio::test]
async fn discovery_retries_transient_upstream_errors() {
    let transport = Arc::new(FakeTransport::default());
    // Popped in reverse order: first the error, then the success.
    transport.search_responses.lock().unwrap().extend([
        Ok(search_ids(&["vid1"])),
        Err(VigilError::upstream("vigil-youtube", "status 503")),
    ]);
    transport
        .video_responses
        .lock()
        .unwrap()
        .push(Ok(VideoListResponse {
            items: vec![live_video("vid1", "rally live", 5)],
        }));

    let connector = connector_with(transport.clone(), 10_000);
    let streams = connector.discover(&kw(&["rally"])).await.unwrap();

    assert_eq!(streams.len(), 1);
    assert_eq!(transport.search_call_count(), 2);
    // The retried call ended in success, so no error sticks.
    assert_eq!(connector.governor().error_count(), 0);
}

#[tokio::test]
async fn discovery_surfaces_exhausted_retries() {
    let transport = Arc::new(FakeTransport::default());
    transport.search_responses.lock().unwrap().extend([
        Err(VigilError::upstream("vigil-youtube", "status 502")),
        Err(VigilError::upstream("vigil-youtube", "status 502")),
        Err(VigilError::upstream("vigil-youtube", "status 502")),
    ]);

    let connector = connector_with(transport.clone(), 10_000);
    let result = connector.discover(&[]).await;

    assert!(result.is_err());
    assert_eq!(transport.search_call_count(), 3);
    assert_eq!(connector.governor().error_count(), 1);
}

#[tokio::test]
async fn authenticate_requires_a_key() {
    let transport = Arc::new(FakeTransport::default());
    let connector = builder_with(transport, 10_000).build().unwrap();
    assert_eq!(connector.key().as_str(), "vigil-youtube");
    assert!(connector.authenticate().await.is_ok());

    let keyless = vigil_youtube::YouTubeConnector::builder(vigil_types::YouTubeConfig {
        api_key: String::new(),
        ..vigil_types::YouTubeConfig::default()
    })
    .transport(Arc::new(FakeTransport::default()))
    .build()
    .unwrap();
    assert!(matches!(
        keyless.authenticate().await,
        Err(VigilError::Auth { .. })
    ));
    assert_eq!(keyless.governor().error_count(), 1);
}

#[tokio::test]
async fn feed_hints_resolve_into_rss_tagged_streams() {
    let transport = Arc::new(FakeTransport::default());
    let mut upload = live_video("plain", "uploaded vod", 5);
    upload.live_details = None;
    transport
        .video_responses
        .lock()
        .unwrap()
        .push(Ok(VideoListResponse {
            items: vec![live_video("hint1", "protest aftermath live", 44), upload],
        }));

    let connector = connector_with(transport, 10_000);
    let streams = connector
        .resolve(&kw(&["hint1", "plain"]))
        .await
        .unwrap();

    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].platform_stream_id, "hint1");
    assert_eq!(streams[0].discovery_method, DiscoveryMethod::Rss);
    // One batch, one unit.
    assert_eq!(connector.governor().quota_consumed(), 1);
}

#[tokio::test]
async fn feed_polling_returns_fresh_ids() {
    let now = chrono::Utc::now();
    let xml = format!(
        "<feed xmlns=\"http://www.w3.org/2005/Atom\" \
         xmlns:yt=\"http://www.youtube.com/xml/schemas/2015\">\
         <entry><yt:videoId>fresh</yt:videoId><published>{}</published></entry>\
         <entry><yt:videoId>stale</yt:videoId><published>{}</published></entry>\
         </feed>",
        (now - chrono::Duration::minutes(20)).to_rfc3339(),
        (now - chrono::Duration::hours(7)).to_rfc3339(),
    );
    let transport = Arc::new(FakeTransport::default());
    *transport.feed_xml.lock().unwrap() = Some(xml);

    let connector = connector_with(transport, 10_000);
    let ids = vigil_core::connector::FeedProvider::poll_feed(&connector, "UC1")
        .await
        .unwrap();
    assert_eq!(ids, vec!["fresh".to_string()]);
    // The feed is free.
    assert_eq!(connector.governor().quota_consumed(), 0);
}
