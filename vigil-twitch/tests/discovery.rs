mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{FakeHelix, builder_with, connector_with, live_channel, offline_channel, stream_item};
use vigil_core::connector::{ChannelProvider, DiscoveryProvider, StreamConnector};
use vigil_core::VigilError;
use vigil_twitch::RateLimitInfo;
use vigil_twitch::dto::UserItem;
use vigil_types::{ConnectorStatus, Platform};

fn kw(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

#[tokio::test]
async fn discovery_merges_search_and_category_scan() {
    let transport = Arc::new(FakeHelix::default());
    transport.search_by_query.lock().unwrap().insert(
        "protest".to_string(),
        vec![live_channel("1", "StreetCam"), offline_channel("2", "Asleep")],
    );
    transport
        .users_queue
        .lock()
        .unwrap()
        .push(Ok(vec![stream_item("1", "protest downtown", 300)]));
    transport.streams_by_game.lock().unwrap().insert(
        "509672".to_string(),
        vec![
            stream_item("1", "protest downtown", 300),
            stream_item("3", "rally on main street", 120),
            stream_item("4", "ranked gaming grind", 9000),
        ],
    );

    let connector = connector_with(transport.clone());
    let streams = connector.discover(&kw(&["protest", "rally"])).await.unwrap();

    // User 1 appears in both strategies but is deduplicated; user 4 never
    // matches a keyword; user 2 was not live.
    let mut ids: Vec<&str> = streams.iter().map(|s| s.platform_stream_id.as_str()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["1", "3"]);

    let rally = streams.iter().find(|s| s.platform_stream_id == "3").unwrap();
    assert_eq!(rally.platform, Platform::Twitch);
    assert_eq!(rally.matched_keywords, kw(&["rally"]));
    assert_eq!(
        rally.thumbnail_url.as_deref(),
        Some("https://static-cdn.example/1280x720.jpg")
    );

    // Only live search hits were resolved through /streams.
    assert_eq!(transport.users_call_sizes(), vec![1]);
}

#[tokio::test]
async fn discovery_reuses_a_fresh_token() {
    let transport = Arc::new(FakeHelix::default());
    let connector = connector_with(transport.clone());

    connector.discover(&kw(&["protest"])).await.unwrap();
    connector.discover(&kw(&["protest"])).await.unwrap();

    assert_eq!(transport.token_call_count(), 1);
}

#[tokio::test]
async fn rate_limit_proximity_pauses_until_declared_reset() {
    let transport = Arc::new(FakeHelix::default());
    let reset = Utc::now() + Duration::milliseconds(80);
    *transport.rate_limit.lock().unwrap() = Some(RateLimitInfo {
        remaining: 10,
        reset,
    });
    transport
        .search_by_query
        .lock()
        .unwrap()
        .insert("protest".to_string(), vec![]);

    let connector = connector_with(transport);
    connector.discover(&kw(&["protest"])).await.unwrap();

    assert_eq!(connector.governor().status(), ConnectorStatus::Paused);
    assert!(!connector.governor().is_operational());

    tokio::time::sleep(std::time::Duration::from_millis(120)).await;
    assert!(connector.governor().is_operational());
    assert_eq!(connector.governor().status(), ConnectorStatus::Active);
}

#[tokio::test]
async fn generous_rate_budget_does_not_pause() {
    let transport = Arc::new(FakeHelix::default());
    *transport.rate_limit.lock().unwrap() = Some(RateLimitInfo {
        remaining: 700,
        reset: Utc::now() + Duration::seconds(60),
    });

    let connector = connector_with(transport);
    connector.discover(&[]).await.unwrap();
    assert_eq!(connector.governor().status(), ConnectorStatus::Active);
}

#[tokio::test]
async fn authenticate_requires_credentials() {
    let connector = vigil_twitch::TwitchConnector::builder(vigil_types::TwitchConfig::default())
        .transport(Arc::new(FakeHelix::default()))
        .build()
        .unwrap();
    assert!(matches!(
        connector.authenticate().await,
        Err(VigilError::Auth { .. })
    ));

    let ok = builder_with(Arc::new(FakeHelix::default())).build().unwrap();
    assert!(ok.authenticate().await.is_ok());
}

#[tokio::test]
async fn channel_lookup_combines_user_and_followers() {
    let transport = Arc::new(FakeHelix::default());
    let created = Utc::now() - Duration::days(365);
    transport.user_lookup.lock().unwrap().push(UserItem {
        id: "4411".to_string(),
        display_name: "StreetCam".to_string(),
        login: "streetcam".to_string(),
        profile_image_url: Some("https://static-cdn.example/avatar.png".to_string()),
        created_at: Some(created.to_rfc3339()),
    });
    *transport.follower_count.lock().unwrap() = 100_000;

    let connector = connector_with(transport);
    let channel = connector.channel("4411").await.unwrap().unwrap();

    assert_eq!(channel.platform, Platform::Twitch);
    assert_eq!(channel.display_name, "StreetCam");
    assert_eq!(channel.subscriber_count, 100_000);
    assert!((channel.trust_score - 0.80).abs() < f64::EPSILON);

    assert!(connector.channel("unknown").await.unwrap().is_none());
}
