//! Scripted Helix transport for exercising the connector without a network.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use vigil_core::VigilError;
use vigil_types::{BackoffConfig, TwitchConfig};
use vigil_twitch::dto::{
    FollowersResponse, Page, SearchChannelItem, StreamItem, TokenResponse, UserItem,
};
use vigil_twitch::{HelixResponse, HelixTransport, RateLimitInfo, TwitchBuilder, TwitchConnector};

#[derive(Default)]
pub struct FakeHelix {
    pub search_by_query: Mutex<HashMap<String, Vec<SearchChannelItem>>>,
    pub streams_by_game: Mutex<HashMap<String, Vec<StreamItem>>>,
    pub users_queue: Mutex<Vec<Result<Vec<StreamItem>, VigilError>>>,
    pub user_lookup: Mutex<Vec<UserItem>>,
    pub follower_count: Mutex<u64>,
    pub rate_limit: Mutex<Option<RateLimitInfo>>,
    pub token_calls: AtomicU32,
    pub users_calls: Mutex<Vec<Vec<String>>>,
}

impl FakeHelix {
    pub fn token_call_count(&self) -> u32 {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn users_call_sizes(&self) -> Vec<usize> {
        self.users_calls.lock().unwrap().iter().map(Vec::len).collect()
    }

    fn wrap<T>(&self, body: T) -> HelixResponse<T> {
        HelixResponse {
            body,
            rate_limit: *self.rate_limit.lock().unwrap(),
        }
    }
}

#[async_trait]
impl HelixTransport for FakeHelix {
    async fn token(&self) -> Result<TokenResponse, VigilError> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        Ok(TokenResponse {
            access_token: "fake-token".to_string(),
            expires_in: 3600,
        })
    }

    async fn search_channels(
        &self,
        _bearer: &str,
        query: &str,
        _first: u32,
    ) -> Result<HelixResponse<Page<SearchChannelItem>>, VigilError> {
        let data = self
            .search_by_query
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default();
        Ok(self.wrap(Page { data }))
    }

    async fn streams_by_category(
        &self,
        _bearer: &str,
        game_id: &str,
        _first: u32,
    ) -> Result<HelixResponse<Page<StreamItem>>, VigilError> {
        let data = self
            .streams_by_game
            .lock()
            .unwrap()
            .get(game_id)
            .cloned()
            .unwrap_or_default();
        Ok(self.wrap(Page { data }))
    }

    async fn streams_by_users(
        &self,
        _bearer: &str,
        user_ids: &[String],
    ) -> Result<HelixResponse<Page<StreamItem>>, VigilError> {
        self.users_calls.lock().unwrap().push(user_ids.to_vec());
        match self.users_queue.lock().unwrap().pop() {
            Some(Ok(data)) => Ok(self.wrap(Page { data })),
            Some(Err(e)) => Err(e),
            None => Ok(self.wrap(Page { data: vec![] })),
        }
    }

    async fn user(
        &self,
        _bearer: &str,
        user_id: &str,
    ) -> Result<HelixResponse<Page<UserItem>>, VigilError> {
        let data = self
            .user_lookup
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.id == user_id)
            .cloned()
            .collect();
        Ok(self.wrap(Page { data }))
    }

    async fn follower_total(
        &self,
        _bearer: &str,
        _broadcaster_id: &str,
    ) -> Result<HelixResponse<FollowersResponse>, VigilError> {
        let total = *self.follower_count.lock().unwrap();
        Ok(self.wrap(FollowersResponse { total }))
    }
}

pub fn live_channel(id: &str, name: &str) -> SearchChannelItem {
    SearchChannelItem {
        id: id.to_string(),
        display_name: name.to_string(),
        is_live: true,
    }
}

pub fn offline_channel(id: &str, name: &str) -> SearchChannelItem {
    SearchChannelItem {
        id: id.to_string(),
        display_name: name.to_string(),
        is_live: false,
    }
}

pub fn stream_item(user_id: &str, title: &str, viewers: u64) -> StreamItem {
    StreamItem {
        user_id: user_id.to_string(),
        user_name: format!("user{user_id}"),
        title: title.to_string(),
        viewer_count: viewers,
        started_at: "2026-08-01T08:00:00Z".to_string(),
        thumbnail_url: "https://static-cdn.example/{width}x{height}.jpg".to_string(),
        language: Some("en".to_string()),
    }
}

pub fn builder_with(transport: std::sync::Arc<FakeHelix>) -> TwitchBuilder {
    TwitchConnector::builder(TwitchConfig {
        client_id: "cid".to_string(),
        client_secret: "secret".to_string(),
        rate_limit_safety_threshold: 50,
    })
    .backoff(BackoffConfig {
        base: std::time::Duration::from_millis(1),
        cap: std::time::Duration::from_millis(2),
        max_attempts: 3,
    })
    .transport(transport)
}

pub fn connector_with(transport: std::sync::Arc<FakeHelix>) -> TwitchConnector {
    builder_with(transport).build().unwrap()
}
