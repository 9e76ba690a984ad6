//! Scripted transport for exercising the connector without a network.

use std::sync::Mutex;

use async_trait::async_trait;

use vigil_core::VigilError;
use vigil_types::{BackoffConfig, YouTubeConfig};
use vigil_youtube::dto::{
    ChannelListResponse, LiveStreamingDetails, SearchItem, SearchItemId, SearchResponse,
    Statistics, Thumbnail, Thumbnails, Video, VideoListResponse, VideoSnippet,
};
use vigil_youtube::{YouTubeBuilder, YouTubeConnector, YtTransport};

#[derive(Default)]
pub struct FakeTransport {
    pub search_responses: Mutex<Vec<Result<SearchResponse, VigilError>>>,
    pub video_responses: Mutex<Vec<Result<VideoListResponse, VigilError>>>,
    pub channel_responses: Mutex<Vec<Result<ChannelListResponse, VigilError>>>,
    pub feed_xml: Mutex<Option<String>>,
    pub search_calls: Mutex<Vec<String>>,
    pub video_calls: Mutex<Vec<Vec<String>>>,
}

impl FakeTransport {
    pub fn search_call_count(&self) -> usize {
        self.search_calls.lock().unwrap().len()
    }

    pub fn video_call_sizes(&self) -> Vec<usize> {
        self.video_calls.lock().unwrap().iter().map(Vec::len).collect()
    }
}

#[async_trait]
impl YtTransport for FakeTransport {
    async fn search_live(
        &self,
        query: &str,
        _max_results: u32,
    ) -> Result<SearchResponse, VigilError> {
        self.search_calls.lock().unwrap().push(query.to_string());
        self.search_responses
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Ok(SearchResponse { items: vec![] }))
    }

    async fn videos(&self, ids: &[String]) -> Result<VideoListResponse, VigilError> {
        self.video_calls.lock().unwrap().push(ids.to_vec());
        self.video_responses
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Ok(VideoListResponse { items: vec![] }))
    }

    async fn channel(&self, _channel_id: &str) -> Result<ChannelListResponse, VigilError> {
        self.channel_responses
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Ok(ChannelListResponse { items: vec![] }))
    }

    async fn fetch_feed(&self, _channel_id: &str) -> Result<String, VigilError> {
        match self.feed_xml.lock().unwrap().clone() {
            Some(xml) => Ok(xml),
            None => Err(VigilError::upstream("fake", "no feed scripted")),
        }
    }
}

pub fn search_ids(ids: &[&str]) -> SearchResponse {
    SearchResponse {
        items: ids
            .iter()
            .map(|id| SearchItem {
                id: SearchItemId {
                    video_id: Some((*id).to_string()),
                },
            })
            .collect(),
    }
}

pub fn live_video(id: &str, title: &str, viewers: u64) -> Video {
    Video {
        id: id.to_string(),
        snippet: Some(VideoSnippet {
            title: title.to_string(),
            description: "on the ground".to_string(),
            channel_id: format!("UC-{id}"),
            channel_title: format!("channel {id}"),
            thumbnails: Thumbnails {
                high: Some(Thumbnail {
                    url: format!("https://i.ytimg.com/{id}/hq.jpg"),
                }),
                default: None,
            },
            default_language: Some("en".to_string()),
            default_audio_language: None,
        }),
        live_details: Some(LiveStreamingDetails {
            actual_start_time: Some("2026-08-01T10:00:00Z".to_string()),
            actual_end_time: None,
            concurrent_viewers: Some(viewers.to_string()),
        }),
        statistics: Some(Statistics {
            view_count: Some("100000".to_string()),
            subscriber_count: None,
        }),
    }
}

pub fn connector_with(
    transport: std::sync::Arc<FakeTransport>,
    quota_limit: u64,
) -> YouTubeConnector {
    builder_with(transport, quota_limit).build().unwrap()
}

pub fn builder_with(
    transport: std::sync::Arc<FakeTransport>,
    quota_limit: u64,
) -> YouTubeBuilder {
    YouTubeConnector::builder(YouTubeConfig {
        api_key: "test-key".to_string(),
        quota_limit,
        search_interval: std::time::Duration::from_secs(30 * 60),
    })
    .backoff(BackoffConfig {
        base: std::time::Duration::from_millis(1),
        cap: std::time::Duration::from_millis(2),
        max_attempts: 3,
    })
    .transport(transport)
}
