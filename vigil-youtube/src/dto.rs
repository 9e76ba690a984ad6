//! Validated DTOs for the upstream JSON payloads.
//!
//! Payloads are reduced to the normalized model here; a record that fails
//! validation is dropped by the caller, never propagated unshaped.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use vigil_core::{ChannelRef, Stream, VigilError, match_keywords};
use vigil_types::{DiscoveryMethod, Platform, StreamStatus};

/// search.list response: ids only, details resolved by a batched videos call.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    /// Matched search results.
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

/// One search.list result.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    /// Compound id object.
    pub id: SearchItemId,
}

/// Id object inside a search result.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchItemId {
    /// Video id when the result is a video.
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
}

/// videos.list response.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoListResponse {
    /// Resolved videos; ids absent upstream are simply missing here.
    #[serde(default)]
    pub items: Vec<Video>,
}

/// One videos.list item.
#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    /// Video id.
    pub id: String,
    /// Basic metadata.
    pub snippet: Option<VideoSnippet>,
    /// Live-broadcast details; absent for plain uploads.
    #[serde(rename = "liveStreamingDetails")]
    pub live_details: Option<LiveStreamingDetails>,
    /// View statistics. Counts arrive as strings.
    pub statistics: Option<Statistics>,
}

/// snippet part of a video.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoSnippet {
    /// Video title.
    pub title: String,
    /// Video description.
    #[serde(default)]
    pub description: String,
    /// Owning channel id.
    #[serde(rename = "channelId")]
    pub channel_id: String,
    /// Owning channel display name.
    #[serde(rename = "channelTitle")]
    pub channel_title: String,
    /// Thumbnails by size key.
    #[serde(default)]
    pub thumbnails: Thumbnails,
    /// Declared content language.
    #[serde(rename = "defaultLanguage")]
    pub default_language: Option<String>,
    /// Declared audio language, used as a fallback.
    #[serde(rename = "defaultAudioLanguage")]
    pub default_audio_language: Option<String>,
}

/// Thumbnail variants.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnails {
    /// High-resolution variant.
    pub high: Option<Thumbnail>,
    /// Default variant.
    pub default: Option<Thumbnail>,
}

/// One thumbnail variant.
#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    /// Image URL.
    pub url: String,
}

/// liveStreamingDetails part of a video.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveStreamingDetails {
    /// Set once the broadcast has started.
    #[serde(rename = "actualStartTime")]
    pub actual_start_time: Option<String>,
    /// Set once the broadcast has finished.
    #[serde(rename = "actualEndTime")]
    pub actual_end_time: Option<String>,
    /// Concurrent viewers; the API serializes this as a string.
    #[serde(rename = "concurrentViewers")]
    pub concurrent_viewers: Option<String>,
}

/// statistics part of a video.
#[derive(Debug, Clone, Deserialize)]
pub struct Statistics {
    /// Cumulative views, serialized as a string.
    #[serde(rename = "viewCount")]
    pub view_count: Option<String>,
    /// Subscriber count, serialized as a string (channels.list).
    #[serde(rename = "subscriberCount")]
    pub subscriber_count: Option<String>,
}

/// channels.list response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelListResponse {
    /// Resolved channels.
    #[serde(default)]
    pub items: Vec<ChannelItem>,
}

/// One channels.list item.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelItem {
    /// Channel id.
    pub id: String,
    /// Basic metadata.
    pub snippet: Option<ChannelSnippet>,
    /// Subscriber statistics.
    pub statistics: Option<Statistics>,
}

/// snippet part of a channel.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelSnippet {
    /// Channel display name.
    pub title: String,
    /// Account creation timestamp.
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
    /// Thumbnails by size key.
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

impl Video {
    /// Lifecycle status derived from the live-broadcast markers.
    ///
    /// Returns `None` for plain uploads, which never enter the catalog.
    #[must_use]
    pub fn live_status(&self) -> Option<StreamStatus> {
        let details = self.live_details.as_ref()?;
        if details.actual_end_time.is_some() {
            Some(StreamStatus::Ended)
        } else if details.actual_start_time.is_some() {
            Some(StreamStatus::Live)
        } else {
            Some(StreamStatus::Upcoming)
        }
    }

    /// Concurrent viewers when live, falling back to cumulative views.
    #[must_use]
    pub fn viewer_count(&self) -> u64 {
        let concurrent = self
            .live_details
            .as_ref()
            .and_then(|d| d.concurrent_viewers.as_deref())
            .and_then(|v| v.parse().ok());
        concurrent.unwrap_or_else(|| {
            self.statistics
                .as_ref()
                .and_then(|s| s.view_count.as_deref())
                .and_then(|v| v.parse().ok())
                .unwrap_or(0)
        })
    }
}

/// Reduce one resolved video to a normalized stream.
///
/// Returns `Ok(None)` for videos without a live marker and `Err` when a
/// required field is missing or malformed.
pub fn video_to_stream(
    video: &Video,
    keywords: &[String],
    method: DiscoveryMethod,
    now: DateTime<Utc>,
) -> Result<Option<Stream>, VigilError> {
    let Some(status) = video.live_status() else {
        return Ok(None);
    };
    if status.is_terminal() {
        return Ok(None);
    }
    let snippet = video
        .snippet
        .as_ref()
        .ok_or_else(|| VigilError::parse(format!("video {} has no snippet", video.id)))?;

    let start_time = video
        .live_details
        .as_ref()
        .and_then(|d| d.actual_start_time.as_deref())
        .map(parse_timestamp)
        .transpose()?;

    let thumbnail = snippet
        .thumbnails
        .high
        .as_ref()
        .or(snippet.thumbnails.default.as_ref())
        .map(|t| t.url.clone());

    let mut stream = Stream::new(
        Platform::YouTube,
        video.id.clone(),
        ChannelRef {
            platform_channel_id: snippet.channel_id.clone(),
            display_name: snippet.channel_title.clone(),
            url: Some(format!(
                "https://www.youtube.com/channel/{}",
                snippet.channel_id
            )),
            avatar_url: None,
        },
        snippet.title.clone(),
        now,
    );
    stream.status = status;
    stream.description = (!snippet.description.is_empty()).then(|| snippet.description.clone());
    stream.thumbnail_url = thumbnail;
    stream.embed_url = Some(format!("https://www.youtube.com/watch?v={}", video.id));
    stream.viewer_count = video.viewer_count();
    stream.start_time = start_time;
    stream.matched_keywords = match_keywords(&snippet.title, keywords);
    stream.language = snippet
        .default_language
        .clone()
        .or_else(|| snippet.default_audio_language.clone());
    stream.discovery_method = method;
    Ok(Some(stream))
}

/// Parse an upstream ISO-8601 timestamp into UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, VigilError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| VigilError::parse(format!("bad timestamp {raw}: {e}")))
}
