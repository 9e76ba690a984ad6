//! Validated DTOs for Helix payloads, reduced to the normalized model.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use vigil_core::{ChannelRef, Stream, VigilError, match_keywords, normalize_thumbnail};
use vigil_types::{DiscoveryMethod, Platform, StreamStatus};

/// OAuth client-credentials grant response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Bearer token value.
    pub access_token: String,
    /// Seconds until expiry.
    pub expires_in: i64,
}

/// Standard Helix `data` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    /// Page contents.
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// GET /search/channels item.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchChannelItem {
    /// Broadcaster user id.
    pub id: String,
    /// Broadcaster display name.
    pub display_name: String,
    /// Whether the broadcaster is live right now.
    pub is_live: bool,
}

/// GET /streams item.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamItem {
    /// Broadcaster user id. Liveness polls key on this.
    pub user_id: String,
    /// Broadcaster display name.
    pub user_name: String,
    /// Stream title.
    pub title: String,
    /// Concurrent viewers.
    #[serde(default)]
    pub viewer_count: u64,
    /// ISO-8601 broadcast start.
    pub started_at: String,
    /// Templated thumbnail URL (`{width}`/`{height}` placeholders).
    #[serde(default)]
    pub thumbnail_url: String,
    /// Stream language.
    pub language: Option<String>,
}

/// GET /users item.
#[derive(Debug, Clone, Deserialize)]
pub struct UserItem {
    /// User id.
    pub id: String,
    /// Display name.
    pub display_name: String,
    /// Login name (URL slug).
    pub login: String,
    /// Avatar URL.
    pub profile_image_url: Option<String>,
    /// Account creation timestamp.
    pub created_at: Option<String>,
}

/// GET /channels/followers envelope; only the total is interesting.
#[derive(Debug, Clone, Deserialize)]
pub struct FollowersResponse {
    /// Total follower count.
    #[serde(default)]
    pub total: u64,
}

/// Parse an upstream ISO-8601 timestamp into UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, VigilError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| VigilError::parse(format!("bad timestamp {raw}: {e}")))
}

/// Reduce one live stream item to the normalized model.
///
/// The broadcaster's user id doubles as the platform stream id, because the
/// liveness endpoint is keyed by user rather than by broadcast.
pub fn stream_item_to_stream(
    item: &StreamItem,
    keywords: &[String],
    now: DateTime<Utc>,
) -> Result<Stream, VigilError> {
    let start_time = parse_timestamp(&item.started_at)?;
    let channel_url = format!("https://www.twitch.tv/{}", item.user_name.to_lowercase());
    let mut stream = Stream::new(
        Platform::Twitch,
        item.user_id.clone(),
        ChannelRef {
            platform_channel_id: item.user_id.clone(),
            display_name: item.user_name.clone(),
            url: Some(channel_url.clone()),
            avatar_url: None,
        },
        item.title.clone(),
        now,
    );
    stream.status = StreamStatus::Live;
    stream.viewer_count = item.viewer_count;
    stream.start_time = Some(start_time);
    stream.thumbnail_url =
        (!item.thumbnail_url.is_empty()).then(|| normalize_thumbnail(&item.thumbnail_url));
    stream.embed_url = Some(channel_url);
    stream.language = item.language.clone();
    stream.matched_keywords = match_keywords(&item.title, keywords);
    stream.discovery_method = DiscoveryMethod::Search;
    Ok(stream)
}
