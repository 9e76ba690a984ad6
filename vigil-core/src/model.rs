//! The normalized data model every connector converges on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vigil_types::{DiscoveryMethod, Platform, PollingPriority, StreamStatus};

/// Width substituted into templated thumbnail URLs.
const THUMBNAIL_WIDTH: &str = "1280";
/// Height substituted into templated thumbnail URLs.
const THUMBNAIL_HEIGHT: &str = "720";

/// Broadcaster identity as observed alongside a stream.
///
/// A lightweight projection of [`Channel`]; discovery responses rarely carry
/// full channel metadata, so this is what a connector can fill without an
/// extra upstream call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRef {
    /// Platform-specific channel id.
    pub platform_channel_id: String,
    /// Display name at observation time.
    pub display_name: String,
    /// Public channel URL.
    pub url: Option<String>,
    /// Avatar URL, when the discovery payload carries one.
    pub avatar_url: Option<String>,
}

/// The broadcaster identity on a platform.
///
/// `(platform, platform_channel_id)` is the natural key; the catalog mints an
/// internal id on first sight. Channels are created by the first connector
/// that observes them and are never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Platform this channel broadcasts on.
    pub platform: Platform,
    /// Platform-specific channel id.
    pub platform_channel_id: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Avatar URL.
    pub avatar_url: Option<String>,
    /// Subscriber/follower count as last reported by the platform.
    pub subscriber_count: u64,
    /// When the account was created upstream.
    pub account_created_at: Option<DateTime<Utc>>,
    /// When connector metadata was last refreshed for this channel.
    pub last_scraped_at: Option<DateTime<Utc>>,
    /// When this channel was last observed live.
    pub last_live_at: Option<DateTime<Utc>>,
    /// Derived trust score in [0, 1].
    pub trust_score: f64,
    /// Derived polling tier.
    pub polling_priority: PollingPriority,
}

impl Channel {
    /// Build a channel with defaults for everything but identity.
    #[must_use]
    pub fn new(
        platform: Platform,
        platform_channel_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            platform_channel_id: platform_channel_id.into(),
            display_name: display_name.into(),
            avatar_url: None,
            subscriber_count: 0,
            account_created_at: None,
            last_scraped_at: None,
            last_live_at: None,
            trust_score: 0.5,
            polling_priority: PollingPriority::Medium,
        }
    }

    /// Zero-cost feed URL for this channel, when the platform publishes one.
    #[must_use]
    pub fn rss_url(&self) -> Option<String> {
        match self.platform {
            Platform::YouTube => Some(format!(
                "https://www.youtube.com/feeds/videos.xml?channel_id={}",
                self.platform_channel_id
            )),
            Platform::Twitch => None,
        }
    }
}

/// Coarse geo tag attached at discovery time.
///
/// Only as precise as the upstream supplies; never derived locally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoTag {
    /// City-level location.
    pub city: Option<String>,
    /// Region/state.
    pub region: Option<String>,
    /// ISO country name or code as supplied upstream.
    pub country: Option<String>,
}

/// The canonical cross-platform stream record produced by discovery.
///
/// `(platform, platform_stream_id)` is the natural key. The catalog adds the
/// durable bookkeeping (internal id, peak viewers, report counts) when the
/// record is upserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    /// Platform this broadcast runs on.
    pub platform: Platform,
    /// Platform-specific stream id.
    pub platform_stream_id: String,
    /// Broadcaster identity as observed.
    pub channel: ChannelRef,
    /// Stream title.
    pub title: String,
    /// Stream description, when available.
    pub description: Option<String>,
    /// Thumbnail URL, with size templates already normalized.
    pub thumbnail_url: Option<String>,
    /// Embeddable player URL.
    pub embed_url: Option<String>,
    /// Lifecycle status at observation time.
    pub status: StreamStatus,
    /// Concurrent viewers at observation time.
    pub viewer_count: u64,
    /// When the broadcast started, if the platform reports it.
    pub start_time: Option<DateTime<Utc>>,
    /// When vigil first saw this stream.
    pub detected_at: DateTime<Utc>,
    /// When the stream was last confirmed against upstream.
    pub last_checked_at: DateTime<Utc>,
    /// Distinct keywords whose case-insensitive match surfaced this stream.
    pub matched_keywords: Vec<String>,
    /// BCP-47-ish language tag as supplied upstream.
    pub language: Option<String>,
    /// Coarse location, when supplied upstream.
    pub geo: GeoTag,
    /// How this stream entered the catalog.
    pub discovery_method: DiscoveryMethod,
}

impl Stream {
    /// Build a live stream record with sensible defaults for optional fields.
    #[must_use]
    pub fn new(
        platform: Platform,
        platform_stream_id: impl Into<String>,
        channel: ChannelRef,
        title: impl Into<String>,
        detected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            platform,
            platform_stream_id: platform_stream_id.into(),
            channel,
            title: title.into(),
            description: None,
            thumbnail_url: None,
            embed_url: None,
            status: StreamStatus::Live,
            viewer_count: 0,
            start_time: None,
            detected_at,
            last_checked_at: detected_at,
            matched_keywords: Vec::new(),
            language: None,
            geo: GeoTag::default(),
            discovery_method: DiscoveryMethod::Search,
        }
    }
}

/// Ephemeral result of one liveness observation.
///
/// Never persisted as-is; the catalog folds it into the stream row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamUpdate {
    /// Platform-specific stream id the observation refers to.
    pub platform_stream_id: String,
    /// Concurrent viewers, 0 when the stream was absent upstream.
    pub viewer_count: u64,
    /// Observed lifecycle status.
    pub status: StreamStatus,
    /// Poll instant.
    pub last_checked_at: DateTime<Utc>,
}

impl StreamUpdate {
    /// Update for an id the upstream no longer reports as live.
    #[must_use]
    pub fn ended(platform_stream_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            platform_stream_id: platform_stream_id.into(),
            viewer_count: 0,
            status: StreamStatus::Ended,
            last_checked_at: at,
        }
    }
}

/// Immutable audit row describing one upstream interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiUsageRecord {
    /// Platform the call targeted.
    pub platform: Platform,
    /// Logical endpoint label (e.g. "search", "liveness").
    pub endpoint: String,
    /// Quota units the interaction consumed.
    pub units_consumed: u64,
    /// Whether the interaction succeeded.
    pub success: bool,
    /// Failure detail when `success` is false.
    pub error_message: Option<String>,
    /// When the interaction happened.
    pub at: DateTime<Utc>,
}

/// A device following a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
    /// Opaque device identifier.
    pub device_id: String,
    /// Internal channel id.
    pub channel_id: Uuid,
    /// When the follow was created.
    pub created_at: DateTime<Utc>,
}

/// A moderation report filed against a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Internal stream id.
    pub stream_id: Uuid,
    /// Opaque reporting device identifier.
    pub device_id: String,
    /// Short machine-readable reason.
    pub reason: String,
    /// Free-form reporter notes.
    pub notes: Option<String>,
    /// When the report was filed.
    pub created_at: DateTime<Utc>,
}

/// Distinct keywords matching `title` by case-insensitive substring.
///
/// Returns the keywords in their requested form, each at most once,
/// preserving request order.
#[must_use]
pub fn match_keywords(title: &str, keywords: &[String]) -> Vec<String> {
    let haystack = title.to_lowercase();
    let mut seen = Vec::new();
    let mut matched = Vec::new();
    for kw in keywords {
        let needle = kw.to_lowercase();
        if needle.is_empty() || seen.contains(&needle) {
            continue;
        }
        if haystack.contains(&needle) {
            seen.push(needle);
            matched.push(kw.clone());
        }
    }
    matched
}

/// Substitute templated size placeholders with the canonical 1280x720.
#[must_use]
pub fn normalize_thumbnail(url: &str) -> String {
    url.replace("{width}", THUMBNAIL_WIDTH)
        .replace("{height}", THUMBNAIL_HEIGHT)
}
