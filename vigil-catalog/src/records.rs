//! Catalog row shapes and their SQL decoding.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use vigil_core::{GeoTag, VigilError};
use vigil_types::{DiscoveryMethod, Platform, PollingPriority, StreamStatus};

/// A persisted channel row, internal id included.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelRecord {
    /// Internal opaque id minted on first sight.
    pub id: Uuid,
    /// Platform this channel broadcasts on.
    pub platform: Platform,
    /// Platform-specific channel id.
    pub platform_channel_id: String,
    /// Display name.
    pub display_name: String,
    /// Avatar URL.
    pub avatar_url: Option<String>,
    /// Derived trust score in [0, 1].
    pub trust_score: f64,
    /// Subscriber/follower count.
    pub subscriber_count: u64,
    /// Upstream account creation timestamp.
    pub account_created_at: Option<DateTime<Utc>>,
    /// When connector metadata was last refreshed.
    pub last_scraped_at: Option<DateTime<Utc>>,
    /// When this channel was last observed live.
    pub last_live_at: Option<DateTime<Utc>>,
    /// Derived polling tier.
    pub polling_priority: PollingPriority,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Row update time.
    pub updated_at: DateTime<Utc>,
}

/// A persisted stream row, catalog bookkeeping included.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRecord {
    /// Internal opaque id minted on first sight.
    pub id: Uuid,
    /// Internal id of the owning channel.
    pub channel_id: Uuid,
    /// Platform the stream runs on (joined from the channel row).
    pub platform: Platform,
    /// Platform-specific stream id.
    pub platform_stream_id: String,
    /// Stream title.
    pub title: String,
    /// Stream description.
    pub description: Option<String>,
    /// Thumbnail URL.
    pub thumbnail_url: Option<String>,
    /// Embeddable player URL.
    pub embed_url: Option<String>,
    /// Lifecycle status.
    pub status: StreamStatus,
    /// Most recently observed concurrent viewers.
    pub viewer_count: u64,
    /// Highest viewer count ever observed; monotonically non-decreasing.
    pub peak_viewer_count: u64,
    /// Broadcast start, when known.
    pub start_time: Option<DateTime<Utc>>,
    /// Broadcast end; set exactly when the status is terminal.
    pub end_time: Option<DateTime<Utc>>,
    /// When vigil first saw this stream.
    pub detected_at: DateTime<Utc>,
    /// Last liveness confirmation.
    pub last_checked_at: DateTime<Utc>,
    /// Distinct keywords matched at discovery time.
    pub matched_keywords: Vec<String>,
    /// Language tag.
    pub language: Option<String>,
    /// Coarse location.
    pub geo: GeoTag,
    /// How the stream entered the catalog.
    pub discovery_method: DiscoveryMethod,
    /// Hidden from feeds (moderation).
    pub is_hidden: bool,
    /// Number of distinct moderation reports.
    pub report_count: u32,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Row update time.
    pub updated_at: DateTime<Utc>,
}

pub(crate) fn map_db_err(e: sqlx::Error) -> VigilError {
    VigilError::catalog(e.to_string())
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid, VigilError> {
    Uuid::parse_str(raw).map_err(|e| VigilError::catalog(format!("malformed row id {raw}: {e}")))
}

fn get<'r, T>(row: &'r SqliteRow, column: &str) -> Result<T, VigilError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column).map_err(map_db_err)
}

pub(crate) fn channel_from_row(row: &SqliteRow) -> Result<ChannelRecord, VigilError> {
    let id: String = get(row, "id")?;
    let platform: String = get(row, "platform")?;
    let priority: String = get(row, "polling_priority")?;
    let subscriber_count: i64 = get(row, "subscriber_count")?;
    Ok(ChannelRecord {
        id: parse_id(&id)?,
        platform: platform
            .parse::<Platform>()
            .map_err(|e| VigilError::catalog(e.to_string()))?,
        platform_channel_id: get(row, "platform_channel_id")?,
        display_name: get(row, "display_name")?,
        avatar_url: get(row, "avatar_url")?,
        trust_score: get(row, "trust_score")?,
        subscriber_count: u64::try_from(subscriber_count).unwrap_or_default(),
        account_created_at: get(row, "account_created_at")?,
        last_scraped_at: get(row, "last_scraped_at")?,
        last_live_at: get(row, "last_live_at")?,
        polling_priority: priority
            .parse::<PollingPriority>()
            .map_err(|e| VigilError::catalog(e.to_string()))?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

pub(crate) fn stream_from_row(row: &SqliteRow) -> Result<StreamRecord, VigilError> {
    let id: String = get(row, "id")?;
    let channel_id: String = get(row, "channel_id")?;
    let platform: String = get(row, "platform")?;
    let status: String = get(row, "status")?;
    let method: String = get(row, "discovery_method")?;
    let viewer_count: i64 = get(row, "viewer_count")?;
    let peak_viewer_count: i64 = get(row, "peak_viewer_count")?;
    let report_count: i64 = get(row, "report_count")?;
    let keywords_json: String = get(row, "matched_keywords")?;
    let matched_keywords: Vec<String> = serde_json::from_str(&keywords_json)
        .map_err(|e| VigilError::catalog(format!("malformed matched_keywords: {e}")))?;
    Ok(StreamRecord {
        id: parse_id(&id)?,
        channel_id: parse_id(&channel_id)?,
        platform: platform
            .parse::<Platform>()
            .map_err(|e| VigilError::catalog(e.to_string()))?,
        platform_stream_id: get(row, "platform_stream_id")?,
        title: get(row, "title")?,
        description: get(row, "description")?,
        thumbnail_url: get(row, "thumbnail_url")?,
        embed_url: get(row, "embed_url")?,
        status: status
            .parse::<StreamStatus>()
            .map_err(|e| VigilError::catalog(e.to_string()))?,
        viewer_count: u64::try_from(viewer_count).unwrap_or_default(),
        peak_viewer_count: u64::try_from(peak_viewer_count).unwrap_or_default(),
        start_time: get(row, "start_time")?,
        end_time: get(row, "end_time")?,
        detected_at: get(row, "detected_at")?,
        last_checked_at: get(row, "last_checked_at")?,
        matched_keywords,
        language: get(row, "language")?,
        geo: GeoTag {
            city: get(row, "geo_city")?,
            region: get(row, "geo_region")?,
            country: get(row, "geo_country")?,
        },
        discovery_method: method
            .parse::<DiscoveryMethod>()
            .map_err(|e| VigilError::catalog(e.to_string()))?,
        is_hidden: get::<i64>(row, "is_hidden")? != 0,
        report_count: u32::try_from(report_count).unwrap_or_default(),
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}
