//! The catalog store: every durable row goes through here.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};
use uuid::Uuid;

use vigil_core::{
    ApiUsageRecord, Channel, ChannelRef, Follow, Report, Stream, StreamUpdate, VigilError,
};
use vigil_types::{CatalogConfig, Platform, PollingPriority, StreamStatus};

use crate::records::{ChannelRecord, StreamRecord, channel_from_row, map_db_err, parse_id, stream_from_row};

/// Distinct reports at which a stream is hidden from feeds.
const REPORT_HIDE_THRESHOLD: i64 = 5;

/// Transactional, key-addressable store for channels, streams, follows,
/// reports, quota usage, and seed channels.
///
/// All writes are single-row transactions; concurrent discovery inserts and
/// liveness updates for the same stream serialize on the row's natural key,
/// with peak viewer counts merged monotonically and terminal states sticky.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    pool: SqlitePool,
}

impl CatalogStore {
    /// Open (and create, if missing) the catalog at the configured URL and
    /// apply the schema.
    ///
    /// The pool is bounded; acquisition fails fast once `max_connections`
    /// are all busy rather than queueing indefinitely.
    pub async fn connect(cfg: &CatalogConfig) -> Result<Self, VigilError> {
        let options = SqliteConnectOptions::from_str(&cfg.url)
            .map_err(map_db_err)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(cfg.max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await
            .map_err(map_db_err)?;
        let store = Self { pool };
        store.migrate().await?;
        info!(url = %cfg.url, "catalog ready");
        Ok(store)
    }

    /// Apply the embedded schema. Idempotent.
    pub async fn migrate(&self) -> Result<(), VigilError> {
        sqlx::raw_sql(include_str!("schema.sql"))
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    // ==================== Channels ====================

    /// Insert or refresh a channel by its `(platform, platform_channel_id)`
    /// natural key, returning the internal id.
    ///
    /// Authoritative metadata (trust, subscribers, timestamps) overwrites
    /// the stored row; absent optional fields keep their stored values.
    pub async fn upsert_channel(&self, channel: &Channel) -> Result<Uuid, VigilError> {
        let now = Utc::now();
        let row = sqlx::query(
            r"
            INSERT INTO channels (
                id, platform, platform_channel_id, display_name, avatar_url,
                trust_score, subscriber_count, account_created_at,
                last_scraped_at, last_live_at, polling_priority,
                created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
            ON CONFLICT (platform, platform_channel_id) DO UPDATE SET
                display_name = excluded.display_name,
                avatar_url = COALESCE(excluded.avatar_url, channels.avatar_url),
                trust_score = excluded.trust_score,
                subscriber_count = excluded.subscriber_count,
                account_created_at =
                    COALESCE(excluded.account_created_at, channels.account_created_at),
                last_scraped_at =
                    COALESCE(excluded.last_scraped_at, channels.last_scraped_at),
                last_live_at = COALESCE(excluded.last_live_at, channels.last_live_at),
                polling_priority = excluded.polling_priority,
                updated_at = excluded.updated_at
            RETURNING id
            ",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(channel.platform.as_str())
        .bind(&channel.platform_channel_id)
        .bind(&channel.display_name)
        .bind(&channel.avatar_url)
        .bind(channel.trust_score)
        .bind(i64::try_from(channel.subscriber_count).unwrap_or(i64::MAX))
        .bind(channel.account_created_at)
        .bind(channel.last_scraped_at)
        .bind(channel.last_live_at)
        .bind(channel.polling_priority.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;
        let id: String = sqlx::Row::get(&row, "id");
        parse_id(&id)
    }

    /// Make sure a channel row exists for a discovery-time [`ChannelRef`],
    /// returning the internal id.
    ///
    /// Unlike [`upsert_channel`](Self::upsert_channel) this never clobbers
    /// derived attributes (trust, priority) or authoritative metadata with
    /// discovery-payload defaults; on conflict only the display name and
    /// avatar refresh.
    pub async fn ensure_channel(
        &self,
        platform: Platform,
        channel: &ChannelRef,
    ) -> Result<Uuid, VigilError> {
        let now = Utc::now();
        let row = sqlx::query(
            r"
            INSERT INTO channels (
                id, platform, platform_channel_id, display_name, avatar_url,
                created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            ON CONFLICT (platform, platform_channel_id) DO UPDATE SET
                display_name = excluded.display_name,
                avatar_url = COALESCE(excluded.avatar_url, channels.avatar_url),
                updated_at = excluded.updated_at
            RETURNING id
            ",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(platform.as_str())
        .bind(&channel.platform_channel_id)
        .bind(&channel.display_name)
        .bind(&channel.avatar_url)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;
        let id: String = sqlx::Row::get(&row, "id");
        parse_id(&id)
    }

    /// Fetch a channel by its natural key.
    pub async fn channel(
        &self,
        platform: Platform,
        platform_channel_id: &str,
    ) -> Result<Option<ChannelRecord>, VigilError> {
        let row = sqlx::query("SELECT * FROM channels WHERE platform = ?1 AND platform_channel_id = ?2")
            .bind(platform.as_str())
            .bind(platform_channel_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;
        row.as_ref().map(channel_from_row).transpose()
    }

    /// Channels in a polling tier, least recently scraped first.
    pub async fn channels_by_priority(
        &self,
        priority: PollingPriority,
        limit: i64,
    ) -> Result<Vec<ChannelRecord>, VigilError> {
        let rows = sqlx::query(
            r"
            SELECT * FROM channels
            WHERE polling_priority = ?1
            ORDER BY last_scraped_at ASC NULLS FIRST
            LIMIT ?2
            ",
        )
        .bind(priority.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        rows.iter().map(channel_from_row).collect()
    }

    /// Record that a channel was observed live at `at` and bump it into the
    /// hot polling tier.
    pub async fn mark_channel_live(
        &self,
        platform: Platform,
        platform_channel_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), VigilError> {
        sqlx::query(
            r"
            UPDATE channels
            SET last_live_at = ?3, polling_priority = 'high', updated_at = ?4
            WHERE platform = ?1 AND platform_channel_id = ?2
            ",
        )
        .bind(platform.as_str())
        .bind(platform_channel_id)
        .bind(at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    /// Recompute every channel's polling tier from `last_live_at` in bulk.
    /// Returns the number of rows touched.
    pub async fn refresh_polling_priorities(&self, now: DateTime<Utc>) -> Result<u64, VigilError> {
        let result = sqlx::query(
            r"
            UPDATE channels
            SET polling_priority = CASE
                    WHEN last_live_at IS NULL THEN 'medium'
                    WHEN last_live_at >= ?1 THEN 'high'
                    WHEN last_live_at >= ?2 THEN 'medium'
                    WHEN last_live_at >= ?3 THEN 'low'
                    ELSE 'dead'
                END,
                updated_at = ?4
            ",
        )
        .bind(now - chrono::Duration::hours(24))
        .bind(now - chrono::Duration::days(7))
        .bind(now - chrono::Duration::days(30))
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(result.rows_affected())
    }

    // ==================== Streams ====================

    /// Insert or merge a discovered stream, returning the internal id.
    ///
    /// The owning channel row is ensured first. On conflict the mutable
    /// metadata refreshes, `peak_viewer_count` only ever grows, `detected_at`
    /// and a non-null `start_time` are preserved, and terminal rows are left
    /// untouched.
    pub async fn upsert_stream(&self, stream: &Stream) -> Result<Uuid, VigilError> {
        let channel_id = self.ensure_channel(stream.platform, &stream.channel).await?;
        let now = Utc::now();
        let keywords = serde_json::to_string(&stream.matched_keywords)
            .map_err(|e| VigilError::catalog(e.to_string()))?;
        let viewer_count = i64::try_from(stream.viewer_count).unwrap_or(i64::MAX);
        let end_time = stream
            .status
            .is_terminal()
            .then_some(stream.last_checked_at);
        let row = sqlx::query(
            r"
            INSERT INTO streams (
                id, channel_id, platform_stream_id, title, description,
                thumbnail_url, embed_url, status, viewer_count,
                peak_viewer_count, start_time, end_time, detected_at,
                last_checked_at, matched_keywords, geo_city, geo_region,
                geo_country, language, discovery_method, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, ?10, ?11, ?12,
                    ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?20)
            ON CONFLICT (channel_id, platform_stream_id) DO UPDATE SET
                title = excluded.title,
                description = COALESCE(excluded.description, streams.description),
                thumbnail_url = COALESCE(excluded.thumbnail_url, streams.thumbnail_url),
                status = excluded.status,
                viewer_count = excluded.viewer_count,
                peak_viewer_count = MAX(streams.peak_viewer_count, excluded.viewer_count),
                start_time = COALESCE(streams.start_time, excluded.start_time),
                end_time = excluded.end_time,
                last_checked_at = excluded.last_checked_at,
                matched_keywords = excluded.matched_keywords,
                updated_at = excluded.updated_at
            WHERE streams.status NOT IN ('ENDED', 'REMOVED')
            RETURNING id
            ",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(channel_id.to_string())
        .bind(&stream.platform_stream_id)
        .bind(&stream.title)
        .bind(&stream.description)
        .bind(&stream.thumbnail_url)
        .bind(&stream.embed_url)
        .bind(stream.status.as_str())
        .bind(viewer_count)
        .bind(stream.start_time)
        .bind(end_time)
        .bind(stream.detected_at)
        .bind(stream.last_checked_at)
        .bind(keywords)
        .bind(&stream.geo.city)
        .bind(&stream.geo.region)
        .bind(&stream.geo.country)
        .bind(&stream.language)
        .bind(stream.discovery_method.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        match row {
            Some(row) => {
                let id: String = sqlx::Row::get(&row, "id");
                parse_id(&id)
            }
            // Conflict on a terminal row: the guarded update matched nothing,
            // so fetch the existing id.
            None => {
                let row = sqlx::query(
                    "SELECT id FROM streams WHERE channel_id = ?1 AND platform_stream_id = ?2",
                )
                .bind(channel_id.to_string())
                .bind(&stream.platform_stream_id)
                .fetch_one(&self.pool)
                .await
                .map_err(map_db_err)?;
                let id: String = sqlx::Row::get(&row, "id");
                parse_id(&id)
            }
        }
    }

    /// Fold one liveness observation into its stream row.
    ///
    /// Implements the status transition table; terminal rows ignore
    /// updates. Returns `true` when a row was mutated.
    pub async fn apply_update(
        &self,
        platform: Platform,
        update: &StreamUpdate,
    ) -> Result<bool, VigilError> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        let row = sqlx::query(
            r"
            SELECT s.id, s.status
            FROM streams s
            JOIN channels c ON s.channel_id = c.id
            WHERE c.platform = ?1 AND s.platform_stream_id = ?2
            ",
        )
        .bind(platform.as_str())
        .bind(&update.platform_stream_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_err)?;

        let Some(row) = row else {
            debug!(
                platform = %platform,
                stream = %update.platform_stream_id,
                "liveness update for unknown stream dropped"
            );
            return Ok(false);
        };

        let id: String = sqlx::Row::get(&row, "id");
        let status: String = sqlx::Row::get(&row, "status");
        let current = status
            .parse::<StreamStatus>()
            .map_err(|e| VigilError::catalog(e.to_string()))?;

        if current.is_terminal() {
            return Ok(false);
        }

        let viewer_count = i64::try_from(update.viewer_count).unwrap_or(i64::MAX);
        let now = Utc::now();

        let applied = match (current, update.status) {
            // Still on air: refresh counters.
            (StreamStatus::Live, StreamStatus::Live)
            | (StreamStatus::Live, StreamStatus::Upcoming)
            | (StreamStatus::Upcoming, StreamStatus::Upcoming) => {
                sqlx::query(
                    r"
                    UPDATE streams SET
                        viewer_count = ?2,
                        peak_viewer_count = MAX(peak_viewer_count, ?2),
                        last_checked_at = ?3,
                        updated_at = ?4
                    WHERE id = ?1
                    ",
                )
                .bind(&id)
                .bind(viewer_count)
                .bind(update.last_checked_at)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(map_db_err)?;
                true
            }
            // Scheduled broadcast went on air.
            (StreamStatus::Upcoming, StreamStatus::Live) => {
                sqlx::query(
                    r"
                    UPDATE streams SET
                        status = 'LIVE',
                        start_time = COALESCE(start_time, ?3),
                        viewer_count = ?2,
                        peak_viewer_count = MAX(peak_viewer_count, ?2),
                        last_checked_at = ?3,
                        updated_at = ?4
                    WHERE id = ?1
                    ",
                )
                .bind(&id)
                .bind(viewer_count)
                .bind(update.last_checked_at)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(map_db_err)?;
                true
            }
            // Broadcast finished (or was withdrawn): terminal from here on.
            (_, StreamStatus::Ended | StreamStatus::Removed) => {
                sqlx::query(
                    r"
                    UPDATE streams SET
                        status = ?5,
                        end_time = ?3,
                        viewer_count = ?2,
                        last_checked_at = ?3,
                        updated_at = ?4
                    WHERE id = ?1
                    ",
                )
                .bind(&id)
                .bind(viewer_count)
                .bind(update.last_checked_at)
                .bind(now)
                .bind(update.status.as_str())
                .execute(&mut *tx)
                .await
                .map_err(map_db_err)?;
                true
            }
            // Terminal current states returned early above.
            _ => false,
        };

        tx.commit().await.map_err(map_db_err)?;
        Ok(applied)
    }

    /// Platform stream ids currently LIVE on the given platform; the input
    /// of the cheap liveness loop.
    pub async fn live_stream_ids(&self, platform: Platform) -> Result<Vec<String>, VigilError> {
        let rows = sqlx::query(
            r"
            SELECT s.platform_stream_id
            FROM streams s
            JOIN channels c ON s.channel_id = c.id
            WHERE c.platform = ?1 AND s.status = 'LIVE'
            ",
        )
        .bind(platform.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(rows
            .iter()
            .map(|r| sqlx::Row::get::<String, _>(r, "platform_stream_id"))
            .collect())
    }

    /// Fetch a stream row by platform and platform stream id.
    pub async fn stream(
        &self,
        platform: Platform,
        platform_stream_id: &str,
    ) -> Result<Option<StreamRecord>, VigilError> {
        let row = sqlx::query(
            r"
            SELECT s.*, c.platform
            FROM streams s
            JOIN channels c ON s.channel_id = c.id
            WHERE c.platform = ?1 AND s.platform_stream_id = ?2
            ",
        )
        .bind(platform.as_str())
        .bind(platform_stream_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        row.as_ref().map(stream_from_row).transpose()
    }

    /// Visible LIVE streams, most-watched first.
    pub async fn live_streams(
        &self,
        platform: Option<Platform>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<StreamRecord>, VigilError> {
        let rows = match platform {
            Some(p) => sqlx::query(
                r"
                SELECT s.*, c.platform
                FROM streams s
                JOIN channels c ON s.channel_id = c.id
                WHERE s.status = 'LIVE' AND s.is_hidden = 0 AND c.platform = ?1
                ORDER BY s.viewer_count DESC
                LIMIT ?2 OFFSET ?3
                ",
            )
            .bind(p.as_str())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query(
                r"
                SELECT s.*, c.platform
                FROM streams s
                JOIN channels c ON s.channel_id = c.id
                WHERE s.status = 'LIVE' AND s.is_hidden = 0
                ORDER BY s.viewer_count DESC
                LIMIT ?1 OFFSET ?2
                ",
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await,
        }
        .map_err(map_db_err)?;
        rows.iter().map(stream_from_row).collect()
    }

    /// Visible recently ended streams, latest first.
    pub async fn recent_streams(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<StreamRecord>, VigilError> {
        let rows = sqlx::query(
            r"
            SELECT s.*, c.platform
            FROM streams s
            JOIN channels c ON s.channel_id = c.id
            WHERE s.status = 'ENDED' AND s.is_hidden = 0
            ORDER BY s.end_time DESC
            LIMIT ?1 OFFSET ?2
            ",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        rows.iter().map(stream_from_row).collect()
    }

    /// Close stale LIVE/UPCOMING rows and move long-ended rows to REMOVED.
    ///
    /// Rows are never deleted. Returns `(closed, archived)` counts.
    pub async fn archive_streams(
        &self,
        now: DateTime<Utc>,
        retention: chrono::Duration,
        stale_live_after: chrono::Duration,
    ) -> Result<(u64, u64), VigilError> {
        let closed = sqlx::query(
            r"
            UPDATE streams SET
                status = 'ENDED',
                end_time = last_checked_at,
                updated_at = ?2
            WHERE status IN ('LIVE', 'UPCOMING') AND last_checked_at < ?1
            ",
        )
        .bind(now - stale_live_after)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?
        .rows_affected();

        let archived = sqlx::query(
            r"
            UPDATE streams SET
                status = 'REMOVED',
                is_hidden = 1,
                updated_at = ?2
            WHERE status = 'ENDED' AND end_time < ?1
            ",
        )
        .bind(now - retention)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?
        .rows_affected();

        if closed > 0 || archived > 0 {
            info!(closed, archived, "archive pass finished");
        }
        Ok((closed, archived))
    }

    // ==================== Follows and reports ====================

    /// Record a follow. Returns `false` when it already existed.
    pub async fn follow_channel(
        &self,
        device_id: &str,
        channel_id: Uuid,
    ) -> Result<bool, VigilError> {
        let result = sqlx::query(
            r"
            INSERT INTO user_follows (user_device_id, channel_id, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(device_id)
        .bind(channel_id.to_string())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a follow. Returns `false` when there was nothing to remove.
    pub async fn unfollow_channel(
        &self,
        device_id: &str,
        channel_id: Uuid,
    ) -> Result<bool, VigilError> {
        let result =
            sqlx::query("DELETE FROM user_follows WHERE user_device_id = ?1 AND channel_id = ?2")
                .bind(device_id)
                .bind(channel_id.to_string())
                .execute(&self.pool)
                .await
                .map_err(map_db_err)?;
        Ok(result.rows_affected() > 0)
    }

    /// Raw follow rows for a device, most recent first.
    pub async fn follows(&self, device_id: &str) -> Result<Vec<Follow>, VigilError> {
        let rows = sqlx::query(
            r"
            SELECT user_device_id, channel_id, created_at
            FROM user_follows
            WHERE user_device_id = ?1
            ORDER BY created_at DESC
            ",
        )
        .bind(device_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        rows.iter()
            .map(|row| {
                let channel_id: String = sqlx::Row::get(row, "channel_id");
                Ok(Follow {
                    device_id: sqlx::Row::get(row, "user_device_id"),
                    channel_id: parse_id(&channel_id)?,
                    created_at: sqlx::Row::get(row, "created_at"),
                })
            })
            .collect()
    }

    /// Channels followed by a device, most recent follow first.
    pub async fn followed_channels(
        &self,
        device_id: &str,
    ) -> Result<Vec<ChannelRecord>, VigilError> {
        let rows = sqlx::query(
            r"
            SELECT c.*
            FROM channels c
            JOIN user_follows uf ON c.id = uf.channel_id
            WHERE uf.user_device_id = ?1
            ORDER BY uf.created_at DESC
            ",
        )
        .bind(device_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        rows.iter().map(channel_from_row).collect()
    }

    /// File a moderation report against a stream.
    ///
    /// One report per `(stream, device)`; a fresh report bumps the stream's
    /// report count and hides it once the threshold is crossed.
    pub async fn report_stream(
        &self,
        stream_id: Uuid,
        device_id: &str,
        reason: &str,
        notes: Option<&str>,
    ) -> Result<(), VigilError> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;
        let inserted = sqlx::query(
            r"
            INSERT INTO stream_reports (stream_id, reporter_device_id, reason, notes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(stream_id.to_string())
        .bind(device_id)
        .bind(reason)
        .bind(notes)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?
        .rows_affected();

        if inserted > 0 {
            sqlx::query(
                r"
                UPDATE streams SET
                    report_count = report_count + 1,
                    is_hidden = CASE
                        WHEN report_count + 1 >= ?2 THEN 1
                        ELSE is_hidden
                    END,
                    updated_at = ?3
                WHERE id = ?1
                ",
            )
            .bind(stream_id.to_string())
            .bind(REPORT_HIDE_THRESHOLD)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;
        }
        tx.commit().await.map_err(map_db_err)?;
        Ok(())
    }

    /// Reports filed against a stream, oldest first.
    pub async fn stream_reports(&self, stream_id: Uuid) -> Result<Vec<Report>, VigilError> {
        let rows = sqlx::query(
            r"
            SELECT stream_id, reporter_device_id, reason, notes, created_at
            FROM stream_reports
            WHERE stream_id = ?1
            ORDER BY created_at ASC
            ",
        )
        .bind(stream_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        rows.iter()
            .map(|row| {
                let raw_id: String = sqlx::Row::get(row, "stream_id");
                Ok(Report {
                    stream_id: parse_id(&raw_id)?,
                    device_id: sqlx::Row::get(row, "reporter_device_id"),
                    reason: sqlx::Row::get(row, "reason"),
                    notes: sqlx::Row::get(row, "notes"),
                    created_at: sqlx::Row::get(row, "created_at"),
                })
            })
            .collect()
    }

    // ==================== Usage log ====================

    /// Append an immutable API usage row.
    pub async fn log_api_usage(&self, record: &ApiUsageRecord) -> Result<(), VigilError> {
        sqlx::query(
            r"
            INSERT INTO api_usage_log
                (platform, endpoint, quota_units_consumed, success, error_message, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(record.platform.as_str())
        .bind(&record.endpoint)
        .bind(i64::try_from(record.units_consumed).unwrap_or(i64::MAX))
        .bind(record.success)
        .bind(&record.error_message)
        .bind(record.at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    /// Total units recorded for a platform since `since`.
    pub async fn quota_used_since(
        &self,
        platform: Platform,
        since: DateTime<Utc>,
    ) -> Result<u64, VigilError> {
        let row = sqlx::query(
            r"
            SELECT COALESCE(SUM(quota_units_consumed), 0) AS total
            FROM api_usage_log
            WHERE platform = ?1 AND created_at >= ?2
            ",
        )
        .bind(platform.as_str())
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;
        let total: i64 = sqlx::Row::get(&row, "total");
        Ok(u64::try_from(total).unwrap_or_default())
    }

    // ==================== Seed channels ====================

    /// Put a channel on the curated allowlist.
    pub async fn seed_channel(
        &self,
        channel_id: Uuid,
        category: &str,
        priority: PollingPriority,
    ) -> Result<(), VigilError> {
        sqlx::query(
            r"
            INSERT INTO seed_channels (channel_id, category, priority, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (channel_id) DO UPDATE SET
                category = excluded.category,
                priority = excluded.priority
            ",
        )
        .bind(channel_id.to_string())
        .bind(category)
        .bind(priority.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    /// Whether a channel is on the curated allowlist.
    pub async fn is_seeded(&self, channel_id: Uuid) -> Result<bool, VigilError> {
        let row = sqlx::query("SELECT 1 AS present FROM seed_channels WHERE channel_id = ?1")
            .bind(channel_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(row.is_some())
    }
}
