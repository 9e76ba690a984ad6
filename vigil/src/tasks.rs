//! Task bodies driven by the scheduler.
//!
//! Every task is best-effort and idempotent: failures are logged and
//! recorded, never propagated, and the next tick resumes from scratch.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use vigil_core::{
    ApiUsageRecord, Stream, StreamConnector, VigilError, scoring,
};
use vigil_types::{Platform, PollingPriority, StreamStatus};

use crate::Vigil;

/// High-priority channels probed for feed hints per discovery run.
const FEED_PROBE_CHANNELS: i64 = 25;

impl Vigil {
    /// One discovery pass for a platform: search upstream, ingest the
    /// results, refresh channel metadata, chase feed hints, and append the
    /// usage record. Returns the number of streams ingested.
    pub async fn run_discovery(&self, platform: Platform) -> usize {
        let Some(connector) = self.connector_for(platform) else {
            return 0;
        };
        let connector = Arc::clone(connector);
        if !connector.governor().is_operational() {
            debug!(platform = %platform, "connector not operational, skipping discovery");
            return 0;
        }
        let Some(provider) = connector.as_discovery_provider() else {
            return 0;
        };

        let governor = connector.governor();
        let before = governor.quota_consumed();
        match provider.discover(&self.keywords).await {
            Ok(streams) => {
                let mut ingested = self.ingest_streams(platform, &streams).await;
                self.refresh_channels(platform, connector.as_ref(), &streams)
                    .await;
                ingested += self.probe_feeds(platform, connector.as_ref()).await;
                let units = governor.quota_consumed().saturating_sub(before);
                self.log_usage(platform, "discovery", units, true, None).await;
                info!(platform = %platform, ingested, units, "discovery task finished");
                ingested
            }
            Err(e) => {
                let units = governor.quota_consumed().saturating_sub(before);
                self.log_usage(platform, "discovery", units, false, Some(e.to_string()))
                    .await;
                warn!(platform = %platform, error = %e, "discovery task failed");
                0
            }
        }
    }

    /// One liveness pass for a platform: read the currently-LIVE ids from
    /// the catalog, check them upstream, and fold the updates back in.
    /// Returns the number of rows mutated.
    pub async fn run_liveness(&self, platform: Platform) -> usize {
        let Some(connector) = self.connector_for(platform) else {
            return 0;
        };
        let connector = Arc::clone(connector);
        if !connector.governor().is_operational() {
            debug!(platform = %platform, "connector not operational, skipping liveness");
            return 0;
        }
        let Some(provider) = connector.as_liveness_provider() else {
            return 0;
        };

        let ids = match self.catalog.live_stream_ids(platform).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(platform = %platform, error = %e, "could not read live ids");
                return 0;
            }
        };
        if ids.is_empty() {
            return 0;
        }

        let units = (ids.len() as u64).div_ceil(provider.batch_limit().max(1) as u64);
        match provider.check_liveness(&ids).await {
            Ok(updates) => {
                let mut applied = 0;
                for update in &updates {
                    // One retry per record, then drop it; the next poll
                    // observes the same upstream state again.
                    let result = match self.catalog.apply_update(platform, update).await {
                        Err(_) => self.catalog.apply_update(platform, update).await,
                        ok => ok,
                    };
                    match result {
                        Ok(true) => applied += 1,
                        Ok(false) => {}
                        Err(e) => {
                            warn!(
                                stream = %update.platform_stream_id,
                                error = %e,
                                "dropping update after failed writes"
                            );
                        }
                    }
                }
                self.log_usage(platform, "liveness", units, true, None).await;
                debug!(platform = %platform, checked = ids.len(), applied, "liveness task finished");
                applied
            }
            Err(e) => {
                self.log_usage(platform, "liveness", units, false, Some(e.to_string()))
                    .await;
                warn!(platform = %platform, error = %e, "liveness task failed");
                0
            }
        }
    }

    /// Zero the quota counters on every connector (daily rollover).
    pub fn reset_quotas(&self) {
        for connector in &self.connectors {
            connector.governor().reset_quota();
        }
    }

    /// Recompute every channel's polling tier in bulk.
    pub async fn refresh_priorities(&self) -> u64 {
        match self.catalog.refresh_polling_priorities(Utc::now()).await {
            Ok(touched) => {
                info!(touched, "polling priorities refreshed");
                touched
            }
            Err(e) => {
                warn!(error = %e, "priority refresh failed");
                0
            }
        }
    }

    /// Close stale LIVE rows and archive long-ended ones.
    pub async fn archive_old(&self) -> (u64, u64) {
        let retention = chrono::Duration::days(self.schedule.archive_retention_days);
        let stale = chrono::Duration::from_std(self.schedule.stale_live_after)
            .unwrap_or_else(|_| chrono::Duration::hours(6));
        match self
            .catalog
            .archive_streams(Utc::now(), retention, stale)
            .await
        {
            Ok(counts) => counts,
            Err(e) => {
                warn!(error = %e, "archive pass failed");
                (0, 0)
            }
        }
    }

    /// Upsert a batch of discovered streams, marking their channels live.
    async fn ingest_streams(&self, platform: Platform, streams: &[Stream]) -> usize {
        let mut ingested = 0;
        for stream in streams {
            match self.upsert_with_retry(stream).await {
                Ok(_) => {
                    ingested += 1;
                    if stream.status == StreamStatus::Live
                        && let Err(e) = self
                            .catalog
                            .mark_channel_live(
                                platform,
                                &stream.channel.platform_channel_id,
                                stream.last_checked_at,
                            )
                            .await
                    {
                        warn!(
                            channel = %stream.channel.platform_channel_id,
                            error = %e,
                            "could not mark channel live"
                        );
                    }
                }
                Err(e) => {
                    warn!(
                        stream = %stream.platform_stream_id,
                        error = %e,
                        "dropping stream after failed writes"
                    );
                }
            }
        }
        ingested
    }

    async fn upsert_with_retry(&self, stream: &Stream) -> Result<Uuid, VigilError> {
        match self.catalog.upsert_stream(stream).await {
            Err(_) => self.catalog.upsert_stream(stream).await,
            ok => ok,
        }
    }

    /// Refresh authoritative metadata for the channels behind a discovery
    /// batch, at most once per TTL window per channel.
    async fn refresh_channels(
        &self,
        platform: Platform,
        connector: &dyn StreamConnector,
        streams: &[Stream],
    ) {
        let Some(provider) = connector.as_channel_provider() else {
            return;
        };
        let mut seen = HashSet::new();
        for stream in streams {
            let pcid = &stream.channel.platform_channel_id;
            if !seen.insert(pcid.clone()) {
                continue;
            }
            let cache_key = format!("{platform}:{pcid}");
            if self.channel_cache.get(&cache_key).await.is_some() {
                continue;
            }
            match provider.channel(pcid).await {
                Ok(Some(mut channel)) => {
                    // Allowlisted channels carry a curated history term.
                    if let Ok(Some(row)) = self.catalog.channel(platform, pcid).await
                        && self.catalog.is_seeded(row.id).await.unwrap_or(false)
                    {
                        channel.trust_score = scoring::trust_score(
                            channel.account_created_at,
                            channel.subscriber_count,
                            scoring::SEEDED_HISTORY,
                            Utc::now(),
                        );
                    }
                    match self.catalog.upsert_channel(&channel).await {
                        Ok(_) => self.channel_cache.insert(cache_key, ()).await,
                        Err(e) => warn!(channel = %pcid, error = %e, "channel upsert failed"),
                    }
                }
                Ok(None) => debug!(channel = %pcid, "channel unknown upstream"),
                Err(e) => {
                    warn!(channel = %pcid, error = %e, "channel refresh failed");
                    // Quota blocks apply to the whole pass, not one channel.
                    if matches!(e, VigilError::QuotaExhausted { .. }) {
                        break;
                    }
                }
            }
        }
    }

    /// Poll the feeds of hot channels and resolve fresh hints into
    /// catalog rows through the cheap batch endpoint.
    async fn probe_feeds(&self, platform: Platform, connector: &dyn StreamConnector) -> usize {
        let Some(feed) = connector.as_feed_provider() else {
            return 0;
        };
        let Some(discovery) = connector.as_discovery_provider() else {
            return 0;
        };

        let channels = match self
            .catalog
            .channels_by_priority(PollingPriority::High, FEED_PROBE_CHANNELS)
            .await
        {
            Ok(channels) => channels,
            Err(e) => {
                warn!(error = %e, "could not load channels for feed probing");
                return 0;
            }
        };
        let live: HashSet<String> = match self.catalog.live_stream_ids(platform).await {
            Ok(ids) => ids.into_iter().collect(),
            Err(_) => HashSet::new(),
        };

        let mut hints = Vec::new();
        for channel in channels.iter().filter(|c| c.platform == platform) {
            match feed.poll_feed(&channel.platform_channel_id).await {
                Ok(ids) => hints.extend(ids.into_iter().filter(|id| !live.contains(id))),
                Err(e) => {
                    debug!(channel = %channel.platform_channel_id, error = %e, "feed poll failed");
                }
            }
        }
        hints.sort_unstable();
        hints.dedup();
        if hints.is_empty() {
            return 0;
        }

        match discovery.resolve(&hints).await {
            Ok(streams) => self.ingest_streams(platform, &streams).await,
            Err(e) => {
                warn!(error = %e, "hint resolution failed");
                0
            }
        }
    }

    async fn log_usage(
        &self,
        platform: Platform,
        endpoint: &str,
        units: u64,
        success: bool,
        error_message: Option<String>,
    ) {
        let record = ApiUsageRecord {
            platform,
            endpoint: endpoint.to_string(),
            units_consumed: units,
            success,
            error_message,
            at: Utc::now(),
        };
        if let Err(e) = self.catalog.log_api_usage(&record).await {
            warn!(platform = %platform, error = %e, "could not append usage record");
        }
    }
}
