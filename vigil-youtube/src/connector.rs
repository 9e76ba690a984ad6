use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use vigil_core::connector::{
    ChannelProvider, DiscoveryProvider, FeedProvider, LivenessProvider, StreamConnector,
};
use vigil_core::{
    Channel, Governor, Stream, StreamUpdate, VigilError, retry_with_backoff, scoring,
};
use vigil_types::{
    BackoffConfig, BreakerConfig, DiscoveryMethod, Platform, QuotaConfig, YouTubeConfig,
};

use crate::dto::{self, Video};
use crate::feed;
use crate::transport::{HttpTransport, YtTransport};

/// Units debited per search.list call.
const SEARCH_COST: u64 = 100;
/// Units debited per videos.list or channels.list call.
const LIST_COST: u64 = 1;
/// Ids accepted per videos.list call.
const LIVENESS_BATCH: usize = 50;
/// Results requested per search.
const SEARCH_RESULTS: u32 = 20;

const DEFAULT_INCLUDE: &[&str] = &[
    "protest",
    "rally",
    "march",
    "demonstration",
    "activism",
    "police",
    "riot",
    "civil unrest",
    "breaking news",
    "live coverage",
];

const DEFAULT_EXCLUDE: &[&str] = &[
    "gaming",
    "gameplay",
    "let's play",
    "walkthrough",
    "reaction",
    "review",
    "trailer",
    "music video",
];

/// Quota-metered connector: a small daily unit budget, an expensive search
/// endpoint, and a cheap batched validation endpoint.
///
/// The three-pronged strategy: feed monitoring costs nothing, searches are
/// surgical and interval-guarded, and everything else rides the 1-unit
/// batch endpoint.
pub struct YouTubeConnector {
    transport: Arc<dyn YtTransport>,
    governor: Governor,
    backoff: BackoffConfig,
    include_keywords: Vec<String>,
    exclude_keywords: Vec<String>,
    search_interval: Duration,
    last_search: Mutex<Option<Instant>>,
    has_credentials: bool,
}

/// Builder for [`YouTubeConnector`].
pub struct YouTubeBuilder {
    config: YouTubeConfig,
    breaker: BreakerConfig,
    backoff: BackoffConfig,
    include_keywords: Vec<String>,
    exclude_keywords: Vec<String>,
    transport: Option<Arc<dyn YtTransport>>,
}

impl YouTubeBuilder {
    fn new(config: YouTubeConfig) -> Self {
        Self {
            config,
            breaker: BreakerConfig::default(),
            backoff: BackoffConfig::default(),
            include_keywords: DEFAULT_INCLUDE.iter().map(|s| (*s).to_string()).collect(),
            exclude_keywords: DEFAULT_EXCLUDE.iter().map(|s| (*s).to_string()).collect(),
            transport: None,
        }
    }

    /// Override the breaker tuning.
    #[must_use]
    pub fn breaker(mut self, breaker: BreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }

    /// Override the retry backoff.
    #[must_use]
    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Replace the default inclusion keywords.
    #[must_use]
    pub fn include_keywords(mut self, keywords: Vec<String>) -> Self {
        self.include_keywords = keywords;
        self
    }

    /// Replace the default exclusion keywords.
    #[must_use]
    pub fn exclude_keywords(mut self, keywords: Vec<String>) -> Self {
        self.exclude_keywords = keywords;
        self
    }

    /// Inject a transport (tests, proxies) instead of the real HTTP one.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn YtTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the connector.
    pub fn build(self) -> Result<YouTubeConnector, VigilError> {
        let has_credentials = !self.config.api_key.is_empty();
        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new(self.config.api_key.clone())?),
        };
        Ok(YouTubeConnector {
            transport,
            governor: Governor::new(
                Platform::YouTube,
                &QuotaConfig {
                    limit: self.config.quota_limit,
                    pause: QuotaConfig::default().pause,
                },
                self.breaker,
            ),
            backoff: self.backoff,
            include_keywords: self.include_keywords,
            exclude_keywords: self.exclude_keywords,
            search_interval: self.config.search_interval,
            last_search: Mutex::new(None),
            has_credentials,
        })
    }
}

impl YouTubeConnector {
    /// Returns a builder seeded with the given configuration.
    #[must_use]
    pub fn builder(config: YouTubeConfig) -> YouTubeBuilder {
        YouTubeBuilder::new(config)
    }

    fn search_query(&self, keywords: &[String]) -> String {
        let include = if keywords.is_empty() {
            &self.include_keywords
        } else {
            keywords
        };
        let mut query = include.join(" OR ");
        for excluded in &self.exclude_keywords {
            query.push_str(" -");
            query.push_str(excluded);
        }
        query
    }

    /// True when the minimum interval since the previous search has not yet
    /// elapsed.
    fn search_too_recent(&self) -> bool {
        let last = self.last_search.lock().expect("search guard poisoned");
        matches!(*last, Some(at) if at.elapsed() < self.search_interval)
    }

    fn mark_searched(&self) {
        *self.last_search.lock().expect("search guard poisoned") = Some(Instant::now());
    }

    fn keywords_in_effect<'a>(&'a self, requested: &'a [String]) -> &'a [String] {
        if requested.is_empty() {
            &self.include_keywords
        } else {
            requested
        }
    }

    async fn resolve_videos(&self, ids: &[String]) -> Result<Vec<Video>, VigilError> {
        let response = retry_with_backoff(&self.backoff, || self.transport.videos(ids)).await;
        match response {
            Ok(r) => {
                self.governor.record_success();
                Ok(r.items)
            }
            Err(e) => {
                self.governor.record_error(&e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl StreamConnector for YouTubeConnector {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    fn name(&self) -> &'static str {
        "vigil-youtube"
    }

    fn governor(&self) -> &Governor {
        &self.governor
    }

    async fn authenticate(&self) -> Result<(), VigilError> {
        // The Data API takes the key as a query parameter, so authentication
        // is a local credential check rather than a token exchange.
        if self.has_credentials {
            Ok(())
        } else {
            let err = VigilError::auth(self.name(), "no API key configured");
            self.governor.record_error(&err);
            Err(err)
        }
    }

    fn as_discovery_provider(&self) -> Option<&dyn DiscoveryProvider> {
        Some(self)
    }

    fn as_liveness_provider(&self) -> Option<&dyn LivenessProvider> {
        Some(self)
    }

    fn as_channel_provider(&self) -> Option<&dyn ChannelProvider> {
        Some(self)
    }

    fn as_feed_provider(&self) -> Option<&dyn FeedProvider> {
        Some(self)
    }
}

#[async_trait]
impl DiscoveryProvider for YouTubeConnector {
    async fn discover(&self, keywords: &[String]) -> Result<Vec<Stream>, VigilError> {
        if !self.governor.is_operational() {
            return Ok(Vec::new());
        }
        if self.search_too_recent() {
            debug!("skipping search, previous one was too recent");
            return Ok(Vec::new());
        }
        if !self.governor.consume_quota(SEARCH_COST) {
            return Ok(Vec::new());
        }

        let query = self.search_query(keywords);
        info!(%query, "searching for live streams");
        let search = retry_with_backoff(&self.backoff, || {
            self.transport.search_live(&query, SEARCH_RESULTS)
        })
        .await;
        let search = match search {
            Ok(s) => {
                self.mark_searched();
                self.governor.record_success();
                s
            }
            Err(e) => {
                self.governor.record_error(&e);
                return Err(e);
            }
        };

        let ids: Vec<String> = search
            .items
            .into_iter()
            .filter_map(|item| item.id.video_id)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        // Full detail rides the cheap batch endpoint; bail with nothing if
        // the budget ran out between the two calls.
        if !self.governor.consume_quota(LIST_COST) {
            return Ok(Vec::new());
        }

        let videos = self.resolve_videos(&ids).await?;
        let effective = self.keywords_in_effect(keywords);
        let now = Utc::now();
        let mut seen = HashSet::new();
        let mut streams = Vec::new();
        for video in &videos {
            match dto::video_to_stream(video, effective, DiscoveryMethod::Search, now) {
                Ok(Some(stream)) => {
                    if seen.insert(stream.platform_stream_id.clone()) {
                        streams.push(stream);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    // A single malformed record is dropped, not fatal.
                    warn!(video = %video.id, error = %e, "dropping unparseable video");
                }
            }
        }
        info!(discovered = streams.len(), "search finished");
        Ok(streams)
    }

    async fn resolve(&self, ids: &[String]) -> Result<Vec<Stream>, VigilError> {
        if !self.governor.is_operational() || ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut seen = HashSet::new();
        let mut streams = Vec::new();
        for chunk in ids.chunks(LIVENESS_BATCH) {
            if !self.governor.consume_quota(LIST_COST) {
                break;
            }
            let videos = self.resolve_videos(chunk).await?;
            let now = Utc::now();
            for video in &videos {
                match dto::video_to_stream(video, &self.include_keywords, DiscoveryMethod::Rss, now)
                {
                    Ok(Some(stream)) => {
                        if seen.insert(stream.platform_stream_id.clone()) {
                            streams.push(stream);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(video = %video.id, error = %e, "dropping unparseable video");
                    }
                }
            }
        }
        Ok(streams)
    }
}

#[async_trait]
impl LivenessProvider for YouTubeConnector {
    async fn check_liveness(&self, ids: &[String]) -> Result<Vec<StreamUpdate>, VigilError> {
        if !self.governor.is_operational() || ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut updates = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(LIVENESS_BATCH) {
            if !self.governor.consume_quota(LIST_COST) {
                break;
            }
            let videos = match self.resolve_videos(chunk).await {
                Ok(v) => v,
                // Skip the chunk rather than fabricate ENDED updates out of
                // a transport failure; the next tick retries from scratch.
                Err(_) => continue,
            };
            let now = Utc::now();
            for id in chunk {
                let update = videos
                    .iter()
                    .find(|v| &v.id == id)
                    .and_then(|video| {
                        video.live_status().map(|status| StreamUpdate {
                            platform_stream_id: id.clone(),
                            viewer_count: video.viewer_count(),
                            status,
                            last_checked_at: now,
                        })
                    })
                    .unwrap_or_else(|| StreamUpdate::ended(id.clone(), now));
                updates.push(update);
            }
        }
        Ok(updates)
    }

    fn batch_limit(&self) -> usize {
        LIVENESS_BATCH
    }
}

#[async_trait]
impl ChannelProvider for YouTubeConnector {
    async fn channel(&self, platform_channel_id: &str) -> Result<Option<Channel>, VigilError> {
        if !self.governor.consume_quota(LIST_COST) {
            return Err(VigilError::QuotaExhausted {
                remaining: self.governor.quota_remaining(),
            });
        }
        let response = retry_with_backoff(&self.backoff, || {
            self.transport.channel(platform_channel_id)
        })
        .await;
        let response = match response {
            Ok(r) => {
                self.governor.record_success();
                r
            }
            Err(e) => {
                self.governor.record_error(&e);
                return Err(e);
            }
        };

        let Some(item) = response.items.into_iter().next() else {
            return Ok(None);
        };
        let snippet = item
            .snippet
            .ok_or_else(|| VigilError::parse(format!("channel {} has no snippet", item.id)))?;
        let subscriber_count = item
            .statistics
            .as_ref()
            .and_then(|s| s.subscriber_count.as_deref())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let account_created_at = snippet
            .published_at
            .as_deref()
            .map(dto::parse_timestamp)
            .transpose()?;

        let now = Utc::now();
        let mut channel = Channel::new(Platform::YouTube, item.id, snippet.title);
        channel.avatar_url = snippet.thumbnails.default.map(|t| t.url);
        channel.subscriber_count = subscriber_count;
        channel.account_created_at = account_created_at;
        channel.last_scraped_at = Some(now);
        channel.trust_score = scoring::trust_score(
            account_created_at,
            subscriber_count,
            scoring::DEFAULT_HISTORY,
            now,
        );
        Ok(Some(channel))
    }
}

#[async_trait]
impl FeedProvider for YouTubeConnector {
    async fn poll_feed(&self, platform_channel_id: &str) -> Result<Vec<String>, VigilError> {
        let xml = retry_with_backoff(&self.backoff, || {
            self.transport.fetch_feed(platform_channel_id)
        })
        .await?;
        feed::fresh_video_ids(&xml, Utc::now())
    }
}
