use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use vigil_core::connector::{
    ChannelProvider, DiscoveryProvider, LivenessProvider, StreamConnector,
};
use vigil_core::{
    Channel, Governor, PauseReason, Stream, StreamUpdate, VigilError, retry_with_backoff, scoring,
};
use vigil_types::{BackoffConfig, BreakerConfig, Platform, TwitchConfig};

use crate::dto::{self, StreamItem};
use crate::transport::{HelixTransport, HttpTransport, RateLimitInfo};

/// Ids accepted per GET /streams call.
const LIVENESS_BATCH: usize = 100;
/// Results requested per search or category page.
const PAGE_SIZE: u32 = 100;
/// Keyword searches performed per discovery run.
const SEARCH_KEYWORDS: usize = 5;
/// Refresh the token this long before its declared expiry.
const TOKEN_SLACK_SECS: i64 = 60;

/// Non-gaming categories worth scanning, id and human label.
const NEWS_CATEGORIES: &[(&str, &str)] = &[
    ("509672", "News & Politics"),
    ("509658", "Just Chatting"),
    ("509673", "Talk Shows & Podcasts"),
];

const DEFAULT_INCLUDE: &[&str] = &[
    "protest",
    "rally",
    "march",
    "demonstration",
    "activism",
    "police",
    "riot",
    "breaking",
    "live coverage",
    "news",
    "on the ground",
];

#[derive(Debug, Clone)]
struct BearerToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Rate-budgeted connector over the Helix API.
///
/// The budget is a short-window token bucket rather than a daily quota, so
/// governance keys off the `Ratelimit-*` response headers: when the
/// remaining budget sinks below the safety threshold the connector pauses
/// itself until the upstream's declared reset.
pub struct TwitchConnector {
    transport: Arc<dyn HelixTransport>,
    governor: Governor,
    backoff: BackoffConfig,
    include_keywords: Vec<String>,
    safety_threshold: u64,
    token: Mutex<Option<BearerToken>>,
    has_credentials: bool,
}

/// Builder for [`TwitchConnector`].
pub struct TwitchBuilder {
    config: TwitchConfig,
    breaker: BreakerConfig,
    backoff: BackoffConfig,
    include_keywords: Vec<String>,
    transport: Option<Arc<dyn HelixTransport>>,
}

impl TwitchBuilder {
    fn new(config: TwitchConfig) -> Self {
        Self {
            config,
            breaker: BreakerConfig::default(),
            backoff: BackoffConfig::default(),
            include_keywords: DEFAULT_INCLUDE.iter().map(|s| (*s).to_string()).collect(),
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

    /// Inject a transport (tests, proxies) instead of the real HTTP one.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn HelixTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the connector.
    pub fn build(self) -> Result<TwitchConnector, VigilError> {
        let has_credentials =
            !self.config.client_id.is_empty() && !self.config.client_secret.is_empty();
        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new(
                self.config.client_id.clone(),
                self.config.client_secret.clone(),
            )?),
        };
        Ok(TwitchConnector {
            transport,
            governor: Governor::unmetered(Platform::Twitch, self.breaker),
            backoff: self.backoff,
            include_keywords: self.include_keywords,
            safety_threshold: self.config.rate_limit_safety_threshold,
            token: Mutex::new(None),
            has_credentials,
        })
    }
}

impl TwitchConnector {
    /// Returns a builder seeded with the given configuration.
    #[must_use]
    pub fn builder(config: TwitchConfig) -> TwitchBuilder {
        TwitchBuilder::new(config)
    }

    fn keywords_in_effect<'a>(&'a self, requested: &'a [String]) -> &'a [String] {
        if requested.is_empty() {
            &self.include_keywords
        } else {
            requested
        }
    }

    /// Return a valid bearer token, refreshing through the transport when
    /// missing or about to expire.
    async fn ensure_token(&self) -> Result<String, VigilError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref()
            && token.expires_at - Duration::seconds(TOKEN_SLACK_SECS) > Utc::now()
        {
            return Ok(token.value.clone());
        }
        let response = retry_with_backoff(&self.backoff, || self.transport.token()).await;
        match response {
            Ok(token) => {
                info!("token refreshed");
                let bearer = BearerToken {
                    value: token.access_token,
                    expires_at: Utc::now() + Duration::seconds(token.expires_in),
                };
                let value = bearer.value.clone();
                *guard = Some(bearer);
                Ok(value)
            }
            Err(e) => {
                self.governor.record_error(&e);
                Err(e)
            }
        }
    }

    /// Record a failure, pausing until the declared reset when the
    /// upstream answered with a hard rate-limit rejection.
    fn note_failure(&self, e: &VigilError) {
        if let VigilError::RateLimited { reset_in_ms } = e {
            self.governor.pause(
                PauseReason::RateLimit,
                std::time::Duration::from_millis(*reset_in_ms),
            );
        }
        self.governor.record_error(e);
    }

    /// Fold one response's rate headers into the governor.
    fn observe_rate_limit(&self, info: Option<RateLimitInfo>) {
        let Some(info) = info else { return };
        if info.remaining < self.safety_threshold {
            warn!(
                remaining = info.remaining,
                threshold = self.safety_threshold,
                "rate budget near exhaustion"
            );
            self.governor
                .pause_until(PauseReason::RateLimit, info.reset);
        }
    }

    /// Keyword-search half of discovery: find live broadcasters by query,
    /// then resolve their streams through one batched /streams call.
    async fn search_streams(
        &self,
        bearer: &str,
        keywords: &[String],
    ) -> Vec<StreamItem> {
        let mut live_ids = Vec::new();
        for keyword in keywords.iter().take(SEARCH_KEYWORDS) {
            if !self.governor.is_operational() {
                break;
            }
            self.governor.consume_quota(1);
            let result = retry_with_backoff(&self.backoff, || {
                self.transport.search_channels(bearer, keyword, PAGE_SIZE)
            })
            .await;
            match result {
                Ok(response) => {
                    self.observe_rate_limit(response.rate_limit);
                    self.governor.record_success();
                    live_ids.extend(
                        response
                            .body
                            .data
                            .into_iter()
                            .filter(|c| c.is_live)
                            .map(|c| c.id),
                    );
                }
                Err(e) => {
                    warn!(keyword = %keyword, error = %e, "channel search failed");
                    self.note_failure(&e);
                }
            }
        }
        if live_ids.is_empty() {
            return Vec::new();
        }

        let mut items = Vec::new();
        for chunk in live_ids.chunks(LIVENESS_BATCH) {
            if !self.governor.is_operational() {
                break;
            }
            self.governor.consume_quota(1);
            let result = retry_with_backoff(&self.backoff, || {
                self.transport.streams_by_users(bearer, chunk)
            })
            .await;
            match result {
                Ok(response) => {
                    self.observe_rate_limit(response.rate_limit);
                    self.governor.record_success();
                    items.extend(response.body.data);
                }
                Err(e) => {
                    warn!(error = %e, "stream resolve failed");
                    self.note_failure(&e);
                }
            }
        }
        items
    }

    /// Category-scan half of discovery: pull the top live streams in the
    /// news-adjacent categories and keep keyword-matched titles.
    async fn scan_categories(&self, bearer: &str, keywords: &[String]) -> Vec<StreamItem> {
        let mut items = Vec::new();
        for (game_id, label) in NEWS_CATEGORIES {
            if !self.governor.is_operational() {
                break;
            }
            self.governor.consume_quota(1);
            let result = retry_with_backoff(&self.backoff, || {
                self.transport.streams_by_category(bearer, game_id, PAGE_SIZE)
            })
            .await;
            match result {
                Ok(response) => {
                    self.observe_rate_limit(response.rate_limit);
                    self.governor.record_success();
                    items.extend(
                        response
                            .body
                            .data
                            .into_iter()
                            .filter(|s| !vigil_core::match_keywords(&s.title, keywords).is_empty()),
                    );
                }
                Err(e) => {
                    warn!(category = label, error = %e, "category scan failed");
                    self.note_failure(&e);
                }
            }
        }
        items
    }
}

#[async_trait]
impl StreamConnector for TwitchConnector {
    fn platform(&self) -> Platform {
        Platform::Twitch
    }

    fn name(&self) -> &'static str {
        "vigil-twitch"
    }

    fn governor(&self) -> &Governor {
        &self.governor
    }

    async fn authenticate(&self) -> Result<(), VigilError> {
        if !self.has_credentials {
            let err = VigilError::auth(self.name(), "no client credentials configured");
            self.governor.record_error(&err);
            return Err(err);
        }
        // Force a refresh so expiry is tracked from this instant.
        *self.token.lock().await = None;
        self.ensure_token().await.map(|_| ())
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
}

#[async_trait]
impl DiscoveryProvider for TwitchConnector {
    async fn discover(&self, keywords: &[String]) -> Result<Vec<Stream>, VigilError> {
        if !self.governor.is_operational() {
            return Ok(Vec::new());
        }
        let bearer = self.ensure_token().await?;
        let effective = self.keywords_in_effect(keywords).to_vec();

        let mut items = self.search_streams(&bearer, &effective).await;
        items.extend(self.scan_categories(&bearer, &effective).await);

        let now = Utc::now();
        let mut seen = HashSet::new();
        let mut streams = Vec::new();
        for item in &items {
            if !seen.insert(item.user_id.clone()) {
                continue;
            }
            match dto::stream_item_to_stream(item, &effective, now) {
                Ok(stream) => streams.push(stream),
                Err(e) => {
                    warn!(user = %item.user_id, error = %e, "dropping unparseable stream");
                }
            }
        }
        info!(discovered = streams.len(), "discovery finished");
        Ok(streams)
    }
}

#[async_trait]
impl LivenessProvider for TwitchConnector {
    async fn check_liveness(&self, ids: &[String]) -> Result<Vec<StreamUpdate>, VigilError> {
        if !self.governor.is_operational() || ids.is_empty() {
            return Ok(Vec::new());
        }
        let bearer = self.ensure_token().await?;

        let mut updates = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(LIVENESS_BATCH) {
            if !self.governor.is_operational() {
                break;
            }
            self.governor.consume_quota(1);
            let result = retry_with_backoff(&self.backoff, || {
                self.transport.streams_by_users(bearer.as_str(), chunk)
            })
            .await;
            let response = match result {
                Ok(r) => r,
                // Skip the chunk rather than fabricate ENDED updates out of
                // a transport failure; the next tick retries from scratch.
                Err(e) => {
                    debug!(error = %e, "liveness chunk failed");
                    self.note_failure(&e);
                    continue;
                }
            };
            self.observe_rate_limit(response.rate_limit);
            self.governor.record_success();

            let now = Utc::now();
            for id in chunk {
                let update = response
                    .body
                    .data
                    .iter()
                    .find(|item| &item.user_id == id)
                    .map_or_else(
                        || StreamUpdate::ended(id.clone(), now),
                        |item| StreamUpdate {
                            platform_stream_id: id.clone(),
                            viewer_count: item.viewer_count,
                            status: vigil_types::StreamStatus::Live,
                            last_checked_at: now,
                        },
                    );
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
impl ChannelProvider for TwitchConnector {
    async fn channel(&self, platform_channel_id: &str) -> Result<Option<Channel>, VigilError> {
        let bearer = self.ensure_token().await?;
        self.governor.consume_quota(1);
        let response = retry_with_backoff(&self.backoff, || {
            self.transport.user(&bearer, platform_channel_id)
        })
        .await;
        let response = match response {
            Ok(r) => {
                self.observe_rate_limit(r.rate_limit);
                self.governor.record_success();
                r
            }
            Err(e) => {
                self.governor.record_error(&e);
                return Err(e);
            }
        };
        let Some(user) = response.body.data.into_iter().next() else {
            return Ok(None);
        };

        // Follower count rides a separate endpoint; a failure there should
        // not sink the whole lookup.
        self.governor.consume_quota(1);
        let followers = match retry_with_backoff(&self.backoff, || {
            self.transport.follower_total(&bearer, platform_channel_id)
        })
        .await
        {
            Ok(r) => {
                self.observe_rate_limit(r.rate_limit);
                r.body.total
            }
            Err(e) => {
                debug!(error = %e, "follower lookup failed, defaulting to 0");
                0
            }
        };

        let account_created_at = user
            .created_at
            .as_deref()
            .map(dto::parse_timestamp)
            .transpose()?;
        let now = Utc::now();
        let mut channel = Channel::new(Platform::Twitch, user.id, user.display_name);
        channel.avatar_url = user.profile_image_url;
        channel.subscriber_count = followers;
        channel.account_created_at = account_created_at;
        channel.last_scraped_at = Some(now);
        channel.trust_score = scoring::trust_score(
            account_created_at,
            followers,
            scoring::DEFAULT_HISTORY,
            now,
        );
        Ok(Some(channel))
    }
}
