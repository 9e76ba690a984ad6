//! Configuration types shared across the orchestrator and connectors.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Budget configuration for a quota-metered connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Maximum units that may be consumed between daily resets.
    pub limit: u64,
    /// How long the breaker stays tripped after the budget is exhausted.
    pub pause: Duration,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            limit: 10_000,
            pause: Duration::from_secs(300),
        }
    }
}

/// Circuit-breaker tuning shared by all connectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Error tally at which the breaker trips.
    pub max_errors: u32,
    /// Cool-off applied when the error tally trips the breaker.
    pub error_pause: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            max_errors: 5,
            error_pause: Duration::from_secs(600),
        }
    }
}

/// Exponential backoff configuration for retrying transient upstream errors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub base: Duration,
    /// Upper bound on any single delay.
    pub cap: Duration,
    /// Total attempts per upstream call, including the first.
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(2),
            cap: Duration::from_secs(60),
            max_attempts: 3,
        }
    }
}

/// Cadences and limits for the periodic task runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Discovery period for the quota-metered platform.
    pub youtube_discovery_every: Duration,
    /// Discovery period for the rate-budgeted platform.
    pub twitch_discovery_every: Duration,
    /// Liveness period for the quota-metered platform.
    pub youtube_liveness_every: Duration,
    /// Liveness period for the rate-budgeted platform.
    pub twitch_liveness_every: Duration,
    /// Period of the bulk polling-priority refresh.
    pub priority_refresh_every: Duration,
    /// Cron expression for the daily quota reset (UTC).
    pub quota_reset_cron: String,
    /// Cron expression for the daily archive pass (UTC).
    pub archive_cron: String,
    /// Hard wall-clock ceiling per task run.
    pub task_time_limit: Duration,
    /// Concurrent task slots per labeled queue.
    pub workers_per_queue: usize,
    /// ENDED streams older than this many days are archived as REMOVED.
    pub archive_retention_days: i64,
    /// LIVE rows unchecked for this long are closed as ENDED.
    pub stale_live_after: Duration,
}

impl ScheduleConfig {
    /// Discovery period for the given platform.
    #[must_use]
    pub const fn discovery_every(&self, platform: crate::Platform) -> Duration {
        match platform {
            crate::Platform::YouTube => self.youtube_discovery_every,
            crate::Platform::Twitch => self.twitch_discovery_every,
        }
    }

    /// Liveness period for the given platform.
    #[must_use]
    pub const fn liveness_every(&self, platform: crate::Platform) -> Duration {
        match platform {
            crate::Platform::YouTube => self.youtube_liveness_every,
            crate::Platform::Twitch => self.twitch_liveness_every,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            youtube_discovery_every: Duration::from_secs(30 * 60),
            twitch_discovery_every: Duration::from_secs(5 * 60),
            youtube_liveness_every: Duration::from_secs(2 * 60),
            twitch_liveness_every: Duration::from_secs(60),
            priority_refresh_every: Duration::from_secs(60 * 60),
            quota_reset_cron: "0 0 0 * * *".to_string(),
            archive_cron: "0 0 3 * * *".to_string(),
            task_time_limit: Duration::from_secs(300),
            workers_per_queue: 2,
            archive_retention_days: 7,
            stale_live_after: Duration::from_secs(6 * 60 * 60),
        }
    }
}

/// Credentials and tuning for the quota-metered connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubeConfig {
    /// Data API key.
    pub api_key: String,
    /// Daily unit budget.
    pub quota_limit: u64,
    /// Minimum interval between discovery searches.
    pub search_interval: Duration,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            quota_limit: 10_000,
            search_interval: Duration::from_secs(30 * 60),
        }
    }
}

/// Credentials and tuning for the rate-budgeted connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitchConfig {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Remaining-budget floor below which the connector pauses itself
    /// until the upstream's declared reset.
    pub rate_limit_safety_threshold: u64,
}

impl Default for TwitchConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            rate_limit_safety_threshold: 50,
        }
    }
}

/// Catalog connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// sqlite connection URL, e.g. `sqlite://vigil.db` or `sqlite::memory:`.
    pub url: String,
    /// Upper bound on pooled connections; acquisition past the bound
    /// fails fast instead of queueing indefinitely.
    pub max_connections: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 8,
        }
    }
}
