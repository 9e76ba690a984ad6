//! Environment-driven configuration for the daemon.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use vigil_types::{CatalogConfig, Platform, ScheduleConfig, TwitchConfig, YouTubeConfig};

/// Everything the daemon needs, resolved from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Catalog connection settings.
    pub catalog: CatalogConfig,
    /// Task cadences and limits.
    pub schedule: ScheduleConfig,
    /// Quota-metered connector credentials, when configured.
    pub youtube: Option<YouTubeConfig>,
    /// Rate-budgeted connector credentials, when configured.
    pub twitch: Option<TwitchConfig>,
    /// Discovery keywords; empty means adapter defaults.
    pub keywords: Vec<String>,
    /// Platforms switched off by configuration; their connectors are
    /// registered but their breakers are set to DISABLED at startup.
    pub disabled_platforms: Vec<Platform>,
}

impl Settings {
    /// Resolve settings from the process environment.
    ///
    /// A connector without credentials in the environment is simply left
    /// unconfigured; malformed numeric overrides fall back to defaults
    /// with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        let catalog = CatalogConfig {
            url: env_string("VIGIL_DATABASE_URL")
                .unwrap_or_else(|| "sqlite://vigil.db".to_string()),
            max_connections: env_parsed("VIGIL_DB_MAX_CONNECTIONS")
                .unwrap_or(CatalogConfig::default().max_connections),
        };

        let mut schedule = ScheduleConfig::default();
        if let Some(secs) = env_parsed::<u64>("VIGIL_TASK_TIME_LIMIT_SECS") {
            schedule.task_time_limit = Duration::from_secs(secs);
        }
        if let Some(workers) = env_parsed::<usize>("VIGIL_WORKERS_PER_QUEUE") {
            schedule.workers_per_queue = workers;
        }
        if let Some(days) = env_parsed::<i64>("VIGIL_ARCHIVE_RETENTION_DAYS") {
            schedule.archive_retention_days = days;
        }

        let youtube = env_string("YOUTUBE_API_KEY").map(|api_key| YouTubeConfig {
            api_key,
            quota_limit: env_parsed("YOUTUBE_QUOTA_LIMIT")
                .unwrap_or(YouTubeConfig::default().quota_limit),
            search_interval: Duration::from_secs(
                env_parsed::<u64>("YOUTUBE_SEARCH_INTERVAL_MINUTES").unwrap_or(30) * 60,
            ),
        });

        let twitch = match (env_string("TWITCH_CLIENT_ID"), env_string("TWITCH_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(TwitchConfig {
                client_id,
                client_secret,
                rate_limit_safety_threshold: env_parsed("TWITCH_RATE_LIMIT_SAFETY_THRESHOLD")
                    .unwrap_or(TwitchConfig::default().rate_limit_safety_threshold),
            }),
            _ => None,
        };

        let keywords = env_string("VIGIL_KEYWORDS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let disabled_platforms = env_string("VIGIL_DISABLED_PLATFORMS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .filter_map(|s| match s.parse() {
                        Ok(platform) => Some(platform),
                        Err(_) => {
                            warn!(platform = s, "ignoring unknown platform in disable list");
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            catalog,
            schedule,
            youtube,
            twitch,
            keywords,
            disabled_platforms,
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parsed<T: FromStr>(key: &str) -> Option<T> {
    let raw = env_string(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, raw, "ignoring malformed environment override");
            None
        }
    }
}
