//! vigil
//!
//! The orchestrator: wires platform connectors to the catalog and drives
//! the two-phase polling architecture — an expensive discovery loop and a
//! cheap liveness loop per platform, plus daily and hourly maintenance —
//! under per-connector quota and circuit-breaker governance.
#![warn(missing_docs)]

mod scheduler;
mod settings;
mod tasks;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{info, warn};

use vigil_catalog::CatalogStore;
use vigil_core::{StreamConnector, VigilError};
use vigil_types::{ConnectorReport, Platform, ScheduleConfig};

pub use scheduler::{QueueLabel, VigilHandle};
pub use settings::Settings;

/// Channel metadata fetched this recently is not re-fetched; refreshing a
/// channel costs quota on the metered platform.
const CHANNEL_REFRESH_TTL: Duration = Duration::from_secs(60 * 60);
/// Upper bound on cached channel keys.
const CHANNEL_CACHE_CAPACITY: u64 = 10_000;

/// The assembled ingestion engine.
///
/// Owns timers and connector references; the catalog is a passive
/// dependency injected at build time and borrowed by tasks.
pub struct Vigil {
    catalog: CatalogStore,
    connectors: Vec<Arc<dyn StreamConnector>>,
    schedule: ScheduleConfig,
    keywords: Vec<String>,
    quota_reset_schedule: cron::Schedule,
    archive_schedule: cron::Schedule,
    channel_cache: Cache<String, ()>,
}

impl std::fmt::Debug for Vigil {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vigil")
            .field("connectors", &self.connectors.len())
            .field("schedule", &self.schedule)
            .field("keywords", &self.keywords)
            .finish()
    }
}

/// Builder for [`Vigil`].
pub struct VigilBuilder {
    catalog: Option<CatalogStore>,
    connectors: Vec<Arc<dyn StreamConnector>>,
    schedule: ScheduleConfig,
    keywords: Vec<String>,
}

impl VigilBuilder {
    fn new() -> Self {
        Self {
            catalog: None,
            connectors: Vec::new(),
            schedule: ScheduleConfig::default(),
            keywords: Vec::new(),
        }
    }

    /// Set the catalog store every task writes through. Required.
    #[must_use]
    pub fn catalog(mut self, catalog: CatalogStore) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Register a platform connector.
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn StreamConnector>) -> Self {
        self.connectors.push(connector);
        self
    }

    /// Override the task cadences and limits.
    #[must_use]
    pub fn schedule(mut self, schedule: ScheduleConfig) -> Self {
        self.schedule = schedule;
        self
    }

    /// Configure the discovery keywords. Empty means every adapter uses
    /// its built-in defaults.
    #[must_use]
    pub fn keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    /// Validate and assemble the engine.
    ///
    /// Rejects a missing catalog, duplicate platform registrations, and
    /// malformed cron expressions.
    pub fn build(self) -> Result<Vigil, VigilError> {
        let catalog = self
            .catalog
            .ok_or_else(|| VigilError::InvalidArg("a catalog store is required".to_string()))?;

        let mut platforms = Vec::new();
        for connector in &self.connectors {
            let platform = connector.platform();
            if platforms.contains(&platform) {
                return Err(VigilError::InvalidArg(format!(
                    "duplicate connector for platform {platform}"
                )));
            }
            platforms.push(platform);
        }

        let quota_reset_schedule = cron::Schedule::from_str(&self.schedule.quota_reset_cron)
            .map_err(|e| VigilError::InvalidArg(format!("bad quota reset cron: {e}")))?;
        let archive_schedule = cron::Schedule::from_str(&self.schedule.archive_cron)
            .map_err(|e| VigilError::InvalidArg(format!("bad archive cron: {e}")))?;

        Ok(Vigil {
            catalog,
            connectors: self.connectors,
            schedule: self.schedule,
            keywords: self.keywords,
            quota_reset_schedule,
            archive_schedule,
            channel_cache: Cache::builder()
                .max_capacity(CHANNEL_CACHE_CAPACITY)
                .time_to_live(CHANNEL_REFRESH_TTL)
                .build(),
        })
    }
}

impl Vigil {
    /// Returns a fresh builder.
    #[must_use]
    pub fn builder() -> VigilBuilder {
        VigilBuilder::new()
    }

    /// The catalog the engine writes through.
    #[must_use]
    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    pub(crate) fn connector_for(&self, platform: Platform) -> Option<&Arc<dyn StreamConnector>> {
        self.connectors.iter().find(|c| c.platform() == platform)
    }

    /// Operator-visible governance snapshots for every connector.
    #[must_use]
    pub fn status_reports(&self) -> Vec<ConnectorReport> {
        self.connectors.iter().map(|c| c.report()).collect()
    }

    /// Switch a platform's connector off. A disabled breaker never
    /// self-clears, so the platform stays dark until a restart.
    ///
    /// Returns `false` when no connector serves the platform.
    pub fn disable_platform(&self, platform: Platform) -> bool {
        match self.connector_for(platform) {
            Some(connector) => {
                warn!(platform = %platform, "connector disabled by configuration");
                connector.governor().disable();
                true
            }
            None => false,
        }
    }

    /// Authenticate every registered connector, logging failures.
    ///
    /// Best-effort: a connector that cannot authenticate stays registered
    /// and will keep recording errors until its breaker pauses it.
    pub async fn authenticate_all(&self) {
        for connector in &self.connectors {
            match connector.authenticate().await {
                Ok(()) => info!(connector = connector.name(), "authenticated"),
                Err(e) => warn!(connector = connector.name(), error = %e, "authentication failed"),
            }
        }
    }

    /// Spawn every periodic task loop and return a handle over them.
    ///
    /// Loops per registered connector: one discovery task and one liveness
    /// task for each advertised capability, each with its platform's
    /// cadence. Plus the maintenance set: daily quota reset, hourly
    /// priority refresh, daily archive pass.
    #[must_use]
    pub fn start(self: &Arc<Self>) -> VigilHandle {
        let scheduler = scheduler::Scheduler::new(
            self.schedule.workers_per_queue,
            self.schedule.task_time_limit,
        );
        let mut handles = Vec::new();

        for connector in &self.connectors {
            let platform = connector.platform();
            if connector.as_discovery_provider().is_some() {
                let vigil = Arc::clone(self);
                handles.push(scheduler.spawn_periodic(
                    &format!("discovery({platform})"),
                    QueueLabel::Discovery,
                    self.schedule.discovery_every(platform),
                    move || {
                        let vigil = Arc::clone(&vigil);
                        Box::pin(async move {
                            vigil.run_discovery(platform).await;
                        })
                    },
                ));
            }
            if connector.as_liveness_provider().is_some() {
                let vigil = Arc::clone(self);
                handles.push(scheduler.spawn_periodic(
                    &format!("liveness({platform})"),
                    QueueLabel::Liveness,
                    self.schedule.liveness_every(platform),
                    move || {
                        let vigil = Arc::clone(&vigil);
                        Box::pin(async move {
                            vigil.run_liveness(platform).await;
                        })
                    },
                ));
            }
        }

        let vigil = Arc::clone(self);
        handles.push(scheduler.spawn_cron(
            "reset-daily-quotas",
            QueueLabel::Maintenance,
            self.quota_reset_schedule.clone(),
            move || {
                let vigil = Arc::clone(&vigil);
                Box::pin(async move {
                    vigil.reset_quotas();
                })
            },
        ));

        let vigil = Arc::clone(self);
        handles.push(scheduler.spawn_periodic(
            "priority-refresh",
            QueueLabel::Maintenance,
            self.schedule.priority_refresh_every,
            move || {
                let vigil = Arc::clone(&vigil);
                Box::pin(async move {
                    vigil.refresh_priorities().await;
                })
            },
        ));

        let vigil = Arc::clone(self);
        handles.push(scheduler.spawn_cron(
            "archive-old",
            QueueLabel::Maintenance,
            self.archive_schedule.clone(),
            move || {
                let vigil = Arc::clone(&vigil);
                Box::pin(async move {
                    vigil.archive_old().await;
                })
            },
        ));

        info!(tasks = handles.len(), "scheduler started");
        VigilHandle::new(handles)
    }
}
