//! Vigil-specific enums, configuration primitives, and report envelopes.
#![warn(missing_docs)]

mod config;
mod connector;
mod platform;
mod reports;

pub use config::{
    BackoffConfig, BreakerConfig, CatalogConfig, QuotaConfig, ScheduleConfig, TwitchConfig,
    YouTubeConfig,
};
pub use connector::{ConnectorKey, ConnectorStatus};
pub use platform::{
    DiscoveryMethod, ParseEnumError, Platform, PollingPriority, StreamStatus,
};
pub use reports::ConnectorReport;
