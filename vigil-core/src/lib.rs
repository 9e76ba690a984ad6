//! vigil-core
//!
//! Core types, traits, and governance shared across the vigil ecosystem.
//!
//! - `model`: the normalized cross-platform data model.
//! - `connector`: the `StreamConnector` trait and capability provider traits.
//! - `governor`: quota accounting, error tallies, and the circuit breaker.
//! - `scoring`: trust, relevance, and polling-priority derivation.
//! - `retry`: bounded exponential backoff for transient upstream errors.
#![warn(missing_docs)]

/// Connector capability traits and the primary `StreamConnector` interface.
pub mod connector;
/// Core error type shared by the orchestrator, catalog, and connectors.
pub mod error;
/// Quota, error-tally, and circuit-breaker governance.
pub mod governor;
/// Normalized data model.
pub mod model;
/// Retry helper for transient upstream errors.
pub mod retry;
/// Derived-attribute scoring.
pub mod scoring;

pub use connector::{
    ChannelProvider, DiscoveryProvider, FeedProvider, LivenessProvider, StreamConnector,
};
pub use error::VigilError;
pub use governor::{Governor, PauseReason};
pub use model::{
    ApiUsageRecord, Channel, ChannelRef, Follow, GeoTag, Report, Stream, StreamUpdate,
    match_keywords, normalize_thumbnail,
};
pub use retry::retry_with_backoff;
pub use scoring::{
    DEFAULT_HISTORY, SEEDED_HISTORY, polling_priority, relevance_score, trust_score,
};
