//! Closed enumerations shared by the catalog, connectors, and scheduler.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a string does not name a known enum variant.
///
/// Unknown upstream values are rejected at the boundary rather than being
/// carried through the system as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    /// Which enumeration failed to parse (e.g. "platform").
    pub kind: &'static str,
    /// The offending input.
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Supported streaming platforms.
///
/// This is a closed set: adding a platform means adding a connector crate,
/// so there is deliberately no catch-all variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Quota-metered platform: a small daily unit budget, expensive search.
    YouTube,
    /// Rate-budgeted platform: short-window request budgets, cheap search.
    Twitch,
}

impl Platform {
    /// Stable lowercase identifier used in the catalog and in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::YouTube => "youtube",
            Self::Twitch => "twitch",
        }
    }

    /// All supported platforms, in catalog order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::YouTube, Self::Twitch]
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "youtube" => Ok(Self::YouTube),
            "twitch" => Ok(Self::Twitch),
            other => Err(ParseEnumError::new("platform", other)),
        }
    }
}

/// Lifecycle status of a stream.
///
/// The lifecycle is a DAG: `Upcoming -> Live -> Ended`, with `Removed`
/// reachable from any state. Terminal states are never re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamStatus {
    /// The broadcast is currently on air.
    Live,
    /// Scheduled but not yet started.
    Upcoming,
    /// The broadcast finished.
    Ended,
    /// Withdrawn by moderation or archival; hidden from feeds.
    Removed,
}

impl StreamStatus {
    /// Catalog column form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Live => "LIVE",
            Self::Upcoming => "UPCOMING",
            Self::Ended => "ENDED",
            Self::Removed => "REMOVED",
        }
    }

    /// Whether this status may never transition back to `Live`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ended | Self::Removed)
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LIVE" => Ok(Self::Live),
            "UPCOMING" => Ok(Self::Upcoming),
            "ENDED" => Ok(Self::Ended),
            "REMOVED" => Ok(Self::Removed),
            other => Err(ParseEnumError::new("stream status", other)),
        }
    }
}

/// Per-channel polling tier derived from recent liveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollingPriority {
    /// Live within the last 24 hours; polled every couple of minutes.
    High,
    /// Live within the last week, or never observed; polled half-hourly.
    Medium,
    /// Live within the last month; polled a few times a day.
    Low,
    /// Dormant for over a month; polled daily.
    Dead,
}

impl PollingPriority {
    /// Catalog column form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Dead => "dead",
        }
    }
}

impl fmt::Display for PollingPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PollingPriority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            "dead" => Ok(Self::Dead),
            other => Err(ParseEnumError::new("polling priority", other)),
        }
    }
}

/// How a stream entered the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    /// Direct upstream keyword search.
    Search,
    /// Zero-cost feed monitoring of a known channel.
    Rss,
    /// Manually submitted by an operator or user.
    Submission,
    /// Out-of-band signal (e.g. an external alerting pipeline).
    Signal,
}

impl DiscoveryMethod {
    /// Catalog column form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Rss => "rss",
            Self::Submission => "submission",
            Self::Signal => "signal",
        }
    }
}

impl fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscoveryMethod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "search" => Ok(Self::Search),
            "rss" => Ok(Self::Rss),
            "submission" => Ok(Self::Submission),
            "signal" => Ok(Self::Signal),
            other => Err(ParseEnumError::new("discovery method", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_round_trips_through_str() {
        for p in Platform::all() {
            assert_eq!(p.as_str().parse::<Platform>().unwrap(), *p);
        }
    }

    #[test]
    fn unknown_platform_is_rejected() {
        let err = "rumble".parse::<Platform>().unwrap_err();
        assert_eq!(err.kind, "platform");
        assert_eq!(err.value, "rumble");
    }

    #[test]
    fn terminal_statuses() {
        assert!(StreamStatus::Ended.is_terminal());
        assert!(StreamStatus::Removed.is_terminal());
        assert!(!StreamStatus::Live.is_terminal());
        assert!(!StreamStatus::Upcoming.is_terminal());
    }

    #[test]
    fn status_serde_uses_screaming_case() {
        let json = serde_json::to_string(&StreamStatus::Live).unwrap();
        assert_eq!(json, "\"LIVE\"");
    }
}
