//! Report envelopes surfaced to operators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::connector::ConnectorStatus;
use crate::platform::Platform;

/// Point-in-time snapshot of a connector's governance state.
///
/// Derived entirely from in-memory counters; pairing it with the catalog's
/// `api_usage_log` gives the full operator-visible health picture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorReport {
    /// Platform this connector serves.
    pub platform: Platform,
    /// Registry name of the connector (e.g. "vigil-youtube").
    pub connector: String,
    /// Breaker-governed operational status.
    pub status: ConnectorStatus,
    /// Units consumed since the last reset.
    pub quota_consumed: u64,
    /// Configured unit budget.
    pub quota_limit: u64,
    /// Units still available.
    pub quota_remaining: u64,
    /// Current sliding error tally.
    pub error_count: u32,
    /// Deadline after which a tripped breaker auto-clears, if tripped.
    pub paused_until: Option<DateTime<Utc>>,
    /// When the quota counter was last zeroed.
    pub last_reset: DateTime<Utc>,
}
