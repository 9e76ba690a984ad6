//! Derived-attribute scoring over channels and streams.
//!
//! Trust feeds the read-side ranking and tags freshly observed channels;
//! polling priority bins channels into poll tiers for the scheduler.

use chrono::{DateTime, Utc};

use vigil_types::PollingPriority;

/// Default history component for channels with no curated standing.
pub const DEFAULT_HISTORY: f64 = 0.5;
/// History component for allowlisted seed channels.
pub const SEEDED_HISTORY: f64 = 1.0;

const W_AGE: f64 = 0.3;
const W_REACH: f64 = 0.3;
const W_HISTORY: f64 = 0.4;

const W_TRUST: f64 = 0.3;
const W_VIEWERS: f64 = 0.4;
const W_KEYWORDS: f64 = 0.3;

/// Trust score in [0, 1], rounded to two decimals.
///
/// Combines account age (a year saturates), reach (100k subscribers
/// saturates, log scale), and curated history. An unknown creation date
/// contributes a neutral 0.5 age component.
#[must_use]
pub fn trust_score(
    account_created_at: Option<DateTime<Utc>>,
    subscriber_count: u64,
    history: f64,
    now: DateTime<Utc>,
) -> f64 {
    let age = account_created_at.map_or(0.5, |created| {
        let age_days = (now - created).num_days().max(0) as f64;
        (age_days / 365.0).min(1.0)
    });
    let reach = (log10_of_max1(subscriber_count) / 5.0).min(1.0);
    let score = W_AGE * age + W_REACH * reach + W_HISTORY * history.clamp(0.0, 1.0);
    round_to(score, 2)
}

/// Relevance score for read-side ranking, rounded to three decimals.
///
/// 10k concurrent viewers saturate the viewer component; three matched
/// keywords saturate the keyword component.
#[must_use]
pub fn relevance_score(trust: f64, viewer_count: u64, keyword_matches: usize) -> f64 {
    let viewers = (log10_of_max1(viewer_count) / 4.0).min(1.0);
    let keywords = (keyword_matches as f64 / 3.0).min(1.0);
    let score = W_TRUST * trust.clamp(0.0, 1.0) + W_VIEWERS * viewers + W_KEYWORDS * keywords;
    round_to(score, 3)
}

/// Bin a channel into a polling tier from its last observed liveness.
#[must_use]
pub fn polling_priority(last_live_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> PollingPriority {
    let Some(last_live) = last_live_at else {
        return PollingPriority::Medium;
    };
    let hours = (now - last_live).num_hours();
    if hours < 24 {
        PollingPriority::High
    } else if hours < 24 * 7 {
        PollingPriority::Medium
    } else if hours < 24 * 30 {
        PollingPriority::Low
    } else {
        PollingPriority::Dead
    }
}

fn log10_of_max1(n: u64) -> f64 {
    (n.max(1) as f64).log10()
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
