//! Quota accounting, error tallies, and the circuit breaker.
//!
//! Every connector owns one [`Governor`]. Tasks consult it before touching
//! upstream; adapters debit it as they spend units and feed it their
//! successes and failures. All state is in-memory and survives across task
//! runs for the life of the connector.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use vigil_types::{BreakerConfig, ConnectorReport, ConnectorStatus, Platform, QuotaConfig};

use crate::error::VigilError;

/// Why the breaker tripped. Quota-tripped pauses are the only kind a daily
/// quota rollover is allowed to clear early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    /// The unit budget ran out.
    QuotaExhausted,
    /// The upstream's short-window budget dropped below the safety floor.
    RateLimit,
    /// The sliding error tally reached its threshold.
    Errors,
}

#[derive(Debug)]
struct BreakerState {
    status: ConnectorStatus,
    until: Option<DateTime<Utc>>,
    reason: Option<PauseReason>,
    last_reset: DateTime<Utc>,
}

/// Shared governance state for one logical connector.
#[derive(Debug)]
pub struct Governor {
    platform: Platform,
    quota_limit: u64,
    quota_pause: Duration,
    breaker: BreakerConfig,
    quota_consumed: AtomicU64,
    error_count: AtomicU32,
    state: Mutex<BreakerState>,
}

impl Governor {
    /// Create a governor with the given quota budget and breaker tuning.
    #[must_use]
    pub fn new(platform: Platform, quota: &QuotaConfig, breaker: BreakerConfig) -> Self {
        Self {
            platform,
            quota_limit: quota.limit,
            quota_pause: quota.pause,
            breaker,
            quota_consumed: AtomicU64::new(0),
            error_count: AtomicU32::new(0),
            state: Mutex::new(BreakerState {
                status: ConnectorStatus::Active,
                until: None,
                reason: None,
                last_reset: Utc::now(),
            }),
        }
    }

    /// Governor for a connector without a unit budget (rate headers govern
    /// it instead). Quota debits always succeed.
    #[must_use]
    pub fn unmetered(platform: Platform, breaker: BreakerConfig) -> Self {
        Self::new(
            platform,
            &QuotaConfig {
                limit: u64::MAX,
                pause: Duration::from_secs(300),
            },
            breaker,
        )
    }

    /// Atomically debit `units` from the budget.
    ///
    /// If the debit would exceed the limit, the counter is left untouched,
    /// the breaker trips with a quota cool-off, and `false` is returned.
    pub fn consume_quota(&self, units: u64) -> bool {
        let mut current = self.quota_consumed.load(Ordering::Acquire);
        loop {
            if current.saturating_add(units) > self.quota_limit {
                warn!(
                    platform = %self.platform,
                    consumed = current,
                    limit = self.quota_limit,
                    units,
                    "quota exhausted"
                );
                self.pause(PauseReason::QuotaExhausted, self.quota_pause);
                return false;
            }
            match self.quota_consumed.compare_exchange_weak(
                current,
                current + units,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    /// Zero the quota counter (daily rollover). Clears the breaker if, and
    /// only if, quota exhaustion is what tripped it.
    pub fn reset_quota(&self) {
        self.quota_consumed.store(0, Ordering::Release);
        let mut state = self.state.lock().expect("governor mutex poisoned");
        state.last_reset = Utc::now();
        info!(platform = %self.platform, "quota reset to 0");
        if state.status == ConnectorStatus::Paused
            && state.reason == Some(PauseReason::QuotaExhausted)
        {
            self.resume(&mut state);
            info!(platform = %self.platform, "connector resumed after quota reset");
        }
    }

    /// Units consumed since the last reset.
    pub fn quota_consumed(&self) -> u64 {
        self.quota_consumed.load(Ordering::Acquire)
    }

    /// Units still available.
    pub fn quota_remaining(&self) -> u64 {
        self.quota_limit.saturating_sub(self.quota_consumed())
    }

    /// Record a failed upstream interaction. Trips the breaker for the
    /// configured error cool-off once the tally reaches its threshold.
    pub fn record_error(&self, err: &VigilError) {
        let tally = self.error_count.fetch_add(1, Ordering::AcqRel) + 1;
        warn!(
            platform = %self.platform,
            tally,
            threshold = self.breaker.max_errors,
            error = %err,
            "connector error recorded"
        );
        if tally >= self.breaker.max_errors {
            self.pause(PauseReason::Errors, self.breaker.error_pause);
        }
    }

    /// Record a successful upstream interaction: decrement the tally, floor 0.
    pub fn record_success(&self) {
        let mut current = self.error_count.load(Ordering::Acquire);
        while current > 0 {
            match self.error_count.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }

    /// Current sliding error tally.
    pub fn error_count(&self) -> u32 {
        self.error_count.load(Ordering::Acquire)
    }

    /// Trip the breaker for `cool_off` from now.
    pub fn pause(&self, reason: PauseReason, cool_off: Duration) {
        // Out-of-range cool-offs clamp to a year, which is over-long anyway.
        let cool_off =
            chrono::Duration::from_std(cool_off).unwrap_or_else(|_| chrono::Duration::days(365));
        self.pause_until(reason, Utc::now() + cool_off);
    }

    /// Trip the breaker until an absolute deadline (e.g. the upstream's
    /// declared rate-window reset).
    pub fn pause_until(&self, reason: PauseReason, deadline: DateTime<Utc>) {
        let mut state = self.state.lock().expect("governor mutex poisoned");
        state.status = ConnectorStatus::Paused;
        state.until = Some(deadline);
        state.reason = Some(reason);
        warn!(
            platform = %self.platform,
            reason = ?reason,
            resuming_at = %deadline,
            "connector paused"
        );
    }

    /// Switch the connector off. Never self-clears.
    pub fn disable(&self) {
        let mut state = self.state.lock().expect("governor mutex poisoned");
        state.status = ConnectorStatus::Disabled;
        state.until = None;
        state.reason = None;
    }

    /// True iff the connector may touch upstream right now.
    ///
    /// A tripped breaker whose deadline has passed auto-clears here, so the
    /// first check after the cool-off resumes the connector.
    pub fn is_operational(&self) -> bool {
        let mut state = self.state.lock().expect("governor mutex poisoned");
        match state.status {
            ConnectorStatus::Active => true,
            ConnectorStatus::Disabled | ConnectorStatus::Error => false,
            ConnectorStatus::Paused => match state.until {
                Some(deadline) if Utc::now() >= deadline => {
                    self.resume(&mut state);
                    info!(platform = %self.platform, "connector resumed");
                    true
                }
                _ => false,
            },
        }
    }

    /// Breaker-governed status without triggering auto-clear.
    pub fn status(&self) -> ConnectorStatus {
        self.state.lock().expect("governor mutex poisoned").status
    }

    /// Operator-visible snapshot of the governance counters.
    pub fn snapshot(&self, connector: &str) -> ConnectorReport {
        let state = self.state.lock().expect("governor mutex poisoned");
        ConnectorReport {
            platform: self.platform,
            connector: connector.to_string(),
            status: state.status,
            quota_consumed: self.quota_consumed(),
            quota_limit: self.quota_limit,
            quota_remaining: self.quota_remaining(),
            error_count: self.error_count(),
            paused_until: state.until,
            last_reset: state.last_reset,
        }
    }

    fn resume(&self, state: &mut BreakerState) {
        state.status = ConnectorStatus::Active;
        state.until = None;
        state.reason = None;
        self.error_count.store(0, Ordering::Release);
    }
}
