use std::time::Duration;

use vigil_core::{Governor, PauseReason, VigilError};
use vigil_types::{BreakerConfig, ConnectorStatus, Platform, QuotaConfig};

fn metered(limit: u64) -> Governor {
    Governor::new(
        Platform::YouTube,
        &QuotaConfig {
            limit,
            pause: Duration::from_millis(40),
        },
        BreakerConfig {
            max_errors: 5,
            error_pause: Duration::from_millis(40),
        },
    )
}

#[test]
fn quota_firewall_blocks_the_unit_past_the_limit() {
    let gov = metered(100);

    assert!(gov.consume_quota(100));
    assert_eq!(gov.status(), ConnectorStatus::Active);

    assert!(!gov.consume_quota(1));
    assert_eq!(gov.status(), ConnectorStatus::Paused);
    // The failed debit leaves the counter untouched.
    assert_eq!(gov.quota_consumed(), 100);
    assert_eq!(gov.quota_remaining(), 0);
}

#[test]
fn debit_landing_exactly_on_the_limit_succeeds() {
    let gov = metered(10);
    assert!(gov.consume_quota(4));
    assert!(gov.consume_quota(6));
    assert_eq!(gov.quota_consumed(), 10);
    assert_eq!(gov.status(), ConnectorStatus::Active);
}

#[test]
fn error_tally_trips_exactly_at_the_threshold() {
    let gov = metered(100);
    let err = VigilError::upstream("test", "boom");

    for _ in 0..4 {
        gov.record_error(&err);
    }
    assert_eq!(gov.status(), ConnectorStatus::Active);

    gov.record_error(&err);
    assert_eq!(gov.status(), ConnectorStatus::Paused);
}

#[test]
fn successes_decrement_the_tally_with_a_floor_of_zero() {
    let gov = metered(100);
    let err = VigilError::upstream("test", "boom");

    gov.record_success();
    assert_eq!(gov.error_count(), 0);

    gov.record_error(&err);
    gov.record_error(&err);
    gov.record_success();
    assert_eq!(gov.error_count(), 1);
}

#[test]
fn breaker_auto_clears_after_the_cool_off() {
    let gov = metered(100);
    gov.pause(PauseReason::Errors, Duration::from_millis(50));

    assert!(!gov.is_operational());

    std::thread::sleep(Duration::from_millis(70));
    assert!(gov.is_operational());
    assert_eq!(gov.status(), ConnectorStatus::Active);
    assert_eq!(gov.error_count(), 0);
}

#[test]
fn quota_reset_clears_only_quota_pauses() {
    let gov = metered(5);
    assert!(!gov.consume_quota(6));
    assert_eq!(gov.status(), ConnectorStatus::Paused);

    gov.reset_quota();
    assert_eq!(gov.quota_consumed(), 0);
    assert_eq!(gov.status(), ConnectorStatus::Active);

    // A pause caused by errors survives the daily rollover.
    gov.pause(PauseReason::Errors, Duration::from_secs(600));
    gov.reset_quota();
    assert_eq!(gov.status(), ConnectorStatus::Paused);
}

#[test]
fn disabled_connectors_never_self_clear() {
    let gov = metered(100);
    gov.disable();
    assert!(!gov.is_operational());
    gov.reset_quota();
    assert!(!gov.is_operational());
    assert_eq!(gov.status(), ConnectorStatus::Disabled);
}

#[test]
fn unmetered_governors_always_grant_quota() {
    let gov = Governor::unmetered(Platform::Twitch, BreakerConfig::default());
    assert!(gov.consume_quota(1_000_000));
    assert_eq!(gov.status(), ConnectorStatus::Active);
}

#[test]
fn snapshot_reflects_the_counters() {
    let gov = metered(100);
    assert!(gov.consume_quota(30));
    gov.record_error(&VigilError::upstream("test", "boom"));

    let report = gov.snapshot("vigil-test");
    assert_eq!(report.platform, Platform::YouTube);
    assert_eq!(report.connector, "vigil-test");
    assert_eq!(report.quota_consumed, 30);
    assert_eq!(report.quota_remaining, 70);
    assert_eq!(report.error_count, 1);
    assert_eq!(report.status, ConnectorStatus::Active);
    assert!(report.paused_until.is_none());
}
