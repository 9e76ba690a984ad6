use std::sync::Arc;
use std::time::Duration;

use vigil::Vigil;
use vigil_catalog::CatalogStore;
use vigil_mock::{MockBehavior, MockConnector};
use vigil_types::{CatalogConfig, Platform, ScheduleConfig};

async fn memory_catalog() -> CatalogStore {
    CatalogStore::connect(&CatalogConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    })
    .await
    .expect("in-memory catalog")
}

fn fast_schedule(discovery_ms: u64, time_limit_ms: u64) -> ScheduleConfig {
    ScheduleConfig {
        youtube_discovery_every: Duration::from_millis(discovery_ms),
        twitch_discovery_every: Duration::from_secs(3600),
        youtube_liveness_every: Duration::from_millis(20),
        twitch_liveness_every: Duration::from_secs(3600),
        priority_refresh_every: Duration::from_secs(3600),
        task_time_limit: Duration::from_millis(time_limit_ms),
        ..ScheduleConfig::default()
    }
}

#[tokio::test]
async fn discovery_runs_never_overlap() {
    let (connector, controller) = MockConnector::builder(Platform::YouTube).build();
    // Every run takes several ticks; overlapping ticks must be dropped.
    for _ in 0..8 {
        controller
            .push_discovery(MockBehavior::Delayed(Duration::from_millis(90), vec![]))
            .await;
    }

    let vigil = Arc::new(
        Vigil::builder()
            .catalog(memory_catalog().await)
            .connector(Arc::new(connector))
            .schedule(fast_schedule(25, 5_000))
            .build()
            .unwrap(),
    );
    let handle = vigil.start();
    tokio::time::sleep(Duration::from_millis(300)).await;
    handle.shutdown();

    let calls = controller.discover_calls().await.len();
    assert!(calls >= 1, "expected at least one discovery run");
    assert!(calls <= 4, "ticks during a run should be dropped, saw {calls}");
    assert_eq!(controller.max_concurrent_discovers().await, 1);
}

#[tokio::test]
async fn wedged_tasks_are_cut_off_at_the_time_limit() {
    let (connector, controller) = MockConnector::builder(Platform::YouTube).build();
    controller.push_discovery(MockBehavior::Hang).await;

    let vigil = Arc::new(
        Vigil::builder()
            .catalog(memory_catalog().await)
            .connector(Arc::new(connector))
            .schedule(fast_schedule(30, 50))
            .build()
            .unwrap(),
    );
    let handle = vigil.start();
    tokio::time::sleep(Duration::from_millis(400)).await;
    handle.shutdown();

    // The hung first run was interrupted and the loop kept ticking.
    let calls = controller.discover_calls().await.len();
    assert!(calls >= 2, "scheduler should outlive a wedged run, saw {calls}");
}

#[tokio::test]
async fn one_loop_per_advertised_capability() {
    let (full, _ctl_full) = MockConnector::builder(Platform::YouTube).build();
    let (no_liveness, _ctl_partial) = MockConnector::builder(Platform::Twitch)
        .without_liveness()
        .without_channels()
        .build();

    let vigil = Arc::new(
        Vigil::builder()
            .catalog(memory_catalog().await)
            .connector(Arc::new(full))
            .connector(Arc::new(no_liveness))
            .build()
            .unwrap(),
    );
    let handle = vigil.start();

    // discovery+liveness for the full connector, discovery only for the
    // partial one, plus quota reset, priority refresh, and archive.
    assert_eq!(handle.task_count(), 6);
    handle.shutdown();
}
