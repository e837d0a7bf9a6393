// tests/ingest_scheduler.rs
use chrono::{Duration, Utc};
use metal_price_tracker::ingest::providers::build_providers;
use metal_price_tracker::ingest::scheduler::{spawn_scheduler, SyncSchedulerCfg};
use metal_price_tracker::{HistoryStore, InMemoryHistory, TrackerConfig};
use std::sync::Arc;

#[tokio::test]
async fn first_tick_runs_immediately_and_persists_mock_quotes() {
    let cfg = TrackerConfig {
        mock_mode: true,
        ..TrackerConfig::default()
    };
    let providers = build_providers(&cfg).unwrap();
    let store = Arc::new(InMemoryHistory::with_capacity(1_000));

    let handle = spawn_scheduler(
        SyncSchedulerCfg { interval_secs: 3_600 },
        providers,
        store.clone(),
    );

    let mut stored = 0;
    for _ in 0..100 {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        stored = store.len();
        if stored >= 6 {
            break;
        }
    }
    handle.abort();

    assert_eq!(stored, 6, "one tick = 3 products x 2 vendors");
    let rows = store.query(Utc::now() - Duration::hours(1)).await.unwrap();
    assert_eq!(rows.len(), 6);
}
