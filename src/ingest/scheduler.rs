// src/ingest/scheduler.rs
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::history::HistoryStore;
use crate::ingest::types::SharedProviders;

#[derive(Clone, Copy, Debug)]
pub struct SyncSchedulerCfg {
    pub interval_secs: u64,
}

/// Spawn the background price sync. The first tick runs immediately; a slow
/// tick delays the next one instead of queueing a burst.
pub fn spawn_scheduler(
    cfg: SyncSchedulerCfg,
    providers: SharedProviders,
    store: Arc<dyn HistoryStore>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(cfg.interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;

            let report =
                crate::ingest::run_once(&providers[..], store.as_ref(), chrono::Utc::now()).await;

            counter!("ingest_runs_total").increment(1);
            tracing::info!(
                target: "ingest",
                appended = report.appended(),
                failed = report.failed(),
                skipped = report.skipped(),
                "price sync tick"
            );
        }
    })
}
