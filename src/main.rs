//! Price tracker service: binary entrypoint.
//! Boots the Axum HTTP server and the background price sync.

use metal_price_tracker::ingest::scheduler::{spawn_scheduler, SyncSchedulerCfg};
use metal_price_tracker::metrics::Metrics;
use metal_price_tracker::{api, AppState, TrackerConfig};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Logs filtered by `RUST_LOG`; JSON lines when `TRACKER_LOG_JSON=1`.
/// The hosting runtime may already have installed a subscriber, in which
/// case this is a no-op.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("metal_price_tracker=info,ingest=info,warn"));
    let json = std::env::var("TRACKER_LOG_JSON").is_ok_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = TrackerConfig::load_default()?;
    tracing::info!(
        refresh_secs = cfg.refresh_interval_secs,
        mock = cfg.mock_mode,
        locale = %cfg.locale,
        "tracker config loaded"
    );

    let metrics = Metrics::init(&cfg)?;
    let state = AppState::from_config(cfg)?;

    spawn_scheduler(
        SyncSchedulerCfg {
            interval_secs: state.config.refresh_interval_secs,
        },
        state.providers.clone(),
        state.store.clone(),
    );

    let router = api::create_router(state).merge(metrics.into_router());
    Ok(router.into())
}
