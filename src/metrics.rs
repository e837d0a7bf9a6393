use anyhow::Context;
use axum::{extract::State, routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::TrackerConfig;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and expose the configured refresh interval.
    pub fn init(cfg: &TrackerConfig) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        gauge!("tracker_refresh_interval_secs").set(cfg.refresh_interval_secs as f64);

        Ok(Self { handle })
    }

    /// `/metrics` in the Prometheus text format, merged next to the API router.
    pub fn into_router(self) -> Router {
        Router::new()
            .route("/metrics", get(render))
            .with_state(self.handle)
    }
}

async fn render(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}
