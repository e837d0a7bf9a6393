use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;

use crate::config::TrackerConfig;
use crate::history::{build_store, HistoryStore};
use crate::ingest::providers::build_providers;
use crate::ingest::types::SharedProviders;
use crate::ingest::{self, SourcePoll, TickReport};
use crate::query::{self, ChartSeries};
use crate::quote::{PriceSnapshotRecord, Source};

#[derive(Clone)]
pub struct AppState {
    pub providers: SharedProviders,
    pub store: Arc<dyn HistoryStore>,
    pub config: Arc<TrackerConfig>,
}

impl AppState {
    pub fn new(
        providers: SharedProviders,
        store: Arc<dyn HistoryStore>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            providers,
            store,
            config: Arc::new(config),
        }
    }

    /// Providers and history store as described by `config`.
    pub fn from_config(config: TrackerConfig) -> anyhow::Result<Self> {
        let providers = build_providers(&config)?;
        let store = build_store(&config);
        Ok(Self::new(providers, store, config))
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/quotes", get(live_quotes))
        .route("/api/history", get(history))
        .route("/api/series", get(series))
        .route("/api/sync", post(sync_now))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Store failures surface as 500 with a JSON `{ "error": .. }` body.
struct ApiError(anyhow::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::warn!(error = ?self.0, "history query failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct QuotesOut {
    fetched_at: DateTime<Utc>,
    sources: Vec<SourcePoll>,
}

async fn live_quotes(State(state): State<AppState>) -> Json<QuotesOut> {
    let sources = ingest::poll_quotes(&state.providers[..]).await;
    Json(QuotesOut {
        fetched_at: Utc::now(),
        sources,
    })
}

#[derive(Debug, Default, serde::Deserialize)]
struct WindowParams {
    hours: Option<String>,
    source: Option<Source>,
}

/// Missing, unparsable and zero `hours` all mean the default window.
fn window_hours(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|h| *h > 0)
        .unwrap_or(default)
}

async fn windowed(state: &AppState, params: &WindowParams) -> anyhow::Result<Vec<PriceSnapshotRecord>> {
    let hours = window_hours(params.hours.as_deref(), state.config.default_window_hours);
    let mut rows = query::query_history(state.store.as_ref(), hours, Utc::now()).await?;
    if let Some(src) = params.source {
        rows.retain(|r| r.source == src);
    }
    Ok(rows)
}

async fn history(
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> Result<Json<Vec<PriceSnapshotRecord>>, ApiError> {
    Ok(Json(windowed(&state, &params).await?))
}

async fn series(
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> Result<Json<Vec<ChartSeries>>, ApiError> {
    let rows = windowed(&state, &params).await?;
    Ok(Json(query::group_series(&rows)))
}

async fn sync_now(State(state): State<AppState>) -> Json<TickReport> {
    let report = ingest::run_once(&state.providers[..], state.store.as_ref(), Utc::now()).await;
    tracing::info!(appended = report.appended(), failed = report.failed(), "on-demand sync");
    Json(report)
}
