//! # Query Layer
//! Time-windowed reads from the history store and grouping into chart series.

use anyhow::Result;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::history::HistoryStore;
use crate::quote::{PriceSnapshotRecord, Product, Source};

/// Records of the last `window_hours` hours (relative to `now`), ascending.
/// An empty window is not an error. A window reaching past the representable
/// range covers all history.
pub async fn query_history(
    store: &dyn HistoryStore,
    window_hours: u32,
    now: DateTime<Utc>,
) -> Result<Vec<PriceSnapshotRecord>> {
    let since = window_start(now, window_hours);
    let mut rows = store.query(since).await?;
    rows.retain(|r| r.timestamp >= since);
    rows.sort_by_key(|r| r.timestamp);
    Ok(rows)
}

fn window_start(now: DateTime<Utc>, window_hours: u32) -> DateTime<Utc> {
    TimeDelta::try_hours(i64::from(window_hours))
        .and_then(|d| now.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// One chart point: time on x, sell price on y.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub x: DateTime<Utc>,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub source: Source,
    pub product: Product,
    pub label: &'static str,
    pub points: Vec<SeriesPoint>,
}

/// Group records by (source, product). Points keep the input order, so an
/// ascending history yields ascending series. Series are ordered by source,
/// then product.
pub fn group_series(records: &[PriceSnapshotRecord]) -> Vec<ChartSeries> {
    let mut grouped: BTreeMap<(Source, Product), Vec<SeriesPoint>> = BTreeMap::new();
    for r in records {
        grouped
            .entry((r.source, r.product))
            .or_default()
            .push(SeriesPoint {
                x: r.timestamp,
                y: r.sell_price,
            });
    }
    grouped
        .into_iter()
        .map(|((source, product), points)| ChartSeries {
            source,
            product,
            label: product.label(),
            points,
        })
        .collect()
}
