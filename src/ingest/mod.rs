// src/ingest/mod.rs
pub mod providers;
pub mod scheduler;
pub mod types;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::history::HistoryStore;
use crate::ingest::types::QuoteProvider;
use crate::quote::{CanonicalQuoteSet, PriceSnapshotRecord, Source};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ingest_provider_errors_total",
            "Vendor fetch errors (unreachable or non-success status)."
        );
        describe_counter!(
            "ingest_malformed_payload_total",
            "Vendor payloads missing their expected container."
        );
        describe_counter!(
            "btmc_unparsable_price_total",
            "BTMC buy/sell strings that did not parse as numbers."
        );
        describe_counter!(
            "phu_quy_unparsable_price_total",
            "Phú Quý price fields that were neither numbers nor numeric strings."
        );
        describe_counter!(
            "ingest_nonfinite_price_total",
            "Quotes not persisted because a price did not parse as a number."
        );
        describe_counter!("ingest_records_appended_total", "Snapshots appended to history.");
        describe_counter!(
            "history_append_errors_total",
            "Snapshot appends rejected by the history store."
        );
        describe_counter!("ingest_runs_total", "Scheduled sync ticks.");
        describe_histogram!("ingest_fetch_ms", "Vendor fetch time in milliseconds.");
        describe_gauge!(
            "ingest_pipeline_last_run_ts",
            "Unix ts when the sync pipeline last ran."
        );
    });
}

/// Result of polling one vendor. `quotes` is `None` when the vendor was
/// unreachable or its payload was malformed.
#[derive(Debug, Clone, Serialize)]
pub struct SourcePoll {
    pub source: Source,
    pub quotes: Option<CanonicalQuoteSet>,
}

/// Poll every provider concurrently. A failing provider never affects the others.
pub async fn poll_quotes(providers: &[Box<dyn QuoteProvider>]) -> Vec<SourcePoll> {
    ensure_metrics_described();

    let polls = providers.iter().map(|p| async move {
        let quotes = match p.fetch_latest().await {
            Ok(Some(set)) => Some(set),
            Ok(None) => {
                tracing::warn!(target: "ingest", provider = p.name(), "malformed payload");
                counter!("ingest_malformed_payload_total", "source" => p.name()).increment(1);
                None
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, provider = p.name(), "provider error");
                counter!("ingest_provider_errors_total", "source" => p.name()).increment(1);
                None
            }
        };
        SourcePoll {
            source: p.source(),
            quotes,
        }
    });

    join_all(polls).await
}

/// Per-vendor outcome of one sync tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceOutcome {
    pub source: Source,
    pub fetched: bool,
    pub appended: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub timestamp: DateTime<Utc>,
    pub sources: Vec<SourceOutcome>,
}

impl TickReport {
    pub fn appended(&self) -> usize {
        self.sources.iter().map(|s| s.appended).sum()
    }

    pub fn failed(&self) -> usize {
        self.sources.iter().map(|s| s.failed).sum()
    }

    pub fn skipped(&self) -> usize {
        self.sources.iter().map(|s| s.skipped).sum()
    }

    pub fn outcome(&self, source: Source) -> Option<&SourceOutcome> {
        self.sources.iter().find(|s| s.source == source)
    }
}

/// Append one snapshot per present product of one vendor's quote set.
/// Every append stands alone: failures are logged and counted only.
async fn persist_poll(
    store: &dyn HistoryStore,
    poll: &SourcePoll,
    now: DateTime<Utc>,
) -> SourceOutcome {
    let mut out = SourceOutcome {
        source: poll.source,
        fetched: poll.quotes.is_some(),
        appended: 0,
        failed: 0,
        skipped: 0,
    };
    let Some(set) = &poll.quotes else {
        return out;
    };

    for (product, quote) in set.present() {
        // NaN from malformed vendor numbers cannot round-trip through JSON.
        if !quote.is_finite() {
            tracing::warn!(
                target: "ingest",
                source = poll.source.id(),
                product = product.label(),
                buy = quote.buy,
                sell = quote.sell,
                "non-numeric price, snapshot not stored"
            );
            counter!("ingest_nonfinite_price_total", "source" => poll.source.id()).increment(1);
            out.skipped += 1;
            continue;
        }

        let record = PriceSnapshotRecord::from_quote(now, poll.source, product, quote);
        match store.append(&record).await {
            Ok(()) => out.appended += 1,
            Err(e) => {
                tracing::warn!(
                    target: "ingest",
                    error = ?e,
                    source = poll.source.id(),
                    product = product.label(),
                    "history append failed"
                );
                counter!("history_append_errors_total").increment(1);
                out.failed += 1;
            }
        }
    }
    out
}

/// Run one sync tick: poll all vendors, then append their quotes to `store`
/// stamped with `now`. Never fails; problems are reported in the returned
/// [`TickReport`] and the logs.
pub async fn run_once(
    providers: &[Box<dyn QuoteProvider>],
    store: &dyn HistoryStore,
    now: DateTime<Utc>,
) -> TickReport {
    let polls = poll_quotes(providers).await;

    let mut sources = Vec::with_capacity(polls.len());
    for poll in &polls {
        sources.push(persist_poll(store, poll, now).await);
    }
    let report = TickReport {
        timestamp: now,
        sources,
    };

    // Telemetry
    counter!("ingest_records_appended_total").increment(report.appended() as u64);
    gauge!("ingest_pipeline_last_run_ts").set(now.timestamp() as f64);

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::InMemoryHistory;
    use crate::quote::CanonicalQuote;
    use anyhow::Result;

    struct Fixed(Source, Option<CanonicalQuoteSet>);

    #[async_trait::async_trait]
    impl QuoteProvider for Fixed {
        async fn fetch_latest(&self) -> Result<Option<CanonicalQuoteSet>> {
            Ok(self.1)
        }
        fn source(&self) -> Source {
            self.0
        }
    }

    #[tokio::test]
    async fn nan_quotes_are_skipped_not_stored() {
        let set = CanonicalQuoteSet {
            gold: Some(CanonicalQuote::new(f64::NAN, 1.0, None)),
            sjc: Some(CanonicalQuote::new(2.0, 3.0, None)),
            silver: None,
        };
        let providers: Vec<Box<dyn QuoteProvider>> = vec![Box::new(Fixed(Source::Btmc, Some(set)))];
        let store = InMemoryHistory::with_capacity(10);
        let report = run_once(&providers, &store, Utc::now()).await;

        let o = report.outcome(Source::Btmc).unwrap();
        assert!(o.fetched);
        assert_eq!((o.appended, o.skipped, o.failed), (1, 1, 0));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn malformed_payload_is_reported_as_not_fetched() {
        let providers: Vec<Box<dyn QuoteProvider>> = vec![Box::new(Fixed(Source::PhuQuy, None))];
        let store = InMemoryHistory::with_capacity(10);
        let report = run_once(&providers, &store, Utc::now()).await;
        assert!(!report.outcome(Source::PhuQuy).unwrap().fetched);
        assert_eq!(report.appended(), 0);
        assert!(store.is_empty());
    }
}
