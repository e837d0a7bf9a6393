// tests/ingest_pipeline.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use metal_price_tracker::ingest::providers::{btmc::BtmcProvider, phu_quy::PhuQuyProvider};
use metal_price_tracker::ingest::types::QuoteProvider;
use metal_price_tracker::query::query_history;
use metal_price_tracker::{
    poll_quotes, run_once, CanonicalQuoteSet, HistoryStore, InMemoryHistory, PriceSnapshotRecord,
    Product, Source,
};
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

const PHU_QUY: &str = include_str!("fixtures/phu_quy.json");
const BTMC: &str = include_str!("fixtures/btmc.json");

struct Unreachable(Source);

#[async_trait]
impl QuoteProvider for Unreachable {
    async fn fetch_latest(&self) -> Result<Option<CanonicalQuoteSet>> {
        Err(anyhow!("connection refused"))
    }
    fn source(&self) -> Source {
        self.0
    }
}

/// Waits until every gated provider has started before answering.
struct Gated {
    source: Source,
    gate: Arc<Barrier>,
}

#[async_trait]
impl QuoteProvider for Gated {
    async fn fetch_latest(&self) -> Result<Option<CanonicalQuoteSet>> {
        self.gate.wait().await;
        Ok(Some(CanonicalQuoteSet::default()))
    }
    fn source(&self) -> Source {
        self.source
    }
}

/// Rejects every SJC record, stores the rest.
struct RejectSjc {
    rows: Mutex<Vec<PriceSnapshotRecord>>,
}

#[async_trait]
impl HistoryStore for RejectSjc {
    async fn append(&self, record: &PriceSnapshotRecord) -> Result<()> {
        if record.product == Product::Sjc {
            return Err(anyhow!("write rejected"));
        }
        self.rows.lock().unwrap().push(record.clone());
        Ok(())
    }
    async fn query(&self, since: DateTime<Utc>) -> Result<Vec<PriceSnapshotRecord>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().filter(|r| r.timestamp >= since).cloned().collect())
    }
}

fn fixture_providers() -> Vec<Box<dyn QuoteProvider>> {
    vec![
        Box::new(PhuQuyProvider::from_fixture_str(PHU_QUY).unwrap()),
        Box::new(BtmcProvider::from_fixture_str(BTMC).unwrap()),
    ]
}

#[tokio::test]
async fn failing_vendor_does_not_block_the_other() {
    let providers: Vec<Box<dyn QuoteProvider>> = vec![
        Box::new(Unreachable(Source::PhuQuy)),
        Box::new(BtmcProvider::from_fixture_str(BTMC).unwrap()),
    ];
    let store = InMemoryHistory::with_capacity(100);
    let report = run_once(&providers, &store, Utc::now()).await;

    let pq = report.outcome(Source::PhuQuy).unwrap();
    assert!(!pq.fetched);
    assert_eq!(pq.appended, 0);

    let btmc = report.outcome(Source::Btmc).unwrap();
    assert!(btmc.fetched);
    assert_eq!(btmc.appended, 3);

    let rows = store.query(Utc::now() - Duration::hours(1)).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.source == Source::Btmc));
}

#[tokio::test]
async fn append_failure_is_isolated_per_product() {
    let store = RejectSjc {
        rows: Mutex::new(Vec::new()),
    };
    let report = run_once(&fixture_providers(), &store, Utc::now()).await;

    assert_eq!(report.failed(), 2);
    assert_eq!(report.appended(), 4);
    let rows = store.rows.lock().unwrap();
    assert!(rows.iter().all(|r| r.product != Product::Sjc));
    assert!(rows.iter().any(|r| r.source == Source::PhuQuy && r.product == Product::Silver));
}

#[tokio::test]
async fn persisted_values_equal_normalized_values() {
    let providers = fixture_providers();
    let polls = poll_quotes(&providers).await;

    let store = InMemoryHistory::with_capacity(100);
    let now = Utc::now();
    run_once(&providers, &store, now).await;

    let rows = query_history(&store, 1, now + Duration::minutes(1)).await.unwrap();
    assert_eq!(rows.len(), 6);
    for poll in &polls {
        let set = poll.quotes.expect("fixture quotes");
        for (product, quote) in set.present() {
            let rec = rows
                .iter()
                .find(|r| r.source == poll.source && r.product == product)
                .expect("record for product");
            assert_eq!(rec.buy_price, quote.buy);
            assert_eq!(rec.sell_price, quote.sell);
            assert_eq!(rec.change_percent, quote.change_percent);
            assert_eq!(rec.timestamp, now);
        }
    }
}

#[tokio::test]
async fn polls_come_back_in_provider_order() {
    let providers = fixture_providers();
    let polls = poll_quotes(&providers).await;
    let sources: Vec<Source> = polls.iter().map(|p| p.source).collect();
    assert_eq!(sources, vec![Source::PhuQuy, Source::Btmc]);
}

#[tokio::test]
async fn vendor_polls_overlap() {
    let gate = Arc::new(Barrier::new(2));
    let providers: Vec<Box<dyn QuoteProvider>> = vec![
        Box::new(Gated { source: Source::PhuQuy, gate: gate.clone() }),
        Box::new(Gated { source: Source::Btmc, gate }),
    ];
    // Sequential polling would park the first provider at the barrier forever.
    let polls = tokio::time::timeout(std::time::Duration::from_secs(5), poll_quotes(&providers))
        .await
        .expect("both polls in flight at once");
    assert_eq!(polls.len(), 2);
    assert!(polls.iter().all(|p| p.quotes.is_some()));
}
