//! Phú Quý price feed (Vendor A).
//!
//! Payload: `{ "errorCode": "0", "data": [{ "id": "V", "priceBuyTael": .., "priceSellTael": .., "priceChangePercent": .. }] }`.
//! Prices are per tael and are converted to per chỉ.

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::Mode;
use crate::ingest::types::QuoteProvider;
use crate::quote::{tael_to_chi, CanonicalQuote, CanonicalQuoteSet, Source};

const GOLD_999_ID: &str = "V";
const SJC_ID: &str = "S";
const SILVER_ID: &str = "B";

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(rename = "errorCode")]
    error_code: Option<Value>,
    data: Option<Vec<Value>>,
}

impl Payload {
    fn is_success(&self) -> bool {
        match &self.error_code {
            Some(Value::String(s)) => s == "0",
            Some(Value::Number(n)) => n.as_i64() == Some(0),
            _ => false,
        }
    }
}

/// Numbers and numeric strings; anything else is `None`.
fn number(v: Option<&Value>) -> Option<f64> {
    match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// One `data` element, read field by field so an odd entry only affects itself.
struct Entry<'a>(&'a Value);

impl<'a> Entry<'a> {
    fn id(&self) -> Option<&'a str> {
        self.0.get("id").and_then(Value::as_str)
    }

    fn price(&self, key: &str) -> f64 {
        let raw = self.0.get(key);
        number(raw).unwrap_or_else(|| {
            if raw.is_some_and(|v| !v.is_null()) {
                tracing::warn!(field = key, value = ?raw, "phu_quy: unparsable price");
                counter!("phu_quy_unparsable_price_total").increment(1);
            }
            f64::NAN
        })
    }

    fn quote(&self) -> CanonicalQuote {
        CanonicalQuote::new(
            tael_to_chi(self.price("priceBuyTael")),
            tael_to_chi(self.price("priceSellTael")),
            number(self.0.get("priceChangePercent")),
        )
    }
}

/// Normalize a raw Phú Quý payload. `None` when the vendor reports an error
/// or the entry list is missing.
pub fn normalize(raw: &Value) -> Option<CanonicalQuoteSet> {
    let payload = Payload::deserialize(raw).ok()?;
    if !payload.is_success() {
        return None;
    }
    let data = payload.data?;

    let find = |id: &str| {
        data.iter()
            .map(Entry)
            .find(|e| e.id() == Some(id))
            .map(|e| e.quote())
    };

    Some(CanonicalQuoteSet {
        gold: find(GOLD_999_ID),
        sjc: find(SJC_ID),
        silver: find(SILVER_ID),
    })
}

pub struct PhuQuyProvider {
    mode: Mode,
}

impl PhuQuyProvider {
    pub fn from_fixture(payload: Value) -> Self {
        Self {
            mode: Mode::Fixture(payload),
        }
    }

    pub fn from_fixture_str(s: &str) -> Result<Self> {
        let payload = serde_json::from_str(s).context("parsing phu quy fixture")?;
        Ok(Self::from_fixture(payload))
    }

    pub fn from_url(url: &str, client: Client) -> Self {
        Self {
            mode: Mode::Http {
                url: url.to_string(),
                client,
            },
        }
    }
}

#[async_trait]
impl QuoteProvider for PhuQuyProvider {
    async fn fetch_latest(&self) -> Result<Option<CanonicalQuoteSet>> {
        let raw = self.mode.load(self.name()).await?;
        Ok(normalize(&raw))
    }

    fn source(&self) -> Source {
        Source::PhuQuy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_zero_error_code_counts_as_success() {
        let raw = json!({ "errorCode": 0, "data": [] });
        assert_eq!(normalize(&raw), Some(CanonicalQuoteSet::default()));
    }

    #[test]
    fn first_entry_with_matching_id_wins() {
        let raw = json!({
            "errorCode": "0",
            "data": [
                { "id": "S", "priceBuyTael": 100.0, "priceSellTael": 200.0 },
                { "id": "S", "priceBuyTael": 300.0, "priceSellTael": 400.0 }
            ]
        });
        let set = normalize(&raw).unwrap();
        assert_eq!(set.sjc, Some(CanonicalQuote::new(10.0, 20.0, None)));
    }

    #[test]
    fn odd_entries_only_affect_themselves() {
        let raw = json!({
            "errorCode": "0",
            "data": [
                null,
                { "id": "V", "priceBuyTael": 100.0, "priceSellTael": 200.0 },
                { "id": "N", "priceBuyTael": [1], "priceSellTael": {} },
                { "id": 7 },
                { "id": "B", "priceBuyTael": "50", "priceSellTael": "oops", "priceChangePercent": "-1.5" }
            ]
        });
        let set = normalize(&raw).unwrap();
        assert_eq!(set.gold, Some(CanonicalQuote::new(10.0, 20.0, None)));
        assert!(set.sjc.is_none());
        let silver = set.silver.unwrap();
        assert_eq!(silver.buy, 5.0);
        assert!(silver.sell.is_nan());
        assert_eq!(silver.change_percent, Some(-1.5));
    }

    #[test]
    fn non_object_payload_is_malformed() {
        assert_eq!(normalize(&json!("oops")), None);
        assert_eq!(normalize(&json!({ "errorCode": "0", "data": {} })), None);
    }
}
