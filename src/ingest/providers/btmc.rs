//! BTMC price feed (Vendor B).
//!
//! The payload is a flat table under `DataList.Data`. Every row names its own
//! 1-based index in the `@row` field and suffixes all sibling keys with it:
//!
//! ```json
//! { "@row": "3", "@n_3": "BẠC 1 LƯỢNG", "@pb_3": "750000", "@ps_3": "780000", "@h_3": "" }
//! ```
//!
//! [`RawRow`] is the only code that builds those keys; everything else works
//! on the typed [`BtmcRow`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;
use serde_json::{Map, Value};

use super::Mode;
use crate::ingest::types::QuoteProvider;
use crate::quote::{CanonicalQuote, CanonicalQuoteSet, Source};

const ROW_INDEX_FIELD: &str = "@row";

const GOLD_PURITY: &str = "999.9";
const SJC_MARKER: &str = "SJC";
const JEWELRY_MARKER: &str = "TRANG SỨC";
const SILVER_MARKERS: [&str; 2] = ["BẠC", "BAC"];

/// Silver denomination markers and the factor that brings the quote to one chỉ.
/// Checked in order, first hit wins.
const SILVER_FACTORS: [(&[&str], f64); 3] = [
    (&["1 KG", "1000 GRAM"], 0.00375),
    (&["10 LƯỢNG"], 0.01),
    (&["1 LƯỢNG"], 0.1),
];

/// Logical fields of a row, independent of the row index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowField {
    Name,
    Buy,
    Sell,
    Purity,
}

impl RowField {
    fn key_prefix(self) -> &'static str {
        match self {
            RowField::Name => "@n_",
            RowField::Buy => "@pb_",
            RowField::Sell => "@ps_",
            RowField::Purity => "@h_",
        }
    }
}

/// Raw row object as sent by the vendor.
struct RawRow<'a> {
    fields: &'a Map<String, Value>,
}

impl<'a> RawRow<'a> {
    fn new(v: &'a Value) -> Option<Self> {
        v.as_object().map(|fields| Self { fields })
    }

    fn index(&self) -> Option<String> {
        self.fields.get(ROW_INDEX_FIELD).and_then(non_empty_text)
    }

    fn field(&self, field: RowField, index: &str) -> Option<String> {
        let key = format!("{}{}", field.key_prefix(), index);
        self.fields.get(&key).and_then(non_empty_text)
    }
}

fn non_empty_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Malformed numbers become NaN instead of failing the whole payload.
fn parse_price(s: &str, field: RowField, index: &str) -> f64 {
    s.trim().parse::<f64>().unwrap_or_else(|_| {
        tracing::warn!(row = index, ?field, value = s, "btmc: unparsable price");
        counter!("btmc_unparsable_price_total").increment(1);
        f64::NAN
    })
}

/// One usable row of the BTMC table.
#[derive(Debug, Clone, PartialEq)]
pub struct BtmcRow {
    pub index: String,
    pub name: String,
    pub buy: f64,
    pub sell: f64,
    pub purity: String,
}

impl BtmcRow {
    /// `None` unless index, name, buy and sell are all present and non-empty.
    pub fn parse(v: &Value) -> Option<Self> {
        let raw = RawRow::new(v)?;
        let index = raw.index()?;
        let name = raw.field(RowField::Name, &index)?;
        let buy = raw.field(RowField::Buy, &index)?;
        let sell = raw.field(RowField::Sell, &index)?;
        let purity = raw.field(RowField::Purity, &index).unwrap_or_default();
        Some(Self {
            buy: parse_price(&buy, RowField::Buy, &index),
            sell: parse_price(&sell, RowField::Sell, &index),
            index,
            name,
            purity,
        })
    }

    fn is_gold_999(&self) -> bool {
        (self.purity == GOLD_PURITY && !self.name.contains(SJC_MARKER))
            || self.name.contains(JEWELRY_MARKER)
    }

    fn is_sjc(&self) -> bool {
        self.name.contains(SJC_MARKER)
    }

    fn is_silver(&self) -> bool {
        SILVER_MARKERS.iter().any(|m| self.name.contains(m))
    }

    fn quote(&self, factor: f64) -> CanonicalQuote {
        CanonicalQuote::new(self.buy * factor, self.sell * factor, None)
    }
}

/// Multiplier for a silver row based on the denomination in its name.
pub fn silver_factor(name: &str) -> f64 {
    SILVER_FACTORS
        .iter()
        .find(|(markers, _)| markers.iter().any(|m| name.contains(m)))
        .map(|(_, f)| *f)
        .unwrap_or(1.0)
}

/// Usable rows in payload order. `None` when the table container is missing.
pub fn parse_rows(raw: &Value) -> Option<Vec<BtmcRow>> {
    let data = raw.get("DataList")?.get("Data")?.as_array()?;
    Some(data.iter().filter_map(BtmcRow::parse).collect())
}

/// Normalize a raw BTMC payload. Each product is an independent first-match
/// scan over the rows in payload order.
pub fn normalize(raw: &Value) -> Option<CanonicalQuoteSet> {
    let rows = parse_rows(raw)?;

    let gold = rows.iter().find(|r| r.is_gold_999()).map(|r| r.quote(1.0));
    let sjc = rows.iter().find(|r| r.is_sjc()).map(|r| r.quote(1.0));
    let silver = rows
        .iter()
        .find(|r| r.is_silver())
        .map(|r| r.quote(silver_factor(&r.name)));

    Some(CanonicalQuoteSet { gold, sjc, silver })
}

pub struct BtmcProvider {
    mode: Mode,
}

impl BtmcProvider {
    pub fn from_fixture(payload: Value) -> Self {
        Self {
            mode: Mode::Fixture(payload),
        }
    }

    pub fn from_fixture_str(s: &str) -> Result<Self> {
        let payload = serde_json::from_str(s).context("parsing btmc fixture")?;
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
impl QuoteProvider for BtmcProvider {
    async fn fetch_latest(&self) -> Result<Option<CanonicalQuoteSet>> {
        let raw = self.mode.load(self.name()).await?;
        Ok(normalize(&raw))
    }

    fn source(&self) -> Source {
        Source::Btmc
    }
}
